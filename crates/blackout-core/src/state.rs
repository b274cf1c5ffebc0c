//! Connectivity state derived from a timeline at a reference instant.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  event::{EventKind, OutageEvent},
  timeline::Timeline,
};

/// The three observable states: two event kinds plus their absence.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::AsRefStr,
  strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ConnectivityState {
  Connected,
  PlannedOutage,
  Emergency,
}

impl From<EventKind> for ConnectivityState {
  fn from(kind: EventKind) -> Self {
    match kind {
      EventKind::Definite => Self::PlannedOutage,
      EventKind::Emergency => Self::Emergency,
    }
  }
}

/// Everything a host needs to render sensors for one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Evaluation<'a> {
  pub state:                ConnectivityState,
  /// Start of the earliest definite event beginning after `now`.
  pub next_planned_outage:  Option<DateTime<Utc>>,
  /// End of the active outage; `None` when connected or open-ended.
  pub next_connectivity:    Option<DateTime<Utc>>,
  /// Earliest start of any event (either kind) beginning after `now`.
  pub next_scheduled_event: Option<DateTime<Utc>>,
  /// The event covering `now`, if any.
  pub active_event:         Option<&'a OutageEvent>,
}

/// Evaluate `timeline` at `now`.
///
/// Binary search locates the covering event; the forward scan stops at the
/// first event of each kind, so repeated calls stay cheap.
pub fn evaluate(timeline: &Timeline, now: DateTime<Utc>) -> Evaluation<'_> {
  let active_event = timeline.event_at(now);
  let upcoming = timeline.upcoming(now);

  let next_planned_outage = first_start(upcoming, EventKind::Definite);
  let next_emergency = first_start(upcoming, EventKind::Emergency);
  let next_scheduled_event = next_planned_outage.into_iter().chain(next_emergency).min();

  let (state, next_connectivity) = match active_event {
    Some(event) => (ConnectivityState::from(event.kind), event.end),
    None => (ConnectivityState::Connected, None),
  };

  Evaluation {
    state,
    next_planned_outage,
    next_connectivity,
    next_scheduled_event,
    active_event,
  }
}

fn first_start(events: &[OutageEvent], kind: EventKind) -> Option<DateTime<Utc>> {
  events.iter().find(|e| e.kind == kind).map(|e| e.start)
}
