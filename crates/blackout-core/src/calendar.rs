//! Calendar views over a timeline.
//!
//! Hosts render two calendars from the same reconciled timeline: every
//! outage, and the same timeline with emergencies left out. Definite time
//! carved away by an emergency stays carved in both views.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  event::{EventKind, OutageEvent},
  timeline::Timeline,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalendarView {
  /// Definite and emergency outages.
  #[default]
  All,
  /// Definite outages of the reconciled timeline. Spans an emergency
  /// overrode show as gaps.
  ScheduleOnly,
}

impl CalendarView {
  fn includes(self, kind: EventKind) -> bool {
    match self {
      Self::All => true,
      Self::ScheduleOnly => kind == EventKind::Definite,
    }
  }
}

/// One calendar entry derived from a timeline event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEntry {
  /// Stable across fetches for the same `(kind, start)`.
  pub uid:   String,
  pub kind:  EventKind,
  pub start: DateTime<Utc>,
  pub end:   Option<DateTime<Utc>>,
}

impl From<&OutageEvent> for CalendarEntry {
  fn from(event: &OutageEvent) -> Self {
    Self {
      uid:   format!("{}-{}", event.kind, event.start.timestamp()),
      kind:  event.kind,
      start: event.start,
      end:   event.end,
    }
  }
}

/// Entries of `view` overlapping the window `[from, to)`.
pub fn entries(
  timeline: &Timeline,
  from: DateTime<Utc>,
  to: DateTime<Utc>,
  view: CalendarView,
) -> Vec<CalendarEntry> {
  timeline
    .iter()
    .filter(|e| view.includes(e.kind))
    .filter(|e| e.start < to && e.end.is_none_or(|end| end > from))
    .map(CalendarEntry::from)
    .collect()
}
