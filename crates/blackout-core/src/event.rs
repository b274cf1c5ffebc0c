//! Canonical outage events. The provider-independent unit every adapter
//! produces and every downstream stage consumes.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  selector::{GroupKey, RegionKey, Selector},
};

// ─── Kind ────────────────────────────────────────────────────────────────────

/// Whether an outage was announced in advance or not.
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
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EventKind {
  /// A pre-announced outage from the provider's published schedule.
  Definite,
  /// An unscheduled outage, typically reported during occurrence.
  Emergency,
}

impl EventKind {
  /// Sort rank at equal start instants: emergencies come first.
  pub fn precedence(self) -> u8 {
    match self {
      Self::Emergency => 0,
      Self::Definite => 1,
    }
  }
}

// ─── Event ───────────────────────────────────────────────────────────────────

/// One outage interval `[start, end)` for a single selector.
///
/// `end == None` is the open-ended sentinel: an ongoing outage whose
/// resolution is unknown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutageEvent {
  pub region:            RegionKey,
  pub group:             GroupKey,
  pub kind:              EventKind,
  pub start:             DateTime<Utc>,
  #[serde(default)]
  pub end:               Option<DateTime<Utc>>,
  /// When the provider last modified this schedule server-side.
  #[serde(default)]
  pub source_updated_at: Option<DateTime<Utc>>,
}

impl OutageEvent {
  /// Build a bounded event, rejecting `start >= end`.
  pub fn new(
    selector: &Selector,
    kind: EventKind,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
  ) -> Result<Self> {
    let event = Self {
      region: selector.region.clone(),
      group: selector.group.clone(),
      kind,
      start,
      end: Some(end),
      source_updated_at: None,
    };
    event.validate()?;
    Ok(event)
  }

  /// Build an event with no known end.
  pub fn open_ended(
    selector: &Selector,
    kind: EventKind,
    start: DateTime<Utc>,
  ) -> Self {
    Self {
      region: selector.region.clone(),
      group: selector.group.clone(),
      kind,
      start,
      end: None,
      source_updated_at: None,
    }
  }

  pub fn with_source_updated_at(mut self, at: Option<DateTime<Utc>>) -> Self {
    self.source_updated_at = at;
    self
  }

  pub fn selector(&self) -> Selector {
    Selector {
      region: self.region.clone(),
      group:  self.group.clone(),
    }
  }

  pub fn is_open_ended(&self) -> bool { self.end.is_none() }

  /// Check the `start < end` invariant (open-ended events always pass).
  pub fn validate(&self) -> Result<()> {
    match self.end {
      Some(end) if self.start >= end => Err(Error::InconsistentEvent {
        selector: self.selector(),
        start: self.start,
        end,
      }),
      _ => Ok(()),
    }
  }

  /// True when `at` lies inside `[start, end)`.
  pub fn covers(&self, at: DateTime<Utc>) -> bool {
    self.start <= at && self.end.is_none_or(|end| at < end)
  }

  /// True when this event overlaps or touches an interval starting at `at`.
  pub fn reaches(&self, at: DateTime<Utc>) -> bool {
    self.end.is_none_or(|end| end >= at)
  }

  /// A copy of this event restricted to `[start, end)`.
  pub fn fragment(
    &self,
    start: DateTime<Utc>,
    end: Option<DateTime<Utc>>,
  ) -> Self {
    Self {
      start,
      end,
      ..self.clone()
    }
  }

  /// Total order used everywhere events are sorted: start ascending,
  /// emergencies first at equal starts, then end (open-ended last).
  /// Remaining fields break ties so the order never depends on input order.
  pub fn chronological(a: &Self, b: &Self) -> Ordering {
    a.start
      .cmp(&b.start)
      .then_with(|| a.kind.precedence().cmp(&b.kind.precedence()))
      .then_with(|| cmp_end(a.end, b.end))
      .then_with(|| a.region.cmp(&b.region))
      .then_with(|| a.group.cmp(&b.group))
      .then_with(|| a.source_updated_at.cmp(&b.source_updated_at))
  }
}

/// Compare optional ends with `None` (open-ended) as the greatest value.
pub fn cmp_end(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>) -> Ordering {
  match (a, b) {
    (None, None) => Ordering::Equal,
    (None, Some(_)) => Ordering::Greater,
    (Some(_), None) => Ordering::Less,
    (Some(a), Some(b)) => a.cmp(&b),
  }
}

/// The later of two optional ends, treating `None` as unbounded.
pub fn max_end(
  a: Option<DateTime<Utc>>,
  b: Option<DateTime<Utc>>,
) -> Option<DateTime<Utc>> {
  match cmp_end(a, b) {
    Ordering::Less => b,
    _ => a,
  }
}
