//! Timelines and the reconciler that builds them.
//!
//! Pipeline:
//!   Vec<OutageEvent>               (any order, may overlap)
//!     └─ validate()                → InconsistentEvent on start >= end
//!          └─ sort chronological   → deterministic order
//!               └─ merge per kind  → disjoint emergencies, disjoint definites
//!                    └─ carve      → definites minus emergency coverage
//!                         └─ Timeline (ordered, non-overlapping)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{
  Error, Result,
  event::{EventKind, OutageEvent, max_end},
};

// ─── Timeline ────────────────────────────────────────────────────────────────

/// A strictly ordered, non-overlapping sequence of events for one selector.
///
/// For adjacent events `e[i].end <= e[i + 1].start`; an open-ended event can
/// only be the last one. Gaps are connected periods and are never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<OutageEvent>", into = "Vec<OutageEvent>")]
pub struct Timeline {
  events: Vec<OutageEvent>,
}

impl Timeline {
  pub fn empty() -> Self { Self::default() }

  pub fn events(&self) -> &[OutageEvent] { &self.events }

  pub fn iter(&self) -> std::slice::Iter<'_, OutageEvent> { self.events.iter() }

  pub fn len(&self) -> usize { self.events.len() }

  pub fn is_empty(&self) -> bool { self.events.is_empty() }

  /// Structural equality over the ordered `(kind, start, end)` triples.
  ///
  /// `source_updated_at` and selector fields are ignored: a provider that
  /// re-publishes the same schedule has not changed it.
  pub fn same_schedule(&self, other: &Self) -> bool {
    self.events.len() == other.events.len()
      && self
        .events
        .iter()
        .zip(&other.events)
        .all(|(a, b)| a.kind == b.kind && a.start == b.start && a.end == b.end)
  }

  /// SHA-256 over the `(kind, start, end)` triples, hex-encoded.
  ///
  /// Two timelines have the same fingerprint exactly when
  /// [`same_schedule`](Self::same_schedule) holds (modulo hash collisions).
  pub fn fingerprint(&self) -> String {
    let mut hasher = Sha256::new();
    for event in &self.events {
      hasher.update([event.kind.precedence()]);
      hasher.update(event.start.timestamp_micros().to_le_bytes());
      match event.end {
        Some(end) => {
          hasher.update([1]);
          hasher.update(end.timestamp_micros().to_le_bytes());
        }
        None => hasher.update([0]),
      }
    }
    hex::encode(hasher.finalize())
  }

  /// The most recent `source_updated_at` among the events, if any.
  pub fn latest_source_update(&self) -> Option<DateTime<Utc>> {
    self.events.iter().filter_map(|e| e.source_updated_at).max()
  }

  /// The event covering `at`, if any. Binary search over the ordered events.
  pub fn event_at(&self, at: DateTime<Utc>) -> Option<&OutageEvent> {
    let upcoming = self.events.partition_point(|e| e.start <= at);
    upcoming
      .checked_sub(1)
      .map(|i| &self.events[i])
      .filter(|e| e.covers(at))
  }

  /// Events starting strictly after `at`, in order.
  pub fn upcoming(&self, at: DateTime<Utc>) -> &[OutageEvent] {
    let upcoming = self.events.partition_point(|e| e.start <= at);
    &self.events[upcoming..]
  }
}

impl TryFrom<Vec<OutageEvent>> for Timeline {
  type Error = Error;

  /// Accept an already-reconciled sequence (e.g. one read back from
  /// storage), checking the ordering invariant instead of re-reconciling.
  fn try_from(events: Vec<OutageEvent>) -> Result<Self> {
    for (index, event) in events.iter().enumerate() {
      event.validate()?;
      if index == 0 {
        continue;
      }
      let previous = &events[index - 1];
      if previous.end.is_none_or(|end| end > event.start) {
        return Err(Error::UnorderedTimeline { index });
      }
    }
    Ok(Self { events })
  }
}

impl From<Timeline> for Vec<OutageEvent> {
  fn from(timeline: Timeline) -> Self { timeline.events }
}

impl<'a> IntoIterator for &'a Timeline {
  type IntoIter = std::slice::Iter<'a, OutageEvent>;
  type Item = &'a OutageEvent;

  fn into_iter(self) -> Self::IntoIter { self.events.iter() }
}

// ─── Reconciliation ──────────────────────────────────────────────────────────

/// A reconciled timeline plus the definite coverage that emergencies
/// displaced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
  pub timeline:   Timeline,
  /// Definite fragments hidden under emergency coverage, in chronological
  /// order. Informational only; never part of the timeline.
  pub overridden: Vec<OutageEvent>,
}

/// Merge a set of events into a [`Timeline`].
///
/// Same-kind events that overlap or touch merge into one. Where a definite
/// and an emergency event overlap the emergency wins and the definite event
/// keeps only its non-overlapping remainder(s). Output is a pure function of
/// the input set; input order does not matter.
pub fn reconcile(events: Vec<OutageEvent>) -> Result<Timeline> {
  reconcile_with_audit(events).map(|r| r.timeline)
}

/// [`reconcile`], also returning the definite fragments emergencies hid.
pub fn reconcile_with_audit(mut events: Vec<OutageEvent>) -> Result<Reconciliation> {
  for event in &events {
    event.validate()?;
  }
  events.sort_by(OutageEvent::chronological);

  let (emergencies, definites): (Vec<_>, Vec<_>) = events
    .into_iter()
    .partition(|e| e.kind == EventKind::Emergency);
  let emergencies = merge_same_kind(emergencies);
  let definites = merge_same_kind(definites);

  let mut merged = emergencies.clone();
  let mut overridden = Vec::new();
  for definite in &definites {
    carve(definite, &emergencies, &mut merged, &mut overridden);
  }
  merged.sort_by(OutageEvent::chronological);

  if !overridden.is_empty() {
    tracing::debug!(
      fragments = overridden.len(),
      "emergency coverage displaced definite outages"
    );
  }

  Ok(Reconciliation {
    timeline: Timeline { events: merged },
    overridden,
  })
}

/// Merge chronologically sorted events of one kind that overlap or touch.
fn merge_same_kind(sorted: Vec<OutageEvent>) -> Vec<OutageEvent> {
  let mut merged: Vec<OutageEvent> = Vec::with_capacity(sorted.len());
  for event in sorted {
    match merged.last_mut() {
      Some(current) if current.reaches(event.start) => {
        current.end = max_end(current.end, event.end);
        current.source_updated_at =
          current.source_updated_at.max(event.source_updated_at);
      }
      _ => merged.push(event),
    }
  }
  merged
}

/// Push the parts of `definite` not covered by any of `emergencies` onto
/// `out`, and the covered parts onto `overridden`.
///
/// `emergencies` must be sorted and pairwise disjoint.
fn carve(
  definite: &OutageEvent,
  emergencies: &[OutageEvent],
  out: &mut Vec<OutageEvent>,
  overridden: &mut Vec<OutageEvent>,
) {
  // Start of the not-yet-emitted remainder; `None` once fully consumed.
  let mut cursor = Some(definite.start);

  for emergency in emergencies {
    let Some(from) = cursor else { break };
    if emergency.end.is_some_and(|end| end <= from) {
      continue;
    }
    if definite.end.is_some_and(|end| emergency.start >= end) {
      break;
    }

    if emergency.start > from {
      out.push(definite.fragment(from, Some(emergency.start)));
    }
    let hidden_from = emergency.start.max(from);
    let hidden_to = match (definite.end, emergency.end) {
      (Some(a), Some(b)) => Some(a.min(b)),
      (end, None) | (None, end) => end,
    };
    overridden.push(definite.fragment(hidden_from, hidden_to));

    cursor = match emergency.end {
      Some(end) if definite.end.is_none_or(|d| end < d) => Some(end),
      _ => None,
    };
  }

  if let Some(from) = cursor {
    out.push(definite.fragment(from, definite.end));
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;
  use crate::selector::Selector;

  fn at(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 10, 27, h, m, 0).unwrap()
  }

  fn sel() -> Selector { Selector::new(25u32, "3.1") }

  fn definite(from: (u32, u32), to: (u32, u32)) -> OutageEvent {
    OutageEvent::new(&sel(), EventKind::Definite, at(from.0, from.1), at(to.0, to.1))
      .unwrap()
  }

  fn emergency(from: (u32, u32), to: Option<(u32, u32)>) -> OutageEvent {
    match to {
      Some(to) => OutageEvent::new(
        &sel(),
        EventKind::Emergency,
        at(from.0, from.1),
        at(to.0, to.1),
      )
      .unwrap(),
      None => OutageEvent::open_ended(&sel(), EventKind::Emergency, at(from.0, from.1)),
    }
  }

  fn triples(t: &Timeline) -> Vec<(EventKind, DateTime<Utc>, Option<DateTime<Utc>>)> {
    t.iter().map(|e| (e.kind, e.start, e.end)).collect()
  }

  fn assert_non_overlapping(t: &Timeline) {
    for pair in t.events().windows(2) {
      let end = pair[0].end.expect("only the last event may be open-ended");
      assert!(end <= pair[1].start, "{:?} overlaps {:?}", pair[0], pair[1]);
    }
  }

  // ── Basics ─────────────────────────────────────────────────────────────

  #[test]
  fn empty_input_gives_empty_timeline() {
    let t = reconcile(vec![]).unwrap();
    assert!(t.is_empty());
  }

  #[test]
  fn inverted_event_is_rejected() {
    let mut bad = definite((10, 0), (11, 0));
    bad.end = Some(at(9, 0));
    let err = reconcile(vec![bad]).unwrap_err();
    assert!(matches!(err, Error::InconsistentEvent { .. }));
  }

  #[test]
  fn touching_definites_merge() {
    let t = reconcile(vec![definite((8, 0), (10, 0)), definite((10, 0), (11, 0))])
      .unwrap();
    assert_eq!(triples(&t), vec![(EventKind::Definite, at(8, 0), Some(at(11, 0)))]);
  }

  #[test]
  fn overlapping_definites_merge_and_keep_latest_update() {
    let older = definite((8, 0), (10, 0)).with_source_updated_at(Some(at(1, 0)));
    let newer = definite((9, 0), (12, 0)).with_source_updated_at(Some(at(2, 0)));
    let t = reconcile(vec![newer, older]).unwrap();
    assert_eq!(t.len(), 1);
    assert_eq!(t.events()[0].end, Some(at(12, 0)));
    assert_eq!(t.events()[0].source_updated_at, Some(at(2, 0)));
  }

  #[test]
  fn separated_definites_stay_apart_and_sorted() {
    let t = reconcile(vec![definite((14, 0), (15, 0)), definite((8, 0), (9, 0))])
      .unwrap();
    assert_eq!(t.len(), 2);
    assert_eq!(t.events()[0].start, at(8, 0));
    assert_non_overlapping(&t);
  }

  // ── Emergency priority ─────────────────────────────────────────────────

  #[test]
  fn open_ended_emergency_swallows_contained_definite() {
    let r = reconcile_with_audit(vec![
      definite((9, 30), (10, 30)),
      emergency((9, 0), None),
    ])
    .unwrap();
    assert_eq!(triples(&r.timeline), vec![(EventKind::Emergency, at(9, 0), None)]);
    assert_eq!(r.overridden.len(), 1);
    assert_eq!(r.overridden[0].start, at(9, 30));
    assert_eq!(r.overridden[0].end, Some(at(10, 30)));
  }

  #[test]
  fn emergency_in_the_middle_splits_definite() {
    let t = reconcile(vec![
      definite((8, 0), (12, 0)),
      emergency((9, 0), Some((10, 0))),
    ])
    .unwrap();
    assert_eq!(
      triples(&t),
      vec![
        (EventKind::Definite, at(8, 0), Some(at(9, 0))),
        (EventKind::Emergency, at(9, 0), Some(at(10, 0))),
        (EventKind::Definite, at(10, 0), Some(at(12, 0))),
      ]
    );
  }

  #[test]
  fn same_start_emergency_ending_first_leaves_definite_tail() {
    let t = reconcile(vec![
      definite((10, 0), (11, 0)),
      emergency((10, 0), Some((10, 30))),
    ])
    .unwrap();
    assert_eq!(
      triples(&t),
      vec![
        (EventKind::Emergency, at(10, 0), Some(at(10, 30))),
        (EventKind::Definite, at(10, 30), Some(at(11, 0))),
      ]
    );
  }

  #[test]
  fn emergency_overlapping_definite_head_truncates_it() {
    let t = reconcile(vec![
      emergency((7, 0), Some((9, 0))),
      definite((8, 0), (10, 0)),
    ])
    .unwrap();
    assert_eq!(
      triples(&t),
      vec![
        (EventKind::Emergency, at(7, 0), Some(at(9, 0))),
        (EventKind::Definite, at(9, 0), Some(at(10, 0))),
      ]
    );
  }

  #[test]
  fn several_emergencies_cut_one_definite() {
    let t = reconcile(vec![
      definite((8, 0), (16, 0)),
      emergency((9, 0), Some((10, 0))),
      emergency((12, 0), Some((13, 0))),
    ])
    .unwrap();
    assert_eq!(t.len(), 5);
    assert_non_overlapping(&t);
    assert_eq!(t.events()[4].start, at(13, 0));
    assert_eq!(t.events()[4].end, Some(at(16, 0)));
  }

  #[test]
  fn no_definite_coverage_inside_any_overlap() {
    let d = definite((8, 0), (12, 0));
    let e = emergency((10, 0), Some((14, 0)));
    let t = reconcile(vec![d.clone(), e.clone()]).unwrap();
    let lo = d.start.max(e.start);
    let hi = d.end.unwrap().min(e.end.unwrap());
    for event in t.iter().filter(|x| x.kind == EventKind::Definite) {
      let end = event.end.unwrap();
      assert!(end <= lo || event.start >= hi);
    }
    assert_non_overlapping(&t);
  }

  #[test]
  fn touching_emergency_and_definite_do_not_merge() {
    let t = reconcile(vec![
      definite((8, 0), (9, 0)),
      emergency((9, 0), Some((10, 0))),
    ])
    .unwrap();
    assert_eq!(t.len(), 2);
  }

  // ── Determinism ────────────────────────────────────────────────────────

  #[test]
  fn reconcile_is_independent_of_input_order() {
    let input = vec![
      definite((8, 0), (12, 0)),
      emergency((9, 0), Some((10, 0))),
      definite((11, 0), (13, 0)),
      emergency((15, 0), None),
    ];
    let mut reversed = input.clone();
    reversed.reverse();
    let a = reconcile(input.clone()).unwrap();
    let b = reconcile(reversed).unwrap();
    let c = reconcile(input).unwrap();
    assert_eq!(a, b);
    assert_eq!(a, c);
    assert_eq!(a.fingerprint(), b.fingerprint());
  }

  // ── Timeline helpers ───────────────────────────────────────────────────

  #[test]
  fn same_schedule_ignores_update_metadata() {
    let a = reconcile(vec![definite((8, 0), (9, 0)).with_source_updated_at(Some(at(1, 0)))])
      .unwrap();
    let b = reconcile(vec![definite((8, 0), (9, 0)).with_source_updated_at(Some(at(5, 0)))])
      .unwrap();
    assert_ne!(a, b);
    assert!(a.same_schedule(&b));
    assert_eq!(a.fingerprint(), b.fingerprint());
  }

  #[test]
  fn fingerprint_changes_with_kind() {
    let a = reconcile(vec![definite((8, 0), (9, 0))]).unwrap();
    let b = reconcile(vec![emergency((8, 0), Some((9, 0)))]).unwrap();
    assert_ne!(a.fingerprint(), b.fingerprint());
  }

  #[test]
  fn event_at_uses_half_open_bounds() {
    let t = reconcile(vec![definite((10, 0), (12, 0))]).unwrap();
    assert!(t.event_at(at(9, 59)).is_none());
    assert!(t.event_at(at(10, 0)).is_some());
    assert!(t.event_at(at(12, 0)).is_none());
  }

  #[test]
  fn try_from_rejects_overlap() {
    let err = Timeline::try_from(vec![definite((8, 0), (10, 0)), definite((9, 0), (11, 0))])
      .unwrap_err();
    assert!(matches!(err, Error::UnorderedTimeline { index: 1 }));
  }

  #[test]
  fn serde_round_trip_keeps_events() {
    let t = reconcile(vec![definite((8, 0), (9, 0)), emergency((10, 0), None)]).unwrap();
    let json = serde_json::to_string(&t).unwrap();
    let back: Timeline = serde_json::from_str(&json).unwrap();
    assert_eq!(t, back);
  }
}
