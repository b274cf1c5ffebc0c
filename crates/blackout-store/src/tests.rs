//! Tests for `MemoryStore` and the fetch cycle.

use blackout_core::{
  change::{ChangeKind, Snapshot},
  event::{EventKind, OutageEvent},
  payload::ParsedPayload,
  selector::Selector,
  store::SnapshotStore,
};
use chrono::{DateTime, TimeDelta, TimeZone, Utc};

use crate::{Error, MemoryStore, run_cycle};

fn at(h: u32, m: u32) -> DateTime<Utc> {
  Utc.with_ymd_and_hms(2025, 10, 27, h, m, 0).unwrap()
}

fn sel() -> Selector { Selector::new(25u32, "3.1") }

fn definite(from: u32, to: u32) -> OutageEvent {
  OutageEvent::new(&sel(), EventKind::Definite, at(from, 0), at(to, 0)).unwrap()
}

fn payload(events: Vec<OutageEvent>, updated: Option<DateTime<Utc>>) -> ParsedPayload {
  ParsedPayload {
    events,
    provider_updated_at: updated,
    ..Default::default()
  }
}

// ─── Cycle ───────────────────────────────────────────────────────────────────

#[test]
fn first_cycle_commits_reconciled_timeline() {
  let store = MemoryStore::new();
  let outcome = run_cycle(
    &store,
    &sel(),
    payload(vec![definite(8, 10), definite(10, 11)], Some(at(7, 0))),
    at(7, 5),
  )
  .unwrap();

  assert_eq!(outcome.change.kind, ChangeKind::DataChanged);
  let stored = store.get(&sel()).unwrap();
  assert_eq!(stored.timeline.len(), 1);
  assert_eq!(stored.timeline.events()[0].end, Some(at(11, 0)));
  assert_eq!(stored.data_changed_at, Some(at(7, 5)));
  assert_eq!(store.selectors(), vec![sel()]);
}

#[test]
fn refetch_of_same_schedule_is_quiet() {
  let store = MemoryStore::new();
  run_cycle(&store, &sel(), payload(vec![definite(8, 10)], Some(at(7, 0))), at(7, 5)).unwrap();

  let again = run_cycle(&store, &sel(), payload(vec![definite(8, 10)], Some(at(7, 0))), at(7, 20))
    .unwrap();
  assert_eq!(again.change.kind, ChangeKind::NoChange);
  assert!(again.change.notification(&sel(), "Yasno", "entry").is_none());

  let confirmed = run_cycle(&store, &sel(), payload(vec![definite(8, 10)], Some(at(7, 30))), at(7, 35))
    .unwrap();
  assert_eq!(confirmed.change.kind, ChangeKind::MetadataOnly);
  assert_eq!(store.get(&sel()).unwrap().data_changed_at, Some(at(7, 5)));
}

#[test]
fn inconsistent_event_leaves_previous_snapshot() {
  let store = MemoryStore::new();
  run_cycle(&store, &sel(), payload(vec![definite(8, 10)], None), at(7, 5)).unwrap();
  let before = store.get(&sel()).unwrap();

  let mut broken = definite(12, 14);
  broken.end = Some(at(11, 0));
  let err = run_cycle(&store, &sel(), payload(vec![broken], None), at(7, 10)).unwrap_err();

  assert!(matches!(err, Error::Core(blackout_core::Error::InconsistentEvent { .. })));
  assert_eq!(store.get(&sel()).unwrap(), before);
}

#[test]
fn foreign_event_is_rejected() {
  let store = MemoryStore::new();
  let other = Selector::new(25u32, "3.2");
  let event = OutageEvent::new(&other, EventKind::Definite, at(8, 0), at(9, 0)).unwrap();
  let err = run_cycle(&store, &sel(), payload(vec![event], None), at(7, 0)).unwrap_err();
  assert!(matches!(err, Error::SelectorMismatch { .. }));
  assert!(store.get(&sel()).is_none());
}

#[test]
fn provider_stamp_falls_back_to_event_stamps() {
  let store = MemoryStore::new();
  let events = vec![
    definite(8, 10).with_source_updated_at(Some(at(6, 0))),
    definite(14, 16).with_source_updated_at(Some(at(6, 30))),
  ];
  run_cycle(&store, &sel(), payload(events, None), at(7, 0)).unwrap();
  assert_eq!(store.get(&sel()).unwrap().provider_updated_at, Some(at(6, 30)));
}

#[test]
fn tentative_schedule_never_triggers_a_change() {
  let store = MemoryStore::new();
  run_cycle(&store, &sel(), payload(vec![definite(8, 10)], None), at(7, 0)).unwrap();

  let with_tentative = ParsedPayload {
    tentative: vec![definite(20, 22)],
    ..payload(vec![definite(8, 10)], None)
  };
  let outcome = run_cycle(&store, &sel(), with_tentative, at(7, 30)).unwrap();
  assert_eq!(outcome.change.kind, ChangeKind::NoChange);
  assert_eq!(outcome.change.snapshot.tentative.len(), 1);
  assert_eq!(store.get(&sel()).unwrap().tentative.len(), 1);
}

#[test]
fn emergency_overrides_are_reported() {
  let store = MemoryStore::new();
  let emergency =
    OutageEvent::new(&sel(), EventKind::Emergency, at(9, 0), at(12, 0)).unwrap();
  let outcome =
    run_cycle(&store, &sel(), payload(vec![definite(8, 10), emergency], None), at(7, 0))
      .unwrap();
  assert_eq!(outcome.overridden.len(), 1);
  assert_eq!(outcome.overridden[0].start, at(9, 0));
  assert_eq!(outcome.change.snapshot.timeline.len(), 2);
}

#[test]
fn warnings_pass_through() {
  let store = MemoryStore::new();
  let mut parsed = payload(vec![definite(8, 10)], None);
  parsed.warn("$.3.1.today.slots[4]", "bad slot");
  let outcome = run_cycle(&store, &sel(), parsed, at(7, 0)).unwrap();
  assert_eq!(outcome.warnings.len(), 1);
}

// ─── Store ───────────────────────────────────────────────────────────────────

#[test]
fn failed_transaction_commits_nothing() {
  let store = MemoryStore::new();
  let result: Result<(), &str> = store.transact(&sel(), |_| Err("boom"));
  assert_eq!(result, Err("boom"));
  assert!(store.get(&sel()).is_none());
  assert!(store.selectors().is_empty());
}

#[test]
fn repeated_failures_leave_no_empty_slots() {
  let store = MemoryStore::new();
  for group in ["9.1", "9.2", "9.1"] {
    let selector = Selector::new(25u32, group);
    let result: Result<(), &str> = store.transact(&selector, |_| Err("unsupported"));
    assert!(result.is_err());
  }
  assert_eq!(store.slot_count(), 0);

  run_cycle(&store, &sel(), payload(vec![definite(8, 10)], None), at(7, 0)).unwrap();
  let result: Result<(), &str> = store.transact(&sel(), |_| Err("boom"));
  assert!(result.is_err());
  assert_eq!(store.slot_count(), 1);
  assert!(store.get(&sel()).is_some());
}

#[test]
fn selectors_are_independent() {
  let store = MemoryStore::new();
  let other = Selector::new(25u32, "3.2");
  run_cycle(&store, &sel(), payload(vec![definite(8, 10)], None), at(7, 0)).unwrap();
  run_cycle(&store, &other, payload(vec![], None), at(7, 0)).unwrap();

  assert_eq!(store.get(&sel()).unwrap().timeline.len(), 1);
  assert!(store.get(&other).unwrap().timeline.is_empty());
  assert_eq!(store.selectors(), vec![sel(), other.clone()]);

  assert!(store.remove(&other).is_some());
  assert!(store.get(&other).is_none());
  assert_eq!(store.selectors(), vec![sel()]);
}

#[test]
fn export_and_reseed() {
  let store = MemoryStore::new();
  run_cycle(&store, &sel(), payload(vec![definite(8, 10)], Some(at(7, 0))), at(7, 5)).unwrap();

  let reseeded = MemoryStore::from_snapshots(store.export());
  assert_eq!(reseeded.get(&sel()), store.get(&sel()));

  let again = run_cycle(&reseeded, &sel(), payload(vec![definite(8, 10)], Some(at(7, 0))), at(8, 0))
    .unwrap();
  assert_eq!(again.change.kind, ChangeKind::NoChange);
}

#[test]
fn concurrent_cycles_on_one_selector_are_serialised() {
  const THREADS: i64 = 8;
  const ROUNDS: i64 = 50;

  let store = MemoryStore::new();
  let base = at(0, 0);

  std::thread::scope(|scope| {
    for _ in 0..THREADS {
      scope.spawn(|| {
        for _ in 0..ROUNDS {
          store
            .transact(&sel(), |previous| {
              let stamp = previous
                .and_then(|p| p.provider_updated_at)
                .unwrap_or(base);
              let next = Snapshot {
                provider_updated_at: Some(stamp + TimeDelta::minutes(1)),
                ..previous.cloned().unwrap_or_default()
              };
              Ok::<_, ()>((next, ()))
            })
            .unwrap();
        }
      });
    }
  });

  let stamp = store.get(&sel()).unwrap().provider_updated_at;
  assert_eq!(stamp, Some(base + TimeDelta::minutes(THREADS * ROUNDS)));
}
