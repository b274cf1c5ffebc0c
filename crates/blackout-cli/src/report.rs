//! JSON reports printed by the host commands.

use blackout_core::{
  calendar::{self, CalendarEntry, CalendarView},
  change::{ChangeKind, Snapshot},
  event::OutageEvent,
  payload::ParseWarning,
  selector::{GroupKey, RegionKey, Selector},
  state::{ConnectivityState, evaluate},
};
use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;

/// How far ahead the calendar sections reach.
const HORIZON_DAYS: i64 = 2;

/// Sensor values and calendar for one selector at one instant.
#[derive(Debug, Clone, Serialize)]
pub struct StateReport {
  pub region:               RegionKey,
  pub group:                GroupKey,
  pub at:                   DateTime<Utc>,
  pub state:                ConnectivityState,
  pub next_planned_outage:  Option<DateTime<Utc>>,
  pub next_connectivity:    Option<DateTime<Utc>>,
  pub next_scheduled_event: Option<DateTime<Utc>>,
  pub active_event:         Option<OutageEvent>,
  pub provider_updated_at:  Option<DateTime<Utc>>,
  pub data_changed_at:      Option<DateTime<Utc>>,
  /// Outages overlapping `[at, at + 2 days)`.
  pub outages:              Vec<CalendarEntry>,
  /// Definite outages after reconciliation; time an emergency overrode is
  /// left out rather than restored.
  pub scheduled:            Vec<CalendarEntry>,
  /// Unconfirmed schedule.
  pub tentative:            Vec<CalendarEntry>,
}

impl StateReport {
  pub fn new(selector: &Selector, snapshot: &Snapshot, at: DateTime<Utc>) -> Self {
    let eval = evaluate(&snapshot.timeline, at);
    let until = at + TimeDelta::days(HORIZON_DAYS);
    Self {
      region: selector.region.clone(),
      group: selector.group.clone(),
      at,
      state: eval.state,
      next_planned_outage: eval.next_planned_outage,
      next_connectivity: eval.next_connectivity,
      next_scheduled_event: eval.next_scheduled_event,
      active_event: eval.active_event.cloned(),
      provider_updated_at: snapshot.provider_updated_at,
      data_changed_at: snapshot.data_changed_at,
      outages: calendar::entries(&snapshot.timeline, at, until, CalendarView::All),
      scheduled: calendar::entries(
        &snapshot.timeline,
        at,
        until,
        CalendarView::ScheduleOnly,
      ),
      tentative: calendar::entries(&snapshot.tentative, at, until, CalendarView::All),
    }
  }
}

/// Result of ingesting one source.
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
  pub source:     String,
  pub provider:   String,
  pub change:     ChangeKind,
  pub warnings:   Vec<ParseWarning>,
  /// Number of definite fragments hidden by emergencies.
  pub overridden: usize,
  #[serde(flatten)]
  pub state:      StateReport,
}

/// A source whose cycle failed; its snapshot was left untouched.
#[derive(Debug, Clone, Serialize)]
pub struct FailureReport {
  pub source:    String,
  pub error:     String,
  /// `false` for configuration mismatches that retrying cannot fix.
  pub retryable: bool,
}

#[cfg(test)]
mod tests {
  use blackout_core::{event::EventKind, timeline::reconcile};
  use chrono::TimeZone;

  use super::*;

  #[test]
  fn report_reflects_evaluation_and_calendars() {
    let sel = Selector::new("kyiv_region", "1.1");
    let at = |h| Utc.with_ymd_and_hms(2025, 10, 29, h, 0, 0).unwrap();
    let snapshot = Snapshot {
      timeline: reconcile(vec![
        OutageEvent::new(&sel, EventKind::Definite, at(8), at(10)).unwrap(),
        OutageEvent::new(&sel, EventKind::Emergency, at(12), at(13)).unwrap(),
      ])
      .unwrap(),
      data_changed_at: Some(at(6)),
      ..Default::default()
    };

    let report = StateReport::new(&sel, &snapshot, at(9));
    assert_eq!(report.state, ConnectivityState::PlannedOutage);
    assert_eq!(report.next_connectivity, Some(at(10)));
    assert_eq!(report.next_scheduled_event, Some(at(12)));
    assert_eq!(report.outages.len(), 2);
    assert_eq!(report.scheduled.len(), 1);

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["state"], "planned_outage");
    assert_eq!(json["group"], "1.1");
  }
}
