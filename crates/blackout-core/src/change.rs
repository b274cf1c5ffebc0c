//! Snapshots and the change detector.
//!
//! The detector is the sole gate for "data changed" notifications. It
//! compares reconciled timelines structurally, so provider noise (reordered
//! keys, re-serialised timestamps, refreshed update stamps) never reaches
//! downstream consumers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  selector::{GroupKey, RegionKey, Selector},
  timeline::Timeline,
};

// ─── Snapshot ────────────────────────────────────────────────────────────────

/// Last known state for one selector.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
  pub timeline:            Timeline,
  /// Latest provider-reported update time seen so far.
  pub provider_updated_at: Option<DateTime<Utc>>,
  /// When the schedule last changed in substance. Never moves backwards.
  pub data_changed_at:     Option<DateTime<Utc>>,
  /// Unconfirmed schedule kept alongside; excluded from change detection.
  #[serde(default)]
  pub tentative:           Timeline,
}

impl Snapshot {
  pub fn with_tentative(mut self, tentative: Timeline) -> Self {
    self.tentative = tentative;
    self
  }
}

// ─── Result types ────────────────────────────────────────────────────────────

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
  strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ChangeKind {
  NoChange,
  /// Same schedule, strictly newer provider update time.
  MetadataOnly,
  DataChanged,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeResult {
  pub kind:     ChangeKind,
  pub snapshot: Snapshot,
}

impl ChangeResult {
  pub fn is_data_changed(&self) -> bool { self.kind == ChangeKind::DataChanged }

  /// Build the downstream notification, only for [`ChangeKind::DataChanged`].
  pub fn notification(
    &self,
    selector: &Selector,
    provider: &str,
    correlation_id: &str,
  ) -> Option<DataChangedEvent> {
    if !self.is_data_changed() {
      return None;
    }
    Some(DataChangedEvent {
      region:          selector.region.clone(),
      provider:        provider.to_string(),
      group:           selector.group.clone(),
      data_changed_at: self.snapshot.data_changed_at?,
      fingerprint:     self.snapshot.timeline.fingerprint(),
      correlation_id:  correlation_id.to_string(),
    })
  }
}

/// Payload of a "data changed" notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataChangedEvent {
  pub region:          RegionKey,
  pub provider:        String,
  pub group:           GroupKey,
  pub data_changed_at: DateTime<Utc>,
  /// [`Timeline::fingerprint`] of the new schedule.
  pub fingerprint:     String,
  /// Host-assigned identifier of the configured instance.
  pub correlation_id:  String,
}

// ─── Detector ────────────────────────────────────────────────────────────────

/// Classify `new_timeline` against `previous` and produce the snapshot to
/// commit.
///
/// - Schedules differ (by `(kind, start, end)`) → `DataChanged`,
///   `data_changed_at = now` (never earlier than the previous value).
/// - Same schedule, strictly newer provider update → `MetadataOnly`.
/// - Otherwise → `NoChange`. With no previous snapshot, an empty timeline is
///   `NoChange` and a non-empty one is `DataChanged`.
pub fn detect(
  previous: Option<&Snapshot>,
  new_timeline: Timeline,
  new_provider_updated_at: Option<DateTime<Utc>>,
  now: DateTime<Utc>,
) -> ChangeResult {
  let previous_updated_at = previous.and_then(|p| p.provider_updated_at);
  let previous_changed_at = previous.and_then(|p| p.data_changed_at);

  let schedule_changed = match previous {
    Some(p) => !p.timeline.same_schedule(&new_timeline),
    None => !new_timeline.is_empty(),
  };

  let (kind, data_changed_at) = if schedule_changed {
    let changed_at = previous_changed_at.map_or(now, |t| t.max(now));
    (ChangeKind::DataChanged, Some(changed_at))
  } else if previous.is_some()
    && is_newer(new_provider_updated_at, previous_updated_at)
  {
    (ChangeKind::MetadataOnly, previous_changed_at)
  } else {
    (ChangeKind::NoChange, previous_changed_at)
  };

  let tentative = previous.map(|p| p.tentative.clone()).unwrap_or_default();
  ChangeResult {
    kind,
    snapshot: Snapshot {
      timeline: new_timeline,
      provider_updated_at: new_provider_updated_at.max(previous_updated_at),
      data_changed_at,
      tentative,
    },
  }
}

fn is_newer(candidate: Option<DateTime<Utc>>, current: Option<DateTime<Utc>>) -> bool {
  match (candidate, current) {
    (Some(candidate), Some(current)) => candidate > current,
    (Some(_), None) => true,
    (None, _) => false,
  }
}
