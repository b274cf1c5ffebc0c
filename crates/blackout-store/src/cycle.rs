//! The per-selector fetch cycle: reconcile, detect, commit.

use blackout_core::{
  change::{ChangeKind, ChangeResult, detect},
  event::OutageEvent,
  payload::{ParseWarning, ParsedPayload},
  selector::Selector,
  store::SnapshotStore,
  timeline::{Reconciliation, reconcile, reconcile_with_audit},
};
use chrono::{DateTime, Utc};

use crate::{Error, Result};

/// What one cycle produced for the host.
#[derive(Debug, Clone)]
pub struct CycleOutcome {
  pub change:     ChangeResult,
  /// Definite fragments hidden behind emergencies, for audit logs.
  pub overridden: Vec<OutageEvent>,
  /// Entries the adapter skipped.
  pub warnings:   Vec<ParseWarning>,
}

/// Run one cycle for `selector` under its exclusive lock.
///
/// Nothing is committed unless reconciliation succeeds in full; on error the
/// previous snapshot stays in place.
pub fn run_cycle<S: SnapshotStore>(
  store: &S,
  selector: &Selector,
  payload: ParsedPayload,
  now: DateTime<Utc>,
) -> Result<CycleOutcome> {
  let ParsedPayload {
    events,
    tentative,
    provider_updated_at,
    warnings,
  } = payload;

  if let Some(foreign) = events
    .iter()
    .chain(&tentative)
    .find(|e| e.region != selector.region || e.group != selector.group)
  {
    return Err(Error::SelectorMismatch {
      expected: selector.clone(),
      found:    foreign.selector(),
    });
  }

  let (change, overridden) = store.transact(selector, |previous| {
    let Reconciliation {
      timeline,
      overridden,
    } = reconcile_with_audit(events)?;
    let tentative = reconcile(tentative)?;
    let provider_updated_at =
      provider_updated_at.or_else(|| timeline.latest_source_update());

    let ChangeResult { kind, snapshot } =
      detect(previous, timeline, provider_updated_at, now);
    let change = ChangeResult {
      kind,
      snapshot: snapshot.with_tentative(tentative),
    };
    Ok::<_, Error>((change.snapshot.clone(), (change, overridden)))
  })?;

  match change.kind {
    ChangeKind::DataChanged => tracing::info!(
      %selector,
      events = change.snapshot.timeline.len(),
      fingerprint = %change.snapshot.timeline.fingerprint(),
      "schedule changed"
    ),
    kind => tracing::debug!(%selector, %kind, "cycle committed"),
  }

  Ok(CycleOutcome {
    change,
    overridden,
    warnings,
  })
}
