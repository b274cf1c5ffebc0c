//! The `ingest` command: one concurrent cycle per configured source.

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use blackout_core::{change::DataChangedEvent, selector::Selector};
use blackout_providers::ProviderAdapter;
use blackout_store::{MemoryStore, run_cycle};
use chrono::{DateTime, Utc};
use tokio::task::JoinSet;

use crate::{
  config::HostConfig,
  report::{FailureReport, IngestReport, StateReport},
};

/// A fully resolved source, ready to run.
pub struct Source {
  pub name:     String,
  pub selector: Selector,
  pub provider: String,
  pub payload:  PathBuf,
  pub adapter:  Box<dyn ProviderAdapter>,
}

impl Source {
  pub fn from_config(config: &HostConfig) -> Vec<Self> {
    config
      .sources
      .iter()
      .map(|source| {
        let adapter = source.adapter(config.timezone);
        Self {
          name: source.name.clone(),
          selector: source.selector(),
          provider: source
            .provider_name
            .clone()
            .unwrap_or_else(|| adapter.name().to_string()),
          payload: source.payload.clone(),
          adapter,
        }
      })
      .collect()
  }
}

/// Outcome of one source.
#[derive(Debug)]
pub enum SourceOutcome {
  Ingested {
    report:       Box<IngestReport>,
    notification: Option<DataChangedEvent>,
  },
  Failed(FailureReport),
}

/// Run every source concurrently against `store`. Outcomes come back in
/// source order.
pub async fn ingest(
  sources: Vec<Source>,
  store: &MemoryStore,
  now: DateTime<Utc>,
  correlation_id: &str,
) -> Vec<SourceOutcome> {
  let correlation_id: Arc<str> = Arc::from(correlation_id);
  let names: Vec<String> = sources.iter().map(|s| s.name.clone()).collect();
  let mut tasks = JoinSet::new();

  for (index, source) in sources.into_iter().enumerate() {
    let store = store.clone();
    let correlation_id = correlation_id.clone();
    tasks.spawn(async move {
      let name = source.name.clone();
      let outcome = match run_source(&source, &store, now, &correlation_id).await {
        Ok(outcome) => outcome,
        Err(error) => {
          tracing::warn!(source = %name, "cycle failed: {error:#}");
          SourceOutcome::Failed(FailureReport {
            source:    name,
            retryable: is_retryable(&error),
            error:     format!("{error:#}"),
          })
        }
      };
      (index, outcome)
    });
  }

  let mut outcomes: Vec<Option<SourceOutcome>> = names.iter().map(|_| None).collect();
  while let Some(joined) = tasks.join_next().await {
    match joined {
      Ok((index, outcome)) => outcomes[index] = Some(outcome),
      Err(error) => tracing::error!("source task panicked: {error}"),
    }
  }

  // A panicked task never reports its index; its slot stays empty.
  names
    .into_iter()
    .zip(outcomes)
    .map(|(name, outcome)| outcome.unwrap_or_else(|| panicked(name)))
    .collect()
}

fn panicked(source: String) -> SourceOutcome {
  SourceOutcome::Failed(FailureReport {
    source,
    error: "source task panicked".to_string(),
    retryable: true,
  })
}

async fn run_source(
  source: &Source,
  store: &MemoryStore,
  now: DateTime<Utc>,
  correlation_id: &str,
) -> anyhow::Result<SourceOutcome> {
  let raw = tokio::fs::read(&source.payload)
    .await
    .with_context(|| format!("failed to read payload {}", source.payload.display()))?;

  let parsed = source
    .adapter
    .parse(&raw, &source.selector, now)
    .with_context(|| format!("failed to parse {} payload", source.provider))?;

  let outcome = run_cycle(store, &source.selector, parsed, now)
    .with_context(|| format!("cycle for {} failed", source.selector))?;

  let notification =
    outcome
      .change
      .notification(&source.selector, &source.provider, correlation_id);
  let report = IngestReport {
    source:     source.name.clone(),
    provider:   source.provider.clone(),
    change:     outcome.change.kind,
    warnings:   outcome.warnings,
    overridden: outcome.overridden.len(),
    state:      StateReport::new(&source.selector, &outcome.change.snapshot, now),
  };
  Ok(SourceOutcome::Ingested {
    report: Box::new(report),
    notification,
  })
}

/// Selector mismatches persist until the configuration changes; everything
/// else may clear up on the next fetch.
fn is_retryable(error: &anyhow::Error) -> bool {
  !matches!(
    error.downcast_ref::<blackout_providers::Error>(),
    Some(blackout_providers::Error::UnsupportedSelector { .. })
  )
}
