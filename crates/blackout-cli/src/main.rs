//! `blackout`: outage schedule host.
//!
//! Reads `blackout.toml` (or the path given with `--config`), feeds each
//! source's latest payload through its provider adapter and the snapshot
//! store, and prints JSON reports on stdout. Logs go to stderr.
//!
//! # Usage
//!
//! ```text
//! blackout ingest
//! blackout state --at 2025-10-27T18:00:00Z
//! blackout groups --provider dtek_json kyiv-region.json
//! ```

use std::path::PathBuf;

use anyhow::Context as _;
use blackout_cli::{
  config::HostConfig,
  ingest::{self, Source, SourceOutcome},
  report::StateReport,
  state_file,
};
use blackout_core::store::SnapshotStore as _;
use blackout_providers::ProviderKind;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Power outage schedule host")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "blackout.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Parse every source's payload, update snapshots and report changes.
  Ingest {
    /// Reference instant (RFC 3339); defaults to the current time.
    #[arg(long)]
    now: Option<DateTime<Utc>>,
  },
  /// Evaluate stored snapshots without ingesting.
  State {
    /// Reference instant (RFC 3339); defaults to the current time.
    #[arg(long)]
    at: Option<DateTime<Utc>>,
  },
  /// List the groups a payload carries.
  Groups {
    #[arg(long)]
    provider: ProviderKind,
    /// Civil zone of the provider.
    #[arg(long, default_value = "Europe/Kyiv")]
    timezone: Tz,
    payload:  PathBuf,
  },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();

  match cli.command {
    Command::Groups {
      provider,
      timezone,
      payload,
    } => {
      let raw = std::fs::read(&payload)
        .with_context(|| format!("failed to read {}", payload.display()))?;
      let groups = provider.adapter(timezone).groups(&raw)?;
      print_json(&groups)?;
    }

    Command::State { at } => {
      let cfg = HostConfig::load(&cli.config)?;
      let store = state_file::load(&cfg.state_path)?;
      let at = at.unwrap_or_else(Utc::now);
      for selector in store.selectors() {
        if let Some(snapshot) = store.get(&selector) {
          print_json(&StateReport::new(&selector, &snapshot, at))?;
        }
      }
    }

    Command::Ingest { now } => {
      let cfg = HostConfig::load(&cli.config)?;
      let store = state_file::load(&cfg.state_path)?;
      let now = now.unwrap_or_else(Utc::now);
      let correlation_id = cfg
        .instance_id
        .clone()
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

      let sources = Source::from_config(&cfg);
      tracing::info!(sources = sources.len(), %now, "ingesting");
      let outcomes = ingest::ingest(sources, &store, now, &correlation_id).await;

      state_file::save(&cfg.state_path, &store)?;

      let mut failed = 0;
      for outcome in &outcomes {
        match outcome {
          SourceOutcome::Ingested {
            report,
            notification,
          } => {
            print_json(report)?;
            if let Some(event) = notification {
              print_json(event)?;
            }
          }
          SourceOutcome::Failed(failure) => {
            failed += 1;
            print_json(failure)?;
          }
        }
      }
      tracing::info!(total = outcomes.len(), failed, "ingest finished");
    }
  }

  Ok(())
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
  println!("{}", serde_json::to_string(value).context("failed to encode report")?);
  Ok(())
}
