//! Host configuration, read from TOML and `BLACKOUT__*` environment
//! variables.
//!
//! ```toml
//! state_path = "~/.local/state/blackout.json"
//! timezone   = "Europe/Kyiv"
//!
//! [[sources]]
//! name     = "home"
//! provider = "yasno"
//! region   = "25/902"
//! group    = "3.1"
//! payload  = "/var/cache/blackout/yasno-25-902.json"
//! ```

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use blackout_core::selector::{GroupKey, RegionKey, Selector};
use blackout_providers::{ProviderAdapter, ProviderKind};
use chrono_tz::Tz;
use serde::Deserialize;

/// Runtime host configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct HostConfig {
  /// Correlation id attached to notifications. A random one is used per run
  /// when unset.
  #[serde(default)]
  pub instance_id: Option<String>,
  #[serde(default = "default_state_path")]
  pub state_path:  PathBuf,
  /// Civil zone for sources that do not set their own.
  #[serde(default = "default_timezone")]
  pub timezone:    Tz,
  #[serde(default)]
  pub sources:     Vec<SourceConfig>,
}

/// One configured schedule stream and where its payload is found.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
  pub name:          String,
  pub provider:      ProviderKind,
  pub region:        RegionKey,
  pub group:         GroupKey,
  /// File holding the latest fetched payload.
  pub payload:       PathBuf,
  #[serde(default)]
  pub timezone:      Option<Tz>,
  /// Overrides the provider name used in notifications.
  #[serde(default)]
  pub provider_name: Option<String>,
}

fn default_state_path() -> PathBuf { PathBuf::from("blackout-state.json") }

fn default_timezone() -> Tz { chrono_tz::Europe::Kyiv }

impl HostConfig {
  /// Read `path` (optional) layered under `BLACKOUT__*` variables.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("BLACKOUT").separator("__"))
      .build()
      .context("failed to read config file")?;

    let mut cfg: Self = settings
      .try_deserialize()
      .context("failed to deserialise HostConfig")?;
    cfg.state_path = expand_tilde(&cfg.state_path);
    for source in &mut cfg.sources {
      source.payload = expand_tilde(&source.payload);
    }
    Ok(cfg)
  }
}

impl SourceConfig {
  pub fn selector(&self) -> Selector {
    Selector::new(self.region.clone(), self.group.clone())
  }

  pub fn adapter(&self, default_tz: Tz) -> Box<dyn ProviderAdapter> {
    self.provider.adapter(self.timezone.unwrap_or(default_tz))
  }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
