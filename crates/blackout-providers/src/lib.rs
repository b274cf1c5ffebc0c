//! Provider adapters for Blackout.
//!
//! Each adapter turns one already-fetched payload into canonical
//! [`OutageEvent`](blackout_core::event::OutageEvent)s for a single
//! selector. Adapters are pure: no network, no clock, no shared state.
//!
//! # Quick start
//!
//! ```no_run
//! use blackout_core::selector::Selector;
//! use blackout_providers::ProviderKind;
//! use chrono::Utc;
//!
//! let adapter = ProviderKind::Yasno.adapter(chrono_tz::Europe::Kyiv);
//! let raw = std::fs::read("planned-outages.json").unwrap();
//! let parsed = adapter
//!   .parse(&raw, &Selector::new("25/902", "3.1"), Utc::now())
//!   .unwrap();
//! println!("{} events, {} warnings", parsed.events.len(), parsed.warnings.len());
//! ```

pub mod dtek;
pub mod error;
pub mod esvitlo;
mod json;
pub mod time;
pub mod yasno;

use blackout_core::{
  payload::ParsedPayload,
  selector::{GroupKey, Selector},
};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
pub use error::{Error, Result};
use serde::{Deserialize, Serialize};

// ─── Adapter contract ────────────────────────────────────────────────────────

/// One provider family's payload decoder.
///
/// Implementations carry their provider's civil time zone; timestamps without
/// an explicit offset are read in that zone, never in the host's.
pub trait ProviderAdapter: Send + Sync {
  /// Human-readable provider name, used in notifications.
  fn name(&self) -> &str;

  /// Decode `raw` into events for `selector`.
  ///
  /// Fails with [`Error::PayloadFormat`] when the document is unusable and
  /// with [`Error::UnsupportedSelector`] when `selector` is absent. Bad
  /// individual entries are skipped and reported in
  /// [`ParsedPayload::warnings`].
  fn parse(
    &self,
    raw: &[u8],
    selector: &Selector,
    fetch_time: DateTime<Utc>,
  ) -> Result<ParsedPayload>;

  /// Group keys present in `raw`.
  fn groups(&self, raw: &[u8]) -> Result<Vec<GroupKey>>;
}

// ─── Provider families ───────────────────────────────────────────────────────

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
  strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ProviderKind {
  /// Yasno REST API, one document per region/DSO keyed by group.
  Yasno,
  /// DTEK schedule feed published as JSON.
  DtekJson,
  /// DTEK schedule embedded in the provider's web page.
  DtekHtml,
  /// E-Svitlo account API.
  ESvitlo,
}

impl ProviderKind {
  /// Build the adapter for this family with `tz` as the civil zone.
  pub fn adapter(self, tz: Tz) -> Box<dyn ProviderAdapter> {
    match self {
      Self::Yasno => Box::new(yasno::YasnoAdapter::new(tz)),
      Self::DtekJson => Box::new(dtek::DtekAdapter::json(tz)),
      Self::DtekHtml => Box::new(dtek::DtekAdapter::html(tz)),
      Self::ESvitlo => Box::new(esvitlo::ESvitloAdapter::new(tz)),
    }
  }
}
