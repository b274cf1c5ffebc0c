//! The output of a provider adapter for one selector.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::event::OutageEvent;

/// A non-fatal problem found while parsing a payload. The offending entry was
/// skipped; the rest of the document was used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseWarning {
  /// JSON-path-like location of the skipped entry, e.g. `$.3.1.today.slots[2]`.
  pub path:    String,
  pub message: String,
}

impl ParseWarning {
  pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
    Self {
      path:    path.into(),
      message: message.into(),
    }
  }
}

impl fmt::Display for ParseWarning {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}: {}", self.path, self.message)
  }
}

/// Canonical events decoded from one raw payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedPayload {
  /// Confirmed schedule entries (definite and emergency).
  pub events:              Vec<OutageEvent>,
  /// Published but not yet confirmed schedule entries. Kept apart from
  /// `events`; they never affect connectivity state or change detection.
  pub tentative:           Vec<OutageEvent>,
  /// Document-level "last modified" time reported by the provider.
  pub provider_updated_at: Option<DateTime<Utc>>,
  pub warnings:            Vec<ParseWarning>,
}

impl ParsedPayload {
  pub fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
    let warning = ParseWarning::new(path, message);
    tracing::warn!(%warning, "skipping payload entry");
    self.warnings.push(warning);
  }
}
