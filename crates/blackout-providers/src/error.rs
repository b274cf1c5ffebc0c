//! Error types for the provider adapters.

use blackout_core::selector::Selector;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// The document as a whole could not be understood. `path` points at the
  /// offending node, e.g. `$.data` or `$.3.1.today`.
  #[error("malformed payload at {path}: {reason}")]
  PayloadFormat { path: String, reason: String },

  /// The configured selector does not exist in this provider's payload.
  #[error("selector {selector} not supported: {reason}")]
  UnsupportedSelector { selector: Selector, reason: String },
}

impl Error {
  pub(crate) fn format(path: impl Into<String>, reason: impl Into<String>) -> Self {
    Self::PayloadFormat {
      path:   path.into(),
      reason: reason.into(),
    }
  }

  pub(crate) fn unsupported(selector: &Selector, reason: impl Into<String>) -> Self {
    Self::UnsupportedSelector {
      selector: selector.clone(),
      reason:   reason.into(),
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
