//! Error type for `blackout-store`.

use blackout_core::selector::Selector;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] blackout_core::Error),

  /// A payload for one selector carried an event for another.
  #[error("event for {found} handed to the cycle of {expected}")]
  SelectorMismatch { expected: Selector, found: Selector },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
