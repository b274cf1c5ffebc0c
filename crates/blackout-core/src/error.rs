//! Error types for `blackout-core`.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::selector::Selector;

#[derive(Debug, Error)]
pub enum Error {
  /// An adapter produced an event whose start is not before its end.
  #[error("inconsistent event for {selector}: start {start} is not before end {end}")]
  InconsistentEvent {
    selector: Selector,
    start:    DateTime<Utc>,
    end:      DateTime<Utc>,
  },

  /// A stored timeline is out of order or overlapping.
  #[error("timeline event {index} overlaps or precedes its predecessor")]
  UnorderedTimeline { index: usize },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
