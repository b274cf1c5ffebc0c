//! The `SnapshotStore` trait.
//!
//! Implemented by storage backends (e.g. `blackout-store`). The cycle driver
//! and hosts depend on this abstraction, not on a concrete backend.

use crate::{change::Snapshot, selector::Selector};

/// Per-selector snapshot storage.
///
/// Each selector owns an independent snapshot. Updates to one selector are
/// serialised through [`transact`](SnapshotStore::transact); different
/// selectors never share mutable state.
pub trait SnapshotStore: Send + Sync {
  /// A copy of the current snapshot, or `None` before the first commit.
  fn get(&self, selector: &Selector) -> Option<Snapshot>;

  /// All selectors with a committed snapshot.
  fn selectors(&self) -> Vec<Selector>;

  /// Forget a selector (e.g. when its configuration is removed).
  fn remove(&self, selector: &Selector) -> Option<Snapshot>;

  /// Run `cycle` inside the selector's exclusive critical section.
  ///
  /// `cycle` sees the current snapshot and returns the snapshot to commit.
  /// On `Err` nothing is committed and the previous snapshot is retained.
  fn transact<T, E, F>(&self, selector: &Selector, cycle: F) -> Result<T, E>
  where
    F: FnOnce(Option<&Snapshot>) -> Result<(Snapshot, T), E>;
}
