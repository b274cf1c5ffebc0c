//! [`MemoryStore`], the in-process implementation of [`SnapshotStore`].

use std::{collections::{BTreeMap, HashMap}, sync::Arc};

use blackout_core::{change::Snapshot, selector::Selector, store::SnapshotStore};
use parking_lot::Mutex;

type Slot = Arc<Mutex<Option<Snapshot>>>;

/// Snapshots keyed by selector, each guarded by its own mutex.
///
/// The outer map lock is held only long enough to find a slot, so a long
/// cycle on one selector never blocks another. Cloning is cheap; clones
/// share the same snapshots.
#[derive(Clone, Default)]
pub struct MemoryStore {
  slots: Arc<Mutex<HashMap<Selector, Slot>>>,
}

impl MemoryStore {
  pub fn new() -> Self { Self::default() }

  /// Seed a store, e.g. from a persisted state file.
  pub fn from_snapshots(
    snapshots: impl IntoIterator<Item = (Selector, Snapshot)>,
  ) -> Self {
    let slots = snapshots
      .into_iter()
      .map(|(selector, snapshot)| (selector, Arc::new(Mutex::new(Some(snapshot)))))
      .collect();
    Self {
      slots: Arc::new(Mutex::new(slots)),
    }
  }

  /// Copy out every committed snapshot, ordered by selector.
  pub fn export(&self) -> BTreeMap<Selector, Snapshot> {
    self
      .all_slots()
      .into_iter()
      .filter_map(|(selector, slot)| Some((selector, slot.lock().clone()?)))
      .collect()
  }

  fn slot(&self, selector: &Selector) -> Slot {
    self.slots.lock().entry(selector.clone()).or_default().clone()
  }

  fn existing_slot(&self, selector: &Selector) -> Option<Slot> {
    self.slots.lock().get(selector).cloned()
  }

  /// Drop a never-committed slot after a failed transaction.
  ///
  /// Called with the slot's own lock held. Taking the map lock second is
  /// safe: nothing acquires a slot lock while holding the map lock.
  fn prune(&self, selector: &Selector, slot: &Slot) {
    let mut slots = self.slots.lock();
    // Slots are only cloned under the map lock, so a count of two (map and
    // caller) means no other transaction is queued on this one.
    if Arc::strong_count(slot) == 2
      && slots.get(selector).is_some_and(|held| Arc::ptr_eq(held, slot))
    {
      slots.remove(selector);
    }
  }

  #[cfg(test)]
  pub(crate) fn slot_count(&self) -> usize { self.slots.lock().len() }

  fn all_slots(&self) -> Vec<(Selector, Slot)> {
    self
      .slots
      .lock()
      .iter()
      .map(|(selector, slot)| (selector.clone(), slot.clone()))
      .collect()
  }
}

impl SnapshotStore for MemoryStore {
  fn get(&self, selector: &Selector) -> Option<Snapshot> {
    self.existing_slot(selector)?.lock().clone()
  }

  fn selectors(&self) -> Vec<Selector> {
    let mut selectors: Vec<_> = self
      .all_slots()
      .into_iter()
      .filter(|(_, slot)| slot.lock().is_some())
      .map(|(selector, _)| selector)
      .collect();
    selectors.sort();
    selectors
  }

  fn remove(&self, selector: &Selector) -> Option<Snapshot> {
    let slot = self.slots.lock().remove(selector)?;
    slot.lock().take()
  }

  fn transact<T, E, F>(&self, selector: &Selector, cycle: F) -> Result<T, E>
  where
    F: FnOnce(Option<&Snapshot>) -> Result<(Snapshot, T), E>,
  {
    let slot = self.slot(selector);
    let mut current = slot.lock();
    match cycle(current.as_ref()) {
      Ok((next, value)) => {
        *current = Some(next);
        Ok(value)
      }
      Err(error) => {
        if current.is_none() {
          self.prune(selector, &slot);
        }
        Err(error)
      }
    }
  }
}
