//! In-memory snapshot storage and the per-selector fetch cycle.
//!
//! [`MemoryStore`] keeps one snapshot per selector behind its own lock, and
//! [`run_cycle`] drives reconcile, detect and commit inside that lock.

mod cycle;
mod memory;

pub mod error;

pub use cycle::{CycleOutcome, run_cycle};
pub use error::{Error, Result};
pub use memory::MemoryStore;

#[cfg(test)]
mod tests;
