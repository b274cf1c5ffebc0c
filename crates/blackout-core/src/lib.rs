//! Core types and the schedule engine for outage-schedule ingestion.
//!
//! No network, file or provider-format dependencies. Provider adapters
//! produce [`event::OutageEvent`]s; reconciliation, state evaluation and
//! change detection live here as pure functions over owned values.

pub mod calendar;
pub mod change;
pub mod error;
pub mod event;
pub mod payload;
pub mod selector;
pub mod state;
pub mod store;
pub mod timeline;

pub use error::{Error, Result};
