//! Host side of Blackout: configuration, state persistence, concurrent
//! ingestion and reporting.
//!
//! The binary in `main.rs` is a thin clap front-end over these modules.

pub mod config;
pub mod ingest;
pub mod report;
pub mod state_file;
