//! Core types for backfetch.
//!
//! This crate provides the values that flow through the fetch pipeline:
//! - [`ObjectDescriptor`] - Listing metadata for one remote object
//! - [`DownloadOutcome`] - Result of materializing one object locally
//! - [`RunSummary`] - Aggregate of all outcomes for one invocation

pub mod descriptor;
pub mod outcome;
pub mod summary;

pub use descriptor::*;
pub use outcome::*;
pub use summary::*;
