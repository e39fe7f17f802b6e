//! Core traits for backfetch.
//!
//! This crate defines the seams of the fetch pipeline:
//! - [`ObjectStore`] - Listing and streaming reads against a bucket (S3, in-memory)
//! - [`OutcomeSink`] - Destination for per-object outcomes and the run summary

pub mod sink;
pub mod store;

pub use sink::*;
pub use store::*;
