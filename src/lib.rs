//! Huella - Pure Rust working set size estimator
//!
//! This library provides the core functionality for estimating the working
//! set size of a program from a stream of attributed memory access events:
//! bounded event intake, cache-line deduplication, per-routine aggregation
//! and fixed-width report rendering.

pub mod aggregate;
pub mod buffer;
pub mod cacheline;
pub mod capacity;
pub mod cli;
pub mod engine;
pub mod filter;
pub mod registry;
pub mod replay;
pub mod report;
