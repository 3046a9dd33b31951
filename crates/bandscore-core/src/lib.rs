//! bandscore-core — Session controller, timing engine, and scoring pipeline.
//!
//! This crate defines the exam data model, the timed session state machine,
//! and the scoring logic that the rest of the bandscore workspace builds on.

pub mod engine;
pub mod error;
pub mod generator;
pub mod model;
pub mod pool;
pub mod report;
pub mod responses;
pub mod scoring;
pub mod session;
pub mod statistics;
pub mod timing;
pub mod traits;
