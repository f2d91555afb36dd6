//! keygrade-core: Answer-key set detection, scoring, and aggregation.
//!
//! This crate defines the exam data model, the answer-key parser, the
//! set detector, the scoring engine and the batch aggregator that the
//! rest of keygrade builds on. All core operations are synchronous pure
//! functions; the async [`engine`] only orchestrates them.

pub mod answer_key;
pub mod context;
pub mod detect;
pub mod engine;
pub mod error;
pub mod model;
pub mod parser;
pub mod report;
pub mod results;
pub mod scoring;
pub mod statistics;
pub mod traits;
