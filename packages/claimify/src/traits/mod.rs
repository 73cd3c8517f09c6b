//! Capability traits the pipeline consumes.
//!
//! The pipeline never talks to a model provider or a tokenizer directly;
//! applications hand it implementations of these traits.

pub mod judge;
pub mod tokenizer;
