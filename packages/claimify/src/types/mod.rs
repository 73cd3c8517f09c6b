//! Data types for the claim extraction pipeline.

pub mod config;
pub mod decision;
pub mod run;
pub mod sentence;
