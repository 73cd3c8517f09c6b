//! Claim extraction pipeline - the core of the library.
//!
//! The pipeline orchestrates:
//! - Segmentation (line-aware, tokenizer-driven)
//! - Context windows drawn from the original sentences
//! - Selection → Disambiguation → Decomposition, one judge call each
//! - Structured response contracts with bounded retry
//! - Aggregation of claims and per-sentence failures

pub mod contract;
pub mod decomposition;
pub mod disambiguation;
pub mod orchestrator;
pub mod prompts;
pub mod retry;
pub mod segment;
pub mod selection;
pub mod stage;
pub mod window;

pub use contract::{
    DecompositionContract, DecompositionResponse, DisambiguationContract, DisambiguationOutcome,
    DisambiguationResponse, ResponseContract, SelectionContract, SelectionOutcome,
    SelectionResponse,
};
pub use orchestrator::Claimify;
pub use prompts::{
    format_decomposition_prompt, format_sentence_prompt, prompt_fingerprint,
    DECOMPOSITION_SYSTEM_PROMPT, DISAMBIGUATION_SYSTEM_PROMPT, NO_QUESTION,
    SELECTION_SYSTEM_PROMPT,
};
pub use retry::{Answered, CallFailure, Reply, RetryingCall};
pub use segment::{is_formatting_artifact, segment, Segments};
pub use window::WindowBuilder;
