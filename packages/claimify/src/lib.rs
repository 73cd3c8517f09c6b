//! Claim Extraction Library
//!
//! Extracts atomic, verifiable factual claims from free-form text by running
//! every sentence through three schema-constrained model judgments.
//!
//! # Pipeline
//!
//! ```text
//! text → segment → (sentence, window) → Selection → Disambiguation → Decomposition → claims
//! ```
//!
//! - **Selection** keeps sentences that assert something verifiable.
//! - **Disambiguation** rewrites a sentence so it stands alone, using only
//!   its context window, or drops it as unresolvable.
//! - **Decomposition** splits the rewrite into atomic claims, with inferred
//!   context in square brackets.
//!
//! Sentence-level problems (refusals, malformed replies, exhausted retries)
//! never abort a run; they are listed in [`PipelineRun::failures`].
//!
//! # Usage
//!
//! ```rust,ignore
//! use claimify::{Claimify, PipelineConfig};
//! use claimify::ai::OpenAIJudge;
//!
//! let judge = OpenAIJudge::from_env("gpt-4o-2024-08-06")?;
//! let pipeline = Claimify::new(judge).with_config(PipelineConfig::default());
//!
//! let run = pipeline
//!     .extract("The American flag contains 50 stars and 13 stripes.", Some("en"))
//!     .await?;
//!
//! println!("{:?}", run.claim_texts());
//! ```
//!
//! # Modules
//!
//! - [`traits`] - Capability traits (Judge, Tokenizer)
//! - [`types`] - Sentences, decisions, claims, config, run results
//! - [`pipeline`] - Segmentation, windows, contracts, stages, orchestrator
//! - [`tokenizers`] - Rule-based default tokenizer
//! - [`ai`] - Judge implementations (OpenAI behind the `openai` feature)
//! - [`testing`] - Mock implementations for testing

pub mod ai;
pub mod error;
pub mod pipeline;
pub mod testing;
pub mod tokenizers;
pub mod traits;
pub mod types;

// Re-export core types at crate root
pub use error::{ClaimifyError, ContractViolation, JudgeError, SegmentationError};
pub use traits::{
    judge::{Judge, JudgeRequest, Judgment},
    tokenizer::Tokenizer,
};
pub use types::{
    config::{PipelineConfig, RetryPolicy},
    decision::{
        Claim, DisambiguationDecision, DisambiguationResult, SelectionDecision, SelectionResult,
        Stage,
    },
    run::{PipelineRun, RunReport, SentenceFailure, SentenceFailureKind, SentenceReport, SentenceState},
    sentence::{CharSpan, ContextWindow, Sentence},
};

// Re-export pipeline components
pub use pipeline::{
    // Orchestrator
    Claimify,
    // Segmentation and windows
    segment, Segments, WindowBuilder,
    // Prompts
    prompt_fingerprint,
};

pub use ai::{JudgeExt, RateLimitedJudge};
pub use tokenizers::RuleTokenizer;

// Re-export testing utilities
pub use testing::{MockJudge, MockReply, MockTokenizer};
