//! Typed errors for the claim extraction library.
//!
//! Uses `thiserror` for library errors (not `anyhow`). Only
//! [`ClaimifyError`] ever aborts a run; judgment failures are recorded per
//! sentence (see [`crate::types::run::SentenceFailure`]).

use thiserror::Error;

/// Run-fatal errors.
#[derive(Debug, Error)]
pub enum ClaimifyError {
    /// The document could not be split into sentences.
    #[error("segmentation failed: {0}")]
    Segmentation(#[from] SegmentationError),

    /// A context window was requested for a sentence that does not exist.
    #[error("sentence index {index} out of range (document has {len} sentences)")]
    IndexOutOfRange { index: usize, len: usize },

    /// Invalid pipeline configuration
    #[error("config error: {0}")]
    Config(String),
}

/// Errors raised by a tokenizer capability.
#[derive(Debug, Error)]
pub enum SegmentationError {
    /// Tokenizer could not be used at all (missing model data, etc.)
    #[error("tokenizer unavailable: {0}")]
    Unavailable(String),

    /// Tokenizer rejected the document
    #[error("document unparsable: {0}")]
    Unparsable(String),

    /// Tokenizer returned a span that does not fit the text it was given
    #[error("tokenizer returned invalid span {start}..{end} for text of {len} bytes")]
    InvalidSpan { start: usize, end: usize, len: usize },
}

/// Errors returned by a judgment capability.
///
/// A refusal is *not* an error; it is a regular
/// [`crate::traits::judge::Judgment::Refusal`] reply.
#[derive(Debug, Error)]
pub enum JudgeError {
    /// Network, timeout, rate limit or server-side failure. Retried.
    #[error("transient judge failure: {0}")]
    Transient(String),

    /// The reply was not valid structured data. Retried.
    #[error("malformed judge reply: {0}")]
    Malformed(String),

    /// The provider rejected the request. Not retried.
    #[error("judge API error: {0}")]
    Api(String),

    /// Judge is misconfigured (unknown model, missing credentials).
    #[error("judge config error: {0}")]
    Config(String),
}

/// A judge reply that does not fit the shape a stage expects.
#[derive(Debug, Error)]
pub enum ContractViolation {
    /// Reply could not be decoded into the expected shape at all.
    #[error("reply does not match {contract}: {source}")]
    Shape {
        contract: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// A field required by the chosen decision is absent.
    #[error("{contract}: decision {decision} requires `{field}`")]
    MissingField {
        contract: &'static str,
        decision: &'static str,
        field: &'static str,
    },

    /// A text field is present but empty.
    #[error("{contract}: `{field}` is blank")]
    BlankField {
        contract: &'static str,
        field: &'static str,
    },
}

/// Result type alias for run-level operations.
pub type Result<T> = std::result::Result<T, ClaimifyError>;

/// Result type alias for judgment calls.
pub type JudgeResult<T> = std::result::Result<T, JudgeError>;

/// Result type alias for tokenizer calls.
pub type SegmentationResult<T> = std::result::Result<T, SegmentationError>;
