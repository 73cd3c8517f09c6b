//! Run-level types - what a caller gets back from one document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

use super::decision::{Claim, DisambiguationResult, SelectionResult, Stage};
use super::sentence::Sentence;

/// Why a sentence produced no claims (or fewer than it should have).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentenceFailureKind {
    /// The judge declined to answer; mapped to the conservative outcome.
    JudgmentRefusal,

    /// Replies kept failing the stage's response contract.
    JudgmentSchemaViolation,

    /// Transient errors outlasted the retry budget.
    TransientExhausted,

    /// The provider rejected the request outright.
    ProviderError,

    /// A resolved sentence decomposed into zero claims.
    EmptyDecomposition,

    /// The run was cancelled before the sentence finished.
    Cancelled,
}

impl SentenceFailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SentenceFailureKind::JudgmentRefusal => "judgment_refusal",
            SentenceFailureKind::JudgmentSchemaViolation => "judgment_schema_violation",
            SentenceFailureKind::TransientExhausted => "transient_exhausted",
            SentenceFailureKind::ProviderError => "provider_error",
            SentenceFailureKind::EmptyDecomposition => "empty_decomposition",
            SentenceFailureKind::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for SentenceFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A sentence-level failure. Never aborts the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentenceFailure {
    pub sentence_index: usize,

    /// Stage that failed; `None` when the sentence never started
    pub stage: Option<Stage>,

    pub kind: SentenceFailureKind,

    /// Human-readable detail (refusal text, last error)
    pub message: String,

    /// Judge calls spent before giving up
    pub attempts: u32,
}

impl SentenceFailure {
    /// Create a new failure record.
    pub fn new(
        sentence_index: usize,
        stage: Option<Stage>,
        kind: SentenceFailureKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            sentence_index,
            stage,
            kind,
            message: message.into(),
            attempts: 0,
        }
    }

    /// Record how many judge calls were made.
    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }
    /// Whether the decomposition stage answered despite this failure
    /// (a refusal or an empty claim list).
    fn ends_decomposition(&self) -> bool {
        match self.kind {
            SentenceFailureKind::EmptyDecomposition => true,
            SentenceFailureKind::JudgmentRefusal => self.stage == Some(Stage::Decomposition),
            _ => false,
        }
    }
}

/// Where a sentence ended up in the per-sentence state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SentenceState {
    /// Never judged (cancelled, or selection failed)
    Candidate,
    Rejected,
    /// Selected, but disambiguation did not complete
    Selected,
    Unresolvable,
    /// Resolved, but decomposition did not complete
    Resolved,
    Decomposed,
}

impl SentenceState {
    /// Whether the state machine reached one of its end states.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SentenceState::Rejected | SentenceState::Unresolvable | SentenceState::Decomposed
        )
    }
}

/// Everything one `extract` call produced.
///
/// Scoped to a single invocation; the caller owns it afterwards.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub language_hint: Option<String>,

    /// Segmenter output, in document order
    pub sentences: Vec<Sentence>,

    /// Selection results by sentence index
    pub selections: BTreeMap<usize, SelectionResult>,

    /// Disambiguation results by sentence index
    pub disambiguations: BTreeMap<usize, DisambiguationResult>,

    /// Surviving claims, ordered by `(source_sentence_index, decomposition_order)`
    pub claims: Vec<Claim>,

    /// Sentence-level failures, ordered by sentence index
    pub failures: Vec<SentenceFailure>,

    /// Whether the run was cancelled before every sentence finished
    pub cancelled: bool,

    /// Fingerprint of the stage prompts used for this run
    pub prompt_fingerprint: String,
}

impl PipelineRun {
    /// Claim texts in document order.
    pub fn claim_texts(&self) -> Vec<String> {
        self.claims.iter().map(|c| c.text.clone()).collect()
    }

    /// Claims emitted for one sentence.
    pub fn claims_for(&self, sentence_index: usize) -> impl Iterator<Item = &Claim> {
        self.claims
            .iter()
            .filter(move |c| c.source_sentence_index == sentence_index)
    }

    /// Failures recorded for one sentence.
    pub fn failures_for(&self, sentence_index: usize) -> impl Iterator<Item = &SentenceFailure> {
        self.failures
            .iter()
            .filter(move |f| f.sentence_index == sentence_index)
    }

    /// Indices of every sentence with at least one failure.
    pub fn failed_indices(&self) -> Vec<usize> {
        let mut indices: Vec<usize> = self.failures.iter().map(|f| f.sentence_index).collect();
        indices.sort_unstable();
        indices.dedup();
        indices
    }

    /// State reached by a sentence, or `None` for an unknown index.
    pub fn state(&self, sentence_index: usize) -> Option<SentenceState> {
        if sentence_index >= self.sentences.len() {
            return None;
        }

        let selection = match self.selections.get(&sentence_index) {
            None => return Some(SentenceState::Candidate),
            Some(s) => s,
        };
        if !selection.is_selected() {
            return Some(SentenceState::Rejected);
        }

        let disambiguation = match self.disambiguations.get(&sentence_index) {
            None => return Some(SentenceState::Selected),
            Some(d) => d,
        };
        if !disambiguation.is_resolved() {
            return Some(SentenceState::Unresolvable);
        }

        let decomposed = self.claims_for(sentence_index).next().is_some()
            || self.failures_for(sentence_index).any(SentenceFailure::ends_decomposition);
        if decomposed {
            Some(SentenceState::Decomposed)
        } else {
            Some(SentenceState::Resolved)
        }
    }

    /// Whether every sentence reached an end state without failures.
    pub fn is_clean(&self) -> bool {
        !self.cancelled && self.failures.is_empty()
    }

    /// Wall-clock duration of the run.
    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }

    /// Serializable summary with per-sentence diagnostics.
    pub fn report(&self) -> RunReport {
        let sentences = self
            .sentences
            .iter()
            .map(|sentence| {
                let index = sentence.index;
                SentenceReport {
                    index,
                    text: sentence.text.clone(),
                    state: self.state(index).unwrap_or(SentenceState::Candidate),
                    selection: self.selections.get(&index).cloned(),
                    disambiguation: self.disambiguations.get(&index).cloned(),
                    claims: self.claims_for(index).map(|c| c.text.clone()).collect(),
                    failures: self.failures_for(index).cloned().collect(),
                }
            })
            .collect();

        RunReport {
            run_id: self.run_id,
            claims: self.claim_texts(),
            sentences,
            failures: self.failures.clone(),
            cancelled: self.cancelled,
            duration_ms: self.duration().num_milliseconds(),
            prompt_fingerprint: self.prompt_fingerprint.clone(),
        }
    }
}

/// Outbound result shape: claims plus diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub claims: Vec<String>,
    pub sentences: Vec<SentenceReport>,
    pub failures: Vec<SentenceFailure>,
    pub cancelled: bool,
    pub duration_ms: i64,
    pub prompt_fingerprint: String,
}

/// Diagnostics for one sentence.
#[derive(Debug, Clone, Serialize)]
pub struct SentenceReport {
    pub index: usize,
    pub text: String,
    pub state: SentenceState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selection: Option<SelectionResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disambiguation: Option<DisambiguationResult>,
    pub claims: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<SentenceFailure>,
}
