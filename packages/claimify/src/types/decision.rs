//! Per-stage decision records and the claims they produce.
//!
//! Every record is keyed by the index of the sentence it describes. Stages
//! never edit a [`Sentence`](super::sentence::Sentence); they emit one of
//! these instead.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The three judgment stages, in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    Selection,
    Disambiguation,
    Decomposition,
}

impl Stage {
    /// Stable lowercase name for logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Selection => "selection",
            Stage::Disambiguation => "disambiguation",
            Stage::Decomposition => "decomposition",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a sentence carries a verifiable proposition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SelectionDecision {
    /// Asserts something that can in principle be checked.
    Selected,

    /// Opinion, speculation, question, instruction or no content.
    Rejected,
}

/// Outcome of the selection stage for one sentence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionResult {
    pub sentence_index: usize,
    pub decision: SelectionDecision,
    pub rationale: Option<String>,
}

impl SelectionResult {
    /// Whether the sentence continues to disambiguation.
    pub fn is_selected(&self) -> bool {
        self.decision == SelectionDecision::Selected
    }
}

/// Whether a sentence's ambiguity could be resolved from context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DisambiguationDecision {
    Resolved,
    Unresolvable,
}

/// Outcome of the disambiguation stage for one sentence.
///
/// `resolved_text` is present exactly when the decision is `Resolved`;
/// the constructors are the only way to build one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisambiguationResult {
    sentence_index: usize,
    decision: DisambiguationDecision,
    resolved_text: Option<String>,
    rationale: Option<String>,
}

impl DisambiguationResult {
    /// A sentence rewritten so it no longer depends on its context.
    pub fn resolved(
        sentence_index: usize,
        resolved_text: impl Into<String>,
        rationale: Option<String>,
    ) -> Self {
        Self {
            sentence_index,
            decision: DisambiguationDecision::Resolved,
            resolved_text: Some(resolved_text.into()),
            rationale,
        }
    }

    /// A sentence whose ambiguity the context cannot settle.
    pub fn unresolvable(sentence_index: usize, rationale: Option<String>) -> Self {
        Self {
            sentence_index,
            decision: DisambiguationDecision::Unresolvable,
            resolved_text: None,
            rationale,
        }
    }

    pub fn sentence_index(&self) -> usize {
        self.sentence_index
    }

    pub fn decision(&self) -> DisambiguationDecision {
        self.decision
    }

    pub fn resolved_text(&self) -> Option<&str> {
        self.resolved_text.as_deref()
    }

    pub fn rationale(&self) -> Option<&str> {
        self.rationale.as_deref()
    }

    pub fn is_resolved(&self) -> bool {
        self.decision == DisambiguationDecision::Resolved
    }
}

/// An atomic, self-contained factual statement taken from one sentence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    /// Sentence the claim was decomposed from
    pub source_sentence_index: usize,

    /// Claim text, possibly with bracketed inferred context
    pub text: String,

    /// Position among the claims of the same sentence
    pub decomposition_order: usize,
}

impl Claim {
    /// Create a new claim.
    pub fn new(source_sentence_index: usize, decomposition_order: usize, text: impl Into<String>) -> Self {
        Self {
            source_sentence_index,
            text: text.into(),
            decomposition_order,
        }
    }

    /// Document-order sort key.
    pub fn order_key(&self) -> (usize, usize) {
        (self.source_sentence_index, self.decomposition_order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolved_text_present_iff_resolved() {
        let resolved = DisambiguationResult::resolved(2, "Apple Inc. grew.", None);
        assert!(resolved.is_resolved());
        assert_eq!(resolved.resolved_text(), Some("Apple Inc. grew."));

        let unresolvable = DisambiguationResult::unresolvable(3, Some("no antecedent".into()));
        assert!(!unresolvable.is_resolved());
        assert_eq!(unresolvable.resolved_text(), None);
        assert_eq!(unresolvable.rationale(), Some("no antecedent"));
    }

    #[test]
    fn test_decisions_use_wire_names() {
        assert_eq!(
            serde_json::to_string(&SelectionDecision::Selected).unwrap(),
            "\"SELECTED\""
        );
        assert_eq!(
            serde_json::to_string(&DisambiguationDecision::Unresolvable).unwrap(),
            "\"UNRESOLVABLE\""
        );
        assert_eq!(serde_json::to_string(&Stage::Decomposition).unwrap(), "\"DECOMPOSITION\"");
    }

    #[test]
    fn test_claim_order_key() {
        let claim = Claim::new(4, 1, "The flag has 13 stripes.");
        assert_eq!(claim.order_key(), (4, 1));
    }
}
