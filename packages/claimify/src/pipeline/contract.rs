//! Structured response contracts.
//!
//! Each stage expects a closed set of reply shapes. The wire structs below
//! define the JSON schema sent to the judge; `decode` turns a reply into a
//! sum type, or a [`ContractViolation`] that names exactly what was wrong.

use schemars::{schema_for, JsonSchema};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::error::ContractViolation;
use crate::types::decision::{DisambiguationDecision, SelectionDecision};

/// A stage's reply contract.
pub trait ResponseContract {
    /// Schema name sent to the judge
    const NAME: &'static str;

    /// Decoded reply
    type Output;

    /// JSON schema the reply must follow.
    fn schema() -> Value;

    /// Validate and decode a reply.
    fn decode(value: Value) -> Result<Self::Output, ContractViolation>;
}

/// Selection reply as it appears on the wire.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct SelectionResponse {
    /// SELECTED if the sentence asserts a verifiable proposition, otherwise REJECTED
    pub decision: SelectionDecision,

    /// One short sentence explaining the decision
    pub rationale: Option<String>,
}

/// Disambiguation reply as it appears on the wire.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct DisambiguationResponse {
    /// RESOLVED if every ambiguity can be settled from the context, otherwise UNRESOLVABLE
    pub decision: DisambiguationDecision,

    /// The rewritten sentence; required when RESOLVED, null otherwise
    pub resolved_sentence: Option<String>,

    /// One short sentence explaining the decision
    pub rationale: Option<String>,
}

/// Decomposition reply as it appears on the wire.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct DecompositionResponse {
    /// Atomic claims in the order they appear in the sentence
    pub claims: Vec<String>,
}

/// Decoded selection reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionOutcome {
    Selected { rationale: Option<String> },
    Rejected { rationale: Option<String> },
}

/// Decoded disambiguation reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisambiguationOutcome {
    Resolved {
        text: String,
        rationale: Option<String>,
    },
    Unresolvable {
        rationale: Option<String>,
    },
}

pub struct SelectionContract;
pub struct DisambiguationContract;
pub struct DecompositionContract;

impl ResponseContract for SelectionContract {
    const NAME: &'static str = "selection_response";
    type Output = SelectionOutcome;

    fn schema() -> Value {
        serde_json::to_value(schema_for!(SelectionResponse)).unwrap_or_default()
    }

    fn decode(value: Value) -> Result<SelectionOutcome, ContractViolation> {
        let reply: SelectionResponse = parse(Self::NAME, value)?;
        let rationale = non_blank(reply.rationale);

        Ok(match reply.decision {
            SelectionDecision::Selected => SelectionOutcome::Selected { rationale },
            SelectionDecision::Rejected => SelectionOutcome::Rejected { rationale },
        })
    }
}

impl ResponseContract for DisambiguationContract {
    const NAME: &'static str = "disambiguation_response";
    type Output = DisambiguationOutcome;

    fn schema() -> Value {
        serde_json::to_value(schema_for!(DisambiguationResponse)).unwrap_or_default()
    }

    fn decode(value: Value) -> Result<DisambiguationOutcome, ContractViolation> {
        let reply: DisambiguationResponse = parse(Self::NAME, value)?;
        let rationale = non_blank(reply.rationale);

        match reply.decision {
            DisambiguationDecision::Resolved => {
                let text = reply.resolved_sentence.ok_or(ContractViolation::MissingField {
                    contract: Self::NAME,
                    decision: "RESOLVED",
                    field: "resolved_sentence",
                })?;
                let text = text.trim();
                if text.is_empty() {
                    return Err(ContractViolation::BlankField {
                        contract: Self::NAME,
                        field: "resolved_sentence",
                    });
                }
                Ok(DisambiguationOutcome::Resolved {
                    text: text.to_string(),
                    rationale,
                })
            }
            // A rewrite sent alongside UNRESOLVABLE is ignored.
            DisambiguationDecision::Unresolvable => Ok(DisambiguationOutcome::Unresolvable { rationale }),
        }
    }
}

impl ResponseContract for DecompositionContract {
    const NAME: &'static str = "decomposition_response";
    type Output = Vec<String>;

    fn schema() -> Value {
        serde_json::to_value(schema_for!(DecompositionResponse)).unwrap_or_default()
    }

    /// Claims in reply order. An empty list is valid here; the stage decides
    /// what zero claims means.
    fn decode(value: Value) -> Result<Vec<String>, ContractViolation> {
        let reply: DecompositionResponse = parse(Self::NAME, value)?;

        reply
            .claims
            .into_iter()
            .map(|claim| {
                let trimmed = claim.trim();
                if trimmed.is_empty() {
                    Err(ContractViolation::BlankField {
                        contract: Self::NAME,
                        field: "claims[]",
                    })
                } else {
                    Ok(trimmed.to_string())
                }
            })
            .collect()
    }
}

fn parse<T: DeserializeOwned>(contract: &'static str, value: Value) -> Result<T, ContractViolation> {
    serde_json::from_value(value).map_err(|source| ContractViolation::Shape { contract, source })
}

fn non_blank(text: Option<String>) -> Option<String> {
    text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())
}
