//! Testing utilities including mock implementations.
//!
//! These are useful for testing applications that use the claim extraction
//! library without making real LLM calls.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::error::{JudgeError, JudgeResult, SegmentationError, SegmentationResult};
use crate::traits::judge::{Judge, JudgeRequest, Judgment};
use crate::traits::tokenizer::Tokenizer;
use crate::types::decision::Stage;
use crate::types::sentence::CharSpan;

/// A scripted judge reply.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Return this value as the structured answer
    Value(Value),

    /// Refuse with this reason
    Refuse(String),

    /// Fail with [`JudgeError::Transient`]
    Transient(String),

    /// Fail with [`JudgeError::Malformed`]
    Malformed(String),

    /// Fail with [`JudgeError::Api`]
    ApiError(String),
}

impl MockReply {
    fn into_result(self) -> JudgeResult<Judgment> {
        match self {
            MockReply::Value(value) => Ok(Judgment::Value(value)),
            MockReply::Refuse(reason) => Ok(Judgment::Refusal(reason)),
            MockReply::Transient(message) => Err(JudgeError::Transient(message)),
            MockReply::Malformed(message) => Err(JudgeError::Malformed(message)),
            MockReply::ApiError(message) => Err(JudgeError::Api(message)),
        }
    }
}

type ReplyKey = (Stage, String);

/// A mock judge for testing.
///
/// Replies are keyed by stage and subject (the sentence text for selection
/// and disambiguation, the resolved text for decomposition). One-shot
/// replies are used first, in order; then the sticky reply; then a default:
///
/// - selection: REJECTED if the sentence ends with `?`, otherwise SELECTED
/// - disambiguation: RESOLVED, text unchanged
/// - decomposition: one claim equal to the subject
#[derive(Default, Clone)]
pub struct MockJudge {
    /// Replies returned on every call
    sticky: Arc<RwLock<HashMap<ReplyKey, MockReply>>>,

    /// Replies returned once each, before the sticky reply
    queued: Arc<RwLock<HashMap<ReplyKey, VecDeque<MockReply>>>>,

    /// Artificial latency by subject
    delays: Arc<RwLock<HashMap<String, Duration>>>,

    /// Call tracking for assertions
    calls: Arc<RwLock<Vec<JudgeRequest>>>,
}

/// Record of a call made to the mock judge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockJudgeCall {
    pub stage: Stage,
    pub sentence_index: usize,
    pub subject: String,
}

impl MockJudge {
    /// Create a new mock judge with default behavior.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply with `reply` to every `stage` call about `subject`.
    pub fn reply(self, stage: Stage, subject: impl Into<String>, reply: MockReply) -> Self {
        self.sticky
            .write()
            .unwrap()
            .insert((stage, subject.into()), reply);
        self
    }

    /// Reply with `reply` to the next `stage` call about `subject` only.
    pub fn reply_once(self, stage: Stage, subject: impl Into<String>, reply: MockReply) -> Self {
        self.queued
            .write()
            .unwrap()
            .entry((stage, subject.into()))
            .or_default()
            .push_back(reply);
        self
    }

    /// Select the sentence.
    pub fn select(self, sentence: impl Into<String>) -> Self {
        self.reply(
            Stage::Selection,
            sentence,
            MockReply::Value(json!({"decision": "SELECTED", "rationale": "Contains a verifiable fact."})),
        )
    }

    /// Reject the sentence.
    pub fn reject(self, sentence: impl Into<String>) -> Self {
        self.reply(
            Stage::Selection,
            sentence,
            MockReply::Value(json!({"decision": "REJECTED", "rationale": "No verifiable content."})),
        )
    }

    /// Resolve the sentence to `resolved`.
    pub fn resolve(self, sentence: impl Into<String>, resolved: impl Into<String>) -> Self {
        self.reply(
            Stage::Disambiguation,
            sentence,
            MockReply::Value(json!({
                "decision": "RESOLVED",
                "resolved_sentence": resolved.into(),
                "rationale": null
            })),
        )
    }

    /// Mark the sentence unresolvable.
    pub fn unresolvable(self, sentence: impl Into<String>) -> Self {
        self.reply(
            Stage::Disambiguation,
            sentence,
            MockReply::Value(json!({
                "decision": "UNRESOLVABLE",
                "resolved_sentence": null,
                "rationale": "The context does not settle the reference."
            })),
        )
    }

    /// Decompose `resolved` into `claims`.
    pub fn decompose(
        self,
        resolved: impl Into<String>,
        claims: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        let claims: Vec<String> = claims.into_iter().map(Into::into).collect();
        self.reply(
            Stage::Decomposition,
            resolved,
            MockReply::Value(json!({ "claims": claims })),
        )
    }

    /// Refuse every `stage` call about `subject`.
    pub fn refuse(self, stage: Stage, subject: impl Into<String>, reason: impl Into<String>) -> Self {
        self.reply(stage, subject, MockReply::Refuse(reason.into()))
    }

    /// Fail the next `times` calls with a transient error.
    pub fn fail_transiently(self, stage: Stage, subject: impl Into<String>, times: usize) -> Self {
        let subject = subject.into();
        (0..times).fold(self, |judge, attempt| {
            judge.reply_once(
                stage,
                subject.clone(),
                MockReply::Transient(format!("simulated outage #{}", attempt + 1)),
            )
        })
    }

    /// Delay every call about `subject`.
    pub fn with_delay(self, subject: impl Into<String>, delay: Duration) -> Self {
        self.delays.write().unwrap().insert(subject.into(), delay);
        self
    }

    /// Get all calls made to this mock.
    pub fn calls(&self) -> Vec<MockJudgeCall> {
        self.calls
            .read()
            .unwrap()
            .iter()
            .map(|r| MockJudgeCall {
                stage: r.stage,
                sentence_index: r.sentence_index,
                subject: r.subject.clone(),
            })
            .collect()
    }

    /// Get the full requests made to this mock.
    pub fn requests(&self) -> Vec<JudgeRequest> {
        self.calls.read().unwrap().clone()
    }

    /// Number of calls made.
    pub fn call_count(&self) -> usize {
        self.calls.read().unwrap().len()
    }

    /// Number of calls made for one stage.
    pub fn calls_for(&self, stage: Stage) -> usize {
        self.calls
            .read()
            .unwrap()
            .iter()
            .filter(|r| r.stage == stage)
            .count()
    }

    /// Clear call history.
    pub fn clear_calls(&self) {
        self.calls.write().unwrap().clear();
    }

    fn next_reply(&self, request: &JudgeRequest) -> MockReply {
        let key = (request.stage, request.subject.clone());

        if let Some(reply) = self
            .queued
            .write()
            .unwrap()
            .get_mut(&key)
            .and_then(VecDeque::pop_front)
        {
            return reply;
        }

        if let Some(reply) = self.sticky.read().unwrap().get(&key) {
            return reply.clone();
        }

        default_reply(request.stage, &request.subject)
    }
}

fn default_reply(stage: Stage, subject: &str) -> MockReply {
    let value = match stage {
        Stage::Selection if subject.trim_end().ends_with('?') => {
            json!({"decision": "REJECTED", "rationale": "A question is not a claim."})
        }
        Stage::Selection => json!({"decision": "SELECTED", "rationale": null}),
        Stage::Disambiguation => json!({
            "decision": "RESOLVED",
            "resolved_sentence": subject,
            "rationale": null
        }),
        Stage::Decomposition => json!({ "claims": [subject] }),
    };
    MockReply::Value(value)
}

#[async_trait]
impl Judge for MockJudge {
    async fn judge(&self, request: &JudgeRequest) -> JudgeResult<Judgment> {
        self.calls.write().unwrap().push(request.clone());

        let delay = self.delays.read().unwrap().get(&request.subject).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.next_reply(request).into_result()
    }
}

/// A mock tokenizer for testing.
#[derive(Debug, Clone, Default)]
pub struct MockTokenizer {
    spans: Option<Vec<CharSpan>>,
    failure: Option<String>,
}

impl MockTokenizer {
    /// Treat every line as one sentence.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return `spans` for every line, whatever its content.
    pub fn with_spans(spans: Vec<CharSpan>) -> Self {
        Self {
            spans: Some(spans),
            failure: None,
        }
    }

    /// Fail every call with [`SegmentationError::Unavailable`].
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            spans: None,
            failure: Some(message.into()),
        }
    }
}

impl Tokenizer for MockTokenizer {
    fn split(&self, text: &str, _language_hint: Option<&str>) -> SegmentationResult<Vec<CharSpan>> {
        if let Some(message) = &self.failure {
            return Err(SegmentationError::Unavailable(message.clone()));
        }
        Ok(self
            .spans
            .clone()
            .unwrap_or_else(|| vec![CharSpan::new(0, text.len())]))
    }
}
