//! Bounded retry around a single judge call.
//!
//! The schedule itself is [`RetryPolicy::backoff_for`]; this module only
//! classifies what went wrong and waits.

use std::marker::PhantomData;
use std::time::{Duration, Instant};
use tracing::warn;

use crate::error::JudgeError;
use crate::pipeline::contract::ResponseContract;
use crate::traits::judge::{Judge, JudgeRequest, Judgment};
use crate::types::config::RetryPolicy;
use crate::types::run::SentenceFailureKind;

/// A usable judge answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply<T> {
    /// Reply decoded under the stage contract
    Answer(T),

    /// Judge declined to answer
    Refused(String),
}

/// A reply together with the number of calls it took.
#[derive(Debug, Clone)]
pub struct Answered<T> {
    pub reply: Reply<T>,
    pub attempts: u32,
}

/// Why a call produced no usable reply.
#[derive(Debug, Clone)]
pub struct CallFailure {
    pub kind: SentenceFailureKind,
    pub message: String,
    pub attempts: u32,
}

/// Calls a judge under one response contract with a retry policy.
pub struct RetryingCall<'a, C> {
    policy: &'a RetryPolicy,
    timeout: Duration,
    contract: PhantomData<C>,
}

impl<'a, C: ResponseContract> RetryingCall<'a, C> {
    pub fn new(policy: &'a RetryPolicy, timeout: Duration) -> Self {
        Self {
            policy,
            timeout,
            contract: PhantomData,
        }
    }

    /// Call `judge` until it gives a reply that fits the contract, refuses,
    /// fails permanently, or the policy runs out.
    ///
    /// Retried: timeouts, [`JudgeError::Transient`], [`JudgeError::Malformed`]
    /// and contract violations. Not retried: refusals, [`JudgeError::Api`],
    /// [`JudgeError::Config`].
    pub async fn run<J: Judge + ?Sized>(
        &self,
        judge: &J,
        request: &JudgeRequest,
    ) -> Result<Answered<C::Output>, CallFailure> {
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            let started = Instant::now();

            let (kind, message) = match tokio::time::timeout(self.timeout, judge.judge(request)).await {
                Ok(Ok(Judgment::Refusal(reason))) => {
                    return Ok(Answered {
                        reply: Reply::Refused(reason),
                        attempts,
                    });
                }
                Ok(Ok(Judgment::Value(value))) => match C::decode(value) {
                    Ok(output) => {
                        return Ok(Answered {
                            reply: Reply::Answer(output),
                            attempts,
                        });
                    }
                    Err(violation) => (SentenceFailureKind::JudgmentSchemaViolation, violation.to_string()),
                },
                Ok(Err(JudgeError::Malformed(message))) => {
                    (SentenceFailureKind::JudgmentSchemaViolation, message)
                }
                Ok(Err(JudgeError::Transient(message))) => (SentenceFailureKind::TransientExhausted, message),
                Ok(Err(e @ (JudgeError::Api(_) | JudgeError::Config(_)))) => {
                    return Err(CallFailure {
                        kind: SentenceFailureKind::ProviderError,
                        message: e.to_string(),
                        attempts,
                    });
                }
                Err(_) => (
                    SentenceFailureKind::TransientExhausted,
                    format!("judge call timed out after {}ms", self.timeout.as_millis()),
                ),
            };

            let Some(delay) = self.policy.backoff_for(attempts) else {
                return Err(CallFailure {
                    kind,
                    message,
                    attempts,
                });
            };

            warn!(
                sentence_index = request.sentence_index,
                stage = %request.stage,
                attempt = attempts,
                max_attempts = self.policy.max_attempts,
                kind = %kind,
                elapsed_ms = started.elapsed().as_millis() as u64,
                backoff_ms = delay.as_millis() as u64,
                error = %message,
                "Judge call failed, retrying"
            );

            tokio::time::sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::contract::{SelectionContract, SelectionOutcome};
    use crate::testing::{MockJudge, MockReply};
    use crate::types::decision::Stage;
    use serde_json::json;

    fn request(subject: &str) -> JudgeRequest {
        JudgeRequest {
            stage: Stage::Selection,
            sentence_index: 0,
            subject: subject.to_string(),
            system_prompt: String::new(),
            user_prompt: String::new(),
            schema_name: SelectionContract::NAME,
            schema: json!({}),
        }
    }

    fn fast_policy(attempts: u32) -> RetryPolicy {
        RetryPolicy::default()
            .with_max_attempts(attempts)
            .with_backoff(Duration::from_millis(1), Duration::from_millis(2))
    }

    #[tokio::test]
    async fn test_transient_then_success() {
        let judge = MockJudge::new()
            .reply_once(Stage::Selection, "A fact.", MockReply::Transient("connection reset".into()))
            .select("A fact.");
        let policy = fast_policy(3);

        let answered = RetryingCall::<SelectionContract>::new(&policy, Duration::from_secs(1))
            .run(&judge, &request("A fact."))
            .await
            .unwrap();

        assert_eq!(answered.attempts, 2);
        assert!(matches!(answered.reply, Reply::Answer(SelectionOutcome::Selected { .. })));
    }

    #[tokio::test]
    async fn test_schema_violation_exhausts_budget() {
        let judge = MockJudge::new().reply(
            Stage::Selection,
            "A fact.",
            MockReply::Value(json!({"verdict": "yes"})),
        );
        let policy = fast_policy(3);

        let failure = RetryingCall::<SelectionContract>::new(&policy, Duration::from_secs(1))
            .run(&judge, &request("A fact."))
            .await
            .unwrap_err();

        assert_eq!(failure.kind, SentenceFailureKind::JudgmentSchemaViolation);
        assert_eq!(failure.attempts, 3);
        assert_eq!(judge.call_count(), 3);
    }

    #[tokio::test]
    async fn test_api_error_is_not_retried() {
        let judge = MockJudge::new().reply(
            Stage::Selection,
            "A fact.",
            MockReply::ApiError("invalid model".into()),
        );
        let policy = fast_policy(5);

        let failure = RetryingCall::<SelectionContract>::new(&policy, Duration::from_secs(1))
            .run(&judge, &request("A fact."))
            .await
            .unwrap_err();

        assert_eq!(failure.kind, SentenceFailureKind::ProviderError);
        assert_eq!(failure.attempts, 1);
    }

    #[tokio::test]
    async fn test_refusal_is_returned_immediately() {
        let judge = MockJudge::new().refuse(Stage::Selection, "A fact.", "I can't help with that.");
        let policy = fast_policy(3);

        let answered = RetryingCall::<SelectionContract>::new(&policy, Duration::from_secs(1))
            .run(&judge, &request("A fact."))
            .await
            .unwrap();

        assert_eq!(answered.attempts, 1);
        assert_eq!(answered.reply, Reply::Refused("I can't help with that.".into()));
    }

    #[tokio::test]
    async fn test_timeout_counts_as_transient() {
        let judge = MockJudge::new().with_delay("Slow fact.", Duration::from_millis(200));
        let policy = fast_policy(2);

        let failure = RetryingCall::<SelectionContract>::new(&policy, Duration::from_millis(10))
            .run(&judge, &request("Slow fact."))
            .await
            .unwrap_err();

        assert_eq!(failure.kind, SentenceFailureKind::TransientExhausted);
        assert_eq!(failure.attempts, 2);
        assert!(failure.message.contains("timed out"));
    }
}
