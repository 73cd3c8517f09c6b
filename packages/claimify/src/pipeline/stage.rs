//! Shared plumbing for the three judgment stages.

use crate::pipeline::contract::ResponseContract;
use crate::pipeline::retry::{Answered, RetryingCall};
use crate::traits::judge::{Judge, JudgeRequest};
use crate::types::config::PipelineConfig;
use crate::types::decision::Stage;
use crate::types::run::{SentenceFailure, SentenceFailureKind};
use crate::types::sentence::Sentence;

/// Everything a stage needs besides the sentence itself.
pub struct StageEnv<'a, J: ?Sized> {
    pub judge: &'a J,
    pub config: &'a PipelineConfig,
    pub language_hint: Option<&'a str>,
}

// Manual impls: derive would require `J: Clone`.
impl<J: ?Sized> Clone for StageEnv<'_, J> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<J: ?Sized> Copy for StageEnv<'_, J> {}

impl<'a, J: Judge + ?Sized> StageEnv<'a, J> {
    pub fn new(judge: &'a J, config: &'a PipelineConfig, language_hint: Option<&'a str>) -> Self {
        Self {
            judge,
            config,
            language_hint,
        }
    }

    pub fn question(&self) -> Option<&'a str> {
        self.config.question.as_deref()
    }

    /// Build a request for `sentence` under contract `C`.
    pub fn request<C: ResponseContract>(
        &self,
        stage: Stage,
        sentence: &Sentence,
        subject: &str,
        system_prompt: &str,
        user_prompt: String,
    ) -> JudgeRequest {
        JudgeRequest {
            stage,
            sentence_index: sentence.index,
            subject: subject.to_string(),
            system_prompt: system_prompt.to_string(),
            user_prompt,
            schema_name: C::NAME,
            schema: C::schema(),
        }
    }

    /// Run one request with the configured retry policy and timeout.
    ///
    /// A failed call becomes a [`SentenceFailure`] for `stage`.
    pub async fn call<C: ResponseContract>(
        &self,
        request: &JudgeRequest,
    ) -> Result<Answered<C::Output>, SentenceFailure> {
        RetryingCall::<C>::new(&self.config.retry, self.config.call_timeout)
            .run(self.judge, request)
            .await
            .map_err(|failure| {
                SentenceFailure::new(request.sentence_index, Some(request.stage), failure.kind, failure.message)
                    .with_attempts(failure.attempts)
            })
    }
}

/// A stage result plus a non-fatal failure to record alongside it
/// (a refusal, or a zero-claim decomposition).
#[derive(Debug, Clone)]
pub struct StageOutcome<T> {
    pub result: T,
    pub failure: Option<SentenceFailure>,
}

impl<T> StageOutcome<T> {
    pub fn clean(result: T) -> Self {
        Self { result, failure: None }
    }

    pub fn refused(result: T, sentence_index: usize, stage: Stage, reason: String, attempts: u32) -> Self {
        Self {
            result,
            failure: Some(
                SentenceFailure::new(sentence_index, Some(stage), SentenceFailureKind::JudgmentRefusal, reason)
                    .with_attempts(attempts),
            ),
        }
    }
}
