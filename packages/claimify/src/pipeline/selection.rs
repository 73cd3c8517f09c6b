//! Selection stage: keep only sentences with verifiable content.

use tracing::{debug, warn};

use crate::pipeline::contract::{ResponseContract, SelectionContract, SelectionOutcome};
use crate::pipeline::prompts::{format_sentence_prompt, SELECTION_SYSTEM_PROMPT};
use crate::pipeline::retry::Reply;
use crate::pipeline::stage::{StageEnv, StageOutcome};
use crate::traits::judge::Judge;
use crate::types::decision::{SelectionDecision, SelectionResult, Stage};
use crate::types::run::SentenceFailure;
use crate::types::sentence::{ContextWindow, Sentence};

/// Rationale recorded when the judge refuses.
pub const REFUSED_RATIONALE: &str = "refused";

/// Classify one sentence as SELECTED or REJECTED.
///
/// A refusal becomes REJECTED with rationale `"refused"` and is reported
/// in [`StageOutcome::failure`]. The sentence is never modified.
pub async fn select<J: Judge + ?Sized>(
    env: &StageEnv<'_, J>,
    sentence: &Sentence,
    window: &ContextWindow<'_>,
) -> Result<StageOutcome<SelectionResult>, SentenceFailure> {
    let user_prompt = format_sentence_prompt(env.question(), window, sentence, env.language_hint);
    let request = env.request::<SelectionContract>(
        Stage::Selection,
        sentence,
        &sentence.text,
        SELECTION_SYSTEM_PROMPT,
        user_prompt,
    );

    let answered = env.call::<SelectionContract>(&request).await?;

    let outcome = match answered.reply {
        Reply::Answer(SelectionOutcome::Selected { rationale }) => StageOutcome::clean(SelectionResult {
            sentence_index: sentence.index,
            decision: SelectionDecision::Selected,
            rationale,
        }),
        Reply::Answer(SelectionOutcome::Rejected { rationale }) => StageOutcome::clean(SelectionResult {
            sentence_index: sentence.index,
            decision: SelectionDecision::Rejected,
            rationale,
        }),
        Reply::Refused(reason) => {
            warn!(
                sentence_index = sentence.index,
                stage = %Stage::Selection,
                reason = %reason,
                "Judge refused, treating sentence as rejected"
            );
            StageOutcome::refused(
                SelectionResult {
                    sentence_index: sentence.index,
                    decision: SelectionDecision::Rejected,
                    rationale: Some(REFUSED_RATIONALE.to_string()),
                },
                sentence.index,
                Stage::Selection,
                reason,
                answered.attempts,
            )
        }
    };

    debug!(
        sentence_index = sentence.index,
        decision = ?outcome.result.decision,
        attempts = answered.attempts,
        contract = SelectionContract::NAME,
        "Selection decided"
    );

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockJudge;
    use crate::types::config::PipelineConfig;
    use crate::types::run::SentenceFailureKind;
    use crate::types::sentence::CharSpan;

    fn sentence(text: &str) -> Sentence {
        Sentence::new(0, text, CharSpan::new(0, text.len()))
    }

    fn lone(sentence: &Sentence) -> ContextWindow<'_> {
        ContextWindow {
            target_index: sentence.index,
            preceding: &[],
            following: &[],
        }
    }

    #[tokio::test]
    async fn test_selected_sentence() {
        let judge = MockJudge::new().select("Apple was founded in 1976.");
        let config = PipelineConfig::default();
        let env = StageEnv::new(&judge, &config, None);
        let s = sentence("Apple was founded in 1976.");

        let outcome = select(&env, &s, &lone(&s)).await.unwrap();
        assert!(outcome.result.is_selected());
        assert!(outcome.failure.is_none());
    }

    #[tokio::test]
    async fn test_refusal_is_rejected_with_rationale() {
        let judge = MockJudge::new().refuse(Stage::Selection, "Some sentence.", "Cannot comply.");
        let config = PipelineConfig::default();
        let env = StageEnv::new(&judge, &config, None);
        let s = sentence("Some sentence.");

        let outcome = select(&env, &s, &lone(&s)).await.unwrap();
        assert_eq!(outcome.result.decision, SelectionDecision::Rejected);
        assert_eq!(outcome.result.rationale.as_deref(), Some(REFUSED_RATIONALE));

        let failure = outcome.failure.unwrap();
        assert_eq!(failure.kind, SentenceFailureKind::JudgmentRefusal);
        assert_eq!(failure.message, "Cannot comply.");
    }

    #[tokio::test]
    async fn test_request_carries_question_and_schema() {
        let judge = MockJudge::new();
        let config = PipelineConfig::default().with_question("When was Apple founded?");
        let env = StageEnv::new(&judge, &config, Some("en"));
        let s = sentence("Apple was founded in 1976.");

        select(&env, &s, &lone(&s)).await.unwrap();

        let requests = judge.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].schema_name, "selection_response");
        assert!(requests[0].user_prompt.contains("When was Apple founded?"));
        assert!(requests[0].schema["properties"].get("decision").is_some());
    }
}
