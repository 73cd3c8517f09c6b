//! Decomposition stage: split a resolved sentence into atomic claims.

use tracing::{debug, warn};

use crate::pipeline::contract::{DecompositionContract, ResponseContract};
use crate::pipeline::prompts::{format_decomposition_prompt, DECOMPOSITION_SYSTEM_PROMPT};
use crate::pipeline::retry::Reply;
use crate::pipeline::stage::{StageEnv, StageOutcome};
use crate::traits::judge::Judge;
use crate::types::decision::{Claim, Stage};
use crate::types::run::{SentenceFailure, SentenceFailureKind};
use crate::types::sentence::{ContextWindow, Sentence};

/// Decompose `resolved_text` (the rewrite of `sentence`) into claims.
///
/// Claims keep the order the judge listed them in. Zero claims is an
/// anomaly: it is logged and reported as
/// [`SentenceFailureKind::EmptyDecomposition`], or as a refusal when the
/// judge refused.
pub async fn decompose<J: Judge + ?Sized>(
    env: &StageEnv<'_, J>,
    sentence: &Sentence,
    window: &ContextWindow<'_>,
    resolved_text: &str,
) -> Result<StageOutcome<Vec<Claim>>, SentenceFailure> {
    let user_prompt =
        format_decomposition_prompt(env.question(), window, sentence, resolved_text, env.language_hint);
    let request = env.request::<DecompositionContract>(
        Stage::Decomposition,
        sentence,
        resolved_text,
        DECOMPOSITION_SYSTEM_PROMPT,
        user_prompt,
    );

    let answered = env.call::<DecompositionContract>(&request).await?;

    let texts = match answered.reply {
        Reply::Answer(texts) => texts,
        Reply::Refused(reason) => {
            warn!(
                sentence_index = sentence.index,
                stage = %Stage::Decomposition,
                reason = %reason,
                "Judge refused, sentence yields no claims"
            );
            return Ok(StageOutcome::refused(
                Vec::new(),
                sentence.index,
                Stage::Decomposition,
                reason,
                answered.attempts,
            ));
        }
    };

    if texts.is_empty() {
        warn!(
            sentence_index = sentence.index,
            stage = %Stage::Decomposition,
            "Resolved sentence decomposed into zero claims"
        );
        return Ok(StageOutcome {
            result: Vec::new(),
            failure: Some(
                SentenceFailure::new(
                    sentence.index,
                    Some(Stage::Decomposition),
                    SentenceFailureKind::EmptyDecomposition,
                    "decomposition returned no claims",
                )
                .with_attempts(answered.attempts),
            ),
        });
    }

    let claims: Vec<Claim> = texts
        .into_iter()
        .enumerate()
        .map(|(order, text)| Claim::new(sentence.index, order, text))
        .collect();

    debug!(
        sentence_index = sentence.index,
        claims = claims.len(),
        attempts = answered.attempts,
        contract = DecompositionContract::NAME,
        "Decomposition complete"
    );

    Ok(StageOutcome::clean(claims))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockJudge;
    use crate::types::config::PipelineConfig;
    use crate::types::sentence::CharSpan;

    const FLAG: &str = "The American flag contains 50 stars and 13 stripes.";

    fn flag() -> Sentence {
        Sentence::new(3, FLAG, CharSpan::new(0, FLAG.len()))
    }

    fn lone(sentence: &Sentence) -> ContextWindow<'_> {
        ContextWindow {
            target_index: sentence.index,
            preceding: &[],
            following: &[],
        }
    }

    #[tokio::test]
    async fn test_claims_keep_reply_order() {
        let judge = MockJudge::new().decompose(
            FLAG,
            [
                "The American flag contains 50 stars [representing the 50 states].",
                "The American flag contains 13 stripes.",
            ],
        );
        let config = PipelineConfig::default();
        let env = StageEnv::new(&judge, &config, None);
        let s = flag();

        let outcome = decompose(&env, &s, &lone(&s), FLAG).await.unwrap();
        let claims = outcome.result;
        assert_eq!(claims.len(), 2);
        assert_eq!(claims[0].order_key(), (3, 0));
        assert_eq!(claims[1].order_key(), (3, 1));
        assert!(claims[0].text.contains("50 stars"));
        assert!(claims[1].text.contains("13 stripes"));
        assert!(outcome.failure.is_none());
    }

    #[tokio::test]
    async fn test_zero_claims_is_recorded() {
        let judge = MockJudge::new().decompose(FLAG, Vec::<String>::new());
        let config = PipelineConfig::default();
        let env = StageEnv::new(&judge, &config, None);
        let s = flag();

        let outcome = decompose(&env, &s, &lone(&s), FLAG).await.unwrap();
        assert!(outcome.result.is_empty());
        assert_eq!(outcome.failure.unwrap().kind, SentenceFailureKind::EmptyDecomposition);
    }

    #[tokio::test]
    async fn test_refusal_yields_no_claims() {
        let judge = MockJudge::new().refuse(Stage::Decomposition, FLAG, "Refusing.");
        let config = PipelineConfig::default();
        let env = StageEnv::new(&judge, &config, None);
        let s = flag();

        let outcome = decompose(&env, &s, &lone(&s), FLAG).await.unwrap();
        assert!(outcome.result.is_empty());
        assert_eq!(outcome.failure.unwrap().kind, SentenceFailureKind::JudgmentRefusal);
    }

    #[tokio::test]
    async fn test_subject_is_resolved_text() {
        let resolved = "It [the American flag] contains 50 stars.";
        let judge = MockJudge::new();
        let config = PipelineConfig::default();
        let env = StageEnv::new(&judge, &config, None);
        let s = flag();

        let outcome = decompose(&env, &s, &lone(&s), resolved).await.unwrap();
        assert_eq!(outcome.result[0].text, resolved);
        assert_eq!(judge.requests()[0].subject, resolved);
    }
}
