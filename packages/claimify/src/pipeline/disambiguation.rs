//! Disambiguation stage: rewrite a selected sentence so it stands alone,
//! or give up on it.

use tracing::{debug, warn};

use crate::pipeline::contract::{DisambiguationContract, DisambiguationOutcome, ResponseContract};
use crate::pipeline::prompts::{format_sentence_prompt, DISAMBIGUATION_SYSTEM_PROMPT};
use crate::pipeline::retry::Reply;
use crate::pipeline::stage::{StageEnv, StageOutcome};
use crate::traits::judge::Judge;
use crate::types::decision::{DisambiguationResult, Stage};
use crate::types::run::SentenceFailure;
use crate::types::sentence::{ContextWindow, Sentence};

/// Resolve the ambiguities of a SELECTED sentence from its window.
///
/// The window must come from the original sentence sequence. A refusal
/// becomes UNRESOLVABLE and is reported in [`StageOutcome::failure`].
pub async fn disambiguate<J: Judge + ?Sized>(
    env: &StageEnv<'_, J>,
    sentence: &Sentence,
    window: &ContextWindow<'_>,
) -> Result<StageOutcome<DisambiguationResult>, SentenceFailure> {
    let user_prompt = format_sentence_prompt(env.question(), window, sentence, env.language_hint);
    let request = env.request::<DisambiguationContract>(
        Stage::Disambiguation,
        sentence,
        &sentence.text,
        DISAMBIGUATION_SYSTEM_PROMPT,
        user_prompt,
    );

    let answered = env.call::<DisambiguationContract>(&request).await?;

    let outcome = match answered.reply {
        Reply::Answer(DisambiguationOutcome::Resolved { text, rationale }) => {
            StageOutcome::clean(DisambiguationResult::resolved(sentence.index, text, rationale))
        }
        Reply::Answer(DisambiguationOutcome::Unresolvable { rationale }) => {
            StageOutcome::clean(DisambiguationResult::unresolvable(sentence.index, rationale))
        }
        Reply::Refused(reason) => {
            warn!(
                sentence_index = sentence.index,
                stage = %Stage::Disambiguation,
                reason = %reason,
                "Judge refused, treating sentence as unresolvable"
            );
            StageOutcome::refused(
                DisambiguationResult::unresolvable(sentence.index, None),
                sentence.index,
                Stage::Disambiguation,
                reason,
                answered.attempts,
            )
        }
    };

    debug!(
        sentence_index = sentence.index,
        decision = ?outcome.result.decision(),
        rewritten = outcome
            .result
            .resolved_text()
            .is_some_and(|text| text != sentence.text),
        attempts = answered.attempts,
        contract = DisambiguationContract::NAME,
        "Disambiguation decided"
    );

    Ok(outcome)
}
