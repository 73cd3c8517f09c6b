//! The pipeline orchestrator - main entry point for claim extraction.
//!
//! Each sentence runs its own state machine:
//!
//! ```text
//! CANDIDATE -> REJECTED
//!           -> SELECTED -> UNRESOLVABLE
//!                       -> RESOLVED -> claims emitted
//! ```
//!
//! Sentences run concurrently up to `max_concurrency`; stages within one
//! sentence run in order. Every sentence writes only to its own slot, and
//! the run is assembled from the slots in document order once all sentences
//! finish or the run is cancelled.

use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::sync::{Mutex, PoisonError};
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, Instrument};
use uuid::Uuid;

use crate::error::Result;
use crate::pipeline::decomposition::decompose;
use crate::pipeline::disambiguation::disambiguate;
use crate::pipeline::prompts::prompt_fingerprint;
use crate::pipeline::segment::segment;
use crate::pipeline::selection::select;
use crate::pipeline::stage::StageEnv;
use crate::pipeline::window::WindowBuilder;
use crate::tokenizers::RuleTokenizer;
use crate::traits::judge::Judge;
use crate::traits::tokenizer::Tokenizer;
use crate::types::config::PipelineConfig;
use crate::types::decision::{Claim, DisambiguationResult, SelectionResult, Stage};
use crate::types::run::{PipelineRun, SentenceFailure, SentenceFailureKind};
use crate::types::sentence::{ContextWindow, Sentence};

/// Claim extraction pipeline.
///
/// # Example
///
/// ```rust,ignore
/// use claimify::{Claimify, PipelineConfig};
/// use claimify::testing::MockJudge;
///
/// let pipeline = Claimify::new(MockJudge::new())
///     .with_config(PipelineConfig::default().with_max_concurrency(8));
///
/// let run = pipeline.extract("Apple Inc. was founded in 1976.", Some("en")).await?;
/// for claim in run.claim_texts() {
///     println!("{}", claim);
/// }
/// ```
pub struct Claimify<J: Judge, T: Tokenizer = RuleTokenizer> {
    judge: J,
    tokenizer: T,
    config: PipelineConfig,
}

impl<J: Judge> Claimify<J, RuleTokenizer> {
    /// Create a pipeline with the rule-based tokenizer and default config.
    pub fn new(judge: J) -> Self {
        Self {
            judge,
            tokenizer: RuleTokenizer::default(),
            config: PipelineConfig::default(),
        }
    }
}

impl<J: Judge, T: Tokenizer> Claimify<J, T> {
    /// Swap the tokenizer.
    pub fn with_tokenizer<U: Tokenizer>(self, tokenizer: U) -> Claimify<J, U> {
        Claimify {
            judge: self.judge,
            tokenizer,
            config: self.config,
        }
    }

    /// Replace the configuration.
    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Get a reference to the configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Get a reference to the judge.
    pub fn judge(&self) -> &J {
        &self.judge
    }

    /// Extract claims from one document.
    ///
    /// `language_hint` only helps the tokenizer and the judge; it never
    /// causes translation. Fails only on invalid configuration, tokenizer
    /// failure, or an internal window error; everything else is recorded
    /// per sentence in the returned run.
    pub async fn extract(&self, text: &str, language_hint: Option<&str>) -> Result<PipelineRun> {
        self.extract_with_cancel(text, language_hint, CancellationToken::new())
            .await
    }

    /// Like [`extract`](Self::extract), stopping early when `cancel` fires.
    ///
    /// In-flight sentences are abandoned; everything already decided is kept
    /// and unfinished sentences are reported as
    /// [`SentenceFailureKind::Cancelled`].
    pub async fn extract_with_cancel(
        &self,
        text: &str,
        language_hint: Option<&str>,
        cancel: CancellationToken,
    ) -> Result<PipelineRun> {
        self.config.validate()?;

        let run_id = Uuid::now_v7();
        let started_at = Utc::now();
        let timer = Instant::now();

        let sentences = segment(
            &self.tokenizer,
            text,
            language_hint,
            self.config.filter_formatting_artifacts,
        )?
        .into_vec();

        let builder = WindowBuilder::new(self.config.preceding, self.config.following);
        let windows = (0..sentences.len())
            .map(|index| builder.window(&sentences, index))
            .collect::<Result<Vec<ContextWindow<'_>>>>()?;

        debug!(
            run_id = %run_id,
            sentences = sentences.len(),
            max_concurrency = self.config.max_concurrency,
            "Starting claim extraction"
        );

        let env = StageEnv::new(&self.judge, &self.config, language_hint);
        let slots: Vec<Mutex<SentenceSlot>> = sentences
            .iter()
            .map(|_| Mutex::new(SentenceSlot::default()))
            .collect();

        let mut cancelled = false;
        {
            let mut pending = stream::iter(sentences.iter().zip(windows.iter()).zip(slots.iter()))
                .map(|((sentence, window), slot)| {
                    process_sentence(env, sentence, window, slot)
                        .instrument(info_span!("sentence", index = sentence.index))
                })
                .buffer_unordered(self.config.max_concurrency);

            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        cancelled = true;
                        break;
                    }
                    next = pending.next() => {
                        if next.is_none() {
                            break;
                        }
                    }
                }
            }
        }

        let mut run = PipelineRun {
            run_id,
            started_at,
            finished_at: started_at,
            language_hint: language_hint.map(str::to_string),
            sentences: Vec::new(),
            selections: Default::default(),
            disambiguations: Default::default(),
            claims: Vec::new(),
            failures: Vec::new(),
            cancelled,
            prompt_fingerprint: prompt_fingerprint(),
        };

        for (index, slot) in slots.into_iter().enumerate() {
            let slot = slot.into_inner().unwrap_or_else(PoisonError::into_inner);
            slot.collect_into(index, &mut run);
        }

        run.sentences = sentences;
        run.finished_at = Utc::now();

        info!(
            run_id = %run.run_id,
            sentences = run.sentences.len(),
            selected = run.selections.values().filter(|s| s.is_selected()).count(),
            resolved = run.disambiguations.values().filter(|d| d.is_resolved()).count(),
            claims = run.claims.len(),
            failures = run.failures.len(),
            cancelled = run.cancelled,
            duration_ms = timer.elapsed().as_millis() as u64,
            "Claim extraction complete"
        );

        Ok(run)
    }
}

/// Per-sentence results, written only by that sentence's task.
#[derive(Debug, Default)]
struct SentenceSlot {
    selection: Option<SelectionResult>,
    disambiguation: Option<DisambiguationResult>,
    claims: Vec<Claim>,
    failures: Vec<SentenceFailure>,
    finished: bool,
}

impl SentenceSlot {
    /// Stage an unfinished sentence was waiting on; `None` if no stage had
    /// answered yet.
    fn pending_stage(&self) -> Option<Stage> {
        match (&self.selection, &self.disambiguation) {
            (None, _) => None,
            (Some(_), None) => Some(Stage::Disambiguation),
            (Some(_), Some(_)) => Some(Stage::Decomposition),
        }
    }

    fn collect_into(mut self, index: usize, run: &mut PipelineRun) {
        if !self.finished {
            self.failures.push(SentenceFailure::new(
                index,
                self.pending_stage(),
                SentenceFailureKind::Cancelled,
                "run cancelled before the sentence finished",
            ));
        }

        if let Some(selection) = self.selection {
            run.selections.insert(index, selection);
        }
        if let Some(disambiguation) = self.disambiguation {
            run.disambiguations.insert(index, disambiguation);
        }
        run.claims.extend(self.claims);
        run.failures.extend(self.failures);
    }
}

fn with_slot(slot: &Mutex<SentenceSlot>, update: impl FnOnce(&mut SentenceSlot)) {
    let mut guard = slot.lock().unwrap_or_else(PoisonError::into_inner);
    update(&mut guard);
}

/// Run one sentence through the stages, recording each result as soon as
/// it is known.
async fn process_sentence<J: Judge + ?Sized>(
    env: StageEnv<'_, J>,
    sentence: &Sentence,
    window: &ContextWindow<'_>,
    slot: &Mutex<SentenceSlot>,
) {
    let finish = |failure: Option<SentenceFailure>| {
        with_slot(slot, |s| {
            s.failures.extend(failure);
            s.finished = true;
        })
    };

    let selection = match select(&env, sentence, window).await {
        Ok(outcome) => outcome,
        Err(failure) => return finish(Some(failure)),
    };
    let selected = selection.result.is_selected();
    with_slot(slot, |s| {
        s.selection = Some(selection.result);
        s.failures.extend(selection.failure);
    });
    if !selected {
        return finish(None);
    }

    let disambiguation = match disambiguate(&env, sentence, window).await {
        Ok(outcome) => outcome,
        Err(failure) => return finish(Some(failure)),
    };
    let resolved_text = disambiguation.result.resolved_text().map(str::to_string);
    with_slot(slot, |s| {
        s.disambiguation = Some(disambiguation.result);
        s.failures.extend(disambiguation.failure);
    });
    let Some(resolved_text) = resolved_text else {
        return finish(None);
    };

    match decompose(&env, sentence, window, &resolved_text).await {
        Ok(outcome) => {
            with_slot(slot, |s| s.claims = outcome.result);
            finish(outcome.failure)
        }
        Err(failure) => finish(Some(failure)),
    }
}
