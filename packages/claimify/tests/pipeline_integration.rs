//! Integration tests for the full claim extraction pipeline.
//!
//! These tests drive `Claimify::extract` end to end with a scripted judge:
//! 1. Segment the document
//! 2. Select, disambiguate and decompose every sentence
//! 3. Aggregate claims and per-sentence failures

use claimify::{
    testing::{MockJudge, MockReply, MockTokenizer},
    Claimify, ClaimifyError, PipelineConfig, RetryPolicy, SentenceFailureKind, SentenceState,
    Stage,
};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const APPLE: &str = "Apple Inc. was founded in 1976 by Steve Jobs, Steve Wozniak, and Ronald Wayne.";
const OPINION: &str = "The company is incredibly innovative.";
const FLAG: &str = "The American flag contains 50 stars and 13 stripes.";

/// Helper for a config with near-instant retries.
fn fast_config() -> PipelineConfig {
    PipelineConfig::default().with_retry(
        RetryPolicy::default().with_backoff(Duration::from_millis(1), Duration::from_millis(5)),
    )
}

#[tokio::test]
async fn test_empty_input_yields_empty_run() {
    let judge = MockJudge::new();
    let pipeline = Claimify::new(judge.clone());

    for text in ["", "   \n\n\t  "] {
        let run = pipeline.extract(text, None).await.unwrap();
        assert!(run.sentences.is_empty());
        assert!(run.claim_texts().is_empty());
        assert!(run.is_clean());
    }
    assert_eq!(judge.call_count(), 0);
}

#[tokio::test]
async fn test_all_rejected_is_a_successful_run() {
    let judge = MockJudge::new();
    let pipeline = Claimify::new(judge.clone());

    let run = pipeline
        .extract("Is this any good? What do you think?", None)
        .await
        .unwrap();

    assert_eq!(run.sentences.len(), 2);
    assert!(run.claims.is_empty());
    assert!(run.failures.is_empty());
    assert_eq!(run.state(0), Some(SentenceState::Rejected));
    assert_eq!(run.state(1), Some(SentenceState::Rejected));
    assert_eq!(judge.calls_for(Stage::Disambiguation), 0);
    assert_eq!(judge.calls_for(Stage::Decomposition), 0);
}

#[tokio::test]
async fn test_flag_sentence_is_decomposed() {
    let resolved = "The American flag contains 50 stars [representing the 50 states] and 13 stripes.";
    let judge = MockJudge::new()
        .select(FLAG)
        .resolve(FLAG, resolved)
        .decompose(
            resolved,
            [
                "The American flag contains 50 stars [representing the 50 states].",
                "The American flag contains 13 stripes.",
            ],
        );
    let pipeline = Claimify::new(judge);

    let run = pipeline.extract(FLAG, Some("en")).await.unwrap();

    assert_eq!(run.state(0), Some(SentenceState::Decomposed));
    assert!(run.selections[&0].is_selected());
    assert_eq!(run.disambiguations[&0].resolved_text(), Some(resolved));

    let claims = run.claim_texts();
    assert!(!claims.is_empty());
    assert!(claims.iter().any(|c| c.contains("50 stars")));
    assert!(claims.iter().any(|c| c.contains("13 stripes")));
    assert!(run.is_clean());
}

#[tokio::test]
async fn test_apple_opinion_sentence_is_rejected() {
    let text = format!("{} {}", APPLE, OPINION);
    let judge = MockJudge::new()
        .reject(OPINION)
        .decompose(
            APPLE,
            ["Apple Inc. was founded in 1976 by Steve Jobs, Steve Wozniak, and Ronald Wayne."],
        );
    let pipeline = Claimify::new(judge.clone());

    let run = pipeline.extract(&text, None).await.unwrap();

    assert_eq!(run.sentences.len(), 2);
    assert_eq!(run.sentences[0].text, APPLE);
    assert_eq!(run.sentences[1].text, OPINION);

    assert_eq!(run.state(0), Some(SentenceState::Decomposed));
    assert_eq!(run.state(1), Some(SentenceState::Rejected));
    assert_eq!(run.claims_for(1).count(), 0);

    let claims = run.claim_texts();
    assert_eq!(claims.len(), 1);
    for name in ["Steve Jobs", "Steve Wozniak", "Ronald Wayne", "1976"] {
        assert!(claims[0].contains(name), "claim lost {}", name);
    }

    // The rejected sentence never reaches later stages
    let later: Vec<_> = judge
        .calls()
        .into_iter()
        .filter(|c| c.stage != Stage::Selection)
        .collect();
    assert!(later.iter().all(|c| c.sentence_index == 0));
}

#[tokio::test]
async fn test_disambiguation_refusal_is_listed_not_fatal() {
    let text = "Apple Inc. was founded in 1976. It moved to Cupertino.";
    let judge = MockJudge::new().refuse(
        Stage::Disambiguation,
        "It moved to Cupertino.",
        "I can't help with that.",
    );
    let pipeline = Claimify::new(judge);

    let run = pipeline.extract(text, None).await.unwrap();

    assert_eq!(run.state(1), Some(SentenceState::Unresolvable));
    assert_eq!(run.claims_for(1).count(), 0);
    assert_eq!(run.claim_texts(), vec!["Apple Inc. was founded in 1976."]);

    assert_eq!(run.failed_indices(), vec![1]);
    let failure = &run.failures[0];
    assert_eq!(failure.kind, SentenceFailureKind::JudgmentRefusal);
    assert_eq!(failure.stage, Some(Stage::Disambiguation));
    assert!(!run.is_clean());
}

#[tokio::test]
async fn test_extract_is_idempotent() {
    let text = format!("{} {}\n{}", APPLE, OPINION, FLAG);
    let judge = MockJudge::new().reject(OPINION);
    let pipeline = Claimify::new(judge);

    let first = pipeline.extract(&text, None).await.unwrap();
    let second = pipeline.extract(&text, None).await.unwrap();

    assert_eq!(first.claim_texts(), second.claim_texts());
    assert_eq!(first.claims, second.claims);
    assert_eq!(first.prompt_fingerprint, second.prompt_fingerprint);
    assert_ne!(first.run_id, second.run_id);
}

#[tokio::test]
async fn test_claims_keep_document_order_under_concurrency() {
    let sentences = [
        "Mercury is the closest planet to the Sun.",
        "Venus is the hottest planet.",
        "Earth has one natural satellite.",
        "Mars has two moons.",
        "Jupiter is the largest planet.",
    ];
    let text = sentences.join(" ");

    // Early sentences finish last
    let judge = MockJudge::new()
        .with_delay(sentences[0], Duration::from_millis(60))
        .with_delay(sentences[1], Duration::from_millis(30))
        .decompose(sentences[2], ["Earth has a satellite.", "The satellite is natural."]);
    let pipeline = Claimify::new(judge).with_config(fast_config().with_max_concurrency(5));

    let run = pipeline.extract(&text, None).await.unwrap();

    assert_eq!(run.claims.len(), 6);
    let keys: Vec<_> = run.claims.iter().map(|c| c.order_key()).collect();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);
    assert_eq!(run.claims[2].text, "Earth has a satellite.");
    assert_eq!(run.claims[3].text, "The satellite is natural.");
}

#[tokio::test]
async fn test_transient_failures_are_retried() {
    let judge = MockJudge::new().fail_transiently(Stage::Selection, FLAG, 2);
    let pipeline = Claimify::new(judge.clone()).with_config(fast_config());

    let run = pipeline.extract(FLAG, None).await.unwrap();

    assert!(run.is_clean());
    assert_eq!(run.claim_texts(), vec![FLAG]);
    assert_eq!(judge.calls_for(Stage::Selection), 3);
}

#[tokio::test]
async fn test_schema_violations_exhaust_into_sentence_failure() {
    let text = format!("{} {}", FLAG, APPLE);
    let judge = MockJudge::new().reply(
        Stage::Disambiguation,
        FLAG,
        MockReply::Value(serde_json::json!({"decision": "PROBABLY"})),
    );
    let pipeline = Claimify::new(judge.clone()).with_config(fast_config());

    let run = pipeline.extract(&text, None).await.unwrap();

    assert_eq!(run.failed_indices(), vec![0]);
    let failure = &run.failures[0];
    assert_eq!(failure.kind, SentenceFailureKind::JudgmentSchemaViolation);
    assert_eq!(failure.stage, Some(Stage::Disambiguation));
    assert_eq!(failure.attempts, 3);

    assert_eq!(run.state(0), Some(SentenceState::Selected));
    assert_eq!(run.claims_for(0).count(), 0);
    assert_eq!(run.claim_texts(), vec![APPLE]);
}

#[tokio::test]
async fn test_transient_exhaustion_is_not_fatal() {
    let judge = MockJudge::new().reply(
        Stage::Selection,
        FLAG,
        MockReply::Transient("503 Service Unavailable".into()),
    );
    let config = fast_config().with_retry(
        RetryPolicy::default()
            .with_max_attempts(2)
            .with_backoff(Duration::from_millis(1), Duration::from_millis(1)),
    );
    let pipeline = Claimify::new(judge).with_config(config);

    let run = pipeline.extract(FLAG, None).await.unwrap();

    assert_eq!(run.failures.len(), 1);
    assert_eq!(run.failures[0].kind, SentenceFailureKind::TransientExhausted);
    assert_eq!(run.failures[0].attempts, 2);
    assert_eq!(run.state(0), Some(SentenceState::Candidate));
}

#[tokio::test]
async fn test_provider_error_is_not_retried() {
    let judge = MockJudge::new().reply(
        Stage::Decomposition,
        FLAG,
        MockReply::ApiError("400 invalid schema".into()),
    );
    let pipeline = Claimify::new(judge.clone()).with_config(fast_config());

    let run = pipeline.extract(FLAG, None).await.unwrap();

    assert_eq!(run.failures[0].kind, SentenceFailureKind::ProviderError);
    assert_eq!(judge.calls_for(Stage::Decomposition), 1);
    assert_eq!(run.state(0), Some(SentenceState::Resolved));
}

#[tokio::test]
async fn test_cancellation_returns_partial_run() {
    let slow = "Slow sentence about Saturn.";
    let text = format!("Water boils at 100 degrees Celsius. The Eiffel Tower is in Paris. {}", slow);
    let judge = MockJudge::new().with_delay(slow, Duration::from_secs(10));
    let pipeline = Claimify::new(judge);

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let run = pipeline
        .extract_with_cancel(&text, None, cancel)
        .await
        .unwrap();

    assert!(run.cancelled);
    assert_eq!(run.claims.len(), 2);
    assert_eq!(run.state(0), Some(SentenceState::Decomposed));
    assert_eq!(run.state(1), Some(SentenceState::Decomposed));

    assert_eq!(run.failed_indices(), vec![2]);
    assert_eq!(run.failures[0].kind, SentenceFailureKind::Cancelled);
    assert_eq!(run.failures[0].stage, None);
    assert_eq!(run.state(2), Some(SentenceState::Candidate));
}

#[tokio::test]
async fn test_segmentation_failure_is_fatal() {
    let pipeline = Claimify::new(MockJudge::new()).with_tokenizer(MockTokenizer::failing("no model"));

    let err = pipeline.extract("Some text.", None).await.unwrap_err();
    assert!(matches!(err, ClaimifyError::Segmentation(_)));
}

#[tokio::test]
async fn test_invalid_config_is_rejected() {
    let pipeline =
        Claimify::new(MockJudge::new()).with_config(PipelineConfig::default().with_max_concurrency(0));

    let err = pipeline.extract(FLAG, None).await.unwrap_err();
    assert!(matches!(err, ClaimifyError::Config(_)));
}

#[tokio::test]
async fn test_zero_claims_is_logged_as_anomaly() {
    let judge = MockJudge::new().decompose(FLAG, Vec::<String>::new());
    let pipeline = Claimify::new(judge);

    let run = pipeline.extract(FLAG, None).await.unwrap();

    assert!(run.claims.is_empty());
    assert_eq!(run.state(0), Some(SentenceState::Decomposed));
    assert_eq!(run.failures[0].kind, SentenceFailureKind::EmptyDecomposition);
}

#[tokio::test]
async fn test_context_comes_from_original_sentences() {
    let first = "Apple Inc. was founded in 1976.";
    let second = "It moved to Cupertino.";
    let text = format!("{} {}", first, second);
    let judge = MockJudge::new().resolve(first, "Apple Inc. [REWRITTEN] was founded in 1976.");
    let pipeline = Claimify::new(judge.clone());

    pipeline.extract(&text, None).await.unwrap();

    let request = judge
        .requests()
        .into_iter()
        .find(|r| r.stage == Stage::Disambiguation && r.sentence_index == 1)
        .unwrap();
    assert!(request.user_prompt.contains(first));
    assert!(!request.user_prompt.contains("[REWRITTEN]"));
}

#[tokio::test]
async fn test_question_and_language_reach_every_prompt() {
    let judge = MockJudge::new();
    let config = PipelineConfig::default().with_question("How many stars are on the flag?");
    let pipeline = Claimify::new(judge.clone()).with_config(config);

    pipeline.extract(FLAG, Some("en-US")).await.unwrap();

    let requests = judge.requests();
    assert_eq!(requests.len(), 3);
    for request in requests {
        assert!(request.user_prompt.contains("How many stars are on the flag?"));
        assert!(request.user_prompt.contains("en-US"));
    }
}

#[tokio::test]
async fn test_source_language_is_preserved() {
    let text = "Die Zugspitze ist 2962 Meter hoch.";
    let pipeline = Claimify::new(MockJudge::new());

    let run = pipeline.extract(text, Some("de")).await.unwrap();

    assert_eq!(run.claim_texts(), vec![text]);
    assert_eq!(run.language_hint.as_deref(), Some("de"));
}

#[tokio::test]
async fn test_report_serializes_diagnostics() {
    let text = format!("{} {}", APPLE, OPINION);
    let pipeline = Claimify::new(MockJudge::new().reject(OPINION));

    let run = pipeline.extract(&text, None).await.unwrap();
    let report = serde_json::to_value(run.report()).unwrap();

    assert_eq!(report["claims"].as_array().unwrap().len(), 1);
    assert_eq!(report["sentences"][0]["state"], "DECOMPOSED");
    assert_eq!(report["sentences"][1]["state"], "REJECTED");
    assert_eq!(report["sentences"][1]["selection"]["decision"], "REJECTED");
    assert_eq!(report["cancelled"], false);
}

mod ordering_properties {
    use super::*;
    use proptest::prelude::*;

    /// What the judge does with one sentence.
    #[derive(Debug, Clone)]
    enum Script {
        Reject,
        Unresolvable,
        Claims(usize),
    }

    fn script() -> impl Strategy<Value = Script> {
        prop_oneof![
            Just(Script::Reject),
            Just(Script::Unresolvable),
            (0usize..4).prop_map(Script::Claims),
        ]
    }

    fn sentence_text(index: usize) -> String {
        format!("Sentence number {} states a fact.", index)
    }

    fn scripted_judge(scripts: &[(Script, u64)]) -> MockJudge {
        scripts
            .iter()
            .enumerate()
            .fold(MockJudge::new(), |judge, (index, (script, delay_ms))| {
                let text = sentence_text(index);
                let judge = judge.with_delay(text.clone(), Duration::from_millis(*delay_ms));
                match script {
                    Script::Reject => judge.reject(text),
                    Script::Unresolvable => judge.unresolvable(text),
                    Script::Claims(count) => {
                        let claims: Vec<String> = (0..*count)
                            .map(|order| format!("Claim {} of sentence {}.", order, index))
                            .collect();
                        judge.decompose(text, claims)
                    }
                }
            })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn claims_follow_document_order_and_filtering(
            scripts in prop::collection::vec((script(), 0u64..5), 1..8),
            max_concurrency in 1usize..6,
        ) {
            let text = (0..scripts.len())
                .map(sentence_text)
                .collect::<Vec<_>>()
                .join("\n");
            let pipeline = Claimify::new(scripted_judge(&scripts))
                .with_config(fast_config().with_max_concurrency(max_concurrency));

            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            let run = runtime.block_on(pipeline.extract(&text, None)).unwrap();

            prop_assert_eq!(run.sentences.len(), scripts.len());

            let keys: Vec<_> = run.claims.iter().map(|c| c.order_key()).collect();
            let mut sorted = keys.clone();
            sorted.sort();
            prop_assert_eq!(&keys, &sorted);

            for claim in &run.claims {
                let index = claim.source_sentence_index;
                prop_assert!(run.selections[&index].is_selected());
                prop_assert!(run.disambiguations[&index].is_resolved());
            }

            for (index, (script, _)) in scripts.iter().enumerate() {
                let emitted = run.claims_for(index).count();
                match script {
                    Script::Reject => {
                        prop_assert_eq!(run.state(index), Some(SentenceState::Rejected));
                        prop_assert_eq!(emitted, 0);
                    }
                    Script::Unresolvable => {
                        prop_assert_eq!(run.state(index), Some(SentenceState::Unresolvable));
                        prop_assert_eq!(emitted, 0);
                    }
                    Script::Claims(count) => {
                        prop_assert_eq!(run.state(index), Some(SentenceState::Decomposed));
                        prop_assert_eq!(emitted, *count);
                    }
                }
            }
        }
    }
}
