//! LLM prompts for the three judgment stages.
//!
//! System prompts carry the stage policy; user prompts carry the question,
//! the context excerpt and the sentence under judgment. Replies are
//! constrained by the stage's response schema, so the prompts describe
//! meaning, not JSON layout.

use sha2::{Digest, Sha256};

use crate::types::sentence::{ContextWindow, Sentence};

/// Shown when the caller supplies no question.
pub const NO_QUESTION: &str = "The user did not provide a question.";

/// Prompt for the selection stage.
pub const SELECTION_SYSTEM_PROMPT: &str = r#"You are an assistant that identifies sentences containing verifiable factual information.

You will receive a question, an excerpt from a text that answers it, and one sentence from that excerpt. Decide whether the sentence contains at least one specific, verifiable proposition.

Decide SELECTED when the sentence asserts something that could in principle be checked against an external source: events, dates, quantities, names, relations, measurements, attributions, definitions.

Decide REJECTED when the sentence is only:
- an opinion, judgment or value statement ("The company is incredibly innovative.")
- speculation, prediction or hypothetical
- a question, instruction, request or exclamation
- a heading, greeting, transition or other text without propositional content

A sentence that mixes opinion with a verifiable fact is SELECTED.

Use the excerpt only to understand the sentence. Judge the sentence itself, not its neighbours. Give a one-sentence rationale in the language of the sentence."#;

/// Prompt for the disambiguation stage.
pub const DISAMBIGUATION_SYSTEM_PROMPT: &str = r#"You are an assistant that makes sentences understandable without their surrounding text.

You will receive a question, an excerpt from a text, and one sentence from that excerpt. Find every ambiguity in the sentence:
- referential ambiguity: pronouns and other references whose target is unclear ("it", "they", "the company", "this")
- elliptical references: omitted subjects, objects or comparisons that the reader must supply
- structural ambiguity: the sentence can be parsed in more than one way (for example, unclear modifier attachment)

For each ambiguity, decide whether the question and excerpt make one reading clearly the intended one.
- If every ambiguity can be settled from the question and excerpt, decide RESOLVED and rewrite the sentence so it stands alone. Replace or annotate unclear references with what they refer to. Add inferred context in square brackets, for example "[Apple Inc.]". Keep all original wording otherwise.
- If any ambiguity cannot be settled from the question and excerpt, decide UNRESOLVABLE and give no rewrite. Do not guess. When the context is silent, UNRESOLVABLE is the correct answer.
- If the sentence has no ambiguity, decide RESOLVED and return it unchanged.

Use only information present in the question and excerpt. Never add facts that are not there. Never translate. Give a one-sentence rationale in the language of the sentence."#;

/// Prompt for the decomposition stage.
pub const DECOMPOSITION_SYSTEM_PROMPT: &str = r#"You are an assistant that splits a sentence into atomic, self-contained factual claims.

You will receive a question, an excerpt from a text, and one sentence that has already been made unambiguous. Return the list of claims the sentence makes.

Each claim must:
- state exactly one verifiable proposition
- be understandable on its own, without the excerpt; add necessary context from the excerpt in square brackets, for example "[representing the 50 states]"
- keep the wording and the language of the sentence; never translate
- contain only what the sentence states, without opinions or speculation it also contains

List claims in the order they appear in the sentence. Every sentence you receive contains at least one verifiable proposition, so return at least one claim."#;

/// Format the user prompt for selection and disambiguation.
pub fn format_sentence_prompt(
    question: Option<&str>,
    window: &ContextWindow<'_>,
    sentence: &Sentence,
    language_hint: Option<&str>,
) -> String {
    render(question, &window.excerpt(sentence), &sentence.text, language_hint)
}

/// Format the user prompt for decomposition.
///
/// The excerpt shows the original sentence in place; `resolved_text` is the
/// sentence to decompose.
pub fn format_decomposition_prompt(
    question: Option<&str>,
    window: &ContextWindow<'_>,
    sentence: &Sentence,
    resolved_text: &str,
    language_hint: Option<&str>,
) -> String {
    render(question, &window.excerpt(sentence), resolved_text, language_hint)
}

fn render(question: Option<&str>, excerpt: &str, sentence: &str, language_hint: Option<&str>) -> String {
    let question = question.filter(|q| !q.trim().is_empty()).unwrap_or(NO_QUESTION);
    let language = match language_hint {
        Some(hint) if !hint.trim().is_empty() => format!(
            "The document language is {}. Answer in the language of the sentence; never translate.",
            hint.trim()
        ),
        _ => "Answer in the language of the sentence; never translate.".to_string(),
    };

    format!(
        "Question:\n{}\n\nExcerpt:\n{}\n\nSentence:\n{}\n\n{}",
        question, excerpt, sentence, language
    )
}

/// Hash of every stage prompt, to tell runs made with different prompts apart.
pub fn prompt_fingerprint() -> String {
    let mut hasher = Sha256::new();
    hasher.update(SELECTION_SYSTEM_PROMPT.as_bytes());
    hasher.update(DISAMBIGUATION_SYSTEM_PROMPT.as_bytes());
    hasher.update(DECOMPOSITION_SYSTEM_PROMPT.as_bytes());
    format!("{:x}", hasher.finalize())
}
