//! Sentence segmentation.
//!
//! Splits a document into lines, hands each non-blank line to the
//! [`Tokenizer`], and maps the returned spans back onto the document. A
//! newline always ends a sentence. Boundary detection inside a line is left
//! entirely to the tokenizer.
//!
//! Formatting policy: with `filter_artifacts` enabled, sentences that carry
//! no alphanumeric content once a leading list marker is removed (`"-"`,
//! `"•"`, `"1."`, `"(iv)"`, `"---"`) are dropped before indices are assigned,
//! so indices stay contiguous.

use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

use crate::error::{SegmentationError, SegmentationResult};
use crate::traits::tokenizer::Tokenizer;
use crate::types::sentence::{CharSpan, Sentence};

static RE_LIST_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:[-*•·–—+>]+|\(?(?:\d{1,3}|[A-Za-z]|[ivxlIVXL]{1,4})[.)])\s*").unwrap()
});

/// Segmenter output: an ordered, restartable sequence of sentences.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Segments {
    sentences: Vec<Sentence>,
}

impl Segments {
    /// Iterate the sentences in document order. Can be called any number of
    /// times; each call starts from the first sentence.
    pub fn iter(&self) -> std::slice::Iter<'_, Sentence> {
        self.sentences.iter()
    }

    pub fn len(&self) -> usize {
        self.sentences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sentences.is_empty()
    }

    pub fn as_slice(&self) -> &[Sentence] {
        &self.sentences
    }

    pub fn into_vec(self) -> Vec<Sentence> {
        self.sentences
    }
}

impl<'a> IntoIterator for &'a Segments {
    type Item = &'a Sentence;
    type IntoIter = std::slice::Iter<'a, Sentence>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl IntoIterator for Segments {
    type Item = Sentence;
    type IntoIter = std::vec::IntoIter<Sentence>;

    fn into_iter(self) -> Self::IntoIter {
        self.sentences.into_iter()
    }
}

/// Split `text` into sentences.
///
/// Empty or whitespace-only input yields an empty [`Segments`]. Fails only
/// when the tokenizer fails or returns spans that do not fit its input.
pub fn segment<T: Tokenizer + ?Sized>(
    tokenizer: &T,
    text: &str,
    language_hint: Option<&str>,
    filter_artifacts: bool,
) -> SegmentationResult<Segments> {
    let mut sentences = Vec::new();
    let mut dropped = 0usize;
    let mut line_offset = 0usize;

    for raw_line in text.split('\n') {
        let offset = line_offset;
        line_offset += raw_line.len() + 1;

        let line = raw_line.strip_suffix('\r').unwrap_or(raw_line);
        if line.trim().is_empty() {
            continue;
        }

        let spans = tokenizer.split(line, language_hint)?;
        let mut previous_end = 0;

        for span in spans {
            check_span(line, span, previous_end)?;
            previous_end = span.end;

            let piece = &line[span.start..span.end];
            let trimmed = piece.trim();
            if trimmed.is_empty() {
                continue;
            }

            if filter_artifacts && is_formatting_artifact(trimmed) {
                dropped += 1;
                continue;
            }

            let leading = piece.len() - piece.trim_start().len();
            let start = offset + span.start + leading;
            let doc_span = CharSpan::new(start, start + trimmed.len());

            sentences.push(Sentence::new(sentences.len(), trimmed, doc_span));
        }
    }

    debug!(
        sentences = sentences.len(),
        dropped_artifacts = dropped,
        bytes = text.len(),
        "Segmented document"
    );

    Ok(Segments { sentences })
}

fn check_span(line: &str, span: CharSpan, previous_end: usize) -> SegmentationResult<()> {
    let fits = span.start <= span.end
        && span.end <= line.len()
        && span.start >= previous_end
        && line.is_char_boundary(span.start)
        && line.is_char_boundary(span.end);

    if fits {
        Ok(())
    } else {
        Err(SegmentationError::InvalidSpan {
            start: span.start,
            end: span.end,
            len: line.len(),
        })
    }
}

/// Whether a sentence is only list or layout punctuation.
pub fn is_formatting_artifact(text: &str) -> bool {
    let stripped = RE_LIST_MARKER.replace(text, "");
    !stripped.chars().any(char::is_alphanumeric)
}
