//! Sentence types - segmenter output and context windows.

use serde::{Deserialize, Serialize};

/// Byte range of a sentence within the source document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CharSpan {
    /// Inclusive start offset
    pub start: usize,

    /// Exclusive end offset
    pub end: usize,
}

impl CharSpan {
    /// Create a new span.
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Whether the span covers no text.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Move the span by `offset` bytes.
    pub fn shifted(self, offset: usize) -> Self {
        Self::new(self.start + offset, self.end + offset)
    }
}

/// One sentence of the source document.
///
/// Produced once by the segmenter and never modified afterwards; later
/// stages produce new records keyed by `index` instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sentence {
    /// 0-based position in the document, contiguous
    pub index: usize,

    /// Original sentence text
    pub text: String,

    /// Location in the source document
    pub span: CharSpan,
}

impl Sentence {
    /// Create a new sentence.
    pub fn new(index: usize, text: impl Into<String>, span: CharSpan) -> Self {
        Self {
            index,
            text: text.into(),
            span,
        }
    }
}

/// Neighbouring sentences supplied as context for one target sentence.
///
/// Borrows from the original sentence sequence, so it can never observe
/// rewritten text from a later stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextWindow<'a> {
    /// Index of the sentence this window surrounds
    pub target_index: usize,

    /// Sentences before the target, most recent last
    pub preceding: &'a [Sentence],

    /// Sentences after the target, nearest first
    pub following: &'a [Sentence],
}

impl<'a> ContextWindow<'a> {
    /// Number of context sentences in the window (target excluded).
    pub fn len(&self) -> usize {
        self.preceding.len() + self.following.len()
    }

    /// Whether the window holds no context at all.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Render the window with `target` in place, one sentence per line.
    pub fn excerpt(&self, target: &Sentence) -> String {
        self.preceding
            .iter()
            .chain(std::iter::once(target))
            .chain(self.following.iter())
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Render only the sentences before the target.
    pub fn preceding_text(&self) -> String {
        self.preceding
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}
