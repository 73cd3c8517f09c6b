//! Tokenizer trait for sentence boundary detection.

use std::sync::Arc;

use crate::error::SegmentationResult;
use crate::types::sentence::CharSpan;

/// Sentence boundary detection capability.
///
/// Given one block of text, returns the byte spans of its sentences in
/// order. Abbreviations and numbers are the tokenizer's problem; the
/// segmenter trusts the boundaries it gets.
pub trait Tokenizer: Send + Sync {
    /// Split `text` into sentence spans relative to `text`.
    fn split(&self, text: &str, language_hint: Option<&str>) -> SegmentationResult<Vec<CharSpan>>;
}

impl<T: Tokenizer + ?Sized> Tokenizer for Arc<T> {
    fn split(&self, text: &str, language_hint: Option<&str>) -> SegmentationResult<Vec<CharSpan>> {
        (**self).split(text, language_hint)
    }
}

impl<T: Tokenizer + ?Sized> Tokenizer for Box<T> {
    fn split(&self, text: &str, language_hint: Option<&str>) -> SegmentationResult<Vec<CharSpan>> {
        (**self).split(text, language_hint)
    }
}
