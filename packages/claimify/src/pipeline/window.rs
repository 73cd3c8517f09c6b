//! Context window construction.

use crate::error::{ClaimifyError, Result};
use crate::types::sentence::{ContextWindow, Sentence};

/// Builds bounded windows of neighbouring sentences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowBuilder {
    preceding: usize,
    following: usize,
}

impl WindowBuilder {
    /// Create a builder taking up to `preceding` sentences before and
    /// `following` sentences after each target.
    pub fn new(preceding: usize, following: usize) -> Self {
        Self {
            preceding,
            following,
        }
    }

    /// Window around `target` within `sentences`.
    ///
    /// Edges are truncated, never padded. Always borrows from the sequence
    /// it is given, which must be the original segmenter output.
    pub fn window<'a>(&self, sentences: &'a [Sentence], target: usize) -> Result<ContextWindow<'a>> {
        if target >= sentences.len() {
            return Err(ClaimifyError::IndexOutOfRange {
                index: target,
                len: sentences.len(),
            });
        }

        let start = target.saturating_sub(self.preceding);
        let end = target
            .saturating_add(1)
            .saturating_add(self.following)
            .min(sentences.len());

        Ok(ContextWindow {
            target_index: target,
            preceding: &sentences[start..target],
            following: &sentences[target + 1..end],
        })
    }
}
