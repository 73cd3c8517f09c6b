//! Tokenizer implementations.
//!
//! Applications with a proper language-aware segmenter should implement
//! [`Tokenizer`](crate::traits::tokenizer::Tokenizer) themselves; the rule
//! based tokenizer here covers the common cases without model data.

mod rule;

pub use rule::RuleTokenizer;
