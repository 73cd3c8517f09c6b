//! Punctuation and abbreviation rules for sentence boundaries.

use regex::Regex;
use std::sync::LazyLock;

use crate::error::SegmentationResult;
use crate::traits::tokenizer::Tokenizer;
use crate::types::sentence::CharSpan;

/// Terminal punctuation plus closing quotes/brackets, then whitespace or end
/// of text. CJK full-width terminals need no trailing whitespace.
static RE_BOUNDARY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[.!?…]+["'”’»)\]]*(?:\s+|$)|[。！？]+["'”’」』）)]*\s*"#).unwrap()
});

/// Dotted initialisms such as `U.S` or `e.g` (final dot already stripped).
static RE_INITIALISM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:\p{L}\.)+\p{L}$").unwrap());

const OPENING_PUNCT: &[char] = &['(', '[', '"', '\'', '“', '‘', '«', '¿', '¡'];

const ABBREVIATIONS_EN: &[&str] = &[
    "mr", "mrs", "ms", "dr", "prof", "sr", "jr", "st", "mt", "ft", "inc", "ltd", "co", "corp",
    "llc", "plc", "vs", "cf", "al", "approx", "fig", "vol", "pp", "ch", "sec", "dept", "est",
    "gen", "gov", "sen", "rep", "capt", "lt", "col", "sgt", "jan", "feb", "mar", "apr", "jun",
    "jul", "aug", "sep", "sept", "oct", "nov", "dec", "no",
];

const ABBREVIATIONS_DE: &[&str] = &[
    "dr", "prof", "hr", "fr", "nr", "str", "bzw", "usw", "ca", "vgl", "ggf", "inkl", "evtl",
    "bspw", "jh", "mio", "mrd", "abs", "gmbh",
];

const ABBREVIATIONS_FR: &[&str] = &[
    "m", "mm", "mme", "mlle", "dr", "pr", "env", "cf", "av", "bd", "st", "ste", "vol", "chap",
];

const ABBREVIATIONS_ES: &[&str] = &[
    "sr", "sra", "srta", "dr", "dra", "ud", "uds", "av", "aprox", "pág", "núm", "dpto", "ej",
];

/// Rule-based sentence tokenizer.
///
/// Splits after `.`, `!`, `?` and `…` (optionally followed by closing quotes
/// or brackets) when whitespace follows, and after CJK full stops. It does
/// not split:
/// - after known abbreviations for the hinted language (English default)
/// - after single-letter initials and dotted initialisms (`J.`, `U.S.`)
/// - after a leading list enumerator (`1.`), or any short number in German
///   where it marks an ordinal
/// - when the next word starts lowercase
/// - inside numbers (`3.5`), since no whitespace follows the dot
#[derive(Debug, Clone, Default)]
pub struct RuleTokenizer {
    extra_abbreviations: Vec<String>,
}

impl RuleTokenizer {
    /// Create a tokenizer with the built-in abbreviation lists.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add abbreviations (without the trailing dot, any case).
    pub fn with_abbreviations(mut self, words: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.extra_abbreviations
            .extend(words.into_iter().map(|w| w.into().to_lowercase()));
        self
    }

    fn is_abbreviation(&self, word: &str, language: &str) -> bool {
        let lower = word.to_lowercase();
        let builtin = match language {
            "de" => ABBREVIATIONS_DE,
            "fr" => ABBREVIATIONS_FR,
            "es" => ABBREVIATIONS_ES,
            _ => ABBREVIATIONS_EN,
        };

        builtin.contains(&lower.as_str()) || self.extra_abbreviations.iter().any(|a| *a == lower)
    }

    /// Decide whether the terminal punctuation at `punct` ends the sentence
    /// that began at `sentence_start`.
    fn is_boundary(&self, text: &str, sentence_start: usize, punct: &str, punct_start: usize, next_start: usize, language: &str) -> bool {
        if next_start >= text.len() {
            return true;
        }

        let next = text[next_start..].chars().next();
        if next.is_some_and(|c| c.is_lowercase()) {
            return false;
        }

        if punct.trim_end_matches(|c: char| !matches!(c, '.' | '!' | '?' | '…')) != "." {
            return true;
        }

        let before = &text[sentence_start..punct_start];
        let word = before
            .rsplit(char::is_whitespace)
            .next()
            .unwrap_or("")
            .trim_start_matches(OPENING_PUNCT);

        if word.is_empty() {
            return true;
        }

        if self.is_abbreviation(word, language) || RE_INITIALISM.is_match(word) {
            return false;
        }

        let mut chars = word.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            if c.is_uppercase() {
                return false;
            }
        }

        let is_enumerator = word.len() <= 3 && word.chars().all(|c| c.is_ascii_digit());
        if is_enumerator && before.trim() == word {
            return false;
        }

        // German ordinals: "am 3. Mai"
        if is_enumerator && language == "de" {
            return false;
        }

        true
    }
}

impl Tokenizer for RuleTokenizer {
    fn split(&self, text: &str, language_hint: Option<&str>) -> SegmentationResult<Vec<CharSpan>> {
        let language = language_code(language_hint);
        let mut spans = Vec::new();
        let mut start = 0;

        for m in RE_BOUNDARY.find_iter(text) {
            let punct = m.as_str().trim_end();
            let punct_end = m.start() + punct.len();

            let cjk = punct.starts_with(['。', '！', '？']);
            if cjk || self.is_boundary(text, start, punct, m.start(), m.end(), language) {
                push_trimmed(&mut spans, text, start, punct_end);
                start = m.end();
            }
        }

        if start < text.len() {
            push_trimmed(&mut spans, text, start, text.len());
        }

        Ok(spans)
    }
}

/// Normalize a language hint ("en-US", "English", "de_DE") to a two-letter code.
fn language_code(hint: Option<&str>) -> &'static str {
    let hint = match hint {
        Some(h) => h.trim().to_lowercase(),
        None => return "en",
    };

    match hint.as_str() {
        "german" | "deutsch" => return "de",
        "french" | "français" | "francais" => return "fr",
        "spanish" | "español" | "espanol" => return "es",
        _ => {}
    }

    match hint.get(..2) {
        Some("de") => "de",
        Some("fr") => "fr",
        Some("es") => "es",
        _ => "en",
    }
}

fn push_trimmed(spans: &mut Vec<CharSpan>, text: &str, start: usize, end: usize) {
    let slice = &text[start..end];
    let leading = slice.len() - slice.trim_start().len();
    let trailing = slice.len() - slice.trim_end().len();

    let span = CharSpan::new(start + leading, end - trailing);
    if span.start < span.end {
        spans.push(span);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sentences<'a>(text: &'a str, hint: Option<&str>) -> Vec<&'a str> {
        RuleTokenizer::new()
            .split(text, hint)
            .unwrap()
            .into_iter()
            .map(|s| &text[s.start..s.end])
            .collect()
    }

    #[test]
    fn test_splits_simple_sentences() {
        let got = sentences("This is the first sentence. This is the second sentence.", None);
        assert_eq!(got, vec!["This is the first sentence.", "This is the second sentence."]);
    }

    #[test]
    fn test_keeps_company_abbreviation() {
        let text = "Apple Inc. was founded in 1976 by Steve Jobs, Steve Wozniak, and Ronald Wayne. The company is incredibly innovative.";
        let got = sentences(text, None);
        assert_eq!(
            got,
            vec![
                "Apple Inc. was founded in 1976 by Steve Jobs, Steve Wozniak, and Ronald Wayne.",
                "The company is incredibly innovative.",
            ]
        );
    }

    #[test]
    fn test_numbers_and_initials_do_not_split() {
        let got = sentences("Growth was 3.5 percent. J. R. R. Tolkien wrote it in the U.S. Army years.", None);
        assert_eq!(
            got,
            vec!["Growth was 3.5 percent.", "J. R. R. Tolkien wrote it in the U.S. Army years."]
        );
    }

    #[test]
    fn test_question_and_exclamation() {
        let got = sentences("Is it true? Yes! It is.", None);
        assert_eq!(got, vec!["Is it true?", "Yes!", "It is."]);
    }

    #[test]
    fn test_closing_quote_stays_with_sentence() {
        let got = sentences("He said \"stop.\" Then he left.", None);
        assert_eq!(got, vec!["He said \"stop.\"", "Then he left."]);
    }

    #[test]
    fn test_leading_enumerator_is_not_a_sentence() {
        let got = sentences("1. The flag has 50 stars. It has 13 stripes.", None);
        assert_eq!(got, vec!["1. The flag has 50 stars.", "It has 13 stripes."]);
    }

    #[test]
    fn test_lowercase_continuation() {
        let got = sentences("It costs approx. five dollars... or so. Next one.", None);
        assert_eq!(got, vec!["It costs approx. five dollars... or so.", "Next one."]);
    }

    #[test]
    fn test_language_specific_abbreviations() {
        let text = "Das Treffen ist am 3. Mai bzw. Juni. Wir kommen.";
        let got = sentences(text, Some("de-DE"));
        assert_eq!(got, vec!["Das Treffen ist am 3. Mai bzw. Juni.", "Wir kommen."]);
    }

    #[test]
    fn test_cjk_full_stops() {
        let got = sentences("东京是日本的首都。人口很多！", Some("zh"));
        assert_eq!(got, vec!["东京是日本的首都。", "人口很多！"]);
    }

    #[test]
    fn test_trailing_text_without_terminal() {
        let got = sentences("  First sentence.   no terminal here  ", None);
        assert_eq!(got, vec!["First sentence.   no terminal here"]);
    }

    #[test]
    fn test_custom_abbreviations() {
        let tokenizer = RuleTokenizer::new().with_abbreviations(["Rev"]);
        let text = "Rev. Smith spoke. Everyone listened.";
        let got: Vec<&str> = tokenizer
            .split(text, None)
            .unwrap()
            .into_iter()
            .map(|s| &text[s.start..s.end])
            .collect();
        assert_eq!(got, vec!["Rev. Smith spoke.", "Everyone listened."]);
    }

    #[test]
    fn test_language_code_normalization() {
        assert_eq!(language_code(None), "en");
        assert_eq!(language_code(Some("English")), "en");
        assert_eq!(language_code(Some("Deutsch")), "de");
        assert_eq!(language_code(Some("fr_CA")), "fr");
        assert_eq!(language_code(Some("es")), "es");
    }
}
