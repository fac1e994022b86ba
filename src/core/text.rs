//! Text cleaning and sentence tokenization
//!
//! PDF extraction yields text with hard line wraps, words hyphenated across
//! lines, page-break form feeds and stray control characters. `clean_text`
//! normalizes that into paragraphs of single-spaced text, and
//! `split_sentences` cuts each paragraph into sentences with a rule-based
//! tokenizer that knows about abbreviations, initials and decimals.

use std::collections::HashSet;

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

lazy_static! {
    // "embed-\nding" -> "embedding"
    static ref HYPHEN_BREAK_RE: Regex = Regex::new(r"(\p{L})-[ \t]*\n[ \t]*(\p{Ll})").unwrap();
    static ref PARAGRAPH_BREAK_RE: Regex = Regex::new(r"\n[ \t]*\n\s*").unwrap();
    static ref WHITESPACE_RE: Regex = Regex::new(r"\s+").unwrap();
    static ref ABBREVIATIONS: HashSet<&'static str> = HashSet::from([
        "mr", "mrs", "ms", "dr", "prof", "sr", "jr", "vs", "e.g", "i.e", "cf", "viz",
        "fig", "figs", "eq", "eqs", "ref", "refs", "sec", "ch", "vol", "vols", "pp", "al",
        "approx", "resp", "eds", "dept", "univ", "inc", "ltd", "corp", "jan", "feb", "apr",
        "jun", "jul", "aug", "sep", "sept", "oct", "nov", "dec", "u.s", "u.k",
    ]);
    // Ordinary words too, so only abbreviations before a number: "No. 5", "p. 12"
    static ref NUMBERED_ABBREVIATIONS: HashSet<&'static str> =
        HashSet::from(["no", "nos", "p", "ca", "st", "ed", "mar"]);
}

/// Characters that may trail a sentence terminator: `."` `.)` `?!`
const CLOSERS: &[char] = &['"', '\'', '\u{201d}', '\u{2019}', ')', ']', '.', '!', '?'];
/// Characters that may open a new sentence besides uppercase letters and digits
const OPENERS: &[char] = &['"', '\'', '\u{201c}', '\u{2018}', '(', '['];

/// A sentence and its zero-based position within its document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sentence {
    pub position: usize,
    pub text: String,
}

/// Drops fragments too short to be meaningful and caps runaway "sentences"
/// (tables and reference lists often lack punctuation)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SentenceFilter {
    pub min_words: usize,
    pub max_chars: usize,
}

impl Default for SentenceFilter {
    fn default() -> Self {
        Self {
            min_words: 3,
            max_chars: 1000,
        }
    }
}

impl SentenceFilter {
    /// Apply the filter to one sentence, returning the text to keep.
    pub fn apply(&self, sentence: &str) -> Option<String> {
        if sentence.split_whitespace().count() < self.min_words {
            return None;
        }
        if self.max_chars > 0 && sentence.chars().count() > self.max_chars {
            let truncated: String = sentence.chars().take(self.max_chars).collect();
            return Some(truncated.trim_end().to_string());
        }
        Some(sentence.to_string())
    }
}

/// Normalize raw extracted text into paragraphs separated by `\n\n`.
pub fn clean_text(raw: &str) -> String {
    let normalized: String = raw
        .replace("\r\n", "\n")
        .replace('\r', "\n")
        .replace('\u{c}', "\n\n")
        .chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect();

    let dehyphenated = HYPHEN_BREAK_RE.replace_all(&normalized, "$1$2");

    PARAGRAPH_BREAK_RE
        .split(&dehyphenated)
        .map(|p| WHITESPACE_RE.replace_all(p, " ").trim().to_string())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Split cleaned text into sentences. Paragraph breaks always end a sentence.
pub fn split_sentences(text: &str) -> Vec<String> {
    text.split("\n\n")
        .flat_map(split_paragraph)
        .collect()
}

/// Clean, split and filter a document's text into positioned sentences.
pub fn sentences(raw: &str, filter: &SentenceFilter) -> Vec<Sentence> {
    split_sentences(&clean_text(raw))
        .iter()
        .filter_map(|s| filter.apply(s))
        .enumerate()
        .map(|(position, text)| Sentence { position, text })
        .collect()
}

fn split_paragraph(paragraph: &str) -> Vec<String> {
    let paragraph = WHITESPACE_RE.replace_all(paragraph.trim(), " ");
    let chars: Vec<(usize, char)> = paragraph.char_indices().collect();
    let n = chars.len();
    let byte_at = |idx: usize| if idx < n { chars[idx].0 } else { paragraph.len() };

    let mut result = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < n {
        let c = chars[i].1;
        if !matches!(c, '.' | '!' | '?') {
            i += 1;
            continue;
        }

        let mut j = i + 1;
        while j < n && CLOSERS.contains(&chars[j].1) {
            j += 1;
        }

        // Needs "<terminator> <Opener>" to count as a boundary
        if j >= n || chars[j].1 != ' ' || j + 1 >= n {
            i = j.max(i + 1);
            continue;
        }
        let next = chars[j + 1].1;
        let opens_sentence = next.is_uppercase() || next.is_ascii_digit() || OPENERS.contains(&next);

        if !opens_sentence || (c == '.' && is_non_terminal_period(&paragraph, byte_at(i), next)) {
            i = j;
            continue;
        }

        let sentence = paragraph[byte_at(start)..byte_at(j)].trim();
        if !sentence.is_empty() {
            result.push(sentence.to_string());
        }
        start = j + 1;
        i = j + 1;
    }

    if start < n {
        let rest = paragraph[byte_at(start)..].trim();
        if !rest.is_empty() {
            result.push(rest.to_string());
        }
    }

    result
}

/// True if the period at `period_byte` belongs to an abbreviation or initial.
/// `next` is the first character after the following space.
fn is_non_terminal_period(text: &str, period_byte: usize, next: char) -> bool {
    let before = &text[..period_byte];
    let token_start = before.rfind(' ').map(|p| p + 1).unwrap_or(0);
    let token = before[token_start..].trim_start_matches(OPENERS);

    if token.is_empty() {
        return false;
    }

    let mut token_chars = token.chars();
    if let (Some(first), None) = (token_chars.next(), token_chars.next()) {
        // "J. Smith"
        if first.is_uppercase() {
            return true;
        }
    }

    let token = token.to_lowercase();
    ABBREVIATIONS.contains(token.as_str())
        || (next.is_ascii_digit() && NUMBERED_ABBREVIATIONS.contains(token.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_split() {
        let s = split_sentences("The cat sat. The dog ran! Did it? Yes.");
        assert_eq!(s, vec!["The cat sat.", "The dog ran!", "Did it?", "Yes."]);
    }

    #[test]
    fn test_abbreviations_do_not_split() {
        let s = split_sentences(
            "Models such as BERT, e.g. Sentence-BERT, work well. See Fig. 3 for details. Dr. Smith agreed.",
        );
        assert_eq!(
            s,
            vec![
                "Models such as BERT, e.g. Sentence-BERT, work well.",
                "See Fig. 3 for details.",
                "Dr. Smith agreed.",
            ]
        );
    }

    #[test]
    fn test_sentence_final_words_still_split() {
        let s = split_sentences(
            "The answer was no. The model failed. We set it to the max. Then we stopped.",
        );
        assert_eq!(
            s,
            vec![
                "The answer was no.",
                "The model failed.",
                "We set it to the max.",
                "Then we stopped.",
            ]
        );
    }

    #[test]
    fn test_numbered_abbreviations() {
        let s = split_sentences("See No. 5 on p. 12 of the report. It was min. Later came more.");
        assert_eq!(
            s,
            vec!["See No. 5 on p. 12 of the report.", "It was min.", "Later came more."]
        );
    }

    #[test]
    fn test_initials_and_decimals() {
        let s = split_sentences("J. R. Tolkien wrote it. The value is 3.14 exactly. Next one.");
        assert_eq!(
            s,
            vec!["J. R. Tolkien wrote it.", "The value is 3.14 exactly.", "Next one."]
        );
    }

    #[test]
    fn test_lowercase_continuation_is_not_a_boundary() {
        let s = split_sentences("The model is described in Smith et al. and later work.");
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn test_closing_quotes_stay_with_sentence() {
        let s = split_sentences("He said \"Stop.\" Then he left (quietly.) After that, silence.");
        assert_eq!(
            s,
            vec![
                "He said \"Stop.\"",
                "Then he left (quietly.)",
                "After that, silence.",
            ]
        );
    }

    #[test]
    fn test_paragraph_break_ends_sentence() {
        let cleaned = clean_text("Introduction\n\nWe study embeddings. They help.");
        let s = split_sentences(&cleaned);
        assert_eq!(s, vec!["Introduction", "We study embeddings.", "They help."]);
    }

    #[test]
    fn test_clean_joins_hyphenated_words() {
        let cleaned = clean_text("Sentence embed-\nding maps text\nto vectors.");
        assert_eq!(cleaned, "Sentence embedding maps text to vectors.");
    }

    #[test]
    fn test_clean_keeps_real_hyphens() {
        let cleaned = clean_text("A state-of-the-\nArt result.");
        assert_eq!(cleaned, "A state-of-the- Art result.");
    }

    #[test]
    fn test_clean_strips_control_chars_and_page_breaks() {
        let cleaned = clean_text("Page one ends.\u{c}Page\u{0} two   starts.\r\nStill two.");
        assert_eq!(cleaned, "Page one ends.\n\nPage two starts. Still two.");
    }

    #[test]
    fn test_sentences_filter_and_positions() {
        let raw = "Short. This sentence is long enough. Ok then. Another valid sentence here.";
        let result = sentences(raw, &SentenceFilter::default());
        assert_eq!(
            result,
            vec![
                Sentence {
                    position: 0,
                    text: "This sentence is long enough.".to_string()
                },
                Sentence {
                    position: 1,
                    text: "Another valid sentence here.".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_max_chars_truncates_on_char_boundary() {
        let filter = SentenceFilter {
            min_words: 1,
            max_chars: 5,
        };
        assert_eq!(filter.apply("héllo wörld"), Some("héllo".to_string()));
    }

    #[test]
    fn test_empty_input() {
        assert!(sentences("", &SentenceFilter::default()).is_empty());
        assert!(split_sentences("   ").is_empty());
    }

    #[test]
    fn test_unicode_text() {
        let s = split_sentences("Über alles. Ça va bien.");
        assert_eq!(s, vec!["Über alles.", "Ça va bien."]);
    }
}
