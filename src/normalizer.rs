//! Search text tokenization
//!
//! Turns raw text into words and quoted phrases, each tagged with a
//! [`TermState`] from its leading sign. Indexing uses the same pipeline with
//! query syntax ignored so content and queries tokenize identically.

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

use crate::models::{Logic, TermState};

static POSSESSIVE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)['’]s\b").expect("valid possessive pattern"));
static APOSTROPHES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"['’]").expect("valid apostrophe pattern"));
static QUOTED_PHRASE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"([~+\-]?)"([^"]*)""#).expect("valid phrase pattern"));
static SYNTAX_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"["()]"#).expect("valid syntax pattern"));
static NON_TERM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w~+\-]+").expect("valid separator pattern"));
static SIGN_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([~+\-])[~+\-]+").expect("valid sign pattern"));

const SIGNS: [char; 3] = ['~', '+', '-'];

/// Words and phrases of one search string, in first-seen order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedTerms {
    pub words: Vec<(String, TermState)>,
    pub phrases: Vec<(String, TermState)>,
}

impl NormalizedTerms {
    pub fn is_empty(&self) -> bool {
        self.words.is_empty() && self.phrases.is_empty()
    }

    /// Iterate over word texts only, ignoring their states
    pub fn word_texts(&self) -> impl Iterator<Item = &str> {
        self.words.iter().map(|(w, _)| w.as_str())
    }
}

/// Counts of distinct terms by state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TermTally {
    pub excluded: usize,
    /// Present plus required
    pub inclusive: usize,
    pub required: usize,
}

impl TermTally {
    pub fn record(&mut self, state: TermState) {
        if state.is_inclusive() {
            self.inclusive += 1;
        } else {
            self.excluded += 1;
        }
        if state == TermState::Required {
            self.required += 1;
        }
    }

    pub fn merge(&mut self, other: TermTally) {
        self.excluded += other.excluded;
        self.inclusive += other.inclusive;
        self.required += other.required;
    }
}

/// Map a leading sign to a term state
pub fn term_state(sign: Option<char>, logic: Logic) -> TermState {
    match sign {
        Some('-') => TermState::Excluded,
        Some('~') => TermState::Present,
        Some('+') => TermState::Required,
        _ if logic == Logic::And => TermState::Required,
        _ => TermState::Present,
    }
}

/// True for terms made only of digits; such terms are never stemmed
pub fn is_numeric(term: &str) -> bool {
    !term.is_empty() && term.chars().all(|c| c.is_ascii_digit())
}

/// Tokenize search text.
///
/// With `ignore_syntax` set, quotes and parentheses are dropped instead of
/// delimiting phrases; that mode is used for indexed content.
pub fn normalize_terms(text: &str, logic: Logic, ignore_syntax: bool) -> NormalizedTerms {
    let text = POSSESSIVE.replace_all(text, "");
    let text = APOSTROPHES.replace_all(&text, "");

    let mut terms = NormalizedTerms::default();
    let mut seen_phrases = HashSet::new();

    let remainder = if ignore_syntax {
        SYNTAX_CHARS.replace_all(&text, " ").into_owned()
    } else {
        for caps in QUOTED_PHRASE.captures_iter(&text) {
            let sign = caps.get(1).and_then(|m| m.as_str().chars().next());
            let state = term_state(sign, logic);
            let words = split_words(&caps[2]);
            match words.len() {
                0 => {}
                // A quoted single word is just a word
                1 => push_unique(&mut terms.words, &words[0], state),
                _ => {
                    let phrase = words.join(" ");
                    if seen_phrases.insert(phrase.clone()) {
                        terms.phrases.push((phrase, state));
                    }
                }
            }
        }
        QUOTED_PHRASE.replace_all(&text, " ").into_owned()
    };

    for (sign, word) in split_signed_tokens(&remainder) {
        push_unique(&mut terms.words, &word, term_state(sign, logic));
    }

    terms
}

/// Collapse separators and sign runs, leaving whitespace-delimited tokens
fn collapse(text: &str) -> String {
    let text = NON_TERM.replace_all(text, " ");
    SIGN_RUN.replace_all(&text, "$1").into_owned()
}

/// Split text into plain lower-cased words, discarding signs
fn split_words(text: &str) -> Vec<String> {
    split_signed_tokens(&SYNTAX_CHARS.replace_all(text, " "))
        .into_iter()
        .map(|(_, word)| word)
        .collect()
}

/// Split text into (sign, word) pairs.
///
/// A hyphenated compound yields the joined compound with the token's sign,
/// followed by each half as an optional term. Halves of an excluded
/// compound are dropped so the exclusion stays narrow.
fn split_signed_tokens(text: &str) -> Vec<(Option<char>, String)> {
    let collapsed = collapse(text);
    let mut tokens = Vec::new();

    for raw in collapsed.split_whitespace() {
        let mut chars = raw.chars();
        let sign = match raw.chars().next() {
            Some(c) if SIGNS.contains(&c) => {
                chars.next();
                Some(c)
            }
            _ => None,
        };

        let parts: Vec<String> = chars
            .as_str()
            .split('-')
            .map(|part| part.replace(['~', '+'], "").to_lowercase())
            .filter(|part| !part.is_empty())
            .collect();

        match parts.len() {
            0 => {}
            1 => tokens.push((sign, parts[0].clone())),
            _ => {
                tokens.push((sign, parts.concat()));
                if sign != Some('-') {
                    tokens.extend(parts.into_iter().map(|part| (Some('~'), part)));
                }
            }
        }
    }

    tokens
}

fn push_unique(list: &mut Vec<(String, TermState)>, word: &str, state: TermState) {
    if !list.iter().any(|(existing, _)| existing == word) {
        list.push((word.to_string(), state));
    }
}
