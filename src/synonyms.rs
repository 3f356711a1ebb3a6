//! Synonym graph maintenance and the synonym list file format
//!
//! ```text
//! # comment
//! fox = vulpine, reynard
//! big large huge
//! ```
//!
//! The first token of a line is the target word, the rest are its synonyms.
//! Tokens are separated by whitespace, commas or `=`.

use regex::Regex;
use rusqlite::Connection;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fs;
use std::path::Path;
use std::sync::LazyLock;
use thiserror::Error;

use crate::db::lexicon::LexiconDbError;
use crate::db::synonyms::{self as synonym_db, SynonymDbError};
use crate::lexicon::Lexicon;

static SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s,=]+").expect("valid separator pattern"));

#[derive(Error, Debug)]
pub enum SynonymError {
    #[error("Synonym list line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("Invalid synonym word: {0:?}")]
    InvalidWord(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Synonym storage error: {0}")]
    DbError(#[from] SynonymDbError),
    #[error("Lexicon error: {0}")]
    LexiconError(#[from] LexiconDbError),
}

/// One parsed line of a synonym list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynonymEntry {
    pub word: String,
    pub synonyms: Vec<String>,
}

fn is_valid_word(token: &str) -> bool {
    !token.is_empty() && token.chars().all(char::is_alphanumeric)
}

fn normalize_word(word: &str) -> Result<String, SynonymError> {
    let word = word.trim();
    if !is_valid_word(word) {
        return Err(SynonymError::InvalidWord(word.to_string()));
    }
    Ok(word.to_lowercase())
}

/// Parse a synonym list. Nothing is returned unless every line is valid.
pub fn parse_synonyms_from_text(text: &str) -> Result<Vec<SynonymEntry>, SynonymError> {
    let mut entries = Vec::new();
    let mut seen_pairs = HashSet::new();

    for (index, raw_line) in text.lines().enumerate() {
        let line_number = index + 1;
        let line = raw_line.split('#').next().unwrap_or_default().trim();
        if line.is_empty() {
            continue;
        }

        let mut tokens = SEPARATORS.split(line).filter(|t| !t.is_empty());
        let Some(target) = tokens.next() else {
            continue;
        };
        if !is_valid_word(target) {
            return Err(SynonymError::Parse {
                line: line_number,
                message: format!("target {:?} is not alphanumeric", target),
            });
        }
        let word = target.to_lowercase();

        let mut synonyms = Vec::new();
        for token in tokens {
            if !is_valid_word(token) {
                return Err(SynonymError::Parse {
                    line: line_number,
                    message: format!("synonym {:?} is not alphanumeric", token),
                });
            }
            let synonym = token.to_lowercase();
            if synonym == word {
                return Err(SynonymError::Parse {
                    line: line_number,
                    message: format!("{:?} is listed as its own synonym", token),
                });
            }
            if !seen_pairs.insert((word.clone(), synonym.clone())) {
                return Err(SynonymError::Parse {
                    line: line_number,
                    message: format!("duplicate synonym {:?} for {:?}", token, target),
                });
            }
            synonyms.push(synonym);
        }

        entries.push(SynonymEntry { word, synonyms });
    }

    Ok(entries)
}

pub fn parse_synonyms_from_file(path: &Path) -> Result<Vec<SynonymEntry>, SynonymError> {
    let content = fs::read_to_string(path)?;
    parse_synonyms_from_text(&content)
}

/// Write a listing in the format `parse_synonyms_from_text` reads
pub fn format_synonyms(listing: &BTreeMap<String, Vec<String>>) -> String {
    listing
        .iter()
        .map(|(word, synonyms)| format!("{} = {}\n", word, synonyms.join(", ")))
        .collect()
}

/// Link `word` to each synonym. Returns the number of new edges.
pub fn add_synonyms<S: AsRef<str>>(
    conn: &Connection,
    lexicon: &mut Lexicon,
    word: &str,
    synonyms: &[S],
) -> Result<usize, SynonymError> {
    let word = normalize_word(word)?;
    let synonyms = synonyms
        .iter()
        .map(|s| normalize_word(s.as_ref()))
        .collect::<Result<Vec<_>, _>>()?;

    let word_id = lexicon.get_or_create_word_id(conn, &word)?;
    let mut added = 0;
    for synonym in &synonyms {
        let synonym_id = lexicon.get_or_create_word_id(conn, synonym)?;
        if synonym_db::add_edge(conn, word_id, synonym_id)? {
            added += 1;
        }
    }

    log::debug!("Added {} synonym edges for {:?}", added, word);
    Ok(added)
}

/// Unlink `word` from each synonym. Returns the number of removed edges.
pub fn remove_synonyms<S: AsRef<str>>(
    conn: &Connection,
    lexicon: &mut Lexicon,
    word: &str,
    synonyms: &[S],
) -> Result<usize, SynonymError> {
    let Some(word_id) = lexicon.lookup_word_id(conn, word)? else {
        return Ok(0);
    };

    let mut removed = 0;
    for synonym in synonyms {
        if let Some(synonym_id) = lexicon.lookup_word_id(conn, synonym.as_ref())? {
            if synonym_db::remove_edge(conn, word_id, synonym_id)? {
                removed += 1;
            }
        }
    }
    Ok(removed)
}

pub fn remove_all_synonyms(
    conn: &Connection,
    lexicon: &mut Lexicon,
    word: &str,
) -> Result<usize, SynonymError> {
    match lexicon.lookup_word_id(conn, word)? {
        Some(word_id) => Ok(synonym_db::remove_edges_for_word(conn, word_id)?),
        None => Ok(0),
    }
}

pub fn clear_synonyms(conn: &Connection) -> Result<usize, SynonymError> {
    Ok(synonym_db::clear_edges(conn)?)
}

/// Words one hop from `word`, sorted
pub fn get_synonyms(
    conn: &Connection,
    lexicon: &mut Lexicon,
    word: &str,
) -> Result<Vec<String>, SynonymError> {
    match lexicon.lookup_word_id(conn, word)? {
        Some(word_id) => Ok(synonym_db::get_synonym_words(conn, word_id)?
            .into_iter()
            .map(|(_, text)| text)
            .collect()),
        None => Ok(Vec::new()),
    }
}

/// Every edge listed once, under the word with the longer synonym list
pub fn get_all_synonyms(conn: &Connection) -> Result<BTreeMap<String, Vec<String>>, SynonymError> {
    let edges = synonym_db::get_all_edges(conn)?;
    Ok(reconcile_listing(&edges))
}

/// Build an adjacency listing in which each reciprocal pair appears once.
///
/// The entry is dropped from the shorter of the two lists; on a tie the
/// alphabetically later word loses it.
fn reconcile_listing(edges: &[(String, String)]) -> BTreeMap<String, Vec<String>> {
    let mut adjacency: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for (a, b) in edges {
        adjacency.entry(a.as_str()).or_default().insert(b.as_str());
        adjacency.entry(b.as_str()).or_default().insert(a.as_str());
    }

    let sizes: BTreeMap<&str, usize> = adjacency.iter().map(|(w, s)| (*w, s.len())).collect();

    for (a, b) in edges {
        let (a, b) = (a.as_str(), b.as_str());
        let (keeper, loser) = match sizes[a].cmp(&sizes[b]) {
            std::cmp::Ordering::Greater => (a, b),
            std::cmp::Ordering::Less => (b, a),
            std::cmp::Ordering::Equal if a <= b => (a, b),
            std::cmp::Ordering::Equal => (b, a),
        };
        debug_assert!(adjacency[keeper].contains(loser));
        if let Some(list) = adjacency.get_mut(loser) {
            list.remove(keeper);
        }
    }

    adjacency
        .into_iter()
        .filter(|(_, synonyms)| !synonyms.is_empty())
        .map(|(word, synonyms)| {
            (
                word.to_string(),
                synonyms.into_iter().map(str::to_string).collect(),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connection::init_test_pool;

    #[test]
    fn test_parse_synonyms_from_text() {
        let entries = parse_synonyms_from_text(
            "# animals\n\nFox = Vulpine, reynard\nbig large huge # sizes\n   \n",
        )
        .unwrap();

        assert_eq!(
            entries,
            vec![
                SynonymEntry {
                    word: "fox".into(),
                    synonyms: vec!["vulpine".into(), "reynard".into()],
                },
                SynonymEntry {
                    word: "big".into(),
                    synonyms: vec!["large".into(), "huge".into()],
                },
            ]
        );
    }

    #[test]
    fn test_parse_rejects_bad_tokens() {
        let err = parse_synonyms_from_text("fox = vulpine\ncat = feline!").unwrap_err();
        assert!(matches!(err, SynonymError::Parse { line: 2, .. }));

        let err = parse_synonyms_from_text("f-o-x = vulpine").unwrap_err();
        assert!(matches!(err, SynonymError::Parse { line: 1, .. }));
    }

    #[test]
    fn test_parse_rejects_duplicates_within_call() {
        let err = parse_synonyms_from_text("fox = vulpine\nfox = reynard, Vulpine").unwrap_err();
        assert!(matches!(err, SynonymError::Parse { line: 2, .. }));

        let err = parse_synonyms_from_text("fox = fox").unwrap_err();
        assert!(matches!(err, SynonymError::Parse { line: 1, .. }));
    }

    #[test]
    fn test_parse_synonyms_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("synonyms.txt");
        fs::write(&path, "quick fast rapid\n").unwrap();

        let entries = parse_synonyms_from_file(&path).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].synonyms, vec!["fast", "rapid"]);

        assert!(matches!(
            parse_synonyms_from_file(&dir.path().join("missing.txt")),
            Err(SynonymError::IoError(_))
        ));
    }

    #[test]
    fn test_add_and_get_synonyms() {
        let pool = init_test_pool().unwrap();
        let conn = pool.get().unwrap();
        let mut lexicon = Lexicon::new();

        assert_eq!(add_synonyms(&conn, &mut lexicon, "Fox", &["Vulpine", "reynard"]).unwrap(), 2);
        assert_eq!(add_synonyms(&conn, &mut lexicon, "vulpine", &["fox"]).unwrap(), 0);
        assert_eq!(add_synonyms(&conn, &mut lexicon, "fox", &["fox"]).unwrap(), 0);

        assert_eq!(
            get_synonyms(&conn, &mut lexicon, "fox").unwrap(),
            vec!["reynard", "vulpine"]
        );
        assert_eq!(get_synonyms(&conn, &mut lexicon, "vulpine").unwrap(), vec!["fox"]);
        assert!(get_synonyms(&conn, &mut lexicon, "unknown").unwrap().is_empty());
    }

    #[test]
    fn test_add_synonyms_rejects_invalid_words_before_writing() {
        let pool = init_test_pool().unwrap();
        let conn = pool.get().unwrap();
        let mut lexicon = Lexicon::new();

        let err = add_synonyms(&conn, &mut lexicon, "fox", &["vulpine", "red fox"]).unwrap_err();
        assert!(matches!(err, SynonymError::InvalidWord(_)));
        assert!(get_synonyms(&conn, &mut lexicon, "fox").unwrap().is_empty());
    }

    #[test]
    fn test_remove_synonyms() {
        let pool = init_test_pool().unwrap();
        let conn = pool.get().unwrap();
        let mut lexicon = Lexicon::new();

        add_synonyms(&conn, &mut lexicon, "big", &["large", "huge", "vast"]).unwrap();

        assert_eq!(remove_synonyms(&conn, &mut lexicon, "large", &["big", "nothing"]).unwrap(), 1);
        assert_eq!(remove_all_synonyms(&conn, &mut lexicon, "big").unwrap(), 2);
        assert_eq!(remove_all_synonyms(&conn, &mut lexicon, "unknown").unwrap(), 0);

        add_synonyms(&conn, &mut lexicon, "big", &["large"]).unwrap();
        assert_eq!(clear_synonyms(&conn).unwrap(), 1);
    }

    #[test]
    fn test_reconcile_drops_shorter_side() {
        let edges = vec![
            ("big".to_string(), "large".to_string()),
            ("big".to_string(), "huge".to_string()),
        ];
        let listing = reconcile_listing(&edges);
        assert_eq!(
            listing,
            BTreeMap::from([("big".to_string(), vec!["huge".to_string(), "large".to_string()])])
        );
    }

    #[test]
    fn test_reconcile_lists_each_edge_once() {
        let edges = vec![
            ("big".to_string(), "huge".to_string()),
            ("big".to_string(), "large".to_string()),
            ("huge".to_string(), "large".to_string()),
            ("fox".to_string(), "vulpine".to_string()),
        ];
        let listing = reconcile_listing(&edges);

        let listed: usize = listing.values().map(Vec::len).sum();
        assert_eq!(listed, edges.len());
        assert_eq!(listing["fox"], vec!["vulpine".to_string()]);
        assert!(!listing.contains_key("vulpine"));
    }

    #[test]
    fn test_format_round_trips_through_parse() {
        let pool = init_test_pool().unwrap();
        let conn = pool.get().unwrap();
        let mut lexicon = Lexicon::new();
        add_synonyms(&conn, &mut lexicon, "fox", &["vulpine"]).unwrap();
        add_synonyms(&conn, &mut lexicon, "big", &["large", "huge"]).unwrap();

        let listing = get_all_synonyms(&conn).unwrap();
        let text = format_synonyms(&listing);
        let entries = parse_synonyms_from_text(&text).unwrap();

        let reparsed: BTreeMap<String, Vec<String>> = entries
            .into_iter()
            .map(|entry| (entry.word, entry.synonyms))
            .collect();
        assert_eq!(reparsed, listing);
    }
}
