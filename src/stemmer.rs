use rust_stemmers::{Algorithm, Stemmer};
use std::sync::LazyLock;

static ENGLISH: LazyLock<Stemmer> = LazyLock::new(|| Stemmer::create(Algorithm::English));

/// Porter stem of a normalized word
pub fn stem(word: &str) -> String {
    ENGLISH.stem(word).into_owned()
}

/// Stem of `word` if stemming changes it
pub fn distinct_stem(word: &str) -> Option<String> {
    let stemmed = stem(word);
    (stemmed != word && !stemmed.is_empty()).then_some(stemmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stem() {
        assert_eq!(stem("foxes"), "fox");
        assert_eq!(stem("running"), "run");
        assert_eq!(stem("red"), "red");
    }

    #[test]
    fn test_distinct_stem() {
        assert_eq!(distinct_stem("jumping").as_deref(), Some("jump"));
        assert_eq!(distinct_stem("fox"), None);
    }
}
