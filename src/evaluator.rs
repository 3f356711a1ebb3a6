//! Relevance scoring of a query tree
//!
//! Each node scores its own field clauses, drops items holding excluded
//! terms, keeps only items matching every required term, then folds in its
//! subgroups with the node's logic. Scores are plain sums:
//!
//! | match                         | contribution               |
//! |-------------------------------|----------------------------|
//! | exact word                    | count × field weight       |
//! | synonym of the word           | count × weight × synonym   |
//! | stem, or word equal to stem   | count × weight × stem      |
//! | phrase                        | words in phrase × weight   |
//!
//! The keyword pseudo-field uses weight 1 because its counts already carry
//! the weight of the field they came from.

use rusqlite::Connection;
use std::collections::{BTreeSet, HashMap, HashSet};

use crate::backend::{ComparisonClause, ComparisonOperator, SearchBackend};
use crate::config::SearchConfig;
use crate::db::occurrences::get_term_counts;
use crate::db::{item_types, synonyms as synonym_db};
use crate::error::Result;
use crate::fields::{Field, FieldRegistry};
use crate::lexicon::Lexicon;
use crate::models::{
    FieldId, ItemId, ItemType, Logic, ScoreMap, TermId, TermState, KEYWORD_FIELD_ID,
};
use crate::normalizer::{is_numeric, normalize_terms, NormalizedTerms, TermTally};
use crate::query::SearchParameterSet;
use crate::stemmer::stem;
use crate::type_cache::ItemTypeCache;

/// One normalized term of a search, as reported by `search_terms`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SearchTerm {
    pub field_id: FieldId,
    pub text: String,
    pub state: TermState,
    pub is_phrase: bool,
}

/// Combine two score sets.
///
/// And keeps items present in both, summing their scores. Or keeps every
/// item, summing where both have one.
pub fn combine_scores(mut target: ScoreMap, source: ScoreMap, logic: Logic) -> ScoreMap {
    match logic {
        Logic::And => {
            target.retain(|item, _| source.contains_key(item));
            for (item, score) in target.iter_mut() {
                *score += source[item];
            }
        }
        Logic::Or => {
            for (item, score) in source {
                *target.entry(item).or_insert(0.0) += score;
            }
        }
    }
    target
}

fn add_scores(target: &mut ScoreMap, source: ScoreMap) {
    for (item, score) in source {
        *target.entry(item).or_insert(0.0) += score;
    }
}

enum Clause<'s> {
    Text(&'s str),
    Comparison(ComparisonOperator, &'s str),
}

/// Decide whether a string is matched as text or by comparison
fn classify<'s>(field: Option<&Field>, text: &'s str) -> Clause<'s> {
    let explicit = ComparisonOperator::parse_prefix(text);
    let comparison_field = field.is_some_and(|f| f.field_type.is_comparison());
    match explicit {
        Some((op, value)) => Clause::Comparison(op, value),
        None if comparison_field => Clause::Comparison(ComparisonOperator::Equal, text.trim()),
        None => Clause::Text(text),
    }
}

enum Exclusion {
    Word { field_id: FieldId, word: String },
    Phrase { field_id: FieldId, phrase: String },
}

/// Scoring state of one query node's own clauses
#[derive(Default)]
struct NodeState {
    scores: ScoreMap,
    tally: TermTally,
    seen: HashSet<(FieldId, bool, String)>,
    required_hits: HashMap<ItemId, HashSet<usize>>,
    exclusions: Vec<Exclusion>,
    searched_fields: BTreeSet<FieldId>,
    comparisons: Vec<ComparisonClause>,
    comparison_weight: i64,
}

impl NodeState {
    /// Register a term; false if the node already saw it
    fn admit(&mut self, field_id: FieldId, is_phrase: bool, text: &str) -> bool {
        self.seen.insert((field_id, is_phrase, text.to_string()))
    }

    fn add_hits(&mut self, state: TermState, hits: ScoreMap) {
        if state == TermState::Required {
            let index = self.tally.required - 1;
            for item in hits.keys() {
                self.required_hits.entry(*item).or_default().insert(index);
            }
        }
        add_scores(&mut self.scores, hits);
    }
}

pub struct QueryEvaluator<'a> {
    pub(crate) conn: &'a Connection,
    pub(crate) registry: &'a FieldRegistry,
    pub(crate) backend: &'a dyn SearchBackend,
    pub(crate) config: &'a SearchConfig,
    pub(crate) lexicon: &'a mut Lexicon,
    pub(crate) type_cache: &'a mut ItemTypeCache,
    pub(crate) debug_level: u32,
    pub(crate) terms: Vec<SearchTerm>,
    pub(crate) tally: TermTally,
}

impl<'a> QueryEvaluator<'a> {
    /// Score a query node and its subgroups
    pub fn raw_search(&mut self, node: &SearchParameterSet) -> Result<ScoreMap> {
        let clauses = node.clauses();

        let mut total = if clauses.is_empty() {
            None
        } else {
            Some(self.search_across_fields(&clauses, node.logic)?)
        };

        if node.logic == Logic::And && total.as_ref().is_some_and(ScoreMap::is_empty) {
            self.trace(|| "And node matched nothing on its own fields".to_string());
            return Ok(ScoreMap::new());
        }

        for subgroup in node.subgroups.iter().filter(|s| !s.is_empty()) {
            let scores = self.raw_search(subgroup)?;
            if node.logic == Logic::And && scores.is_empty() {
                self.trace(|| "And subgroup matched nothing".to_string());
                return Ok(ScoreMap::new());
            }
            total = Some(match total {
                Some(running) => combine_scores(running, scores, node.logic),
                None => scores,
            });
        }

        let mut scores = total.unwrap_or_default();
        if let Some(allowed) = &node.item_types {
            self.restrict_to_types(&mut scores, allowed)?;
        }
        Ok(scores)
    }

    /// Score this node's own clauses and apply exclusion and required-term
    /// filtering
    fn search_across_fields(
        &mut self,
        clauses: &[(FieldId, Vec<String>)],
        logic: Logic,
    ) -> Result<ScoreMap> {
        let mut node = NodeState::default();
        let registry = self.registry;

        for (field_id, strings) in clauses {
            let field = if *field_id == KEYWORD_FIELD_ID {
                None
            } else {
                match registry.get(*field_id) {
                    Some(field) => Some(field),
                    None => {
                        log::warn!("Ignoring search on unregistered field {}", field_id);
                        continue;
                    }
                }
            };

            for text in strings {
                match classify(field, text) {
                    Clause::Comparison(operator, value) => {
                        node.comparisons.push(ComparisonClause {
                            field_id: *field_id,
                            operator,
                            value: value.to_string(),
                        });
                        node.comparison_weight += field.map_or(1, |f| f.weight.max(1));
                        node.searched_fields.insert(*field_id);
                    }
                    Clause::Text(text) => {
                        let terms = normalize_terms(text, logic, false);
                        if terms.is_empty() {
                            continue;
                        }
                        self.search_text(&mut node, *field_id, field, &terms)?;
                    }
                }
            }
        }

        if !node.comparisons.is_empty() {
            let matches = self
                .backend
                .search_fields_for_comparison_matches(&node.comparisons, logic)?;
            let weight = node.comparison_weight.max(1) as f64;
            let compared: ScoreMap = matches.into_iter().map(|item| (item, weight)).collect();
            self.trace(|| format!("{} items matched comparisons", compared.len()));

            node.scores = if node.tally.inclusive > 0 {
                combine_scores(std::mem::take(&mut node.scores), compared, logic)
            } else {
                compared
            };
        }

        if node.scores.is_empty()
            && node.tally.required == 0
            && node.tally.excluded > 0
            && self.config.all_negative_fallback
        {
            self.load_all_items(&mut node)?;
        }

        self.apply_exclusions(&mut node)?;

        if node.tally.required > 0 {
            let required = node.tally.required;
            let hits = &node.required_hits;
            node.scores
                .retain(|item, _| hits.get(item).is_some_and(|matched| matched.len() == required));
        }

        self.tally.merge(node.tally);
        Ok(node.scores)
    }

    fn search_text(
        &mut self,
        node: &mut NodeState,
        field_id: FieldId,
        field: Option<&'a Field>,
        terms: &NormalizedTerms,
    ) -> Result<()> {
        let weight = field.map_or(1, |f| f.weight) as f64;

        for (word, state) in &terms.words {
            if !node.admit(field_id, false, word) {
                continue;
            }
            self.note_term(node, field_id, word, *state, false);

            if *state == TermState::Excluded {
                node.exclusions.push(Exclusion::Word {
                    field_id,
                    word: word.clone(),
                });
                continue;
            }

            let hits = self.word_scores(field_id, weight, word)?;
            self.trace(|| format!("{:?} in field {}: {} items", word, field_id, hits.len()));
            node.add_hits(*state, hits);
        }

        for (phrase, state) in &terms.phrases {
            if !node.admit(field_id, true, phrase) {
                continue;
            }
            self.note_term(node, field_id, phrase, *state, true);

            if *state == TermState::Excluded {
                node.exclusions.push(Exclusion::Phrase {
                    field_id,
                    phrase: phrase.clone(),
                });
                continue;
            }

            let hits = self.phrase_scores(field, phrase)?;
            self.trace(|| format!("\"{}\" in field {}: {} items", phrase, field_id, hits.len()));
            node.add_hits(*state, hits);
        }

        Ok(())
    }

    fn note_term(
        &mut self,
        node: &mut NodeState,
        field_id: FieldId,
        text: &str,
        state: TermState,
        is_phrase: bool,
    ) {
        node.tally.record(state);
        node.searched_fields.insert(field_id);
        self.terms.push(SearchTerm {
            field_id,
            text: text.to_string(),
            state,
            is_phrase,
        });
    }

    /// Scores for one word: exact rows, one-hop synonyms, and stem matches
    fn word_scores(&mut self, field_id: FieldId, weight: f64, word: &str) -> Result<ScoreMap> {
        let mut scores = ScoreMap::new();
        let synonym_weight = weight * self.config.synonym_weight;
        let stem_weight = weight * self.config.stem_weight;

        if let Some(word_id) = self.lexicon.lookup_word_id(self.conn, word)? {
            self.add_counts(&mut scores, TermId::Word(word_id), field_id, weight)?;

            for (synonym_id, _) in synonym_db::get_synonym_words(self.conn, word_id)? {
                self.add_counts(&mut scores, TermId::Word(synonym_id), field_id, synonym_weight)?;
            }
        }

        if self.config.stemming && !is_numeric(word) {
            let stemmed = stem(word);
            if let Some(stem_id) = self.lexicon.lookup_stem_id(self.conn, &stemmed)? {
                self.add_counts(&mut scores, TermId::Stem(stem_id), field_id, stem_weight)?;
            }
            if stemmed != word {
                if let Some(root_id) = self.lexicon.lookup_word_id(self.conn, &stemmed)? {
                    self.add_counts(&mut scores, TermId::Word(root_id), field_id, stem_weight)?;
                }
            }
        }

        Ok(scores)
    }

    fn add_counts(
        &self,
        scores: &mut ScoreMap,
        term: TermId,
        field_id: FieldId,
        multiplier: f64,
    ) -> Result<()> {
        for (item, count) in get_term_counts(self.conn, term, field_id)? {
            *scores.entry(item).or_insert(0.0) += count as f64 * multiplier;
        }
        Ok(())
    }

    /// Fields a phrase is looked up in: the field itself, or every keyword
    /// field for the keyword pseudo-field
    fn phrase_fields(&self, field: Option<&'a Field>) -> Vec<&'a Field> {
        match field {
            Some(field) => vec![field],
            None => self.registry.keyword_fields().collect(),
        }
    }

    fn phrase_scores(&self, field: Option<&'a Field>, phrase: &str) -> Result<ScoreMap> {
        let word_count = phrase.split_whitespace().count() as f64;
        let mut scores = ScoreMap::new();

        for field in self.phrase_fields(field) {
            if !field.is_indexed() {
                continue;
            }
            let contribution = word_count * field.weight as f64;
            for item in self.backend.search_field_for_phrase(field, phrase)? {
                *scores.entry(item).or_insert(0.0) += contribution;
            }
        }

        Ok(scores)
    }

    /// Items containing any excluded term are dropped outright
    fn apply_exclusions(&mut self, node: &mut NodeState) -> Result<()> {
        if node.scores.is_empty() {
            return Ok(());
        }

        for exclusion in &node.exclusions {
            let excluded: HashSet<ItemId> = match exclusion {
                Exclusion::Word { field_id, word } => {
                    match self.lexicon.lookup_word_id(self.conn, word)? {
                        Some(word_id) => {
                            get_term_counts(self.conn, TermId::Word(word_id), *field_id)?
                                .into_iter()
                                .map(|(item, _)| item)
                                .collect()
                        }
                        None => HashSet::new(),
                    }
                }
                Exclusion::Phrase { field_id, phrase } => {
                    let field = self.registry.get(*field_id);
                    let mut items = HashSet::new();
                    for field in self.phrase_fields(field) {
                        items.extend(self.backend.search_field_for_phrase(field, phrase)?);
                    }
                    items
                }
            };
            node.scores.retain(|item, _| !excluded.contains(item));
        }

        Ok(())
    }

    /// Seed scores with every item of the searched fields' types, including
    /// fields only compared
    fn load_all_items(&mut self, node: &mut NodeState) -> Result<()> {
        let types: BTreeSet<ItemType> = node
            .searched_fields
            .iter()
            .flat_map(|field_id| self.registry.item_types_for(*field_id))
            .collect();
        let types: Vec<ItemType> = types.into_iter().collect();

        let items = item_types::get_items_of_types(self.conn, &types)?;
        self.trace(|| {
            format!(
                "Nothing matched or required; starting from {} items of types {:?}",
                items.len(),
                types
            )
        });

        for (item, item_type) in items {
            self.type_cache.insert(item, item_type);
            node.scores.insert(item, 1.0);
        }
        Ok(())
    }

    fn restrict_to_types(
        &mut self,
        scores: &mut ScoreMap,
        allowed: &BTreeSet<ItemType>,
    ) -> Result<()> {
        let types = self
            .type_cache
            .types_for(self.conn, scores.keys(), self.config.max_batch_size)?;
        scores.retain(|item, _| types.get(item).is_some_and(|t| allowed.contains(t)));
        Ok(())
    }

    /// Per-query detail, raised to debug level by a `DBUGLVL` directive
    fn trace(&self, message: impl FnOnce() -> String) {
        if self.debug_level > 0 {
            log::debug!("[search] {}", message());
        } else if log::log_enabled!(log::Level::Trace) {
            log::trace!("[search] {}", message());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::FieldType;

    fn scores(pairs: &[(ItemId, f64)]) -> ScoreMap {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_combine_scores_and() {
        let combined = combine_scores(
            scores(&[(1, 1.0), (2, 2.0)]),
            scores(&[(2, 3.0), (3, 4.0)]),
            Logic::And,
        );
        assert_eq!(combined, scores(&[(2, 5.0)]));
    }

    #[test]
    fn test_combine_scores_or() {
        let combined = combine_scores(
            scores(&[(1, 1.0), (2, 2.0)]),
            scores(&[(2, 3.0), (3, 4.0)]),
            Logic::Or,
        );
        assert_eq!(combined, scores(&[(1, 1.0), (2, 5.0), (3, 4.0)]));
    }

    #[test]
    fn test_classify() {
        let title = Field::new(1, "Title", FieldType::Text, 10, [1]);
        let price = Field::new(2, "Price", FieldType::Numeric, 1, [1]);

        assert!(matches!(classify(Some(&title), "red fox"), Clause::Text(_)));
        assert!(matches!(
            classify(Some(&title), "^Red"),
            Clause::Comparison(ComparisonOperator::StartsWith, "Red")
        ));
        assert!(matches!(
            classify(Some(&price), " 25 "),
            Clause::Comparison(ComparisonOperator::Equal, "25")
        ));
        assert!(matches!(
            classify(Some(&price), "<= 25"),
            Clause::Comparison(ComparisonOperator::LessOrEqual, "25")
        ));
        assert!(matches!(classify(None, "-dog"), Clause::Text(_)));
    }
}
