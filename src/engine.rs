use regex::Regex;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, LazyLock};
use std::time::{Duration, Instant};

use crate::backend::SearchBackend;
use crate::config::SearchConfig;
use crate::db::connection::DbPool;
use crate::db::{item_types, lexicon as lexicon_db, occurrences, synonyms as synonym_db};
use crate::error::Result;
use crate::evaluator::{QueryEvaluator, SearchTerm};
use crate::fields::FieldRegistry;
use crate::indexer::Indexer;
use crate::lexicon::Lexicon;
use crate::models::{FieldId, IndexStats, ItemId, ItemType, RankedItems, TypedResults};
use crate::normalizer::TermTally;
use crate::query::SearchParameterSet;
use crate::ranker::{flatten_ranked, Ranker, ResultFilter};
use crate::synonyms;
use crate::type_cache::ItemTypeCache;

static DEBUG_DIRECTIVE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"DBUGLVL=(\d+)").expect("valid debug directive regex"));

/// Bookkeeping of the most recent search
#[derive(Debug, Default)]
struct LastSearch {
    terms: Vec<SearchTerm>,
    tally: TermTally,
    total: usize,
    per_type: BTreeMap<ItemType, usize>,
    duration: Duration,
}

/// Field-weighted relevance search over an item catalog.
///
/// The engine owns the field registry, the lexicon and item type caches, and
/// the result filters. Item content and the lookups the inverted index cannot
/// answer come from the injected backend.
pub struct SearchEngine {
    pool: DbPool,
    registry: FieldRegistry,
    config: SearchConfig,
    backend: Arc<dyn SearchBackend>,
    lexicon: Lexicon,
    type_cache: ItemTypeCache,
    filters: Vec<ResultFilter>,
    last: LastSearch,
}

impl SearchEngine {
    pub fn new(
        pool: DbPool,
        registry: FieldRegistry,
        backend: Arc<dyn SearchBackend>,
        config: SearchConfig,
    ) -> Result<Self> {
        config.validate()?;
        log::info!("Search engine ready with {} fields", registry.len());

        Ok(Self {
            pool,
            registry,
            config,
            backend,
            lexicon: Lexicon::new(),
            type_cache: ItemTypeCache::new(),
            filters: Vec::new(),
            last: LastSearch::default(),
        })
    }

    pub fn registry(&self) -> &FieldRegistry {
        &self.registry
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    // ---------------------------------------------------------------
    // Searching
    // ---------------------------------------------------------------

    /// Ranked results, all item types concatenated in type order
    pub fn search(&mut self, params: &SearchParameterSet) -> Result<RankedItems> {
        let results = self.search_all(params)?;
        Ok(flatten_ranked(&results))
    }

    /// Ranked results partitioned by item type
    pub fn search_all(&mut self, params: &SearchParameterSet) -> Result<TypedResults> {
        let started = Instant::now();
        self.last = LastSearch::default();

        let mut params = params.clone();
        let debug_level = strip_debug_directives(&mut params);
        if debug_level > 0 {
            log::debug!("Search debug level {}", debug_level);
        }

        let conn = self.pool.get()?;
        let mut evaluator = QueryEvaluator {
            conn: &conn,
            registry: &self.registry,
            backend: self.backend.as_ref(),
            config: &self.config,
            lexicon: &mut self.lexicon,
            type_cache: &mut self.type_cache,
            debug_level,
            terms: Vec::new(),
            tally: TermTally::default(),
        };
        let scores = evaluator.raw_search(&params)?;
        let terms = evaluator.terms;
        let tally = evaluator.tally;

        let mut ranker = Ranker {
            conn: &conn,
            registry: &self.registry,
            backend: self.backend.as_ref(),
            config: &self.config,
            type_cache: &mut self.type_cache,
            filters: &self.filters,
        };
        let sorted = ranker.sort_scores(scores, &params.sort)?;

        let duration = started.elapsed();
        log::debug!(
            "Search matched {} items across {} types in {:?}",
            sorted.total,
            sorted.by_type.len(),
            duration
        );

        self.last = LastSearch {
            terms,
            tally,
            total: sorted.total,
            per_type: sorted
                .by_type
                .iter()
                .map(|(item_type, ranked)| (*item_type, ranked.len()))
                .collect(),
            duration,
        };
        Ok(sorted.by_type)
    }

    /// Match count of the last search, overall or for one item type
    pub fn number_of_results(&self, item_type: Option<ItemType>) -> usize {
        match item_type {
            Some(item_type) => self.last.per_type.get(&item_type).copied().unwrap_or(0),
            None => self.last.total,
        }
    }

    /// Normalized terms of the last search
    pub fn search_terms(&self) -> &[SearchTerm] {
        &self.last.terms
    }

    /// Excluded, inclusive and required term counts of the last search,
    /// summed over every query node
    pub fn search_tally(&self) -> TermTally {
        self.last.tally
    }

    pub fn search_time(&self) -> Duration {
        self.last.duration
    }

    /// Register a predicate; items it returns true for are dropped from
    /// every later search
    pub fn add_result_filter(&mut self, filter: impl Fn(ItemId) -> bool + 'static) {
        self.filters.push(Box::new(filter));
    }

    // ---------------------------------------------------------------
    // Indexing
    // ---------------------------------------------------------------

    pub fn update_for_item(&mut self, item_id: ItemId, item_type: ItemType) -> Result<usize> {
        let conn = self.pool.get()?;
        self.indexer(&conn).update_for_item(item_id, item_type)
    }

    /// Index a batch of items from the backend. Returns the last id
    /// processed, so callers can continue from the next one.
    pub fn update_for_items(&mut self, start_id: ItemId, count: usize) -> Result<Option<ItemId>> {
        let conn = self.pool.get()?;
        self.indexer(&conn).update_for_items(start_id, count)
    }

    pub fn drop_item(&mut self, item_id: ItemId) -> Result<usize> {
        let conn = self.pool.get()?;
        self.indexer(&conn).drop_item(item_id)
    }

    pub fn drop_field(&mut self, field_id: FieldId) -> Result<usize> {
        let conn = self.pool.get()?;
        self.indexer(&conn).drop_field(field_id)
    }

    fn indexer<'a>(&'a mut self, conn: &'a rusqlite::Connection) -> Indexer<'a> {
        Indexer {
            conn,
            registry: &self.registry,
            backend: self.backend.as_ref(),
            config: &self.config,
            lexicon: &mut self.lexicon,
            type_cache: &mut self.type_cache,
        }
    }

    // ---------------------------------------------------------------
    // Synonyms
    // ---------------------------------------------------------------

    pub fn add_synonyms<S: AsRef<str>>(&mut self, word: &str, synonyms: &[S]) -> Result<usize> {
        let conn = self.pool.get()?;
        Ok(synonyms::add_synonyms(&conn, &mut self.lexicon, word, synonyms)?)
    }

    pub fn remove_synonyms<S: AsRef<str>>(&mut self, word: &str, synonyms: &[S]) -> Result<usize> {
        let conn = self.pool.get()?;
        Ok(synonyms::remove_synonyms(&conn, &mut self.lexicon, word, synonyms)?)
    }

    pub fn remove_all_synonyms(&mut self, word: &str) -> Result<usize> {
        let conn = self.pool.get()?;
        Ok(synonyms::remove_all_synonyms(&conn, &mut self.lexicon, word)?)
    }

    pub fn clear_synonyms(&mut self) -> Result<usize> {
        let conn = self.pool.get()?;
        let removed = synonyms::clear_synonyms(&conn)?;
        log::info!("Cleared {} synonym edges", removed);
        Ok(removed)
    }

    pub fn get_synonyms(&mut self, word: &str) -> Result<Vec<String>> {
        let conn = self.pool.get()?;
        Ok(synonyms::get_synonyms(&conn, &mut self.lexicon, word)?)
    }

    pub fn get_all_synonyms(&self) -> Result<BTreeMap<String, Vec<String>>> {
        let conn = self.pool.get()?;
        Ok(synonyms::get_all_synonyms(&conn)?)
    }

    /// Load `word = a, b` lines. Nothing is written unless the whole text
    /// parses. Returns the number of new edges.
    pub fn load_synonyms_from_text(&mut self, text: &str) -> Result<usize> {
        let entries = synonyms::parse_synonyms_from_text(text)?;
        let conn = self.pool.get()?;

        let mut added = 0;
        for entry in &entries {
            added += synonyms::add_synonyms(&conn, &mut self.lexicon, &entry.word, &entry.synonyms)?;
        }

        log::info!("Loaded {} synonym entries ({} new edges)", entries.len(), added);
        Ok(added)
    }

    pub fn load_synonyms_from_file(&mut self, path: &Path) -> Result<usize> {
        let entries = synonyms::parse_synonyms_from_file(path)?;
        let conn = self.pool.get()?;

        let mut added = 0;
        for entry in &entries {
            added += synonyms::add_synonyms(&conn, &mut self.lexicon, &entry.word, &entry.synonyms)?;
        }

        log::info!(
            "Loaded {} synonym entries from {:?} ({} new edges)",
            entries.len(),
            path,
            added
        );
        Ok(added)
    }

    /// Every synonym edge in the format `load_synonyms_from_text` reads
    pub fn export_synonyms_to_text(&self) -> Result<String> {
        Ok(synonyms::format_synonyms(&self.get_all_synonyms()?))
    }

    // ---------------------------------------------------------------
    // Maintenance
    // ---------------------------------------------------------------

    /// Forget cached word, stem and item type lookups
    pub fn clear_caches(&mut self) {
        self.lexicon.clear();
        self.type_cache.clear();
        log::debug!("Search caches cleared");
    }

    pub fn index_stats(&self) -> Result<IndexStats> {
        let conn = self.pool.get()?;
        let (words, stems) = lexicon_db::count_terms(&conn)?;

        Ok(IndexStats {
            words,
            stems,
            occurrences: occurrences::count_occurrences(&conn)?,
            items: item_types::count_items(&conn)?,
            synonym_edges: synonym_db::count_edges(&conn)?,
        })
    }
}

/// Remove `DBUGLVL=<n>` directives from the keywords of a query tree.
/// Returns the highest level found, 0 if none.
fn strip_debug_directives(node: &mut SearchParameterSet) -> u32 {
    let mut level = 0;

    for keywords in node.keywords.iter_mut() {
        if !DEBUG_DIRECTIVE.is_match(keywords) {
            continue;
        }
        for caps in DEBUG_DIRECTIVE.captures_iter(keywords) {
            level = level.max(caps[1].parse().unwrap_or(u32::MAX));
        }
        *keywords = DEBUG_DIRECTIVE.replace_all(keywords, " ").trim().to_string();
    }

    for subgroup in node.subgroups.iter_mut() {
        level = level.max(strip_debug_directives(subgroup));
    }
    level
}
