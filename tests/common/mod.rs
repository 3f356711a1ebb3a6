#![allow(dead_code)]

use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use fieldrank::{
    init_memory_pool, BackendError, ComparisonClause, ComparisonOperator, Field, FieldContent,
    FieldId, FieldRegistry, FieldType, ItemId, ItemType, Logic, SearchBackend, SearchConfig,
    SearchEngine,
};

pub const PRODUCT: ItemType = 1;
pub const ARTICLE: ItemType = 2;

pub const TITLE: FieldId = 1;
pub const BODY: FieldId = 2;
pub const PRICE: FieldId = 3;

/// Item catalog held in memory. Phrase matches are case-insensitive
/// substring matches; comparisons parse numbers when both sides are numeric.
#[derive(Default)]
pub struct MemoryCatalog {
    items: RefCell<BTreeMap<ItemId, ItemType>>,
    content: RefCell<HashMap<(ItemId, FieldId), FieldContent>>,
}

impl MemoryCatalog {
    pub fn add_item(&self, item_id: ItemId, item_type: ItemType, fields: &[(FieldId, &str)]) {
        self.items.borrow_mut().insert(item_id, item_type);
        let mut content = self.content.borrow_mut();
        for (field_id, text) in fields {
            content.insert((item_id, *field_id), FieldContent::from(*text));
        }
    }

    pub fn set_content(&self, item_id: ItemId, field_id: FieldId, value: impl Into<FieldContent>) {
        self.content
            .borrow_mut()
            .insert((item_id, field_id), value.into());
    }

    fn strings_of(&self, item_id: ItemId, field_id: FieldId) -> Vec<String> {
        self.content
            .borrow()
            .get(&(item_id, field_id))
            .map(|content| content.strings().into_iter().map(str::to_string).collect())
            .unwrap_or_default()
    }

    fn matches(&self, item_id: ItemId, clause: &ComparisonClause) -> bool {
        self.strings_of(item_id, clause.field_id)
            .iter()
            .any(|value| compare(value, clause.operator, &clause.value))
    }
}

fn compare(value: &str, operator: ComparisonOperator, target: &str) -> bool {
    let ordering = match (value.trim().parse::<f64>(), target.parse::<f64>()) {
        (Ok(a), Ok(b)) => a.partial_cmp(&b),
        _ => Some(value.to_lowercase().cmp(&target.to_lowercase())),
    };
    match operator {
        ComparisonOperator::StartsWith => value.to_lowercase().starts_with(&target.to_lowercase()),
        ComparisonOperator::EndsWith => value.to_lowercase().ends_with(&target.to_lowercase()),
        ComparisonOperator::Greater => ordering == Some(Ordering::Greater),
        ComparisonOperator::GreaterOrEqual => ordering.is_some_and(Ordering::is_ge),
        ComparisonOperator::Equal => ordering == Some(Ordering::Equal),
        ComparisonOperator::LessOrEqual => ordering.is_some_and(Ordering::is_le),
        ComparisonOperator::Less => ordering == Some(Ordering::Less),
        ComparisonOperator::NotEqual => ordering != Some(Ordering::Equal),
        _ => false,
    }
}

impl SearchBackend for MemoryCatalog {
    fn field_content(&self, item_id: ItemId, field: &Field) -> Result<FieldContent, BackendError> {
        Ok(self
            .content
            .borrow()
            .get(&(item_id, field.id))
            .cloned()
            .unwrap_or_default())
    }

    fn search_field_for_phrase(
        &self,
        field: &Field,
        phrase: &str,
    ) -> Result<Vec<ItemId>, BackendError> {
        let phrase = phrase.to_lowercase();
        let items = self.items.borrow();
        Ok(items
            .keys()
            .copied()
            .filter(|item| {
                self.strings_of(*item, field.id)
                    .iter()
                    .any(|text| text.to_lowercase().contains(&phrase))
            })
            .collect())
    }

    fn search_fields_for_comparison_matches(
        &self,
        clauses: &[ComparisonClause],
        logic: Logic,
    ) -> Result<Vec<ItemId>, BackendError> {
        let items = self.items.borrow();
        Ok(items
            .keys()
            .copied()
            .filter(|item| match logic {
                Logic::And => clauses.iter().all(|clause| self.matches(*item, clause)),
                Logic::Or => clauses.iter().any(|clause| self.matches(*item, clause)),
            })
            .collect())
    }

    fn item_ids_sorted_by_field(
        &self,
        item_type: ItemType,
        field: &Field,
        descending: bool,
    ) -> Result<Vec<ItemId>, BackendError> {
        let items = self.items.borrow();
        let mut keyed: Vec<(f64, ItemId)> = items
            .iter()
            .filter(|(_, t)| **t == item_type)
            .filter_map(|(item, _)| {
                let value = self.strings_of(*item, field.id).first()?.parse::<f64>().ok()?;
                Some((value, *item))
            })
            .collect();
        keyed.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        if descending {
            keyed.reverse();
        }
        Ok(keyed.into_iter().map(|(_, item)| item).collect())
    }

    fn items_from(
        &self,
        start_id: ItemId,
        limit: usize,
    ) -> Result<Vec<(ItemId, ItemType)>, BackendError> {
        Ok(self
            .items
            .borrow()
            .range(start_id..)
            .take(limit)
            .map(|(item, item_type)| (*item, *item_type))
            .collect())
    }
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Title (weight 10, keyword searched), Body (weight 2, keyword searched)
/// and a comparison-only Price field
pub fn registry() -> FieldRegistry {
    let mut registry = FieldRegistry::new();
    registry
        .add_field(
            Field::new(TITLE, "Title", FieldType::Text, 10, [PRODUCT, ARTICLE]).in_keyword_search(),
        )
        .and_then(|r| {
            r.add_field(Field::new(BODY, "Body", FieldType::Text, 2, [ARTICLE]).in_keyword_search())
        })
        .and_then(|r| r.add_field(Field::new(PRICE, "Price", FieldType::Numeric, 0, [PRODUCT])))
        .expect("valid test fields");
    registry
}

pub fn engine_with(catalog: &Arc<MemoryCatalog>, config: SearchConfig) -> SearchEngine {
    init_logging();
    let pool = init_memory_pool().expect("in-memory pool");
    let backend: Arc<dyn SearchBackend> = catalog.clone();
    SearchEngine::new(pool, registry(), backend, config).expect("engine")
}

pub fn engine(catalog: &Arc<MemoryCatalog>) -> SearchEngine {
    engine_with(catalog, SearchConfig::default())
}

/// Three products: "Red Fox", "Red Dog", "Blue Cat"
pub fn animal_catalog() -> Arc<MemoryCatalog> {
    let catalog = MemoryCatalog::default();
    catalog.add_item(1, PRODUCT, &[(TITLE, "Red Fox"), (PRICE, "30")]);
    catalog.add_item(2, PRODUCT, &[(TITLE, "Red Dog"), (PRICE, "15")]);
    catalog.add_item(3, PRODUCT, &[(TITLE, "Blue Cat"), (PRICE, "50")]);
    Arc::new(catalog)
}

pub fn index_all(engine: &mut SearchEngine) {
    let mut next = 1;
    while let Some(last) = engine.update_for_items(next, 2).expect("index batch") {
        next = last + 1;
    }
}
