//! Search field descriptors and their registry
//!
//! Fields are registered once, before the engine is built. The engine owns
//! the registry afterwards and never changes it.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

use crate::models::{FieldId, ItemType, KEYWORD_FIELD_ID};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum FieldError {
    #[error("Field id {0} is reserved for keyword search")]
    ReservedId(FieldId),
    #[error("Field already registered: {0}")]
    AlreadyRegistered(FieldId),
    #[error("Field {0} has negative weight {1}")]
    NegativeWeight(FieldId, i64),
    #[error("Field {0} applies to no item types")]
    NoItemTypes(FieldId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldType {
    Text,
    Numeric,
    Date,
    DateRange,
}

impl FieldType {
    /// Values of this type are matched with relational operators
    pub fn is_comparison(self) -> bool {
        !matches!(self, FieldType::Text)
    }
}

/// A search-relevant attribute of an item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    pub id: FieldId,
    pub name: String,
    pub field_type: FieldType,
    /// Relevance multiplier; 0 turns indexing off for the field
    pub weight: i64,
    pub item_types: BTreeSet<ItemType>,
    pub in_keyword_search: bool,
}

impl Field {
    pub fn new(
        id: FieldId,
        name: impl Into<String>,
        field_type: FieldType,
        weight: i64,
        item_types: impl IntoIterator<Item = ItemType>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            field_type,
            weight,
            item_types: item_types.into_iter().collect(),
            in_keyword_search: false,
        }
    }

    /// Include this field's terms in keyword search
    pub fn in_keyword_search(mut self) -> Self {
        self.in_keyword_search = true;
        self
    }

    pub fn applies_to(&self, item_type: ItemType) -> bool {
        self.item_types.contains(&item_type)
    }

    pub fn is_indexed(&self) -> bool {
        self.weight > 0
    }
}

#[derive(Debug, Clone, Default)]
pub struct FieldRegistry {
    fields: BTreeMap<FieldId, Field>,
}

impl FieldRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a field. Rejects reserved or duplicate ids and bad weights.
    pub fn add_field(&mut self, field: Field) -> Result<&mut Self, FieldError> {
        if field.id == KEYWORD_FIELD_ID {
            return Err(FieldError::ReservedId(field.id));
        }
        if self.fields.contains_key(&field.id) {
            return Err(FieldError::AlreadyRegistered(field.id));
        }
        if field.weight < 0 {
            return Err(FieldError::NegativeWeight(field.id, field.weight));
        }
        if field.item_types.is_empty() {
            return Err(FieldError::NoItemTypes(field.id));
        }

        self.fields.insert(field.id, field);
        Ok(self)
    }

    pub fn get(&self, id: FieldId) -> Option<&Field> {
        self.fields.get(&id)
    }

    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.values()
    }

    /// Fields that get indexed for an item of this type
    pub fn indexed_fields_for(&self, item_type: ItemType) -> impl Iterator<Item = &Field> {
        self.fields
            .values()
            .filter(move |f| f.is_indexed() && f.applies_to(item_type))
    }

    pub fn keyword_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.values().filter(|f| f.in_keyword_search)
    }

    /// Item types a search on `field_id` can return
    pub fn item_types_for(&self, field_id: FieldId) -> BTreeSet<ItemType> {
        if field_id == KEYWORD_FIELD_ID {
            return self
                .keyword_fields()
                .flat_map(|f| f.item_types.iter().copied())
                .collect();
        }
        self.get(field_id)
            .map(|f| f.item_types.clone())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }
}
