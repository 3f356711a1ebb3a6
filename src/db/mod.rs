pub mod connection;
pub mod item_types;
pub mod lexicon;
pub mod migrations;
pub mod occurrences;
pub mod synonyms;

pub use connection::DbPool;
pub use occurrences::Occurrence;
