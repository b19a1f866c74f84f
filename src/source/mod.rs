//! Review source: loading, grouping and batching
//!
//! # Example
//!
//! ```ignore
//! use review_profiler::source::{SourceColumns, load_table, group_by_entity, make_batches};
//!
//! let table = load_table(Path::new("data/长评数据.xlsx"))?;
//! let groups = group_by_entity(&table, &SourceColumns::default())?;
//! for group in groups.iter() {
//!     let batches = make_batches(&group.reviews, 20);
//!     println!("{}: {} batches", group.entity, batches.len());
//! }
//! ```

pub mod batch;
pub mod error;
pub mod grouper;
pub mod loader;

use serde::{Deserialize, Serialize};

pub use batch::{batch_count, make_batches};
pub use error::{SourceError, SourceResult};
pub use grouper::{EntityGroups, EntityReviews, Record, extract_records, group_by_entity};
pub use loader::{SourceFormat, SourceTable, list_sources, load_table};

/// Default entity (game name) column
pub const DEFAULT_ENTITY_COLUMN: &str = "游戏名称";

/// Default review text column
pub const DEFAULT_TEXT_COLUMN: &str = "长评内容";

/// Names of the two required source columns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceColumns {
    /// Entity identifier column
    #[serde(default = "default_entity_column")]
    pub entity: String,
    /// Free-text review column
    #[serde(default = "default_text_column")]
    pub text: String,
}

fn default_entity_column() -> String {
    DEFAULT_ENTITY_COLUMN.to_string()
}

fn default_text_column() -> String {
    DEFAULT_TEXT_COLUMN.to_string()
}

impl Default for SourceColumns {
    fn default() -> Self {
        Self {
            entity: default_entity_column(),
            text: default_text_column(),
        }
    }
}

impl SourceColumns {
    pub fn new(entity: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            text: text.into(),
        }
    }
}
