//! Entity grouping
//!
//! Turns a [`SourceTable`] into per-entity review lists. Rows missing either
//! field (after trimming) are dropped without error; only a schema missing
//! the columns altogether is an error.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::SourceColumns;
use super::error::{SourceError, SourceResult};
use super::loader::SourceTable;

/// One review row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub entity: String,
    pub text: String,
}

impl Record {
    /// Build a record, trimming both fields; `None` if either ends up empty
    pub fn new(entity: &str, text: &str) -> Option<Self> {
        let entity = entity.trim();
        let text = text.trim();
        if entity.is_empty() || text.is_empty() {
            return None;
        }
        Some(Self {
            entity: entity.to_string(),
            text: text.to_string(),
        })
    }
}

/// Reviews belonging to one entity, in source order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityReviews {
    pub entity: String,
    pub reviews: Vec<String>,
}

/// Reviews grouped by entity, entities in order of first appearance
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityGroups {
    groups: Vec<EntityReviews>,
    index: HashMap<String, usize>,
    /// Rows dropped because a field was empty
    pub dropped_rows: usize,
}

impl EntityGroups {
    /// Group records by entity
    ///
    /// Names that are equal after trimming land in the same group.
    pub fn from_records(records: impl IntoIterator<Item = Record>) -> Self {
        let mut groups = Self::default();
        for record in records {
            groups.push(record);
        }
        groups
    }

    fn push(&mut self, record: Record) {
        match self.index.get(&record.entity) {
            Some(&i) => self.groups[i].reviews.push(record.text),
            None => {
                self.index.insert(record.entity.clone(), self.groups.len());
                self.groups.push(EntityReviews {
                    entity: record.entity,
                    reviews: vec![record.text],
                });
            }
        }
    }

    /// Groups in first-seen order
    pub fn iter(&self) -> impl Iterator<Item = &EntityReviews> {
        self.groups.iter()
    }

    /// Look up one entity
    pub fn get(&self, entity: &str) -> Option<&EntityReviews> {
        self.index.get(entity).map(|&i| &self.groups[i])
    }

    /// Whether an entity is present
    pub fn contains(&self, entity: &str) -> bool {
        self.index.contains_key(entity)
    }

    /// Entity names in first-seen order
    pub fn entity_names(&self) -> Vec<&str> {
        self.groups.iter().map(|g| g.entity.as_str()).collect()
    }

    /// Number of entities
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Whether there are no entities
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Total number of reviews across all entities
    pub fn total_reviews(&self) -> usize {
        self.groups.iter().map(|g| g.reviews.len()).sum()
    }
}

/// Extract valid records from a table, in row order
///
/// Returns the records and the number of rows dropped.
pub fn extract_records(
    table: &SourceTable,
    columns: &SourceColumns,
) -> SourceResult<(Vec<Record>, usize)> {
    let entity_idx = table.column_index(&columns.entity);
    let text_idx = table.column_index(&columns.text);

    let (entity_idx, text_idx) = match (entity_idx, text_idx) {
        (Some(e), Some(t)) => (e, t),
        (e, t) => {
            let mut missing = Vec::new();
            if e.is_none() {
                missing.push(columns.entity.clone());
            }
            if t.is_none() {
                missing.push(columns.text.clone());
            }
            return Err(SourceError::MissingColumns(missing));
        }
    };

    let mut dropped = 0;
    let mut records = Vec::with_capacity(table.len());
    for row in &table.rows {
        let entity = row.get(entity_idx).and_then(|c| c.as_deref());
        let text = row.get(text_idx).and_then(|c| c.as_deref());
        match (entity, text) {
            (Some(entity), Some(text)) => match Record::new(entity, text) {
                Some(record) => records.push(record),
                None => dropped += 1,
            },
            _ => dropped += 1,
        }
    }

    Ok((records, dropped))
}

/// Group a table's rows by entity
pub fn group_by_entity(table: &SourceTable, columns: &SourceColumns) -> SourceResult<EntityGroups> {
    let (records, dropped) = extract_records(table, columns)?;
    let mut groups = EntityGroups::from_records(records);
    groups.dropped_rows = dropped;

    if dropped > 0 {
        tracing::debug!(dropped, "Dropped rows with an empty entity or text");
    }
    tracing::info!(
        entities = groups.len(),
        reviews = groups.total_reviews(),
        "Grouped reviews by entity"
    );
    Ok(groups)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(s: &str) -> Option<String> {
        Some(s.to_string())
    }

    fn table(rows: Vec<Vec<Option<String>>>) -> SourceTable {
        SourceTable::from_rows(
            "reviews.csv",
            vec!["game".to_string(), "text".to_string()],
            rows,
        )
    }

    fn columns() -> SourceColumns {
        SourceColumns::new("game", "text")
    }

    #[test]
    fn test_group_preserves_first_seen_order() {
        let t = table(vec![
            vec![cell("B"), cell("b1")],
            vec![cell("A"), cell("a1")],
            vec![cell("B"), cell("b2")],
        ]);
        let groups = group_by_entity(&t, &columns()).unwrap();

        assert_eq!(groups.entity_names(), vec!["B", "A"]);
        assert_eq!(groups.get("B").unwrap().reviews, vec!["b1", "b2"]);
        assert_eq!(groups.total_reviews(), 3);
    }

    #[test]
    fn test_group_drops_incomplete_rows() {
        let t = table(vec![
            vec![cell("A"), cell("  ")],
            vec![None, cell("orphan")],
            vec![cell("   "), cell("blank entity")],
            vec![cell(" A "), cell(" kept ")],
            vec![cell("A")],
        ]);
        let groups = group_by_entity(&t, &columns()).unwrap();

        assert_eq!(groups.len(), 1);
        assert_eq!(groups.get("A").unwrap().reviews, vec!["kept"]);
        assert_eq!(groups.dropped_rows, 4);
    }

    #[test]
    fn test_group_merges_names_equal_after_trim() {
        let t = table(vec![
            vec![cell("Clannad"), cell("one")],
            vec![cell("Clannad  "), cell("two")],
        ]);
        let groups = group_by_entity(&t, &columns()).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups.get("Clannad").unwrap().reviews.len(), 2);
    }

    #[test]
    fn test_missing_text_column() {
        let t = SourceTable::from_rows("r.csv", vec!["game".to_string()], vec![vec![cell("A")]]);
        let err = group_by_entity(&t, &columns()).unwrap_err();
        match err {
            SourceError::MissingColumns(cols) => assert_eq!(cols, vec!["text"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_both_columns() {
        let t = SourceTable::from_rows("r.csv", vec!["x".to_string()], vec![]);
        let err = extract_records(&t, &columns()).unwrap_err();
        assert!(matches!(err, SourceError::MissingColumns(ref c) if c.len() == 2));
    }

    #[test]
    fn test_empty_table_groups_to_nothing() {
        let groups = group_by_entity(&table(vec![]), &columns()).unwrap();
        assert!(groups.is_empty());
        assert_eq!(groups.total_reviews(), 0);
    }
}
