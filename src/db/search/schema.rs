//! Record schema descriptor
//!
//! Every dynamic field path coming from a request is validated against this
//! explicit descriptor before it reaches the query engine; nothing is
//! resolved by reflection. The descriptor also carries the record type's
//! optional full-text capability, which the glue probes and silently skips
//! when absent.

use super::query_builder::{push_text, BindValue};

/// Storage type of a scalar column, used to type-check filter values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    BigInt,
    Text,
    Timestamp,
}

/// Schema of one record table: its scalar columns, its JSON bag column and
/// its optional ranked-text column.
#[derive(Debug, Clone)]
pub struct RecordSchema {
    pub table: &'static str,
    pub data_column: &'static str,
    columns: &'static [(&'static str, ColumnType)],
    search_vector: Option<&'static str>,
}

impl RecordSchema {
    /// The records table behind stories and documents.
    pub fn records() -> Self {
        Self {
            table: "records",
            data_column: "data",
            columns: &[
                ("id", ColumnType::BigInt),
                ("slug", ColumnType::Text),
                ("title", ColumnType::Text),
                ("status", ColumnType::Text),
                ("date", ColumnType::Timestamp),
                ("date_created", ColumnType::Timestamp),
                ("date_last_modified", ColumnType::Timestamp),
            ],
            search_vector: Some("search_vector"),
        }
    }

    /// A schema without the full-text capability (the glue must degrade to
    /// ignoring free-text queries against it).
    #[cfg(test)]
    pub(crate) fn without_search(mut self) -> Self {
        self.search_vector = None;
        self
    }

    pub fn column(&self, name: &str) -> Option<ColumnType> {
        self.columns
            .iter()
            .find(|(col, _)| *col == name)
            .map(|(_, ty)| *ty)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.columns.iter().map(|(col, _)| *col)
    }

    /// Comma-separated select list for loading full records.
    pub fn select_columns(&self) -> String {
        self.columns
            .iter()
            .map(|(col, _)| format!("{}.{}", self.table, col))
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn supports_fulltext(&self) -> bool {
        self.search_vector.is_some()
    }

    pub fn search_vector_column(&self) -> Option<&'static str> {
        self.search_vector
    }

    /// Build the ranked-text match predicate for a free-text query, if this
    /// record type supports one.
    pub fn fulltext_clause(
        &self,
        query: &str,
        bind_params: &mut Vec<BindValue>,
    ) -> Option<String> {
        let column = self.search_vector?;
        let idx = push_text(bind_params, query.to_string());
        Some(format!(
            "{}.{} @@ plainto_tsquery(${})",
            self.table, column, idx
        ))
    }
}
