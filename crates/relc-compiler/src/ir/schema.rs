//! Relation schema — ordered list of typed columns per plan node

use relc_core::ColumnName;
use relc_sql::SqlType;
use serde::{Deserialize, Serialize};

/// Nullability state of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Nullability {
    /// Guaranteed not null
    NotNull,
    /// May contain nulls
    Nullable,
    /// Nullability could not be determined
    Unknown,
}

/// A named, typed output column
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypedColumn {
    /// Column name
    pub name: ColumnName,
    /// Declared or derived SQL type
    pub sql_type: SqlType,
    /// Nullability state
    pub nullability: Nullability,
}

impl TypedColumn {
    /// Create a nullable column
    pub fn new(name: ColumnName, sql_type: SqlType) -> Self {
        Self {
            name,
            sql_type,
            nullability: Nullability::Nullable,
        }
    }
}

/// Schema of a plan node's output
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelSchema {
    /// Ordered list of output columns
    pub columns: Vec<TypedColumn>,
}

impl RelSchema {
    /// Create a schema from a list of typed columns
    pub fn new(columns: Vec<TypedColumn>) -> Self {
        Self { columns }
    }

    /// Build a schema from `(name, type)` pairs
    pub fn from_pairs<'a>(
        pairs: impl IntoIterator<Item = (&'a str, SqlType)>,
    ) -> relc_core::CoreResult<Self> {
        let columns = pairs
            .into_iter()
            .map(|(name, ty)| Ok(TypedColumn::new(ColumnName::new(name)?, ty)))
            .collect::<relc_core::CoreResult<Vec<_>>>()?;
        Ok(Self { columns })
    }

    /// Find a column by exact name
    pub fn find_column(&self, name: &str) -> Option<&TypedColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Whether a column with this name exists
    pub fn contains(&self, name: &str) -> bool {
        self.find_column(name).is_some()
    }

    /// How many columns carry this name; join outputs may repeat one
    pub fn occurrences(&self, name: &str) -> usize {
        self.columns.iter().filter(|c| c.name == name).count()
    }

    /// Merge two schemas (e.g. for JOIN output)
    pub fn merge(left: &RelSchema, right: &RelSchema) -> Self {
        let mut columns = left.columns.clone();
        columns.extend(right.columns.iter().cloned());
        Self { columns }
    }

    /// Return a new schema with all columns set to the given nullability
    pub fn with_nullability(&self, nullability: Nullability) -> Self {
        Self {
            columns: self
                .columns
                .iter()
                .map(|c| TypedColumn {
                    nullability,
                    ..c.clone()
                })
                .collect(),
        }
    }

    /// Number of columns
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Whether the schema has no columns
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Column names in order
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// First name that occurs more than once, if any
    pub fn first_duplicate(&self) -> Option<&str> {
        let mut seen = std::collections::HashSet::new();
        self.columns
            .iter()
            .map(|c| c.name.as_str())
            .find(|name| !seen.insert(*name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_column_is_exact() {
        let schema =
            RelSchema::from_pairs([("id", SqlType::int64()), ("name", SqlType::String)]).unwrap();
        assert!(schema.find_column("id").is_some());
        assert!(schema.find_column("ID").is_none());
        assert_eq!(schema.column_names(), vec!["id", "name"]);
    }

    #[test]
    fn test_merge_and_duplicates() {
        let left = RelSchema::from_pairs([("foo_id", SqlType::String)]).unwrap();
        let right =
            RelSchema::from_pairs([("foo_id", SqlType::String), ("v", SqlType::Boolean)]).unwrap();
        let merged = RelSchema::merge(&left, &right);
        assert_eq!(merged.len(), 3);
        assert_eq!(merged.first_duplicate(), Some("foo_id"));
        assert_eq!(left.first_duplicate(), None);
    }

    #[test]
    fn test_with_nullability() {
        let schema = RelSchema::from_pairs([("id", SqlType::int64())]).unwrap();
        let schema = schema.with_nullability(Nullability::NotNull);
        assert_eq!(schema.columns[0].nullability, Nullability::NotNull);
    }

    #[test]
    fn test_empty_column_name_rejected() {
        assert!(RelSchema::from_pairs([("", SqlType::int64())]).is_err());
    }
}
