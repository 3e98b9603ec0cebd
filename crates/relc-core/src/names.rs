//! Strongly-typed names for tables and columns

use crate::newtype_string::define_newtype_string;

define_newtype_string! {
    /// Name of a physical or unbound table, possibly schema-qualified (`schema.table`).
    pub struct TableName;
}

define_newtype_string! {
    /// Name of a column in a relation's output schema.
    pub struct ColumnName;
}

impl TableName {
    /// Split into `(schema, table)` components.
    ///
    /// Uses the last `.` as the separator; unqualified names have no schema.
    pub fn split(&self) -> (Option<&str>, &str) {
        match self.0.rfind('.') {
            Some(pos) => (Some(&self.0[..pos]), &self.0[pos + 1..]),
            None => (None, &self.0),
        }
    }
}
