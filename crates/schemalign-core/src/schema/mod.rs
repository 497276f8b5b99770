//! The schema object model.
//!
//! These types describe one table the way the application declares it
//! (expected) or the way the catalog reports it (actual). Both sides use
//! the same model so they can be compared directly.

mod column;
mod column_type;
mod foreign_key;
mod index;
mod table;

pub use column::Column;
pub use column_type::ColumnType;
pub use foreign_key::{CascadeAction, ForeignKey};
pub use index::Index;
pub(crate) use table::is_plain_name;
pub use table::{
    ColumnHandle, ForeignKeyHandle, IndexHandle, PartitionStrategy, Partitioning, Table,
    TableBuilder, TableDefinition, DEFAULT_MAX_IDENTIFIER_LENGTH,
};

use serde::{Deserialize, Serialize};

use crate::identifier::Identifier;

/// A set of tables, as stored in a schema document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDocument {
    /// All tables.
    #[serde(default)]
    pub tables: Vec<Table>,
}

impl SchemaDocument {
    /// Creates an empty document.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a table.
    #[must_use]
    pub fn table(mut self, table: Table) -> Self {
        self.tables.push(table);
        self
    }

    /// Looks a table up by identifier.
    #[must_use]
    pub fn get_table(&self, identifier: &Identifier) -> Option<&Table> {
        self.tables.iter().find(|t| t.identifier() == identifier)
    }
}
