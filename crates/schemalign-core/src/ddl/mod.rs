//! Structured DDL statements and their text rendering.
//!
//! A delta produces [`Statement`] values with every constraint and index
//! name already resolved. The [`DdlWriter`] turns them into SQL text
//! according to the [`MigratorRules`].

mod rules;
mod writer;

pub use rules::{Formatting, MigratorRules, TableCreation};
pub use writer::DdlWriter;

use crate::identifier::Identifier;
use crate::schema::{Column, ForeignKey, Index, Table};

/// One schema change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    /// Create a table with its columns, primary key and foreign keys.
    /// Indexes are created by separate [`Statement::CreateIndex`] values.
    CreateTable(Box<Table>),
    /// Drop a table if it exists.
    DropTable {
        /// Table to drop.
        table: Identifier,
    },
    /// Add a column.
    AddColumn {
        /// Target table.
        table: Identifier,
        /// New column.
        column: Column,
    },
    /// Change type, nullability or default of a column.
    AlterColumn {
        /// Target table.
        table: Identifier,
        /// Definition before the change.
        from: Column,
        /// Definition after the change.
        to: Column,
    },
    /// Drop a column.
    DropColumn {
        /// Target table.
        table: Identifier,
        /// Column name.
        column: String,
    },
    /// Create an index.
    CreateIndex {
        /// Target table.
        table: Identifier,
        /// Resolved index name.
        name: String,
        /// Index definition.
        index: Index,
    },
    /// Drop an index.
    DropIndex {
        /// Table owning the index.
        table: Identifier,
        /// Resolved index name.
        name: String,
    },
    /// Add a foreign key constraint.
    AddForeignKey {
        /// Target table.
        table: Identifier,
        /// Resolved constraint name.
        name: String,
        /// Constraint definition.
        foreign_key: ForeignKey,
    },
    /// Drop a foreign key constraint.
    DropForeignKey {
        /// Target table.
        table: Identifier,
        /// Resolved constraint name.
        name: String,
    },
    /// Add a primary key constraint.
    AddPrimaryKey {
        /// Target table.
        table: Identifier,
        /// Constraint name.
        name: String,
        /// Key columns, in order.
        columns: Vec<String>,
    },
    /// Drop a primary key constraint.
    DropPrimaryKey {
        /// Target table.
        table: Identifier,
        /// Constraint name.
        name: String,
        /// Tolerate an already missing constraint.
        if_exists: bool,
    },
}

impl Statement {
    /// Returns the full creation of `table`: the table itself followed by
    /// its indexes.
    #[must_use]
    pub fn create_all(table: &Table) -> Vec<Self> {
        let mut statements = vec![Self::CreateTable(Box::new(table.clone()))];
        statements.extend(table.indexes().iter().map(|index| Self::CreateIndex {
            table: table.identifier().clone(),
            name: index.effective_name(table),
            index: index.clone(),
        }));
        statements
    }

    /// The table the statement applies to.
    #[must_use]
    pub fn table(&self) -> &Identifier {
        match self {
            Self::CreateTable(table) => table.identifier(),
            Self::DropTable { table }
            | Self::AddColumn { table, .. }
            | Self::AlterColumn { table, .. }
            | Self::DropColumn { table, .. }
            | Self::CreateIndex { table, .. }
            | Self::DropIndex { table, .. }
            | Self::AddForeignKey { table, .. }
            | Self::DropForeignKey { table, .. }
            | Self::AddPrimaryKey { table, .. }
            | Self::DropPrimaryKey { table, .. } => table,
        }
    }

    /// Whether the statement removes something.
    #[must_use]
    pub const fn is_drop(&self) -> bool {
        matches!(
            self,
            Self::DropTable { .. }
                | Self::DropColumn { .. }
                | Self::DropIndex { .. }
                | Self::DropForeignKey { .. }
                | Self::DropPrimaryKey { .. }
        )
    }
}
