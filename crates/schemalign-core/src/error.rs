//! Error types for schema construction and delta rendering.

use crate::delta::UnsafeReason;
use crate::identifier::Identifier;

/// Errors raised while building a [`Table`](crate::schema::Table).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    /// Two columns share a name.
    #[error("Table '{table}' declares column '{column}' twice")]
    DuplicateColumn {
        /// Table being built.
        table: Identifier,
        /// Offending column.
        column: String,
    },

    /// Two indexes resolve to the same name.
    #[error("Table '{table}' declares index '{index}' twice")]
    DuplicateIndex {
        /// Table being built.
        table: Identifier,
        /// Offending index name.
        index: String,
    },

    /// Two foreign keys resolve to the same constraint name.
    #[error("Table '{table}' declares foreign key '{foreign_key}' twice")]
    DuplicateForeignKey {
        /// Table being built.
        table: Identifier,
        /// Offending constraint name.
        foreign_key: String,
    },

    /// A foreign key lists a different number of local and referenced
    /// columns.
    #[error(
        "Foreign key '{foreign_key}' on table '{table}' has {columns} columns but references {referenced}"
    )]
    ForeignKeyArity {
        /// Table being built.
        table: Identifier,
        /// Constraint name.
        foreign_key: String,
        /// Number of local columns.
        columns: usize,
        /// Number of referenced columns.
        referenced: usize,
    },

    /// An index is both declared and listed as ignored.
    #[error("Index '{index}' on table '{table}' is declared but also marked as ignored")]
    IgnoredIndexDeclared {
        /// Table being built.
        table: Identifier,
        /// Offending index name.
        index: String,
    },

    /// A column referenced by name does not exist on the table.
    #[error("Table '{table}' has no column '{column}'")]
    UnknownColumn {
        /// Table being built.
        table: Identifier,
        /// Missing column.
        column: String,
    },

    /// An index or foreign key lists no columns.
    #[error("{what} on table '{table}' must cover at least one column")]
    EmptyColumnList {
        /// Table being built.
        table: Identifier,
        /// What was declared empty ("Index", "Foreign key").
        what: &'static str,
    },

    /// Range partitioning declared without any expression.
    #[error("Table '{table}' is range partitioned but has no partition expressions")]
    EmptyPartitionExpressions {
        /// Table being built.
        table: Identifier,
    },
}

/// Errors raised when rendering statements from a delta.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeltaError {
    /// The delta was classified unsafe; no statements can be produced.
    #[error(
        "Refusing to render DDL for unsafe delta on '{table}': {}",
        .reasons.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
    )]
    UnsafeDelta {
        /// Table the delta belongs to.
        table: Identifier,
        /// Why the delta is unsafe.
        reasons: Vec<UnsafeReason>,
    },
}

/// Errors raised while replaying statements on a [`SchemaState`](crate::state::SchemaState).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    /// The statement targets a table that does not exist.
    #[error("Table '{0}' does not exist")]
    UnknownTable(Identifier),

    /// The statement would replace or duplicate an existing object.
    #[error("Table '{table}' already has {what} '{name}'")]
    AlreadyExists {
        /// Target table.
        table: Identifier,
        /// Kind of object ("column", "index", ...).
        what: &'static str,
        /// Object name.
        name: String,
    },

    /// The statement references an object the table does not have.
    #[error("Table '{table}' has no {what} '{name}'")]
    Missing {
        /// Target table.
        table: Identifier,
        /// Kind of object ("column", "index", ...).
        what: &'static str,
        /// Object name.
        name: String,
    },

    /// The statement would make a primary key column nullable.
    #[error("Column '{column}' of table '{table}' is part of its primary key and cannot be nullable")]
    NullablePrimaryKeyColumn {
        /// Target table.
        table: Identifier,
        /// Key column.
        column: String,
    },
}
