//! Error types for the migration orchestrator.

use std::path::PathBuf;

use schemalign_core::{DeltaError, Identifier, SchemaError, UnsafeReason};

/// Errors that can occur while planning or executing a migration.
#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    /// Foreign keys between the expected tables form a cycle.
    #[error(
        "Circular foreign key dependency between tables: {}",
        .tables.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
    )]
    CircularDependency {
        /// Tables taking part in the cycle.
        tables: Vec<Identifier>,
    },

    /// A table can only be reconciled by hand.
    #[error(
        "Table '{table}' cannot be migrated automatically: {}",
        .reasons.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
    )]
    UnsafeMigration {
        /// The table.
        table: Identifier,
        /// Why its delta is unsafe.
        reasons: Vec<UnsafeReason>,
    },

    /// The database rejected a statement. The transaction was rolled back.
    #[error("Statement {index} for table '{table}' failed: {source}\n  {sql}")]
    StatementFailed {
        /// Table the statement belongs to.
        table: Identifier,
        /// Position of the statement in the executed script.
        index: usize,
        /// The rejected statement.
        sql: String,
        /// Database error.
        source: sqlx::Error,
    },

    /// Cancellation was requested before the migration finished.
    #[error("Migration cancelled after {executed} statements; changes were rolled back")]
    Cancelled {
        /// Statements executed before cancellation.
        executed: usize,
    },

    /// The configured deadline passed before the migration finished.
    #[error("Migration deadline exceeded after {executed} statements; changes were rolled back")]
    DeadlineExceeded {
        /// Statements executed before the deadline.
        executed: usize,
    },

    /// Invalid table definition.
    #[error("Invalid schema: {0}")]
    Schema(#[from] SchemaError),

    /// Statements were requested from a delta that cannot produce them.
    #[error(transparent)]
    Delta(#[from] DeltaError),

    /// Database error outside of statement execution.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// IO error (reading schema documents).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse a schema document.
    #[error("Failed to parse schema document '{path}': {message}")]
    ParseError {
        /// Path to the document.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Multiple errors occurred.
    #[error("Multiple errors occurred:\n{}", .0.iter().map(|e| format!("  - {e}")).collect::<Vec<_>>().join("\n"))]
    Multiple(Vec<MigrateError>),
}

impl MigrateError {
    /// Collapses a list of errors: one error is returned as is, several are
    /// wrapped in [`MigrateError::Multiple`].
    #[must_use]
    pub fn from_many(mut errors: Vec<Self>) -> Option<Self> {
        match errors.len() {
            0 => None,
            1 => errors.pop(),
            _ => Some(Self::Multiple(errors)),
        }
    }
}

/// Result type for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;
