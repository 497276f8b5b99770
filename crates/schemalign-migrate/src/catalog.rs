//! Sources of live table definitions.
//!
//! The orchestrator never queries the database catalog itself; it asks a
//! [`Catalog`] for the live definition of each expected table.

use std::path::Path;

use schemalign_core::{Identifier, SchemaDocument, Table};
use tracing::debug;

use crate::error::{MigrateError, Result};

/// Supplies the live definition of a table.
pub trait Catalog {
    /// Returns the live table, or `None` if it does not exist.
    ///
    /// Columns must come in physical order; indexes, foreign keys and the
    /// primary key must be fully populated.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be read.
    fn fetch_table(&self, identifier: &Identifier) -> Result<Option<Table>>;
}

/// A catalog backed by a schema document, typically a snapshot exported
/// from the database.
#[derive(Debug, Clone, Default)]
pub struct SnapshotCatalog {
    document: SchemaDocument,
}

impl SnapshotCatalog {
    /// Creates a catalog over an in-memory document.
    #[must_use]
    pub const fn new(document: SchemaDocument) -> Self {
        Self { document }
    }

    /// Loads a snapshot from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a valid
    /// schema document.
    pub fn from_path(path: &Path) -> Result<Self> {
        Ok(Self::new(load_document(path)?))
    }

    /// Returns the underlying document.
    #[must_use]
    pub const fn document(&self) -> &SchemaDocument {
        &self.document
    }
}

impl Catalog for SnapshotCatalog {
    fn fetch_table(&self, identifier: &Identifier) -> Result<Option<Table>> {
        let table = self.document.get_table(identifier).cloned();
        debug!(table = %identifier, found = table.is_some(), "Catalog lookup");
        Ok(table)
    }
}

/// Reads a JSON schema document. Every table goes through the builder's
/// validation.
///
/// # Errors
///
/// Returns [`MigrateError::Io`] if the file cannot be read and
/// [`MigrateError::ParseError`] if it is not a valid document.
pub fn load_document(path: &Path) -> Result<SchemaDocument> {
    let text = std::fs::read_to_string(path)?;
    serde_json::from_str(&text).map_err(|e| MigrateError::ParseError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}
