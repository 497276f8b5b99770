//! Rendering options for generated DDL.

use serde::{Deserialize, Serialize};

/// Layout of generated `CREATE TABLE` statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Formatting {
    /// One column per line, names and types aligned.
    #[default]
    Pretty,
    /// Everything on one line.
    Concise,
}

/// How `CREATE TABLE` treats an existing table of the same name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableCreation {
    /// `CREATE TABLE IF NOT EXISTS`.
    #[default]
    CreateIfNotExists,
    /// `DROP TABLE IF EXISTS` followed by a plain `CREATE TABLE`.
    DropThenCreate,
}

/// Options passed to the [`DdlWriter`](super::DdlWriter).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MigratorRules {
    /// `CREATE TABLE` layout.
    pub formatting: Formatting,
    /// `CREATE TABLE` behaviour towards existing tables.
    pub table_creation: TableCreation,
}

impl MigratorRules {
    /// Creates the default rules (pretty, create if not exists).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the formatting.
    #[must_use]
    pub const fn formatting(mut self, formatting: Formatting) -> Self {
        self.formatting = formatting;
        self
    }

    /// Sets the table creation mode.
    #[must_use]
    pub const fn table_creation(mut self, table_creation: TableCreation) -> Self {
        self.table_creation = table_creation;
        self
    }
}
