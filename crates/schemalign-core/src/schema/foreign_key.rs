//! Foreign key constraints.

use serde::{Deserialize, Serialize};

use super::index::same_names;
use super::Table;
use crate::identifier::{truncate_identifier, Identifier};

/// Action taken on dependent rows when a referenced row changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CascadeAction {
    /// No action (error if referenced row is deleted/updated).
    #[default]
    NoAction,
    /// Cascade the delete/update to referencing rows.
    Cascade,
    /// Set the referencing columns to NULL.
    SetNull,
    /// Set the referencing columns to their default value.
    SetDefault,
    /// Restrict (same as `NoAction` but checked immediately).
    Restrict,
}

impl CascadeAction {
    /// Returns the SQL representation of this action.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::NoAction => "NO ACTION",
            Self::Cascade => "CASCADE",
            Self::SetNull => "SET NULL",
            Self::SetDefault => "SET DEFAULT",
            Self::Restrict => "RESTRICT",
        }
    }
}

/// A foreign key constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    /// Explicit constraint name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Referencing columns in this table.
    pub columns: Vec<String>,
    /// Referenced table.
    pub referenced_table: Identifier,
    /// Referenced columns.
    pub referenced_columns: Vec<String>,
    /// ON DELETE action.
    #[serde(default)]
    pub on_delete: CascadeAction,
    /// ON UPDATE action.
    #[serde(default)]
    pub on_update: CascadeAction,
}

impl ForeignKey {
    /// Creates an unnamed foreign key with `NO ACTION` for both actions.
    #[must_use]
    pub fn new<S: Into<String>, R: Into<String>>(
        columns: impl IntoIterator<Item = S>,
        referenced_table: Identifier,
        referenced_columns: impl IntoIterator<Item = R>,
    ) -> Self {
        Self {
            name: None,
            columns: columns.into_iter().map(Into::into).collect(),
            referenced_table,
            referenced_columns: referenced_columns.into_iter().map(Into::into).collect(),
            on_delete: CascadeAction::NoAction,
            on_update: CascadeAction::NoAction,
        }
    }

    /// Sets an explicit constraint name.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the ON DELETE action.
    #[must_use]
    pub fn on_delete(mut self, action: CascadeAction) -> Self {
        self.on_delete = action;
        self
    }

    /// Sets the ON UPDATE action.
    #[must_use]
    pub fn on_update(mut self, action: CascadeAction) -> Self {
        self.on_update = action;
        self
    }

    /// Returns the constraint name: explicit, or `fk_<table>_<columns>`,
    /// truncated to the table's identifier limit.
    #[must_use]
    pub fn effective_name(&self, table: &Table) -> String {
        let name = self.name.clone().unwrap_or_else(|| {
            format!("fk_{}_{}", table.identifier().name(), self.columns.join("_"))
                .to_ascii_lowercase()
        });
        truncate_identifier(&name, table.max_identifier_length())
    }

    /// Whether this key uses any of the given columns.
    #[must_use]
    pub fn uses_any_column<'c>(&self, mut columns: impl Iterator<Item = &'c str>) -> bool {
        columns.any(|c| self.columns.iter().any(|own| own.eq_ignore_ascii_case(c)))
    }

    /// Structural equality of two keys, each resolved against its own
    /// table.
    #[must_use]
    pub fn matches(&self, table: &Table, other: &Self, other_table: &Table) -> bool {
        self.effective_name(table)
            .eq_ignore_ascii_case(&other.effective_name(other_table))
            && same_names(&self.columns, &other.columns)
            && self.referenced_table == other.referenced_table
            && same_names(&self.referenced_columns, &other.referenced_columns)
            && self.on_delete == other.on_delete
            && self.on_update == other.on_update
    }
}
