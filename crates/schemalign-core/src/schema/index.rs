//! Index definitions.

use serde::{Deserialize, Serialize};

use super::Table;
use crate::identifier::truncate_identifier;

/// A table index.
///
/// The name is optional; an unnamed index gets a name derived from its
/// owning table and columns, which is why name resolution and matching
/// take the table as context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    /// Explicit index name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Indexed columns, in index order.
    pub columns: Vec<String>,
    /// Whether this is a UNIQUE index.
    #[serde(default)]
    pub unique: bool,
    /// Partial index condition (WHERE clause).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predicate: Option<String>,
    /// Access method (`USING ...`), e.g. `btree` or `gin`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
}

impl Index {
    /// Creates an unnamed, non-unique index.
    #[must_use]
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            name: None,
            columns: columns.into_iter().map(Into::into).collect(),
            unique: false,
            predicate: None,
            method: None,
        }
    }

    /// Sets an explicit name.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Marks the index as UNIQUE.
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Sets a partial index condition.
    #[must_use]
    pub fn predicate(mut self, condition: impl Into<String>) -> Self {
        self.predicate = Some(condition.into());
        self
    }

    /// Sets the access method.
    #[must_use]
    pub fn using(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    /// Returns the index name as it exists in the database: the explicit
    /// name, or `ix_<table>_<columns>` (`ux_` for unique indexes),
    /// truncated to the table's identifier limit.
    #[must_use]
    pub fn effective_name(&self, table: &Table) -> String {
        let name = self.name.clone().unwrap_or_else(|| {
            let prefix = if self.unique { "ux" } else { "ix" };
            format!(
                "{prefix}_{}_{}",
                table.identifier().name(),
                self.columns.join("_")
            )
            .to_ascii_lowercase()
        });
        truncate_identifier(&name, table.max_identifier_length())
    }

    /// Structural equality of two indexes, each resolved against its own
    /// table.
    #[must_use]
    pub fn matches(&self, table: &Table, other: &Self, other_table: &Table) -> bool {
        self.effective_name(table)
            .eq_ignore_ascii_case(&other.effective_name(other_table))
            && same_names(&self.columns, &other.columns)
            && self.unique == other.unique
            && normalized(self.predicate.as_deref()) == normalized(other.predicate.as_deref())
            && normalized(self.method.as_deref()) == normalized(other.method.as_deref())
    }
}

/// Ordered, case-insensitive comparison of two name lists.
pub(crate) fn same_names(a: &[String], b: &[String]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.eq_ignore_ascii_case(y))
}

fn normalized(text: Option<&str>) -> Option<String> {
    text.map(|t| {
        t.split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_ascii_lowercase()
    })
    .filter(|t| !t.is_empty())
}
