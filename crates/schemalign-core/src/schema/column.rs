//! Column definitions.

use serde::{Deserialize, Serialize};

use super::column_type::ColumnType;

/// A single table column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Column name.
    pub name: String,
    /// Declared SQL type, as text.
    #[serde(rename = "type")]
    pub data_type: String,
    /// Whether the column allows NULL values.
    #[serde(default = "default_nullable")]
    pub nullable: bool,
    /// Whether the column is part of the primary key.
    #[serde(default)]
    pub primary_key: bool,
    /// Default expression, rendered verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

const fn default_nullable() -> bool {
    true
}

impl Column {
    /// Creates a nullable column with no default.
    #[must_use]
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable: true,
            primary_key: false,
            default: None,
        }
    }

    /// Sets the column as NOT NULL.
    #[must_use]
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Sets the column as nullable.
    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Marks the column as part of the primary key. Primary key columns
    /// are always NOT NULL.
    #[must_use]
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }

    /// Sets the default expression.
    #[must_use]
    pub fn default_expr(mut self, expr: impl Into<String>) -> Self {
        self.default = Some(expr.into());
        self
    }

    /// Returns the parsed, canonical type.
    #[must_use]
    pub fn column_type(&self) -> ColumnType {
        ColumnType::parse(&self.data_type)
    }

    /// Whether both columns carry the same name (case-insensitive).
    #[must_use]
    pub fn same_column(&self, other: &Self) -> bool {
        self.name.eq_ignore_ascii_case(&other.name)
    }

    /// Whether the definitions differ in type, nullability or default.
    ///
    /// Primary key membership is compared by the primary key delta, not
    /// here.
    #[must_use]
    pub fn differs_from(&self, other: &Self) -> bool {
        self.type_changed(other) || self.nullability_changed(other) || self.default_changed(other)
    }

    /// Whether the canonical types differ.
    #[must_use]
    pub fn type_changed(&self, other: &Self) -> bool {
        self.column_type() != other.column_type()
    }

    /// Whether nullability differs.
    #[must_use]
    pub const fn nullability_changed(&self, other: &Self) -> bool {
        self.nullable != other.nullable
    }

    /// Whether the normalized default expressions differ.
    #[must_use]
    pub fn default_changed(&self, other: &Self) -> bool {
        normalized_default(self.default.as_deref()) != normalized_default(other.default.as_deref())
    }

    /// Returns `true` if this definition can replace `actual` through
    /// `ALTER COLUMN` without data loss.
    ///
    /// Nullability and default changes are always accepted: tightening to
    /// NOT NULL fails inside the migration transaction when rows still hold
    /// nulls. Type changes must be widening conversions.
    #[must_use]
    pub fn can_alter_from(&self, actual: &Self) -> bool {
        !self.type_changed(actual) || self.column_type().can_convert_from(&actual.column_type())
    }

    /// Returns `true` if the column can be added to a table that may hold
    /// rows. Adding a NOT NULL column without a default to a populated
    /// table is not possible.
    #[must_use]
    pub const fn is_safely_addable(&self, populated: bool) -> bool {
        !populated || self.nullable || self.default.is_some()
    }
}

fn normalized_default(expr: Option<&str>) -> Option<String> {
    expr.map(|e| e.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|e| !e.is_empty())
}
