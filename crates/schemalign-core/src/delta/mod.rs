//! Comparison of expected and actual schema objects.

mod item;
mod table;

pub use item::{ItemChange, ItemDelta};
pub use table::{DeltaSummary, TableDelta};

use std::fmt;

use serde::{Deserialize, Serialize};

/// The aspect that made a table delta unsafe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UnsafeReason {
    /// Partition strategy or partition expressions differ.
    PartitioningChanged,
    /// A column type change has no safe conversion.
    ColumnNotAlterable {
        /// Column name.
        column: String,
        /// Live type.
        from: String,
        /// Declared type.
        to: String,
    },
    /// A NOT NULL column without default cannot be added to a table that
    /// may hold rows.
    ColumnNotAddable {
        /// Column name.
        column: String,
    },
}

impl fmt::Display for UnsafeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PartitioningChanged => f.write_str("partitioning changed"),
            Self::ColumnNotAlterable { column, from, to } => {
                write!(f, "column '{column}' cannot be converted from {from} to {to}")
            }
            Self::ColumnNotAddable { column } => write!(
                f,
                "column '{column}' is NOT NULL without default and the table may hold rows"
            ),
        }
    }
}
