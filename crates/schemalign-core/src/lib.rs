//! # schemalign-core
//!
//! Schema delta engine: compares the table an application expects with
//! the table a database actually has, classifies how disruptive the
//! difference is, and writes the DDL that reconciles the two, plus the
//! script that undoes it.
//!
//! This crate provides:
//! - A schema object model (tables, columns, indexes, foreign keys,
//!   primary keys, range partitioning) with a validating builder
//! - Name-keyed comparison of columns, indexes and foreign keys
//! - Severity classification (`none < alter < create < unsafe`)
//! - Ordered forward and rollback statements, rendered as SQL text
//!
//! ## Comparing tables
//!
//! ```rust
//! use schemalign_core::{DdlWriter, Difference, Table, TableDelta};
//!
//! let mut expected = Table::builder("public.orders");
//! expected.column("id", "int").primary_key();
//! expected.column("email", "varchar").not_null();
//! let expected = expected.build().unwrap();
//!
//! let mut actual = Table::builder("public.orders");
//! actual.column("id", "int").primary_key();
//! actual.column("email", "varchar");
//! actual.column("legacy_flag", "int");
//! let actual = actual.build().unwrap();
//!
//! let delta = TableDelta::compare(&expected, Some(&actual));
//! assert_eq!(delta.difference(), Difference::Alter);
//!
//! let sql = delta.forward_sql(&DdlWriter::default()).unwrap();
//! assert_eq!(
//!     sql,
//!     vec![
//!         r#"ALTER TABLE "public"."orders" ALTER COLUMN "email" SET NOT NULL"#,
//!         r#"ALTER TABLE "public"."orders" DROP COLUMN "legacy_flag""#,
//!     ]
//! );
//! ```
//!
//! Deltas classified [`Difference::Unsafe`] refuse to produce statements:
//! the caller has to resolve them by hand.

pub mod ddl;
pub mod delta;
pub mod difference;
pub mod error;
pub mod identifier;
pub mod schema;
pub mod state;

pub use ddl::{DdlWriter, Formatting, MigratorRules, Statement, TableCreation};
pub use delta::{DeltaSummary, ItemChange, ItemDelta, TableDelta, UnsafeReason};
pub use difference::Difference;
pub use error::{DeltaError, SchemaError, StateError};
pub use identifier::{truncate_identifier, Identifier};
pub use schema::{
    CascadeAction, Column, ColumnType, ForeignKey, Index, PartitionStrategy, Partitioning,
    SchemaDocument, Table, TableBuilder,
};
pub use state::SchemaState;
