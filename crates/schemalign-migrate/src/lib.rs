//! Create-or-update schema migrations.
//!
//! `schemalign-migrate` drives the delta engine from `schemalign-core`
//! against a live database:
//!
//! - **Catalog** - Reports the actual definition of each table
//! - **Ordering** - Sorts tables so foreign-key parents come first
//! - **Orchestrator** - Plans per-table actions under a policy and runs the
//!   script inside one transaction
//! - **Executor** - Executes SQL (through `sqlx`, or printed for dry runs)
//!
//! # Example
//!
//! ```rust,ignore
//! use schemalign_migrate::prelude::*;
//! use tokio_util::sync::CancellationToken;
//!
//! let document = load_document("schema.json".as_ref())?;
//! let catalog = SnapshotCatalog::from_path("live.json".as_ref())?;
//!
//! let migrator = Migrator::new(MigrateOptions::new(MigrationPolicy::CreateOrUpdate));
//! let plan = migrator.plan(&document.tables, &catalog)?;
//! println!("{}", plan.report());
//!
//! let mut executor = SqlxExecutor::connect("sqlite:app.db", 1).await?;
//! migrator.apply(&plan, &mut executor, &CancellationToken::new()).await?;
//! ```
//!
//! # CLI Usage
//!
//! ```bash
//! # Report what would change
//! schemalign plan --expected schema.json --actual live.json
//!
//! # Create missing tables and alter drifted ones
//! schemalign -d sqlite:app.db apply --expected schema.json --actual live.json \
//!     --policy create-or-update
//!
//! # Undo it
//! schemalign -d sqlite:app.db revert --expected schema.json --actual live.json \
//!     --policy create-or-update
//! ```

pub mod catalog;
pub mod error;
pub mod executor;
pub mod orchestrator;
pub mod ordering;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::catalog::{load_document, Catalog, SnapshotCatalog};
    pub use crate::error::{MigrateError, Result};
    pub use crate::executor::{DryRunExecutor, SqlxExecutor, StatementExecutor};
    pub use crate::orchestrator::{
        MigrateOptions, MigrationPlan, MigrationPolicy, MigrationReport, Migrator,
        PlannedTable, ScriptStatement, TableAction, TableReport,
    };
    pub use crate::ordering::dependency_order;
    pub use schemalign_core::{
        Difference, Formatting, Identifier, MigratorRules, SchemaDocument, Table,
        TableCreation,
    };
}
