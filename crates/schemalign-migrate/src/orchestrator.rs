//! Migration planning and execution.
//!
//! A [`Migrator`] compares every expected table with its live counterpart,
//! decides per table what the [`MigrationPolicy`] allows, and executes the
//! resulting script inside a single transaction.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use schemalign_core::{
    DdlWriter, DeltaSummary, Difference, Identifier, MigratorRules, Statement, Table, TableDelta,
};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::catalog::Catalog;
use crate::error::{MigrateError, Result};
use crate::executor::StatementExecutor;
use crate::ordering::dependency_order;

/// What a migration is allowed to do.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum MigrationPolicy {
    /// Create missing tables; report drift on existing ones.
    CreateOnly,
    /// Create missing tables and alter drifted ones. Any unsafe table
    /// fails the whole plan.
    CreateOrUpdate,
    /// Change nothing; report every difference.
    #[default]
    ReportOnly,
}

impl fmt::Display for MigrationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::CreateOnly => "create-only",
            Self::CreateOrUpdate => "create-or-update",
            Self::ReportOnly => "report-only",
        })
    }
}

/// What the plan does with one table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableAction {
    /// Already up to date.
    Skip,
    /// Create the table.
    Create,
    /// Alter the table in place.
    Update,
    /// Leave the table alone but report its drift.
    Report,
}

impl TableAction {
    /// Whether statements are executed for this table.
    #[must_use]
    pub const fn executes(self) -> bool {
        matches!(self, Self::Create | Self::Update)
    }
}

impl fmt::Display for TableAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Skip => "skip",
            Self::Create => "create",
            Self::Update => "update",
            Self::Report => "report",
        })
    }
}

/// Options for a [`Migrator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrateOptions {
    /// What the migration may do.
    pub policy: MigrationPolicy,
    /// DDL rendering rules.
    pub rules: MigratorRules,
    /// Stop starting new statements once this many seconds have passed.
    pub timeout_secs: Option<u64>,
}

impl MigrateOptions {
    /// Options with the given policy and defaults otherwise.
    #[must_use]
    pub fn new(policy: MigrationPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// Sets the rendering rules.
    #[must_use]
    pub const fn rules(mut self, rules: MigratorRules) -> Self {
        self.rules = rules;
        self
    }

    /// Sets the deadline for executing a script.
    #[must_use]
    pub const fn timeout_secs(mut self, secs: Option<u64>) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// The deadline as a duration.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// The planned outcome for one table.
#[derive(Debug, Clone)]
pub struct PlannedTable {
    summary: DeltaSummary,
    action: TableAction,
    forward: Vec<Statement>,
    rollback: Vec<Statement>,
}

impl PlannedTable {
    /// The table identifier.
    #[must_use]
    pub const fn identifier(&self) -> &Identifier {
        &self.summary.table
    }

    /// Severity of the table's delta.
    #[must_use]
    pub const fn difference(&self) -> Difference {
        self.summary.difference
    }

    /// What the plan does with the table.
    #[must_use]
    pub const fn action(&self) -> TableAction {
        self.action
    }

    /// Names of everything that differs.
    #[must_use]
    pub const fn summary(&self) -> &DeltaSummary {
        &self.summary
    }

    /// Statements reconciling the table. Present whenever the delta is
    /// applicable, even if the policy does not execute them.
    #[must_use]
    pub fn forward(&self) -> &[Statement] {
        &self.forward
    }

    /// Statements undoing [`forward`](Self::forward).
    #[must_use]
    pub fn rollback(&self) -> &[Statement] {
        &self.rollback
    }
}

/// One rendered statement of a script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptStatement {
    /// Table the statement belongs to.
    pub table: Identifier,
    /// SQL text.
    pub sql: String,
}

/// A planned migration over a set of tables, in dependency order.
#[derive(Debug, Clone)]
pub struct MigrationPlan {
    policy: MigrationPolicy,
    writer: DdlWriter,
    tables: Vec<PlannedTable>,
    created_at: DateTime<Utc>,
}

impl MigrationPlan {
    /// The policy the plan was made under.
    #[must_use]
    pub const fn policy(&self) -> MigrationPolicy {
        self.policy
    }

    /// Per-table outcomes, parents before children.
    #[must_use]
    pub fn tables(&self) -> &[PlannedTable] {
        &self.tables
    }

    /// Looks up the outcome for one table.
    #[must_use]
    pub fn table(&self, identifier: &Identifier) -> Option<&PlannedTable> {
        self.tables.iter().find(|t| t.identifier() == identifier)
    }

    /// When the plan was made.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Whether executing the plan would change anything.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        self.tables
            .iter()
            .any(|t| t.action.executes() && !t.forward.is_empty())
    }

    /// The statements [`Migrator::apply`] executes, in order.
    #[must_use]
    pub fn forward_script(&self) -> Vec<ScriptStatement> {
        self.render(self.executed(), |t| &t.forward[..])
    }

    /// The statements [`Migrator::revert`] executes: each table's rollback,
    /// children before parents.
    #[must_use]
    pub fn rollback_script(&self) -> Vec<ScriptStatement> {
        self.render(self.executed().rev(), |t| &t.rollback[..])
    }

    /// SQL text of [`forward_script`](Self::forward_script).
    #[must_use]
    pub fn forward_sql(&self) -> Vec<String> {
        self.forward_script().into_iter().map(|s| s.sql).collect()
    }

    /// SQL text of [`rollback_script`](Self::rollback_script).
    #[must_use]
    pub fn rollback_sql(&self) -> Vec<String> {
        self.rollback_script().into_iter().map(|s| s.sql).collect()
    }

    /// A serializable report of every table.
    #[must_use]
    pub fn report(&self) -> MigrationReport {
        MigrationReport {
            generated_at: self.created_at,
            policy: self.policy,
            tables: self
                .tables
                .iter()
                .map(|t| TableReport {
                    summary: t.summary.clone(),
                    action: t.action,
                    forward_sql: self.writer.render_all(&t.forward),
                    rollback_sql: self.writer.render_all(&t.rollback),
                })
                .collect(),
        }
    }

    fn executed(&self) -> impl DoubleEndedIterator<Item = &PlannedTable> {
        self.tables.iter().filter(|t| t.action.executes())
    }

    fn render<'p>(
        &self,
        tables: impl Iterator<Item = &'p PlannedTable>,
        statements: impl Fn(&'p PlannedTable) -> &'p [Statement],
    ) -> Vec<ScriptStatement> {
        let mut script = Vec::new();
        for table in tables {
            for statement in statements(table) {
                script.extend(self.writer.render(statement).into_iter().map(|sql| {
                    ScriptStatement {
                        table: table.identifier().clone(),
                        sql,
                    }
                }));
            }
        }
        script
    }
}

/// Report entry for one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableReport {
    /// What differs.
    #[serde(flatten)]
    pub summary: DeltaSummary,
    /// What the plan does with the table.
    pub action: TableAction,
    /// Statements that would reconcile the table.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub forward_sql: Vec<String>,
    /// Statements that would undo them.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rollback_sql: Vec<String>,
}

/// Structured result of planning, for humans (`Display`) or machines
/// (`serde`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationReport {
    /// When the plan was made.
    pub generated_at: DateTime<Utc>,
    /// Policy in effect.
    pub policy: MigrationPolicy,
    /// One entry per expected table, in dependency order.
    pub tables: Vec<TableReport>,
}

impl MigrationReport {
    /// Number of tables with the given action.
    #[must_use]
    pub fn count(&self, action: TableAction) -> usize {
        self.tables.iter().filter(|t| t.action == action).count()
    }
}

impl fmt::Display for MigrationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Schema report ({}, {})",
            self.policy,
            self.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        )?;
        for table in &self.tables {
            let s = &table.summary;
            writeln!(f, "  {} [{}] -> {}", s.table, s.difference, table.action)?;
            let details = [
                ("add columns", &s.added_columns),
                ("drop columns", &s.dropped_columns),
                ("alter columns", &s.altered_columns),
                ("add indexes", &s.added_indexes),
                ("drop indexes", &s.dropped_indexes),
                ("rebuild indexes", &s.changed_indexes),
                ("add foreign keys", &s.added_foreign_keys),
                ("drop foreign keys", &s.dropped_foreign_keys),
                ("replace foreign keys", &s.changed_foreign_keys),
            ];
            for (label, names) in details {
                if !names.is_empty() {
                    writeln!(f, "      {label}: {}", names.join(", "))?;
                }
            }
            if s.primary_key.has_changes() {
                writeln!(f, "      primary key: {}", s.primary_key)?;
            }
            for reason in &s.unsafe_reasons {
                writeln!(f, "      unsafe: {reason}")?;
            }
        }
        write!(
            f,
            "{} to create, {} to update, {} reported, {} up to date",
            self.count(TableAction::Create),
            self.count(TableAction::Update),
            self.count(TableAction::Report),
            self.count(TableAction::Skip)
        )
    }
}

/// Plans and executes migrations.
#[derive(Debug, Clone, Default)]
pub struct Migrator {
    options: MigrateOptions,
}

impl Migrator {
    /// Creates a migrator.
    #[must_use]
    pub const fn new(options: MigrateOptions) -> Self {
        Self { options }
    }

    /// Returns the options.
    #[must_use]
    pub const fn options(&self) -> &MigrateOptions {
        &self.options
    }

    /// Compares every expected table with the catalog and decides what to
    /// do with it.
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::CircularDependency`] if foreign keys form a
    /// cycle, catalog errors, and under
    /// [`MigrationPolicy::CreateOrUpdate`] an error for every unsafe table
    /// ([`MigrateError::UnsafeMigration`], or [`MigrateError::Multiple`]
    /// when several are unsafe).
    pub fn plan<C>(&self, expected: &[Table], catalog: &C) -> Result<MigrationPlan>
    where
        C: Catalog + ?Sized,
    {
        let policy = self.options.policy;
        info!(tables = expected.len(), %policy, "Planning migration");

        let mut tables = Vec::with_capacity(expected.len());
        let mut unsafe_tables = Vec::new();

        for table in dependency_order(expected)? {
            let actual = catalog.fetch_table(table.identifier())?;
            let delta = TableDelta::compare(table, actual.as_ref());
            let difference = delta.difference();

            if difference == Difference::Unsafe {
                if policy == MigrationPolicy::CreateOrUpdate {
                    unsafe_tables.push(MigrateError::UnsafeMigration {
                        table: table.identifier().clone(),
                        reasons: delta.unsafe_reasons().to_vec(),
                    });
                    continue;
                }
                warn!(table = %table.identifier(), "Unsafe difference, manual migration required");
            }

            let action = action_for(policy, difference, delta.actual().is_some());
            if action == TableAction::Report {
                warn!(table = %table.identifier(), %difference, "Schema drift reported, not altered");
            } else {
                debug!(table = %table.identifier(), %difference, %action, "Planned table");
            }

            let (forward, rollback) = if difference.is_applicable() {
                (delta.forward_statements()?, delta.rollback_statements()?)
            } else {
                (Vec::new(), Vec::new())
            };

            tables.push(PlannedTable {
                summary: delta.summary(),
                action,
                forward,
                rollback,
            });
        }

        if let Some(error) = MigrateError::from_many(unsafe_tables) {
            return Err(error);
        }

        let plan = MigrationPlan {
            policy,
            writer: DdlWriter::new(self.options.rules),
            tables,
            created_at: Utc::now(),
        };
        info!(
            statements = plan.forward_script().len(),
            "Migration planned"
        );
        Ok(plan)
    }

    /// Executes the plan's forward script in one transaction and returns
    /// the number of statements executed.
    ///
    /// Cancellation and the deadline are checked before each statement; a
    /// statement already running is never interrupted.
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::StatementFailed`] for a rejected statement,
    /// [`MigrateError::Cancelled`] or [`MigrateError::DeadlineExceeded`]
    /// when stopped early (the transaction is rolled back in all three
    /// cases), and [`MigrateError::Database`] if the transaction cannot be
    /// opened or committed.
    pub async fn apply<E>(
        &self,
        plan: &MigrationPlan,
        executor: &mut E,
        cancel: &CancellationToken,
    ) -> Result<usize>
    where
        E: StatementExecutor + ?Sized,
    {
        info!(policy = %plan.policy(), "Applying migration");
        self.run(plan.forward_script(), executor, cancel).await
    }

    /// Executes the plan's rollback script, like [`apply`](Self::apply).
    ///
    /// # Errors
    ///
    /// Same as [`apply`](Self::apply).
    pub async fn revert<E>(
        &self,
        plan: &MigrationPlan,
        executor: &mut E,
        cancel: &CancellationToken,
    ) -> Result<usize>
    where
        E: StatementExecutor + ?Sized,
    {
        info!(policy = %plan.policy(), "Reverting migration");
        self.run(plan.rollback_script(), executor, cancel).await
    }

    async fn run<E>(
        &self,
        script: Vec<ScriptStatement>,
        executor: &mut E,
        cancel: &CancellationToken,
    ) -> Result<usize>
    where
        E: StatementExecutor + ?Sized,
    {
        if script.is_empty() {
            info!("Nothing to execute");
            return Ok(0);
        }

        let total = script.len();
        let deadline = self.options.timeout().map(|t| Instant::now() + t);
        executor.begin().await?;

        for (index, statement) in script.into_iter().enumerate() {
            if cancel.is_cancelled() {
                warn!(executed = index, "Cancellation requested, rolling back");
                abort(executor).await;
                return Err(MigrateError::Cancelled { executed: index });
            }
            if deadline.is_some_and(|d| Instant::now() >= d) {
                warn!(executed = index, "Deadline exceeded, rolling back");
                abort(executor).await;
                return Err(MigrateError::DeadlineExceeded { executed: index });
            }

            debug!(table = %statement.table, index, sql = %statement.sql, "Executing statement");
            if let Err(source) = executor.execute(&statement.sql).await {
                warn!(table = %statement.table, index, error = %source, "Statement failed, rolling back");
                abort(executor).await;
                return Err(MigrateError::StatementFailed {
                    table: statement.table,
                    index,
                    sql: statement.sql,
                    source,
                });
            }
        }

        executor.commit().await?;
        info!(statements = total, "Migration committed");
        Ok(total)
    }
}

/// Rolls back after a failure. The original error is what gets reported, so
/// a rollback error is only logged.
async fn abort<E>(executor: &mut E)
where
    E: StatementExecutor + ?Sized,
{
    if let Err(error) = executor.rollback().await {
        warn!(%error, "Rollback failed");
    }
}

const fn action_for(policy: MigrationPolicy, difference: Difference, exists: bool) -> TableAction {
    match (policy, difference, exists) {
        (_, Difference::None, _) => TableAction::Skip,
        (MigrationPolicy::CreateOnly | MigrationPolicy::CreateOrUpdate, _, false) => {
            TableAction::Create
        }
        (MigrationPolicy::CreateOrUpdate, _, true) => TableAction::Update,
        _ => TableAction::Report,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_decides_action() {
        use Difference::{Alter, Create, None as Same};
        use MigrationPolicy::{CreateOnly, CreateOrUpdate, ReportOnly};

        assert_eq!(action_for(CreateOnly, Create, false), TableAction::Create);
        assert_eq!(action_for(CreateOnly, Alter, true), TableAction::Report);
        assert_eq!(action_for(CreateOrUpdate, Create, false), TableAction::Create);
        assert_eq!(action_for(CreateOrUpdate, Alter, true), TableAction::Update);
        assert_eq!(action_for(ReportOnly, Create, false), TableAction::Report);
        assert_eq!(action_for(ReportOnly, Alter, true), TableAction::Report);
        for policy in [CreateOnly, CreateOrUpdate, ReportOnly] {
            assert_eq!(action_for(policy, Same, true), TableAction::Skip);
        }
    }

    #[test]
    fn only_create_and_update_execute() {
        assert!(TableAction::Create.executes());
        assert!(TableAction::Update.executes());
        assert!(!TableAction::Report.executes());
        assert!(!TableAction::Skip.executes());
    }

    #[test]
    fn options_deserialize_with_defaults() {
        let options: MigrateOptions =
            serde_json::from_str(r#"{"policy": "create-only", "timeout_secs": 30}"#).unwrap();
        assert_eq!(options.policy, MigrationPolicy::CreateOnly);
        assert_eq!(options.timeout(), Some(Duration::from_secs(30)));
        assert_eq!(options.rules, MigratorRules::default());

        let options: MigrateOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(options.policy, MigrationPolicy::ReportOnly);
        assert_eq!(options.timeout(), None);
    }
}
