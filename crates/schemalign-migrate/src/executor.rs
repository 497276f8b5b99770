//! Statement execution seam.
//!
//! The orchestrator hands complete DDL statements to a
//! [`StatementExecutor`], all inside one transaction per migration.

use async_trait::async_trait;
use sqlx::any::{AnyPoolOptions, install_default_drivers};
use sqlx::{Any, AnyPool, Transaction};
use tracing::{debug, info, warn};

use crate::error::Result;

/// Executes DDL statements inside a transaction.
#[async_trait]
pub trait StatementExecutor: Send {
    /// Opens the transaction.
    async fn begin(&mut self) -> std::result::Result<(), sqlx::Error>;

    /// Executes one statement inside the open transaction.
    async fn execute(&mut self, sql: &str) -> std::result::Result<(), sqlx::Error>;

    /// Commits the open transaction.
    async fn commit(&mut self) -> std::result::Result<(), sqlx::Error>;

    /// Rolls the open transaction back.
    async fn rollback(&mut self) -> std::result::Result<(), sqlx::Error>;
}

/// Executes statements through an `sqlx` connection pool.
///
/// Any database with an installed `sqlx` driver works; SQLite and
/// PostgreSQL are compiled in.
pub struct SqlxExecutor {
    pool: AnyPool,
    transaction: Option<Transaction<'static, Any>>,
}

impl std::fmt::Debug for SqlxExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlxExecutor")
            .field("pool", &self.pool)
            .field("in_transaction", &self.transaction.is_some())
            .finish()
    }
}

impl SqlxExecutor {
    /// Wraps an existing pool.
    #[must_use]
    pub const fn new(pool: AnyPool) -> Self {
        Self {
            pool,
            transaction: None,
        }
    }

    /// Connects to `url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        install_default_drivers();
        let pool = AnyPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        info!(max_connections, "Connected to database");
        Ok(Self::new(pool))
    }

    /// Returns the pool.
    #[must_use]
    pub const fn pool(&self) -> &AnyPool {
        &self.pool
    }

    fn open(&mut self) -> std::result::Result<&mut Transaction<'static, Any>, sqlx::Error> {
        self.transaction
            .as_mut()
            .ok_or_else(|| sqlx::Error::Protocol("no open transaction".into()))
    }
}

#[async_trait]
impl StatementExecutor for SqlxExecutor {
    async fn begin(&mut self) -> std::result::Result<(), sqlx::Error> {
        if self.transaction.is_some() {
            warn!("Transaction already open, reusing it");
            return Ok(());
        }
        self.transaction = Some(self.pool.begin().await?);
        debug!("Transaction opened");
        Ok(())
    }

    async fn execute(&mut self, sql: &str) -> std::result::Result<(), sqlx::Error> {
        let transaction = self.open()?;
        sqlx::query(sql).execute(&mut **transaction).await?;
        Ok(())
    }

    async fn commit(&mut self) -> std::result::Result<(), sqlx::Error> {
        if let Some(transaction) = self.transaction.take() {
            transaction.commit().await?;
            debug!("Transaction committed");
        }
        Ok(())
    }

    async fn rollback(&mut self) -> std::result::Result<(), sqlx::Error> {
        if let Some(transaction) = self.transaction.take() {
            transaction.rollback().await?;
            debug!("Transaction rolled back");
        }
        Ok(())
    }
}

/// Prints statements instead of executing them.
#[derive(Debug, Default)]
pub struct DryRunExecutor {
    printed: Vec<String>,
    quiet: bool,
}

impl DryRunExecutor {
    /// Creates a dry-run executor that prints to stdout.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records statements without printing them.
    #[must_use]
    pub fn quiet() -> Self {
        Self {
            printed: Vec::new(),
            quiet: true,
        }
    }

    /// Statements seen so far.
    #[must_use]
    pub fn statements(&self) -> &[String] {
        &self.printed
    }
}

#[async_trait]
impl StatementExecutor for DryRunExecutor {
    async fn begin(&mut self) -> std::result::Result<(), sqlx::Error> {
        Ok(())
    }

    async fn execute(&mut self, sql: &str) -> std::result::Result<(), sqlx::Error> {
        if !self.quiet {
            println!("{sql};");
        }
        self.printed.push(sql.to_string());
        Ok(())
    }

    async fn commit(&mut self) -> std::result::Result<(), sqlx::Error> {
        Ok(())
    }

    async fn rollback(&mut self) -> std::result::Result<(), sqlx::Error> {
        self.printed.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory_executor() -> SqlxExecutor {
        SqlxExecutor::connect("sqlite::memory:", 1).await.unwrap()
    }

    async fn table_exists(executor: &SqlxExecutor, name: &str) -> bool {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?")
                .bind(name)
                .fetch_optional(executor.pool())
                .await
                .unwrap();
        row.is_some()
    }

    #[tokio::test]
    async fn test_commit_keeps_changes() {
        let mut executor = memory_executor().await;
        executor.begin().await.unwrap();
        executor
            .execute("CREATE TABLE users (id INTEGER PRIMARY KEY)")
            .await
            .unwrap();
        executor.commit().await.unwrap();
        assert!(table_exists(&executor, "users").await);
    }

    #[tokio::test]
    async fn test_rollback_discards_changes() {
        let mut executor = memory_executor().await;
        executor.begin().await.unwrap();
        executor
            .execute("CREATE TABLE users (id INTEGER PRIMARY KEY)")
            .await
            .unwrap();
        executor.rollback().await.unwrap();
        assert!(!table_exists(&executor, "users").await);
    }

    #[tokio::test]
    async fn test_execute_without_transaction_fails() {
        let mut executor = memory_executor().await;
        assert!(executor.execute("SELECT 1").await.is_err());
    }

    #[tokio::test]
    async fn test_dry_run_records_statements() {
        let mut executor = DryRunExecutor::quiet();
        executor.begin().await.unwrap();
        executor.execute("DROP TABLE x").await.unwrap();
        executor.commit().await.unwrap();
        assert_eq!(executor.statements(), &["DROP TABLE x".to_string()]);
    }
}
