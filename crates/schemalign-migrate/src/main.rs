//! schemalign CLI
//!
//! Command-line tool for reconciling a database with a declared schema.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use schemalign_migrate::prelude::*;

/// Create-or-update schema migrations.
#[derive(Parser)]
#[command(name = "schemalign")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Database URL (e.g. `sqlite:app.db` or `postgres://...`).
    #[arg(short, long, env = "DATABASE_URL", global = true)]
    database: Option<String>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare the declared schema with the live one and report.
    Plan(PlanArgs),

    /// Execute the forward script.
    Apply(RunArgs),

    /// Execute the rollback script.
    Revert(RunArgs),
}

#[derive(Args)]
struct PlanArgs {
    /// JSON document with the declared tables.
    #[arg(short, long)]
    expected: PathBuf,

    /// JSON snapshot of the live tables. Without it every table is
    /// treated as missing.
    #[arg(short, long)]
    actual: Option<PathBuf>,

    /// What the migration may do.
    #[arg(short, long, value_enum, default_value_t = MigrationPolicy::ReportOnly)]
    policy: MigrationPolicy,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Render each statement on one line.
    #[arg(long)]
    concise: bool,

    /// Drop tables before creating them instead of `CREATE TABLE IF NOT EXISTS`.
    #[arg(long)]
    drop_then_create: bool,
}

#[derive(Args)]
struct RunArgs {
    #[command(flatten)]
    plan: PlanArgs,

    /// Print SQL without executing.
    #[arg(long)]
    dry_run: bool,

    /// Stop starting new statements after this many seconds.
    #[arg(long)]
    timeout_secs: Option<u64>,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

impl PlanArgs {
    fn options(&self, timeout_secs: Option<u64>) -> MigrateOptions {
        let rules = MigratorRules::new()
            .formatting(if self.concise {
                Formatting::Concise
            } else {
                Formatting::Pretty
            })
            .table_creation(if self.drop_then_create {
                TableCreation::DropThenCreate
            } else {
                TableCreation::CreateIfNotExists
            });
        MigrateOptions::new(self.policy)
            .rules(rules)
            .timeout_secs(timeout_secs)
    }

    fn plan(&self, migrator: &Migrator) -> anyhow::Result<MigrationPlan> {
        let document = load_document(&self.expected)
            .with_context(|| format!("loading {}", self.expected.display()))?;
        let catalog = match &self.actual {
            Some(path) => SnapshotCatalog::from_path(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => SnapshotCatalog::default(),
        };
        Ok(migrator.plan(&document.tables, &catalog)?)
    }
}

fn print_report(plan: &MigrationPlan, format: OutputFormat) -> anyhow::Result<()> {
    let report = plan.report();
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => {
            println!("{report}");
            for table in report.tables.iter().filter(|t| !t.forward_sql.is_empty()) {
                println!("\n-- {} ({})", table.summary.table, table.action);
                for sql in &table.forward_sql {
                    println!("{sql};");
                }
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Plan(args) => {
            let migrator = Migrator::new(args.options(None));
            let plan = args.plan(&migrator)?;
            print_report(&plan, args.format)?;
        }

        Commands::Apply(args) => {
            let executed = run(cli.database.as_deref(), &args, Direction::Forward).await?;
            info!(executed, "Migration applied");
        }

        Commands::Revert(args) => {
            let executed = run(cli.database.as_deref(), &args, Direction::Rollback).await?;
            info!(executed, "Migration reverted");
        }
    }

    Ok(())
}

#[derive(Clone, Copy)]
enum Direction {
    Forward,
    Rollback,
}

async fn run(database: Option<&str>, args: &RunArgs, direction: Direction) -> anyhow::Result<usize> {
    let migrator = Migrator::new(args.plan.options(args.timeout_secs));
    let plan = args.plan.plan(&migrator)?;
    if args.plan.format == OutputFormat::Json {
        print_report(&plan, OutputFormat::Json)?;
    }

    let mut executor: Box<dyn StatementExecutor> = if args.dry_run {
        info!("Dry run mode - SQL will be printed but not executed.");
        Box::new(DryRunExecutor::new())
    } else {
        let url = database.context("--database (or DATABASE_URL) is required unless --dry-run is set")?;
        Box::new(
            SqlxExecutor::connect(url, 1)
                .await
                .with_context(|| format!("connecting to {url}"))?,
        )
    };

    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping before the next statement");
            token.cancel();
        }
    });

    let executed = match direction {
        Direction::Forward => migrator.apply(&plan, &mut *executor, &cancel).await?,
        Direction::Rollback => migrator.revert(&plan, &mut *executor, &cancel).await?,
    };
    Ok(executed)
}
