//! elevate-ctl - operator CLI for media reference maintenance
//!
//! Works directly on the media database, without the HTTP service. Summaries
//! go to stdout (`--json` for machine-readable output); logs go to stderr.
//!
//! Exits non-zero only when configuration is invalid or the database cannot
//! be reached. Individual record failures are reported but do not fail the
//! run.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use elevate_common::api::issue_token;
use elevate_common::config::{ReconcileArgs, ReconcileOverrides, TomlConfig};
use elevate_common::db::init_database;
use elevate_common::reconcile::{
    audit_references, ReconciliationReport, Reconciler, ReferenceAudit, RunStatus,
    SqliteMediaStore,
};
use elevate_common::uploads::{analyze_duplicates, DuplicateAnalysis};
use sqlx::SqlitePool;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "elevate-ctl")]
#[command(about = "Maintain media references in the music database")]
#[command(version)]
struct Cli {
    /// SQLite database holding the music records
    #[arg(short, long, global = true, env = "ELEVATE_DATABASE")]
    database: Option<PathBuf>,

    /// Config file (defaults to the per-user config location)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Rewrite stale media references
    Reconcile {
        #[command(flatten)]
        reconcile: ReconcileArgs,

        /// Show what would change without writing
        #[arg(long)]
        dry_run: bool,

        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Classify stored references without changing anything
    Audit {
        #[command(flatten)]
        reconcile: ReconcileArgs,

        /// Also report references whose file is missing from this directory
        #[arg(long)]
        uploads_dir: Option<PathBuf>,

        #[arg(long)]
        json: bool,
    },
    /// List files in the uploads directory stored more than once
    Duplicates {
        /// Uploads directory (defaults to the configured one)
        #[arg(long, env = "ELEVATE_UPLOADS_DIR")]
        dir: Option<PathBuf>,

        #[arg(long)]
        json: bool,
    },
    /// Manage admin API tokens
    #[command(subcommand)]
    Token(TokenCommand),
}

#[derive(Debug, Subcommand)]
enum TokenCommand {
    /// Create a token and print it once
    Issue {
        /// Label stored alongside the token hash
        #[arg(long)]
        name: String,

        /// Allow the token to trigger reconciliation
        #[arg(long)]
        admin: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "elevate_ctl=info,elevate_common=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let toml_config = TomlConfig::load(cli.config.as_deref())?;

    match cli.command {
        Command::Reconcile {
            reconcile,
            dry_run,
            json,
        } => {
            let settings = ReconcileOverrides::from(reconcile)
                .resolve(&toml_config.reconcile)
                .context("Invalid reconciliation configuration")?;
            let pool = open_database(&toml_config, cli.database).await?;

            let reconciler = Reconciler::new(SqliteMediaStore::new(pool), settings);
            let report = if dry_run {
                reconciler.plan().await?
            } else {
                reconciler.reconcile().await?
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
            if report.failed > 0 {
                warn!("{} records could not be updated", report.failed);
            }
        }
        Command::Audit {
            reconcile,
            uploads_dir,
            json,
        } => {
            let settings = ReconcileOverrides::from(reconcile)
                .resolve(&toml_config.reconcile)
                .context("Invalid reconciliation configuration")?;
            let pool = open_database(&toml_config, cli.database).await?;

            let store = SqliteMediaStore::new(pool);
            let audit = audit_references(
                &store,
                settings.matcher(),
                settings.store_timeout(),
                uploads_dir.as_deref(),
            )
            .await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&audit)?);
            } else {
                print_audit(&audit);
            }
        }
        Command::Duplicates { dir, json } => {
            let dir = toml_config.resolve_uploads_dir(dir);
            let analysis = analyze_duplicates(&dir)
                .with_context(|| format!("Failed to scan {}", dir.display()))?;

            if json {
                println!("{}", serde_json::to_string_pretty(&analysis)?);
            } else {
                print_duplicates(&analysis);
            }
        }
        Command::Token(TokenCommand::Issue { name, admin }) => {
            let pool = open_database(&toml_config, cli.database).await?;
            let token = issue_token(&pool, &name, admin).await?;
            info!(name = %name, admin, "Issued API token");
            println!("{}", token);
        }
    }

    Ok(())
}

async fn open_database(toml_config: &TomlConfig, cli: Option<PathBuf>) -> Result<SqlitePool> {
    let db_path = toml_config.resolve_database_path(cli);
    info!("Database path: {}", db_path.display());
    init_database(&db_path)
        .await
        .with_context(|| format!("Failed to open database {}", db_path.display()))
}

fn print_report(report: &ReconciliationReport) {
    println!("{}", report.message());
    if report.status == RunStatus::AlreadyUpToDate {
        return;
    }

    println!(
        "Target: {}  found: {}  updated: {}  planned: {}  unchanged: {}  failed: {}  ({}ms)",
        report.target_form,
        report.scanned,
        report.updated,
        report.planned,
        report.unchanged,
        report.failed,
        report.elapsed_ms()
    );
    for (outcome, change) in report.applied_changes() {
        println!(
            "  {} [{}] {}: {} -> {}",
            outcome.title, outcome.guid, change.field, change.old_value, change.new_value
        );
    }
    for (outcome, error) in report.failures() {
        println!("  FAILED {} [{}]: {}", outcome.title, outcome.guid, error);
    }
}

fn print_audit(audit: &ReferenceAudit) {
    println!(
        "{} records, {} references ({} missing)",
        audit.total_records, audit.total_references, audit.missing_references
    );
    println!("  stale:         {}", audit.stale);
    println!("  absolute:      {}", audit.absolute);
    println!("  root-relative: {}", audit.root_relative);
    println!("  other:         {}", audit.other);

    if audit.stale == 0 {
        println!("No stale references.");
    }
    for record in &audit.stale_records {
        let fields: Vec<String> = record.fields.iter().map(ToString::to_string).collect();
        println!("  {} [{}]: {}", record.title, record.guid, fields.join(", "));
    }

    if let Some(missing) = &audit.missing_assets {
        println!("{} referenced files missing from uploads", missing.len());
        for asset in missing {
            println!(
                "  {} [{}] {}: {}",
                asset.title, asset.guid, asset.field, asset.file_name
            );
        }
    }
}

fn print_duplicates(analysis: &DuplicateAnalysis) {
    println!(
        "{} files, {} duplicated names",
        analysis.total_files,
        analysis.duplicates.len()
    );

    let mut reclaimable = 0;
    for group in &analysis.duplicates {
        reclaimable += group.redundant_bytes();
        println!("  {} ({} copies)", group.base_name, group.files.len());
        for file in &group.files {
            println!("    {} ({} bytes)", file.file_name, file.size_bytes);
        }
    }
    if reclaimable > 0 {
        println!("{} bytes held by older copies", reclaimable);
    }
}
