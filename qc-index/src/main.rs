//! qc-index - QC review index builder
//!
//! Indexes a QC figure directory into SQLite, applies reviewer updates and
//! exports the review table.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use qc_common::config::{resolve_database_path, TomlConfig};
use qc_common::db::{initialize_index, open_database, require_initialized};
use qc_index::{
    apply_update, AttributeSource, BidsFileSource, EntityUpdate, QcSpecification, ReadView,
    ReconcileOptions, Reconciler, RunSummary,
};
use sqlx::SqlitePool;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for qc-index
#[derive(Parser, Debug)]
#[command(name = "qc-index")]
#[command(about = "Build and query a QC review index")]
#[command(version)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "QC_INDEX_CONFIG")]
    config: Option<PathBuf>,

    /// SQLite index file (overrides QC_INDEX_DB and the config file)
    #[arg(short, long)]
    db_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a new index and populate it from a QC directory
    Initialize {
        #[arg(long)]
        base_directory: PathBuf,
        #[arg(long)]
        qc_specification_file: PathBuf,
    },

    /// Add newly found entities to an existing index
    Update {
        #[arg(long)]
        base_directory: PathBuf,
        #[arg(long)]
        qc_specification_file: PathBuf,
        /// Replace images and names of entities that already exist
        #[arg(long)]
        update_existing: bool,
        /// Keep ratings and annotations of updated entities
        #[arg(long, requires = "update_existing")]
        no_reset_on_update: bool,
    },

    /// Print entity counts as JSON
    Summary,

    /// Print the rating enumeration (ids accepted by `review --rating`) as JSON
    Ratings,

    /// Print one entity and its available annotations as JSON
    Show {
        #[arg(long)]
        entity: i64,
    },

    /// Record a reviewer's rating, annotation or comment
    Review {
        #[arg(long)]
        entity: i64,
        #[arg(long)]
        rating: Option<i64>,
        #[arg(long)]
        annotation: Option<i64>,
        #[arg(long)]
        comment: Option<String>,
    },

    /// Write the review table as TSV
    Export {
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = TomlConfig::load_default(args.config.as_deref())
        .context("Failed to load configuration")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level)),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let db_path = resolve_database_path(args.db_file.as_deref(), &config);
    info!("Database: {}", db_path.display());

    let pool = open_database(&db_path, config.busy_timeout_ms)
        .await
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;

    let result = run(args.command, &pool, &db_path).await;
    pool.close().await;
    result
}

async fn run(command: Command, pool: &SqlitePool, db_path: &Path) -> Result<()> {
    match command {
        Command::Initialize {
            base_directory,
            qc_specification_file,
        } => {
            let spec = QcSpecification::load(&qc_specification_file)?;
            initialize_index(pool, db_path, &spec.ratings()).await?;
            let summary = index(pool, &spec, &base_directory, ReconcileOptions::default()).await?;
            finish(summary)
        }

        Command::Update {
            base_directory,
            qc_specification_file,
            update_existing,
            no_reset_on_update,
        } => {
            require_initialized(pool, db_path).await?;
            let spec = QcSpecification::load(&qc_specification_file)?;
            let options = ReconcileOptions {
                update_existing,
                reset_on_update: !no_reset_on_update,
            };
            let summary = index(pool, &spec, &base_directory, options).await?;
            finish(summary)
        }

        Command::Summary => {
            require_initialized(pool, db_path).await?;
            let summary = ReadView::new(pool.clone()).summary().await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
            Ok(())
        }

        Command::Ratings => {
            require_initialized(pool, db_path).await?;
            let ratings = ReadView::new(pool.clone()).ratings().await?;
            println!("{}", serde_json::to_string_pretty(&ratings)?);
            Ok(())
        }

        Command::Show { entity } => {
            require_initialized(pool, db_path).await?;
            match ReadView::new(pool.clone()).entity_review(entity).await? {
                Some(review) => {
                    println!("{}", serde_json::to_string_pretty(&review)?);
                    Ok(())
                }
                None => bail!("Entity {} not found", entity),
            }
        }

        Command::Review {
            entity,
            rating,
            annotation,
            comment,
        } => {
            require_initialized(pool, db_path).await?;
            let update = EntityUpdate {
                rating,
                annotation,
                comment,
            };
            if update.is_empty() {
                bail!("Nothing to update: pass --rating, --annotation or --comment");
            }
            apply_update(pool, entity, &update).await?;
            let view = ReadView::new(pool.clone()).entity(entity).await?;
            println!("{}", serde_json::to_string_pretty(&view)?);
            Ok(())
        }

        Command::Export { output } => {
            require_initialized(pool, db_path).await?;
            let table = ReadView::new(pool.clone()).export().await?;
            match output {
                Some(path) => {
                    let file = std::fs::File::create(&path)
                        .with_context(|| format!("Failed to create {}", path.display()))?;
                    table
                        .write_tsv(file)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    info!("Exported {} rows to {}", table.rows.len(), path.display());
                }
                None => table.write_tsv(std::io::stdout().lock())?,
            }
            Ok(())
        }
    }
}

async fn index(
    pool: &SqlitePool,
    spec: &QcSpecification,
    base_directory: &Path,
    options: ReconcileOptions,
) -> Result<RunSummary> {
    let source = BidsFileSource::new(base_directory, spec.image_extensions.clone());
    let records = source
        .records()
        .with_context(|| format!("Failed to read {}", base_directory.display()))?;
    info!("Found {} image records under {}", records.len(), base_directory.display());

    let reconciler = Reconciler::new(pool.clone());
    Ok(reconciler
        .reconcile_all(&spec.components(), &records, options)
        .await)
}

fn finish(summary: RunSummary) -> Result<()> {
    for report in &summary.reports {
        println!(
            "{}: {} created, {} updated, {} skipped, {} reset",
            report.component, report.created, report.updated, report.skipped, report.reset
        );
    }

    for failure in &summary.failures {
        match &failure.cell {
            Some((row, column)) => warn!(
                "{} rolled back at ({}, {}): {}",
                failure.component, row, column, failure.error
            ),
            None => warn!("{} rolled back: {}", failure.component, failure.error),
        }
    }

    if !summary.is_success() {
        bail!(
            "{} of {} components failed",
            summary.failures.len(),
            summary.failures.len() + summary.reports.len()
        );
    }
    Ok(())
}
