//! cabinet-import - Legacy clinic data import tool
//!
//! Loads the XML and JSON exports of the legacy desktop application into
//! the cabinet database, one entity job per subcommand, plus read-only
//! diagnostic and verification reports.

use anyhow::{Context, Result};
use cabinet_common::config::{database_path, resolve_root_folder, ImportSettings, TomlConfig};
use cabinet_common::db::{connect_readonly, init_database};
use cabinet_import::jobs::{
    actes, assistants, compte_rendus, honoraires, message_templates, patients,
    payment_validations, visits, WriteMode,
};
use cabinet_import::{diagnose, verify, ImportReport};
use clap::{Parser, Subcommand};
use sqlx::SqlitePool;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{error, info};

/// Command-line arguments for cabinet-import
#[derive(Parser, Debug)]
#[command(name = "cabinet-import")]
#[command(about = "Import legacy clinic exports into the cabinet database")]
#[command(version)]
struct Args {
    /// Root folder holding cabinet.db
    #[arg(long, global = true)]
    root_folder: Option<PathBuf>,

    /// Database file, overrides <root folder>/cabinet.db
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Records per bulk insert call
    #[arg(long, global = true)]
    batch_size: Option<usize>,

    /// Records between progress lines (0 disables them)
    #[arg(long, global = true)]
    progress_interval: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upsert patients from the XML patient table
    Patients {
        /// Source file (default: patients.xml in the source directory)
        file: Option<PathBuf>,
    },
    /// Replace honoraires from the XML fee table
    Honoraires { file: Option<PathBuf> },
    /// Replace the act fee catalog from XML
    Actes { file: Option<PathBuf> },
    /// Import visit examinations from a JSON export
    Visits {
        file: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = WriteMode::Replace)]
        mode: WriteMode,
    },
    /// Upsert compte rendus from a JSON export
    CompteRendus { file: Option<PathBuf> },
    /// Import payment validations from a JSON export
    PaymentValidations {
        file: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = WriteMode::Replace)]
        mode: WriteMode,
    },
    /// Create user accounts for legacy assistants
    MigrateAssistants,
    /// Seed default message templates into an empty table
    SeedMessages,
    /// Report date format and patient code inconsistencies (read-only)
    Diagnose {
        /// Patient code to probe lookups for
        #[arg(long, requires = "date")]
        patient_code: Option<String>,
        /// Raw date string to probe lookups with
        #[arg(long, requires = "patient_code")]
        date: Option<String>,
    },
    /// Report row counts and recorded import runs (read-only)
    Verify,
}

impl Command {
    fn is_read_only(&self) -> bool {
        matches!(self, Command::Diagnose { .. } | Command::Verify)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Config is loaded before tracing so its log_level can seed the filter
    let toml_config = TomlConfig::load(args.config.as_deref());
    let default_level = toml_config
        .as_ref()
        .ok()
        .and_then(|config| config.log_level.clone())
        .unwrap_or_else(|| "info".to_string());

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_level.into()),
        )
        .init();

    info!(
        "Starting cabinet-import v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let result = match toml_config {
        Ok(toml_config) => run(args, toml_config).await,
        Err(e) => Err(anyhow::Error::new(e).context("Failed to load configuration")),
    };

    // Returning the error exits with status 1
    if let Err(e) = &result {
        error!("❌ {:#}", e);
    }
    result
}

async fn run(args: Args, toml_config: TomlConfig) -> Result<()> {
    let settings = ImportSettings::resolve(&toml_config, args.batch_size, args.progress_interval)?;

    let db_path = match args.database {
        Some(path) => path,
        None => database_path(&resolve_root_folder(args.root_folder.as_deref(), &toml_config)),
    };
    info!("Database: {}", db_path.display());

    let pool = if args.command.is_read_only() {
        let pool = connect_readonly(&db_path).await?;
        info!("✓ Connected to database (read-only)");
        pool
    } else {
        init_database(&db_path)
            .await
            .with_context(|| format!("Failed to open database {}", db_path.display()))?
    };

    let outcome = dispatch(args.command, &pool, &settings).await;
    pool.close().await;
    outcome
}

async fn dispatch(command: Command, pool: &SqlitePool, settings: &ImportSettings) -> Result<()> {
    let source = |file: Option<PathBuf>, default_name: &str| -> PathBuf {
        settings.source_path(file.as_deref(), default_name)
    };

    let report = match command {
        Command::Patients { file } => {
            let path = source(file, patients::DEFAULT_SOURCE);
            patients::import_patients(pool, &path, settings).await?
        }
        Command::Honoraires { file } => {
            let path = source(file, honoraires::DEFAULT_SOURCE);
            honoraires::import_honoraires(pool, &path, settings).await?
        }
        Command::Actes { file } => {
            let path = source(file, actes::DEFAULT_SOURCE);
            actes::import_actes(pool, &path, settings).await?
        }
        Command::Visits { file, mode } => {
            let path = source(file, visits::DEFAULT_SOURCE);
            visits::import_visits(pool, &path, settings, mode).await?
        }
        Command::CompteRendus { file } => {
            let path = source(file, compte_rendus::DEFAULT_SOURCE);
            compte_rendus::import_compte_rendus(pool, &path, settings).await?
        }
        Command::PaymentValidations { file, mode } => {
            let path = source(file, payment_validations::DEFAULT_SOURCE);
            payment_validations::import_payment_validations(pool, &path, settings, mode).await?
        }
        Command::MigrateAssistants => assistants::migrate_assistants(pool, settings).await?,
        Command::SeedMessages => match message_templates::seed_message_templates(pool, settings).await? {
            Some(report) => report,
            None => return Ok(()),
        },
        Command::Diagnose { patient_code, date } => {
            let probe = patient_code.as_deref().zip(date.as_deref());
            let report = diagnose::run_diagnostics(pool, probe).await?;
            diagnose::log_report(&report);
            return Ok(());
        }
        Command::Verify => {
            let report = verify::run_verification(pool).await?;
            verify::log_report(&report);
            return Ok(());
        }
    };

    log_skips(&report);
    Ok(())
}

/// Summarize skip reasons after a run
fn log_skips(report: &ImportReport) {
    if report.skipped == 0 {
        return;
    }

    let mut reasons: BTreeMap<String, usize> = BTreeMap::new();
    for skip in &report.skips {
        *reasons.entry(skip.reason.to_string()).or_insert(0) += 1;
    }
    for (reason, count) in reasons {
        info!("   {} × {}", count, reason);
    }
}
