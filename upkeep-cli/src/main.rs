//! upkeep - self-registering update orchestrator for CLI tool projects
//!
//! Projects register themselves here during their own installation; a
//! single `upkeep run` then walks the registry and drives each project's
//! installer to bring stale tools current.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use upkeep_core::update::{Orchestrator, RunOptions, Selection, UpdateOutcome, UpdateResult};
use upkeep_core::{platform, RegistryEntry, RegistryStore, UpkeepError};

/// Log levels
#[derive(Debug, Clone, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_filter_directive(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[derive(Parser, Debug)]
#[clap(
    name = "upkeep",
    about = "Keeps self-registered CLI tool projects up to date",
    version
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,

    /// Override the registry file path
    #[clap(long, global = true)]
    registry: Option<PathBuf>,

    /// Set log level
    #[clap(long, default_value = "warn", global = true)]
    log_level: LogLevel,
}

#[derive(Parser, Debug)]
enum Command {
    /// List registered projects
    List,

    /// Register a project (or replace its existing registration)
    Register {
        /// Unique project name
        name: String,
        /// Clone URL of the project's repository
        repo_url: String,
        /// Branch carrying releases and the VERSION artifact
        branch: String,
        /// Installed tree (may contain ~ and $VAR placeholders)
        install_dir: String,
        /// Plain-text file holding the installed version
        version_file: String,
        /// Install command run from a fresh clone; omit for copy-over
        /// installs. Quote arguments containing whitespace.
        install_cmd: Option<String>,
    },

    /// Unregister a project
    Unregister {
        /// Registered project name
        name: String,
    },

    /// Check registered projects and apply pending updates
    Run {
        /// Restrict the run to these project names (default: all)
        names: Vec<String>,

        /// Report what would change without executing anything
        #[clap(long)]
        dry_run: bool,

        /// Ask project installers to skip their test suites
        #[clap(long)]
        skip_tests: bool,
    },
}

#[derive(Tabled)]
struct ProjectRow {
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "BRANCH")]
    branch: String,
    #[tabled(rename = "REPOSITORY")]
    repo_url: String,
    #[tabled(rename = "INSTALL DIR")]
    install_dir: String,
    #[tabled(rename = "INSTALLER")]
    installer: String,
}

/// Logs go to stderr so stdout stays safe for scripting.
fn initialize_tracing(log_level: &LogLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_filter_directive()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    initialize_tracing(&cli.log_level);

    let store = match &cli.registry {
        Some(path) => RegistryStore::at(path.clone()),
        None => RegistryStore::open().context("could not locate the registry")?,
    };
    debug!("Using registry at {}", store.path().display());

    match cli.command {
        Command::List => list_command(&store),
        Command::Register {
            name,
            repo_url,
            branch,
            install_dir,
            version_file,
            install_cmd,
        } => register_command(
            &store,
            RegistryEntry {
                name,
                repo_url,
                branch,
                install_dir,
                version_file,
                install_cmd: install_cmd.unwrap_or_default(),
            },
        ),
        Command::Unregister { name } => unregister_command(&store, &name),
        Command::Run {
            names,
            dry_run,
            skip_tests,
        } => run_command(&store, names, dry_run, skip_tests).await,
    }
}

fn list_command(store: &RegistryStore) -> Result<()> {
    let entries = store.list();
    if entries.is_empty() {
        println!("No projects registered (registry: {})", store.path().display());
        return Ok(());
    }

    let rows: Vec<ProjectRow> = entries
        .into_iter()
        .map(|e| ProjectRow {
            name: e.name,
            branch: e.branch,
            repo_url: e.repo_url,
            install_dir: e.install_dir,
            installer: if e.install_cmd.is_empty() {
                "(copy-over)".to_string()
            } else {
                e.install_cmd
            },
        })
        .collect();

    let mut table = Table::new(rows);
    table
        .with(Style::blank())
        .with(Modify::new(Rows::first()).with(Alignment::left()));
    println!("{table}");
    Ok(())
}

fn register_command(store: &RegistryStore, entry: RegistryEntry) -> Result<()> {
    store
        .add(&entry)
        .with_context(|| format!("could not register '{}'", entry.name))?;
    println!("Registered '{}' ({} @ {})", entry.name, entry.repo_url, entry.branch);
    Ok(())
}

fn unregister_command(store: &RegistryStore, name: &str) -> Result<()> {
    match store.remove(name) {
        Ok(()) => {
            println!("Unregistered '{name}'");
            Ok(())
        }
        // Absent target is scoped to this call and non-fatal.
        Err(UpkeepError::NotFound(_)) => {
            eprintln!("Warning: '{name}' was not registered");
            Ok(())
        }
        Err(e) => Err(e).with_context(|| format!("could not unregister '{name}'")),
    }
}

async fn run_command(
    store: &RegistryStore,
    names: Vec<String>,
    dry_run: bool,
    skip_tests: bool,
) -> Result<()> {
    let options = RunOptions { dry_run, skip_tests };
    let selection = Selection::from_names(names);

    println!(
        "upkeep {} on {}{}",
        env!("CARGO_PKG_VERSION"),
        platform::describe(),
        if dry_run { " (dry run)" } else { "" }
    );

    let orchestrator =
        Orchestrator::new(store.clone(), options).context("could not start the update engine")?;
    let summary = orchestrator
        .run(&selection)
        .await
        .context("update run aborted")?;

    for result in &summary.results {
        print_result(result);
    }

    println!(
        "\n{} updated, {} up-to-date, {} skipped, {} failed",
        summary.updated(),
        summary.up_to_date(),
        summary.skipped(),
        summary.failed()
    );

    let code = exit_code(&summary);
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}

/// Exit status contract: 0 iff no processed project failed; up-to-date
/// and skipped outcomes never fail a run.
fn exit_code(summary: &upkeep_core::RunSummary) -> i32 {
    if summary.succeeded() {
        0
    } else {
        1
    }
}

fn print_result(result: &UpdateResult) {
    let mark = match result.outcome {
        UpdateOutcome::Updated => "+",
        UpdateOutcome::UpToDate => "=",
        UpdateOutcome::Skipped => "~",
        UpdateOutcome::Failed => "!",
    };

    let mut line = format!(
        "{} {}: {} ({} -> {})",
        mark, result.name, result.outcome, result.local_version, result.remote_version
    );
    if !result.detail.is_empty() {
        line.push_str(&format!(" - {}", result.detail));
    }
    println!("{line}");
}
