// crates/stride-cli/src/main.rs
// ============================================================================
// Module: Stride CLI Entry Point
// Description: Command dispatcher for step ingestion and query workflows.
// Purpose: Route host commands into the reconciliation core over the SQLite
//          store.
// Dependencies: clap, stride-config, stride-core, stride-store-sqlite, time
// ============================================================================

//! ## Overview
//! The Stride CLI is pure message routing: each subcommand opens the
//! configured SQLite store and calls exactly one core entry point. `track`
//! simulates a hosting service session, driving the lifecycle state machine
//! over a stream of raw readings from stdin; the remaining commands are
//! one-shot event or query calls.

// ============================================================================
// SECTION: Modules
// ============================================================================


// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::BufRead;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use clap::Subcommand;
use stride_config::StrideConfig;
use stride_core::DebugLog;
use stride_core::LogEntry;
use stride_core::LogLevel;
use stride_core::ReadingStatus;
use stride_core::ReconcileEngine;
use stride_core::ServiceLifecycle;
use stride_core::StepStore;
use stride_store_sqlite::SqliteStepStore;
use stride_store_sqlite::SqliteStoreConfig;
use time::OffsetDateTime;

// ============================================================================
// SECTION: CLI Definition
// ============================================================================

/// Stride: durable, monotonic step totals from a reset-prone raw counter.
#[derive(Debug, Parser)]
#[command(name = "stride", version)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Path to the SQLite store (overrides the configured path).
    #[arg(long, global = true)]
    store: Option<PathBuf>,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Top-level commands.
#[derive(Debug, Subcommand)]
enum Commands {
    /// Reconciles one raw sensor reading and prints the daily total.
    Ingest {
        /// Raw sensor value (non-negative float).
        raw: f64,
    },
    /// Runs a tracking session, reading raw values from stdin line by line.
    Track,
    /// Prints the lifetime step total.
    Total,
    /// Prints today's step total (`-1` when no data yet).
    Today,
    /// Prints the serialized hourly history table.
    History,
    /// Folds open buckets ahead of power-off.
    Shutdown,
    /// Debug log commands.
    Log {
        /// Log subcommand to execute.
        #[command(subcommand)]
        command: LogCommands,
    },
}

/// Debug log subcommands.
#[derive(Debug, Subcommand)]
enum LogCommands {
    /// Prints the persisted log entries, oldest first.
    Show,
    /// Removes all persisted log entries.
    Clear,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper carrying a user-facing message.
#[derive(Debug)]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`] from a message.
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.message.fmt(f)
    }
}

/// CLI result alias.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    let config =
        StrideConfig::load(cli.config.as_deref()).map_err(|err| CliError::new(err.to_string()))?;
    let store = open_store(&config, cli.store.clone())?;
    let log = debug_log_for(&config);
    dispatch(&cli.command, &store, log)
}

/// Routes one parsed command to its handler.
fn dispatch(command: &Commands, store: &SqliteStepStore, log: DebugLog) -> CliResult<ExitCode> {
    match command {
        Commands::Ingest {
            raw,
        } => command_ingest(store, log, *raw),
        Commands::Track => command_track(store, log, &mut std::io::stdin().lock()),
        Commands::Total => command_total(store, log),
        Commands::Today => command_today(store, log),
        Commands::History => command_history(store, log),
        Commands::Shutdown => command_shutdown(store, log),
        Commands::Log {
            command,
        } => match command {
            LogCommands::Show => command_log_show(store, log),
            LogCommands::Clear => command_log_clear(store, log),
        },
    }
}

// ============================================================================
// SECTION: Store Resolution
// ============================================================================

/// Opens the SQLite store from the loaded configuration and overrides.
fn open_store(
    config: &StrideConfig,
    store_override: Option<PathBuf>,
) -> CliResult<SqliteStepStore> {
    let mut store_config: SqliteStoreConfig = config.store_config();
    if let Some(path) = store_override {
        store_config.path = path;
    }
    SqliteStepStore::open(&store_config).map_err(|err| CliError::new(err.to_string()))
}

/// Builds the debug log ring with the configured retention cap.
fn debug_log_for(config: &StrideConfig) -> DebugLog {
    DebugLog::with_capacity(config.log.max_entries)
}

/// Captures the local calendar moment, falling back to UTC when the local
/// offset is indeterminate.
fn local_now() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

// ============================================================================
// SECTION: Commands
// ============================================================================

/// Reconciles one reading and prints the resulting daily total.
fn command_ingest<S: StepStore>(store: &S, log: DebugLog, raw: f64) -> CliResult<ExitCode> {
    let engine = ReconcileEngine::new(log);
    let report = engine.on_sensor_reading(store, raw, local_now());
    if report.daily_status == ReadingStatus::Invalid {
        return Err(CliError::new(format!("unusable raw reading: {raw}")));
    }
    write_stdout_line(&report.daily_steps.to_string())
        .map_err(|err| CliError::new(output_error(&err)))?;
    Ok(ExitCode::SUCCESS)
}

/// Runs a tracking session over a stream of raw readings.
///
/// Drives the lifecycle state machine the way a hosting service would:
/// start, attach, one reconcile per reading, fold-and-stop at end of input.
fn command_track<S: StepStore, R: BufRead>(
    store: &S,
    log: DebugLog,
    input: &mut R,
) -> CliResult<ExitCode> {
    let mut lifecycle = ServiceLifecycle::new(ReconcileEngine::new(log));
    lifecycle
        .start(true)
        .map_err(|err| CliError::new(err.to_string()))?;
    lifecycle.sensor_attached().map_err(|err| CliError::new(err.to_string()))?;

    let mut line = String::new();
    loop {
        line.clear();
        let read = input
            .read_line(&mut line)
            .map_err(|err| CliError::new(format!("stdin read failed: {err}")))?;
        if read == 0 {
            break;
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let Ok(raw) = trimmed.parse::<f64>() else {
            write_stderr_line(&format!("skipping unparsable reading: {trimmed}"))
                .map_err(|err| CliError::new(output_error(&err)))?;
            continue;
        };
        if let Some(report) = lifecycle.handle_reading(store, raw, local_now()) {
            write_stdout_line(&report.daily_steps.to_string())
                .map_err(|err| CliError::new(output_error(&err)))?;
        }
    }

    lifecycle.handle_shutdown(store, local_now());
    Ok(ExitCode::SUCCESS)
}

/// Prints the lifetime total.
fn command_total<S: StepStore>(store: &S, log: DebugLog) -> CliResult<ExitCode> {
    let engine = ReconcileEngine::new(log);
    let total = engine.lifetime_total(store).map_err(|err| CliError::new(err.to_string()))?;
    write_stdout_line(&total.to_string()).map_err(|err| CliError::new(output_error(&err)))?;
    Ok(ExitCode::SUCCESS)
}

/// Prints today's total (`-1` when no data yet).
fn command_today<S: StepStore>(store: &S, log: DebugLog) -> CliResult<ExitCode> {
    let engine = ReconcileEngine::new(log);
    let today = engine
        .today_total(store, local_now())
        .map_err(|err| CliError::new(err.to_string()))?;
    write_stdout_line(&today.to_string()).map_err(|err| CliError::new(output_error(&err)))?;
    Ok(ExitCode::SUCCESS)
}

/// Prints the serialized hourly history table.
fn command_history<S: StepStore>(store: &S, log: DebugLog) -> CliResult<ExitCode> {
    let engine = ReconcileEngine::new(log);
    let history = engine.history(store).map_err(|err| CliError::new(err.to_string()))?;
    write_stdout_line(&history).map_err(|err| CliError::new(output_error(&err)))?;
    Ok(ExitCode::SUCCESS)
}

/// Folds open buckets ahead of power-off.
fn command_shutdown<S: StepStore>(store: &S, log: DebugLog) -> CliResult<ExitCode> {
    let now = local_now();
    let engine = ReconcileEngine::new(log);
    log.append_best_effort(
        store,
        LogEntry::at(now, LogLevel::Info, "cli", "shutdown requested, folding buffers"),
    );
    engine.on_shutdown(store, now);
    Ok(ExitCode::SUCCESS)
}

/// Prints the persisted log entries, oldest first.
fn command_log_show<S: StepStore>(store: &S, log: DebugLog) -> CliResult<ExitCode> {
    let entries = log.entries(store).map_err(|err| CliError::new(err.to_string()))?;
    for entry in entries {
        write_stdout_line(&format!(
            "{} {} [{}] {}",
            entry.timestamp,
            entry.level.as_str(),
            entry.tag,
            entry.message
        ))
        .map_err(|err| CliError::new(output_error(&err)))?;
    }
    Ok(ExitCode::SUCCESS)
}

/// Removes all persisted log entries.
fn command_log_clear<S: StepStore>(store: &S, log: DebugLog) -> CliResult<ExitCode> {
    log.clear(store).map_err(|err| CliError::new(err.to_string()))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats an output-stream failure message.
fn output_error(err: &std::io::Error) -> String {
    format!("failed to write output: {err}")
}

/// Emits an error message and returns the failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
