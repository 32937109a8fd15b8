// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Vault Console
//!
//! Entry point for the `vault-console` binary. Parses CLI arguments,
//! initializes logging, loads the registry snapshot, and dispatches to a
//! subcommand:
//!
//! - `open`, `deposit`, `accrue`, `request-withdrawal`, `execute-withdrawal`
//!   — apply a ledger operation and save the snapshot
//! - `status`, `estimate` — read-only views
//! - `run`     — accrual scheduler, one day of credits per period, each
//!   period saved under the state-file lock
//! - `version` — print build version information
//!
//! Ledger rejections exit with status 2 and leave the snapshot untouched.

mod cli;
mod commands;
mod logging;
mod metrics;
mod scheduler;
mod session;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;

use cli::{Commands, LedgerCommand, VaultConsoleCli};
use commands::Outcome;
use logging::LogFormat;
use metrics::ConsoleMetrics;
use scheduler::AccrualScheduler;
use session::Session;
use vault_ledger::VaultConfig;

/// Exit status for an operation the ledger rejected.
const EXIT_REJECTED: u8 = 2;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = VaultConsoleCli::parse();

    if let Commands::Version = cli.command {
        print_version();
        return Ok(ExitCode::SUCCESS);
    }

    logging::init_logging(
        "vault_console=info,vault_ledger=info",
        LogFormat::from_str_lossy(&cli.log_format),
    );

    let config = session::load_config(cli.config.as_deref())?;
    let command = match cli.command {
        Commands::Ledger(command) => command,
        Commands::Run(args) => return run_scheduler(cli.state, config, args).await,
        Commands::Version => return Ok(ExitCode::SUCCESS),
    };

    // Held until `session` drops, covering load, apply and save.
    let session = Session::load(&cli.state, config)?;

    let (name, result) = match command {
        LedgerCommand::Open(args) => ("open", commands::open(&session, args)),
        LedgerCommand::Deposit(args) => ("deposit", commands::deposit(&session, args)),
        LedgerCommand::Accrue(args) => ("accrue", commands::accrue(&session, args)),
        LedgerCommand::RequestWithdrawal(args) => (
            "request-withdrawal",
            commands::request_withdrawal(&session, args),
        ),
        LedgerCommand::ExecuteWithdrawal(args) => (
            "execute-withdrawal",
            commands::execute_withdrawal(&session, args),
        ),
        LedgerCommand::Status(args) => ("status", commands::status(&session, args)),
        LedgerCommand::Estimate(args) => ("estimate", commands::estimate(&session, args)),
    };

    match result {
        Ok(Outcome::Changed) => {
            session.save()?;
            commands::audit(name, &session);
            Ok(ExitCode::SUCCESS)
        }
        Ok(Outcome::Unchanged) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            tracing::debug!(command = name, error = %e, "operation rejected");
            eprintln!("{}", commands::feedback(&e));
            Ok(ExitCode::from(EXIT_REJECTED))
        }
    }
}

/// Runs the accrual scheduler until Ctrl+C / SIGTERM or `--max-ticks`.
///
/// The state file is only locked while a period is being applied, so other
/// commands keep working against it in between.
async fn run_scheduler(
    state: PathBuf,
    config: Option<VaultConfig>,
    args: cli::RunArgs,
) -> Result<ExitCode> {
    if args.tick_ms == 0 {
        anyhow::bail!("--tick-ms must be greater than zero");
    }

    // Fail fast on an unreadable snapshot rather than on the first period.
    let accounts = Session::load(&state, config.clone())?.registry().len();

    let metrics = ConsoleMetrics::new();
    tracing::info!(
        tick_ms = args.tick_ms,
        accounts,
        state = %state.display(),
        "accrual scheduler started"
    );

    let scheduler = AccrualScheduler::new(
        state,
        config,
        Duration::from_millis(args.tick_ms),
        metrics.clone(),
    );
    let ticks = scheduler.run(args.max_ticks, shutdown_signal()).await;
    tracing::info!(ticks, "accrual scheduler stopped");

    if args.metrics {
        let text = metrics.encode().context("failed to encode metrics")?;
        print!("{}", text);
    }
    Ok(ExitCode::SUCCESS)
}

/// Prints version information to stdout.
fn print_version() {
    println!("vault-console {}", env!("CARGO_PKG_VERSION"));
    println!(
        "snapshot fmt  v{}",
        vault_ledger::config::SNAPSHOT_FORMAT_VERSION
    );
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// On non-Unix platforms, only Ctrl+C is supported. If a handler cannot be
/// installed, that signal source is ignored rather than stopping at once.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
