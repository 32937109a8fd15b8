//! # CLI Interface
//!
//! Command-line structure for `vault-console`, via `clap` derive. Every
//! subcommand works against a registry snapshot file (`--state`), loaded at
//! start and written back after a successful state change.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Vault ledger operator console.
///
/// Opens vault accounts, applies deposits and daily accrual, files and
/// executes early withdrawals, and shows the derived dashboard values.
#[derive(Parser, Debug)]
#[command(
    name = "vault-console",
    about = "Vault ledger operator console",
    version,
    propagate_version = true
)]
pub struct VaultConsoleCli {
    /// Registry snapshot file. Created on the first state change.
    #[arg(
        long,
        short = 's',
        env = "VAULT_STATE",
        default_value = "vault-state.json",
        global = true
    )]
    pub state: PathBuf,

    /// Vault rate configuration (JSON). Overrides the rates stored in the
    /// snapshot when given.
    #[arg(long, short = 'c', env = "VAULT_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Log output format: `pretty` or `json`.
    #[arg(long, env = "VAULT_LOG_FORMAT", default_value = "pretty", global = true)]
    pub log_format: String,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(flatten)]
    Ledger(LedgerCommand),
    /// Run the accrual scheduler until interrupted.
    Run(RunArgs),
    /// Print version information and exit.
    Version,
}

/// Subcommands that run once against a locked snapshot.
#[derive(Subcommand, Debug)]
pub enum LedgerCommand {
    /// Open a vault account, optionally seeded with existing balances.
    Open(OpenArgs),
    /// Lock tokens into the vault.
    Deposit(AmountArgs),
    /// Accrue daily credits for one account, or for every account.
    Accrue(AccrueArgs),
    /// File the account's one early-withdrawal request.
    RequestWithdrawal(AmountArgs),
    /// Execute a pending withdrawal. Admin only; forfeits all credits.
    ExecuteWithdrawal(ExecuteArgs),
    /// Show balances and derived values for an account.
    Status(StatusArgs),
    /// Estimate the daily credits a deposit would earn.
    Estimate(EstimateArgs),
}

/// Arguments for `open`.
#[derive(Parser, Debug)]
pub struct OpenArgs {
    /// Account identity, typically a wallet address.
    #[arg(long, short = 'o', env = "VAULT_OWNER")]
    pub owner: String,

    /// Tokens held outside the vault (display only). Decimals allowed.
    #[arg(long, default_value = "0")]
    pub wallet_balance: String,

    /// Tokens already staked. Decimals allowed.
    #[arg(long, default_value = "0")]
    pub staked: String,

    /// Credits already accrued.
    #[arg(long, default_value_t = 0)]
    pub credits: u64,

    /// Days already staked.
    #[arg(long, default_value_t = 0)]
    pub days: u32,
}

/// Arguments for commands that take an owner and an amount.
#[derive(Parser, Debug)]
pub struct AmountArgs {
    /// Account identity.
    #[arg(long, short = 'o', env = "VAULT_OWNER")]
    pub owner: String,

    /// Token amount, e.g. `1000`, `1.5` or `12e3`. Taken as text so invalid
    /// input gets a readable rejection instead of a parse error.
    #[arg(allow_hyphen_values = true)]
    pub amount: String,
}

/// Arguments for `accrue`.
#[derive(Parser, Debug)]
pub struct AccrueArgs {
    /// Account to accrue. Accrues every account when omitted.
    #[arg(long, short = 'o', env = "VAULT_OWNER")]
    pub owner: Option<String>,

    /// Number of elapsed days to accrue.
    #[arg(long, default_value_t = 1)]
    pub days: u32,
}

/// Arguments for `execute-withdrawal`.
#[derive(Parser, Debug)]
pub struct ExecuteArgs {
    /// Account whose request to execute.
    #[arg(long, short = 'o', env = "VAULT_OWNER")]
    pub owner: String,

    /// Identity of the operator executing the request.
    #[arg(long, env = "VAULT_CALLER")]
    pub caller: String,

    /// Identities holding the admin role (comma-separated).
    #[arg(long = "admin", env = "VAULT_ADMINS", value_delimiter = ',')]
    pub admins: Vec<String>,
}

/// Arguments for `status`.
#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// Account identity.
    #[arg(long, short = 'o', env = "VAULT_OWNER")]
    pub owner: String,

    /// Token price in USD, from whatever feed the operator trusts.
    #[arg(long, env = "VAULT_PRICE_USD", default_value_t = 0.0)]
    pub price: f64,

    /// 24h price change in percent.
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    pub change_24h: f64,

    /// Token symbol used in the output.
    #[arg(long, default_value = "DIGau")]
    pub symbol: String,

    /// Print the summary as JSON instead of a table.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for `estimate`.
#[derive(Parser, Debug)]
pub struct EstimateArgs {
    /// Prospective deposit amount.
    #[arg(allow_hyphen_values = true)]
    pub amount: String,
}

/// Arguments for `run`.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Accrual period in milliseconds. One period is one day of credits.
    #[arg(long, env = "VAULT_TICK_MS", default_value_t = 86_400_000)]
    pub tick_ms: u64,

    /// Stop after this many periods instead of waiting for Ctrl+C.
    #[arg(long)]
    pub max_ticks: Option<u64>,

    /// Print Prometheus metrics to stdout on shutdown.
    #[arg(long)]
    pub metrics: bool,
}
