//! # Console Commands
//!
//! One function per subcommand. Each returns whether it changed registry
//! state (so `main` knows to save) or the [`LedgerError`] that rejected it.
//! Rejections are turned into operator-facing messages by [`feedback`].

use serde::Serialize;
use tracing::{info, warn};

use vault_ledger::config::UNITS_PER_TOKEN;
use vault_ledger::quantity::{format_amount, parse_amount, parse_quantity};
use vault_ledger::{
    LedgerError, StaticAdminGate, StaticPriceFeed, VaultAccount, VaultSummary, WithdrawalStatus,
};

use crate::cli::{AccrueArgs, AmountArgs, EstimateArgs, ExecuteArgs, OpenArgs, StatusArgs};
use crate::session::Session;

/// Whether a command changed registry state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Changed,
    Unchanged,
}

pub fn open(session: &Session, args: OpenArgs) -> Result<Outcome, LedgerError> {
    let account = VaultAccount::with_balances(
        &args.owner,
        parse_quantity(&args.wallet_balance)?,
        parse_quantity(&args.staked)?,
        args.credits,
        args.days,
    );
    session.registry().open_account_with(account)?;
    println!("Opened vault account {}", short_address(&args.owner));
    Ok(Outcome::Changed)
}

pub fn deposit(session: &Session, args: AmountArgs) -> Result<Outcome, LedgerError> {
    let amount = parse_amount(&args.amount)?;
    let receipt = session.registry().deposit(&args.owner, amount)?;
    println!(
        "Deposited {} (+{} credits). Staked: {}, credits: {}",
        tokens_text(receipt.amount),
        thousands(receipt.bonus_credits),
        tokens_text(receipt.staked_amount),
        thousands(receipt.credits),
    );
    Ok(Outcome::Changed)
}

pub fn accrue(session: &Session, args: AccrueArgs) -> Result<Outcome, LedgerError> {
    let registry = session.registry();
    let mut outcome = Outcome::Unchanged;

    match args.owner {
        Some(owner) => {
            for day in 0..args.days {
                match registry.accrue(&owner) {
                    Ok(receipt) => {
                        outcome = Outcome::Changed;
                        println!(
                            "Day {}: +{} credits ({} total)",
                            receipt.days_staked,
                            thousands(receipt.accrued_credits),
                            thousands(receipt.credits),
                        );
                    }
                    // Days already applied stay applied; report and stop.
                    Err(e) if day > 0 => {
                        eprintln!("{}", feedback(&e));
                        break;
                    }
                    Err(e) => return Err(e),
                }
            }
        }
        None => {
            for _ in 0..args.days {
                let batch = registry.accrue_all();
                if !batch.receipts.is_empty() {
                    outcome = Outcome::Changed;
                }
                for (owner, e) in &batch.failures {
                    eprintln!("{}: {}", short_address(owner), feedback(e));
                }
                println!(
                    "Accrued {} credits across {} accounts",
                    thousands(batch.total_accrued()),
                    batch.receipts.len(),
                );
            }
        }
    }

    Ok(outcome)
}

pub fn request_withdrawal(session: &Session, args: AmountArgs) -> Result<Outcome, LedgerError> {
    let amount = parse_amount(&args.amount)?;
    let ticket = session.registry().request_withdrawal(&args.owner, amount)?;
    println!(
        "Withdrawal of {} requested (id {}). Awaiting admin approval; \
         executing it forfeits all vault credits.",
        tokens_text(ticket.requested_amount),
        ticket.request_id,
    );
    Ok(Outcome::Changed)
}

pub fn execute_withdrawal(session: &Session, args: ExecuteArgs) -> Result<Outcome, LedgerError> {
    let gate = StaticAdminGate::new(args.admins);
    if gate.admin_count() == 0 {
        warn!("no admins configured (--admin / VAULT_ADMINS); every caller will be denied");
    }
    let receipt = session
        .registry()
        .execute_withdrawal(&gate, &args.caller, &args.owner)?;
    println!(
        "Released {} to {}. Forfeited {} credits. Remaining staked: {}",
        tokens_text(receipt.transferred_amount),
        short_address(&receipt.owner),
        thousands(receipt.forfeited_credits),
        tokens_text(receipt.staked_amount),
    );
    Ok(Outcome::Changed)
}

pub fn status(session: &Session, args: StatusArgs) -> Result<Outcome, LedgerError> {
    let feed = StaticPriceFeed::new(args.price, args.change_24h);
    let summary = session.registry().summary(&args.owner, &feed)?;

    if args.json {
        print_json(&summary);
    } else {
        print!("{}", render_summary(&summary, &args.symbol));
    }
    Ok(Outcome::Unchanged)
}

pub fn estimate(session: &Session, args: EstimateArgs) -> Result<Outcome, LedgerError> {
    let deposit = parse_amount(&args.amount)?;
    let ledger = session.registry().ledger();
    println!(
        "Estimated: {} credits/day for a deposit of {} (plus {} up front)",
        thousands(ledger.estimated_credits_per_day(deposit)),
        tokens_text(deposit),
        thousands(ledger.estimated_bonus_credits(deposit)),
    );
    Ok(Outcome::Unchanged)
}

/// Operator-facing wording for a ledger rejection.
pub fn feedback(err: &LedgerError) -> String {
    use WithdrawalStatus as S;
    match err {
        LedgerError::InvalidAmount { .. } => "Amount must be a positive number of tokens.".into(),
        LedgerError::InvalidWithdrawalState { current, expected } => match (current, expected) {
            (c, S::None) if c.is_terminal() => {
                "This vault has already completed its early withdrawal.".into()
            }
            (c, S::Pending) if c.is_terminal() => {
                "The withdrawal request was already executed.".into()
            }
            (S::Pending, S::None) => "A withdrawal request is already pending.".into(),
            (S::None, S::Pending) => "No active withdrawal request.".into(),
            _ => err.to_string(),
        },
        LedgerError::NothingToWithdraw { staked, .. } => format!(
            "Nothing to withdraw: the vault holds {}.",
            tokens_text(*staked)
        ),
        LedgerError::Unauthorized { .. } => "Only an administrator can execute withdrawals.".into(),
        LedgerError::AccountNotFound(owner) => {
            format!("No vault account for {}. Run `open` first.", owner)
        }
        LedgerError::AccountExists(owner) => {
            format!("A vault account for {} already exists.", owner)
        }
        other => other.to_string(),
    }
}

/// `0x8B3C1a9d...5c6D` -> `0x8B3C…5c6D`. Short identities pass through.
pub fn short_address(addr: &str) -> String {
    let chars: Vec<char> = addr.chars().collect();
    if chars.len() <= 10 {
        return addr.to_string();
    }
    let head: String = chars[..6].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}…{}", head, tail)
}

/// Formats an integer with comma thousands separators.
pub fn thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Formats base units as a token amount with thousands separators,
/// e.g. `12_500_000_000` -> `12,500`, `1_500_000` -> `1.5`.
pub fn tokens_text(units: u64) -> String {
    let text = format_amount(units);
    match text.split_once('.') {
        Some((_, frac)) => format!("{}.{}", thousands(units / UNITS_PER_TOKEN), frac),
        None => thousands(units / UNITS_PER_TOKEN),
    }
}

/// Formats a USD amount with two decimals and thousands separators.
pub fn usd(value: f64) -> String {
    let cents = (value.abs() * 100.0).round() as u64;
    let sign = if value < 0.0 && cents > 0 { "-" } else { "" };
    format!("{}${}.{:02}", sign, thousands(cents / 100), cents % 100)
}

fn render_summary(s: &VaultSummary, symbol: &str) -> String {
    let withdrawal = match s.withdrawal_status {
        WithdrawalStatus::None => "Ready".to_string(),
        WithdrawalStatus::Pending => {
            format!("Pending ({} {})", tokens_text(s.requested_amount), symbol)
        }
        WithdrawalStatus::Executed => "Executed".to_string(),
    };

    let mut out = String::new();
    out.push_str(&format!("Vault {}\n", short_address(&s.owner)));
    out.push_str(&format!(
        "  Price             {} ({})\n",
        usd(s.price.price_usd),
        s.price.change_display()
    ));
    out.push_str(&format!(
        "  Wallet balance    {} {} ({})\n",
        tokens_text(s.wallet_balance),
        symbol,
        usd(s.wallet_value_usd)
    ));
    out.push_str(&format!(
        "  Vault balance     {} {} ({})\n",
        tokens_text(s.staked_amount),
        symbol,
        usd(s.vault_value_usd)
    ));
    out.push_str(&format!(
        "  Credits           {} (+{}/day, {} days staked)\n",
        thousands(s.credits),
        thousands(s.credits_per_day),
        s.days_staked
    ));
    out.push_str(&format!(
        "  Milestone         {}% of {} credits\n",
        s.milestone_progress_pct,
        thousands(s.milestone_target)
    ));
    out.push_str(&format!("  Withdrawal        {}\n", withdrawal));
    out
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => tracing::error!("failed to encode output: {}", e),
    }
}

/// Logs a one-line audit record for a state-changing command.
pub fn audit(command: &str, session: &Session) {
    info!(command, state = %session.path().display(), "state updated");
}
