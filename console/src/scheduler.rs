//! # Accrual Scheduler
//!
//! The ledger has no clock. This task is the clock: every period it accrues
//! one day of credits on every account in the snapshot file.
//!
//! Each period is its own [`Session`]: lock the state file, load it, accrue,
//! save, unlock. Commands run from other console invocations between ticks
//! are therefore picked up by the next tick instead of being overwritten.
//!
//! The first accrual happens one full period after start, not immediately,
//! so restarting the console never double-counts a day.

use std::future::Future;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Result;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use vault_ledger::VaultConfig;

use crate::metrics::ConsoleMetrics;
use crate::session::Session;

/// Periodically accrues credits across a snapshot file.
pub struct AccrualScheduler {
    state: PathBuf,
    config: Option<VaultConfig>,
    period: Duration,
    metrics: ConsoleMetrics,
}

impl AccrualScheduler {
    pub fn new(
        state: PathBuf,
        config: Option<VaultConfig>,
        period: Duration,
        metrics: ConsoleMetrics,
    ) -> Self {
        Self {
            state,
            config,
            period,
            metrics,
        }
    }

    /// Runs until `shutdown` resolves or `max_ticks` periods have elapsed.
    ///
    /// Returns the number of periods accrued. A period whose snapshot could
    /// not be loaded or saved is logged and not counted.
    pub async fn run<F>(&self, max_ticks: Option<u64>, shutdown: F) -> u64
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        let mut interval = tokio::time::interval(self.period);
        // A stalled process should not fire a burst of catch-up accruals.
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval.tick().await;

        let mut ticks = 0u64;
        let mut attempts = 0u64;
        loop {
            if max_ticks.is_some_and(|max| attempts >= max) {
                break;
            }
            tokio::select! {
                _ = interval.tick() => {
                    attempts += 1;
                    match self.tick() {
                        Ok(()) => ticks += 1,
                        Err(e) => {
                            self.metrics.snapshot_errors_total.inc();
                            error!(error = %format!("{:#}", e), "accrual period skipped");
                        }
                    }
                }
                _ = &mut shutdown => {
                    info!(ticks, "accrual scheduler stopping");
                    break;
                }
            }
        }
        ticks
    }

    fn tick(&self) -> Result<()> {
        let session = Session::load(&self.state, self.config.clone())?;
        let registry = session.registry();

        let started = Instant::now();
        let batch = registry.accrue_all();
        self.metrics
            .accrual_pass_seconds
            .observe(started.elapsed().as_secs_f64());

        if !batch.receipts.is_empty() {
            session.save()?;
        }

        self.metrics.accrual_ticks_total.inc();
        self.metrics
            .accounts_accrued_total
            .inc_by(batch.receipts.len() as u64);
        self.metrics
            .credits_accrued_total
            .inc_by(batch.total_accrued());
        self.metrics
            .accrual_failures_total
            .inc_by(batch.failures.len() as u64);
        self.metrics.tracked_accounts.set(registry.len() as i64);

        if batch.failures.is_empty() {
            debug!(
                accounts = batch.receipts.len(),
                credits = batch.total_accrued(),
                "accrual pass complete"
            );
        } else {
            warn!(
                accounts = batch.receipts.len(),
                failures = batch.failures.len(),
                "accrual pass completed with failures"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use vault_ledger::quantity::tokens;
    use vault_ledger::VaultAccount;

    fn seed(path: &Path) {
        let session = Session::load(path, None).unwrap();
        let registry = session.registry();
        registry
            .open_account_with(VaultAccount::with_balances("alice", 0, tokens(12_500), 0, 0))
            .unwrap();
        registry
            .open_account_with(VaultAccount::with_balances("bob", 0, tokens(1_000), 0, 0))
            .unwrap();
        session.save().unwrap();
    }

    fn account(path: &Path, owner: &str) -> VaultAccount {
        Session::load(path, None)
            .unwrap()
            .registry()
            .account(owner)
            .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn accrues_once_per_period() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        seed(&path);

        let metrics = ConsoleMetrics::new();
        let scheduler = AccrualScheduler::new(
            path.clone(),
            None,
            Duration::from_secs(86_400),
            metrics.clone(),
        );

        let ticks = scheduler.run(Some(3), std::future::pending()).await;

        assert_eq!(ticks, 3);
        let alice = account(&path, "alice");
        assert_eq!(alice.days_staked, 3);
        assert_eq!(alice.credits, 3 * 2_750);
        assert_eq!(metrics.accrual_ticks_total.get(), 3);
        assert_eq!(metrics.accounts_accrued_total.get(), 6);
        assert_eq!(metrics.credits_accrued_total.get(), 3 * (2_750 + 220));
        assert_eq!(metrics.tracked_accounts.get(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn each_period_picks_up_changes_saved_in_between() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        seed(&path);

        let scheduler = AccrualScheduler::new(
            path.clone(),
            None,
            Duration::from_secs(60),
            ConsoleMetrics::new(),
        );
        assert_eq!(scheduler.run(Some(1), std::future::pending()).await, 1);

        // Another invocation deposits between periods.
        {
            let session = Session::load(&path, None).unwrap();
            session.registry().deposit("bob", tokens(1_000)).unwrap();
            session.save().unwrap();
        }

        assert_eq!(scheduler.run(Some(1), std::future::pending()).await, 1);

        let bob = account(&path, "bob");
        assert_eq!(bob.staked_amount, tokens(2_000));
        assert_eq!(bob.credits, 220 + 3_000 + 440);
        assert_eq!(bob.days_staked, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn unreadable_snapshot_skips_the_period() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{ not json").unwrap();

        let metrics = ConsoleMetrics::new();
        let scheduler = AccrualScheduler::new(
            path.clone(),
            None,
            Duration::from_secs(60),
            metrics.clone(),
        );

        assert_eq!(scheduler.run(Some(2), std::future::pending()).await, 0);
        assert_eq!(metrics.snapshot_errors_total.get(), 2);
        assert_eq!(metrics.accrual_ticks_total.get(), 0);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{ not json");
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_before_first_period_accrues_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        seed(&path);

        let scheduler = AccrualScheduler::new(
            path.clone(),
            None,
            Duration::from_secs(60),
            ConsoleMetrics::new(),
        );

        let ticks = scheduler.run(None, async {}).await;

        assert_eq!(ticks, 0);
        assert_eq!(account(&path, "alice").days_staked, 0);
    }
}
