//! # Prometheus Metrics
//!
//! Counters for the accrual scheduler. Registered in a dedicated
//! [`prometheus::Registry`] and rendered in the text exposition format when
//! the scheduler shuts down with `--metrics`.

use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, IntGauge, Registry, TextEncoder};

/// Metric handles for the console's background work.
#[derive(Clone)]
pub struct ConsoleMetrics {
    registry: Registry,
    /// Accrual periods completed.
    pub accrual_ticks_total: IntCounter,
    /// Account accruals applied, summed over all periods.
    pub accounts_accrued_total: IntCounter,
    /// Credits granted by accrual.
    pub credits_accrued_total: IntCounter,
    /// Account accruals rejected by the ledger.
    pub accrual_failures_total: IntCounter,
    /// Periods skipped because the snapshot could not be loaded or saved.
    pub snapshot_errors_total: IntCounter,
    /// Accounts in the registry at the last tick.
    pub tracked_accounts: IntGauge,
    /// Wall time of one registry-wide accrual pass.
    pub accrual_pass_seconds: Histogram,
}

impl ConsoleMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> Self {
        let registry = Registry::new_custom(Some("vault".into()), None)
            .expect("failed to create prometheus registry");

        let accrual_ticks_total =
            IntCounter::new("accrual_ticks_total", "Accrual periods completed")
                .expect("metric creation");
        registry
            .register(Box::new(accrual_ticks_total.clone()))
            .expect("metric registration");

        let accounts_accrued_total = IntCounter::new(
            "accounts_accrued_total",
            "Per-account accruals applied across all periods",
        )
        .expect("metric creation");
        registry
            .register(Box::new(accounts_accrued_total.clone()))
            .expect("metric registration");

        let credits_accrued_total =
            IntCounter::new("credits_accrued_total", "Credits granted by daily accrual")
                .expect("metric creation");
        registry
            .register(Box::new(credits_accrued_total.clone()))
            .expect("metric registration");

        let accrual_failures_total = IntCounter::new(
            "accrual_failures_total",
            "Per-account accruals rejected by the ledger",
        )
        .expect("metric creation");
        registry
            .register(Box::new(accrual_failures_total.clone()))
            .expect("metric registration");

        let snapshot_errors_total = IntCounter::new(
            "snapshot_errors_total",
            "Accrual periods skipped on snapshot load or save errors",
        )
        .expect("metric creation");
        registry
            .register(Box::new(snapshot_errors_total.clone()))
            .expect("metric registration");

        let tracked_accounts =
            IntGauge::new("tracked_accounts", "Vault accounts in the registry")
                .expect("metric creation");
        registry
            .register(Box::new(tracked_accounts.clone()))
            .expect("metric registration");

        let accrual_pass_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "accrual_pass_seconds",
                "Wall time of one registry-wide accrual pass in seconds",
            )
            .buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]),
        )
        .expect("metric creation");
        registry
            .register(Box::new(accrual_pass_seconds.clone()))
            .expect("metric registration");

        Self {
            registry,
            accrual_ticks_total,
            accounts_accrued_total,
            credits_accrued_total,
            accrual_failures_total,
            snapshot_errors_total,
            tracked_accounts,
            accrual_pass_seconds,
        }
    }

    /// Encodes all registered metrics into the Prometheus text format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
