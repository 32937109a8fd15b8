//! End-to-end tests for the `vault-console` binary.
//!
//! Each test drives the real executable against its own temporary snapshot
//! file and checks both the printed output and what ends up on disk.

use std::path::Path;
use std::process::{Command, Output, Stdio};
use std::thread;
use std::time::Duration;

use serde_json::Value;

const OWNER: &str = "0x8B3C1a9d2F1b2aC6c9d0E3F4aB1cD2eF3a4B5c6D";

/// Base units per token in snapshots and `status --json`.
const UNIT: u64 = 1_000_000;

fn command(state: &Path, args: &[&str]) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_vault-console"));
    cmd.arg("--state")
        .arg(state)
        .args(args)
        .env_remove("VAULT_OWNER")
        .env_remove("VAULT_CONFIG")
        .env("RUST_LOG", "off");
    cmd
}

fn console(state: &Path, args: &[&str]) -> Output {
    command(state, args)
        .output()
        .expect("failed to run vault-console")
}

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).into_owned()
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}

fn open_reference(state: &Path) {
    let out = console(
        state,
        &[
            "open",
            "--owner",
            OWNER,
            "--wallet-balance",
            "18200",
            "--staked",
            "12500",
            "--credits",
            "83220",
            "--days",
            "30",
        ],
    );
    assert!(out.status.success(), "open failed: {}", stderr(&out));
}

fn status_json(state: &Path) -> Value {
    let out = console(state, &["status", "--owner", OWNER, "--price", "3.24", "--json"]);
    assert!(out.status.success(), "status failed: {}", stderr(&out));
    serde_json::from_str(&stdout(&out)).expect("status --json prints JSON")
}

#[test]
fn deposit_then_status() {
    let dir = tempfile::tempdir().unwrap();
    let state = dir.path().join("state.json");
    open_reference(&state);

    let out = console(&state, &["deposit", "--owner", OWNER, "1000"]);
    assert!(out.status.success());
    assert!(stdout(&out).contains("Staked: 13,500, credits: 86,220"));

    let summary = status_json(&state);
    assert_eq!(summary["staked_amount"], 13_500 * UNIT);
    assert_eq!(summary["token_decimals"], 6);
    assert_eq!(summary["credits"], 86_220);
    assert_eq!(summary["credits_per_day"], 2_970);
    assert_eq!(summary["withdrawal_status"], "None");
}

#[test]
fn invalid_deposit_is_rejected_and_not_saved() {
    let dir = tempfile::tempdir().unwrap();
    let state = dir.path().join("state.json");
    open_reference(&state);
    let before = std::fs::read_to_string(&state).unwrap();

    for bad in ["0", "-5", "abc"] {
        let out = console(&state, &["deposit", "--owner", OWNER, bad]);
        assert_eq!(out.status.code(), Some(2), "input {bad:?}");
        assert!(stderr(&out).contains("Amount must be a positive number of tokens."));
    }

    assert_eq!(std::fs::read_to_string(&state).unwrap(), before);
}

#[test]
fn fractional_deposit_is_accepted() {
    let dir = tempfile::tempdir().unwrap();
    let state = dir.path().join("state.json");
    open_reference(&state);

    let out = console(&state, &["deposit", "--owner", OWNER, "1.5"]);
    assert!(out.status.success(), "deposit failed: {}", stderr(&out));
    assert!(stdout(&out).contains("Deposited 1.5 (+4 credits). Staked: 12,501.5"));

    let out = console(&state, &["deposit", "--owner", OWNER, "12e3"]);
    assert!(out.status.success());

    let summary = status_json(&state);
    assert_eq!(summary["staked_amount"], 24_501 * UNIT + UNIT / 2);
    assert_eq!(summary["credits"], 83_220 + 4 + 36_000);
}

#[test]
fn zero_withdrawal_request_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let state = dir.path().join("state.json");
    open_reference(&state);

    let out = console(&state, &["request-withdrawal", "--owner", OWNER, "0"]);
    assert_eq!(out.status.code(), Some(2));
    assert_eq!(status_json(&state)["withdrawal_status"], "None");

    let out = console(&state, &["request-withdrawal", "--owner", OWNER, "100"]);
    assert!(out.status.success());
}

#[test]
fn early_withdrawal_flow() {
    let dir = tempfile::tempdir().unwrap();
    let state = dir.path().join("state.json");
    open_reference(&state);

    let out = console(&state, &["request-withdrawal", "--owner", OWNER, "2500"]);
    assert!(out.status.success());

    let again = console(&state, &["request-withdrawal", "--owner", OWNER, "100"]);
    assert_eq!(again.status.code(), Some(2));
    assert!(stderr(&again).contains("already pending"));

    let denied = console(
        &state,
        &[
            "execute-withdrawal",
            "--owner",
            OWNER,
            "--caller",
            "mallory",
            "--admin",
            "ops",
        ],
    );
    assert_eq!(denied.status.code(), Some(2));
    assert_eq!(status_json(&state)["withdrawal_status"], "Pending");

    let out = console(
        &state,
        &[
            "execute-withdrawal",
            "--owner",
            OWNER,
            "--caller",
            "ops",
            "--admin",
            "ops",
        ],
    );
    assert!(out.status.success(), "execute failed: {}", stderr(&out));
    assert!(stdout(&out).contains("Forfeited 83,220 credits"));

    let summary = status_json(&state);
    assert_eq!(summary["staked_amount"], 10_000 * UNIT);
    assert_eq!(summary["credits"], 0);
    assert_eq!(summary["days_staked"], 0);
    assert_eq!(summary["withdrawal_status"], "Executed");
}

#[test]
fn accrue_all_accounts_for_several_days() {
    let dir = tempfile::tempdir().unwrap();
    let state = dir.path().join("state.json");
    open_reference(&state);

    let out = console(&state, &["accrue", "--days", "2"]);
    assert!(out.status.success());

    let summary = status_json(&state);
    assert_eq!(summary["credits"], 83_220 + 2 * 2_750);
    assert_eq!(summary["days_staked"], 32);
}

#[test]
fn run_scheduler_with_tick_limit() {
    let dir = tempfile::tempdir().unwrap();
    let state = dir.path().join("state.json");
    open_reference(&state);

    let out = console(&state, &["run", "--tick-ms", "10", "--max-ticks", "3", "--metrics"]);
    assert!(out.status.success(), "run failed: {}", stderr(&out));
    assert!(stdout(&out).contains("vault_accrual_ticks_total 3"));

    assert_eq!(status_json(&state)["days_staked"], 33);
}

#[test]
fn deposit_while_scheduler_runs_is_kept() {
    let dir = tempfile::tempdir().unwrap();
    let state = dir.path().join("state.json");
    open_reference(&state);

    let mut scheduler = command(&state, &["run", "--tick-ms", "2000", "--max-ticks", "1"])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("failed to start scheduler");

    thread::sleep(Duration::from_millis(300));
    let out = console(&state, &["deposit", "--owner", OWNER, "1000"]);
    assert!(out.status.success(), "deposit failed: {}", stderr(&out));

    assert!(scheduler.wait().unwrap().success());

    let summary = status_json(&state);
    assert_eq!(summary["staked_amount"], 13_500 * UNIT);
    assert_eq!(summary["days_staked"], 31);
    // Bonus from the deposit plus at least one day on the old stake.
    assert!(summary["credits"].as_u64().unwrap() >= 83_220 + 3_000 + 2_750);
}

#[test]
fn unknown_owner_gets_a_hint() {
    let dir = tempfile::tempdir().unwrap();
    let state = dir.path().join("state.json");

    let out = console(&state, &["deposit", "--owner", "ghost", "10"]);
    assert_eq!(out.status.code(), Some(2));
    assert!(stderr(&out).contains("Run `open` first."));
    assert!(!state.exists());
}

#[test]
fn estimate_is_read_only() {
    let dir = tempfile::tempdir().unwrap();
    let state = dir.path().join("state.json");

    let out = console(&state, &["estimate", "1000"]);
    assert!(out.status.success());
    assert!(stdout(&out).contains("220 credits/day"));
    assert!(!state.exists());
}
