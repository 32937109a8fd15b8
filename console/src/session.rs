//! # Snapshot Session
//!
//! The console is the persistence collaborator the ledger expects: it loads
//! a [`RegistrySnapshot`] from disk, hands the registry to a command, and
//! writes the snapshot back only when the command changed something.
//!
//! A session holds an exclusive advisory lock on `<state>.lock` from load
//! until it is dropped, so the load-modify-save of one console invocation
//! never interleaves with another's. A second invocation waits for the lock.
//!
//! Writes go to a sibling temp file first and are renamed into place, so a
//! crash mid-write never leaves a truncated snapshot behind.

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use fs2::FileExt;
use tracing::{debug, info};

use vault_ledger::{RegistrySnapshot, VaultConfig, VaultRegistry};

/// Reads a [`VaultConfig`] from a JSON file, if a path was given.
pub fn load_config(path: Option<&Path>) -> Result<Option<VaultConfig>> {
    let Some(path) = path else {
        return Ok(None);
    };
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let config = VaultConfig::from_json(&raw)
        .with_context(|| format!("invalid config file {}", path.display()))?;
    info!(
        path = %path.display(),
        daily_rate = %config.daily_rate_display(),
        milestone_target = config.milestone_target,
        "vault config loaded"
    );
    Ok(Some(config))
}

/// `<path><suffix>`, next to `path`.
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| OsString::from("vault-state"));
    name.push(suffix);
    path.with_file_name(name)
}

/// Exclusive lock on a state file, released on drop.
#[derive(Debug)]
struct StateLock {
    file: File,
}

impl StateLock {
    fn acquire(state: &Path) -> Result<Self> {
        let path = sibling(state, ".lock");
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .with_context(|| format!("failed to open lock file {}", path.display()))?;

        if file.try_lock_exclusive().is_err() {
            debug!(path = %path.display(), "state file busy, waiting for lock");
            file.lock_exclusive()
                .with_context(|| format!("failed to lock {}", path.display()))?;
        }
        Ok(Self { file })
    }
}

impl Drop for StateLock {
    fn drop(&mut self) {
        // Closing the handle releases the lock as well.
        let _ = FileExt::unlock(&self.file);
    }
}

/// A registry bound to the snapshot file it came from.
pub struct Session {
    path: PathBuf,
    registry: Arc<VaultRegistry>,
    _lock: StateLock,
}

impl Session {
    /// Locks and loads the snapshot at `path`, or starts an empty registry if
    /// the file does not exist yet. Blocks while another session holds the
    /// same state file.
    ///
    /// `config` replaces the rates stored in the snapshot when given.
    pub fn load(path: &Path, config: Option<VaultConfig>) -> Result<Self> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .with_context(|| format!("failed to create directory {}", dir.display()))?;
        }
        let lock = StateLock::acquire(path)?;

        let snapshot = if path.exists() {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed to read snapshot {}", path.display()))?;
            let mut snapshot = RegistrySnapshot::from_json(&raw)
                .with_context(|| format!("corrupt snapshot {}", path.display()))?;
            if let Some(config) = config {
                snapshot.config = config;
            }
            snapshot
        } else {
            debug!(path = %path.display(), "no snapshot yet, starting empty");
            RegistrySnapshot::empty(config.unwrap_or_default())
        };

        let registry = VaultRegistry::restore(snapshot)
            .with_context(|| format!("failed to restore snapshot {}", path.display()))?;
        debug!(path = %path.display(), accounts = registry.len(), "snapshot loaded");

        Ok(Self {
            path: path.to_path_buf(),
            registry: Arc::new(registry),
            _lock: lock,
        })
    }

    pub fn registry(&self) -> &VaultRegistry {
        &self.registry
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes the current registry state back to the snapshot file.
    pub fn save(&self) -> Result<()> {
        let snapshot = self.registry.snapshot();
        let json = snapshot
            .to_json()
            .context("failed to serialize registry snapshot")?;

        let tmp = sibling(&self.path, ".tmp");
        fs::write(&tmp, json)
            .with_context(|| format!("failed to write snapshot {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("failed to move snapshot into {}", self.path.display()))?;

        debug!(
            path = %self.path.display(),
            accounts = snapshot.accounts.len(),
            "snapshot saved"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    use vault_ledger::quantity::tokens;

    #[test]
    fn missing_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let session = Session::load(&dir.path().join("state.json"), None).unwrap();
        assert!(session.registry().is_empty());
        assert_eq!(session.registry().ledger().config(), &VaultConfig::default());
    }

    #[test]
    fn save_then_load_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.json");

        let session = Session::load(&path, None).unwrap();
        session.registry().open_account("alice").unwrap();
        session.registry().deposit("alice", tokens(250)).unwrap();
        session.save().unwrap();
        drop(session);

        let reloaded = Session::load(&path, None).unwrap();
        let acct = reloaded.registry().account("alice").unwrap();
        assert_eq!(acct.staked_amount, tokens(250));
        assert_eq!(acct.credits, 750);
        assert!(!sibling(&path, ".tmp").exists());
    }

    #[test]
    fn second_session_waits_for_the_first_and_sees_its_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let first = Session::load(&path, None).unwrap();
        first.registry().open_account("alice").unwrap();

        let (tx, rx) = mpsc::channel();
        let waiter = {
            let path = path.clone();
            thread::spawn(move || {
                let second = Session::load(&path, None).unwrap();
                tx.send(()).unwrap();
                second.registry().deposit("alice", tokens(5)).unwrap();
                second.save().unwrap();
            })
        };

        // Still locked: the second session cannot have loaded yet.
        assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());

        first.registry().deposit("alice", tokens(100)).unwrap();
        first.save().unwrap();
        drop(first);

        rx.recv_timeout(Duration::from_secs(10)).unwrap();
        waiter.join().unwrap();

        let last = Session::load(&path, None).unwrap();
        assert_eq!(
            last.registry().account("alice").unwrap().staked_amount,
            tokens(105)
        );
    }

    #[test]
    fn config_override_replaces_snapshot_rates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        Session::load(&path, None).unwrap().save().unwrap();

        let custom = VaultConfig {
            milestone_target: 10,
            ..VaultConfig::default()
        };
        let session = Session::load(&path, Some(custom.clone())).unwrap();
        assert_eq!(session.registry().ledger().config(), &custom);
    }

    #[test]
    fn corrupt_snapshot_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(Session::load(&path, None).is_err());
    }

    #[test]
    fn config_file_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vault.json");
        fs::write(&path, r#"{ "daily_accrual_rate_bps": 1000 }"#).unwrap();

        let config = load_config(Some(&path)).unwrap().unwrap();
        assert_eq!(config.daily_accrual_rate_bps, 1_000);
        assert!(load_config(None).unwrap().is_none());
    }
}
