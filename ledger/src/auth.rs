//! # Authorization Gate
//!
//! Executing a withdrawal is the one privileged operation in the vault. The
//! ledger does not authenticate anyone; it just refuses to run
//! [`execute_withdrawal`](crate::ledger::Ledger::execute_withdrawal) without
//! an [`AdminToken`], and the only way to get one is through an
//! [`AuthorizationGate`].
//!
//! How a gate decides who is an admin (signed session, role claim, a hard-
//! coded list for a local console) is up to the embedding service.

use std::collections::HashSet;

use tracing::warn;

use crate::ledger::LedgerError;

/// Proof that an [`AuthorizationGate`] approved the caller as an admin.
///
/// Cannot be constructed outside this crate.
#[derive(Debug)]
pub struct AdminToken {
    caller: String,
}

impl AdminToken {
    fn issue(caller: &str) -> Self {
        Self {
            caller: caller.to_string(),
        }
    }

    /// The identity the token was issued to.
    pub fn caller(&self) -> &str {
        &self.caller
    }
}

/// Decides whether a caller holds the privileged role.
pub trait AuthorizationGate {
    /// Returns `true` if `caller` may execute withdrawals.
    fn is_admin(&self, caller: &str) -> bool;

    /// Mints an [`AdminToken`] for `caller`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Unauthorized`] if `caller` is not an admin.
    fn authorize(&self, caller: &str) -> Result<AdminToken, LedgerError> {
        if !self.is_admin(caller) {
            warn!(caller, "admin authorization denied");
            return Err(LedgerError::Unauthorized {
                caller: caller.to_string(),
            });
        }
        Ok(AdminToken::issue(caller))
    }
}

/// A gate backed by a fixed set of admin identities.
#[derive(Clone, Debug, Default)]
pub struct StaticAdminGate {
    admins: HashSet<String>,
}

impl StaticAdminGate {
    /// Creates a gate that recognises exactly `admins`.
    pub fn new<I, S>(admins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            admins: admins.into_iter().map(Into::into).collect(),
        }
    }

    /// Number of recognised admins.
    pub fn admin_count(&self) -> usize {
        self.admins.len()
    }
}

impl AuthorizationGate for StaticAdminGate {
    fn is_admin(&self, caller: &str) -> bool {
        self.admins.contains(caller)
    }
}
