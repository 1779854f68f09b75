//! Role permissions and password hashing.
//!
//! Every guarded operation names an [`Action`]. A role either explicitly
//! permits the action or the call is refused with [`Error::Forbidden`].

use std::fmt;

use crate::error::{Error, Result};
use crate::model::{Role, User};

/// Key-derivation context for stored password digests.
const PASSWORD_CONTEXT: &str = "portmaster 2024-06-01 operator password v1";

/// Something an operator can ask the office to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Scan a card or search the registry by hand.
    LookupCards,
    /// Read the scan audit trail.
    ViewNfcLogs,
    /// Add, edit or remove fishers.
    ManageFishers,
    /// Run the insurance renewal wizard.
    RenewInsurance,
    /// Read past renewals.
    ViewRenewals,
    /// Log and edit catches.
    ManageCatches,
    /// Build and export monthly reports.
    ViewReports,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::LookupCards => "look up cards",
            Self::ViewNfcLogs => "view NFC logs",
            Self::ManageFishers => "manage fishers",
            Self::RenewInsurance => "renew insurance",
            Self::ViewRenewals => "view renewals",
            Self::ManageCatches => "manage catches",
            Self::ViewReports => "view reports",
        };
        f.write_str(label)
    }
}

impl Role {
    /// Whether this role may perform the action.
    #[must_use]
    pub fn permits(self, action: Action) -> bool {
        match self {
            Self::Admin => match action {
                Action::ManageCatches | Action::ViewReports => true,
                Action::LookupCards
                | Action::ViewNfcLogs
                | Action::ManageFishers
                | Action::RenewInsurance
                | Action::ViewRenewals => false,
            },
            Self::NfcOperator => match action {
                Action::LookupCards | Action::ViewNfcLogs => true,
                Action::ManageFishers
                | Action::RenewInsurance
                | Action::ViewRenewals
                | Action::ManageCatches
                | Action::ViewReports => false,
            },
            Self::CsnsOperator => match action {
                Action::LookupCards
                | Action::ManageFishers
                | Action::RenewInsurance
                | Action::ViewRenewals => true,
                Action::ViewNfcLogs | Action::ManageCatches | Action::ViewReports => false,
            },
        }
    }
}

/// Refuse the call unless the user's role permits the action.
///
/// # Errors
///
/// Returns [`Error::Forbidden`] when the role does not permit it.
pub fn ensure(user: &User, action: Action) -> Result<()> {
    if user.role.permits(action) {
        Ok(())
    } else {
        tracing::warn!(email = %user.email, role = %user.role, %action, "Action denied");
        Err(Error::Forbidden {
            role: user.role.to_string(),
            action: action.to_string(),
        })
    }
}

fn password_digest(email: &str, password: &str) -> blake3::Hash {
    let mut hasher = blake3::Hasher::new_derive_key(PASSWORD_CONTEXT);
    hasher.update(email.trim().to_lowercase().as_bytes());
    hasher.update(&[0]);
    hasher.update(password.as_bytes());
    hasher.finalize()
}

/// Digest of a password, salted with the account email.
#[must_use]
pub fn hash_password(email: &str, password: &str) -> String {
    password_digest(email, password).to_hex().to_string()
}

/// Check a password against a stored digest.
///
/// A malformed digest never verifies.
#[must_use]
pub fn verify_password(email: &str, password: &str, stored: &str) -> bool {
    blake3::Hash::from_hex(stored).is_ok_and(|expected| password_digest(email, password) == expected)
}
