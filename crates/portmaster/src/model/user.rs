use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::storage::{Record, Table};

/// What an authenticated user is allowed to be.
///
/// Stored roles outside this set never authenticate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Office administrator: catches and reports.
    Admin,
    /// Security desk: card scans and the scan log.
    NfcOperator,
    /// Insurance desk: scans, fisher registry and renewals.
    CsnsOperator,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Self::Admin => "ADMIN",
            Self::NfcOperator => "NFC_OPERATOR",
            Self::CsnsOperator => "CSNS_OPERATOR",
        })
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ADMIN" => Ok(Self::Admin),
            "NFC_OPERATOR" => Ok(Self::NfcOperator),
            "CSNS_OPERATOR" => Ok(Self::CsnsOperator),
            other => Err(Error::validation("role", format!("unknown role {other:?}"))),
        }
    }
}

/// An authenticated operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Login email.
    pub email: String,
    /// Display name.
    pub name: String,
    /// Role that gates every action.
    pub role: Role,
}

/// A stored account. The role stays a raw string until login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    /// Login email, stored lowercase.
    pub email: String,
    /// Display name.
    pub name: String,
    /// Role tag as stored.
    pub role: String,
    /// Salted BLAKE3 digest of the password.
    pub password_hash: String,
}

impl Record for UserAccount {
    const TABLE: Table = Table::Users;

    fn key(&self) -> String {
        self.email.to_lowercase()
    }
}
