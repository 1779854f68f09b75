use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::{Record, Table};

use super::Fisher;

/// Whether a lookup found a registered fisher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    /// A fisher matched.
    Found,
    /// Nobody matched.
    NotFound,
}

/// Coverage classification of a lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivationStatus {
    /// Insurance runs until today or later.
    Active,
    /// Insurance ended before today.
    Expired,
    /// No fisher to classify.
    NotFound,
}

/// One audit entry per card scan or manual search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NfcLog {
    /// Assigned by the store.
    pub log_id: i64,
    /// Matched fisher, or `UNKNOWN`.
    pub fisher_id: String,
    /// Name shown for the card at the time of the scan.
    pub name_from_card: String,
    /// Boat shown for the card at the time of the scan.
    pub boat_from_card: String,
    /// Expiry shown for the card at the time of the scan.
    pub insurance_expiry_from_card: String,
    /// Whether the lookup matched.
    pub match_status: MatchStatus,
    /// Coverage at the time of the scan.
    pub activation_status: ActivationStatus,
    /// When the lookup happened.
    pub timestamp: DateTime<Utc>,
    /// Operator who performed the lookup.
    pub operator_email: String,
}

impl Record for NfcLog {
    const TABLE: Table = Table::NfcLogs;

    fn key(&self) -> String {
        self.log_id.to_string()
    }
}

/// Outcome tag of a lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanStatus {
    /// Registered and covered.
    Active,
    /// Registered but coverage lapsed.
    Expired,
    /// Not registered.
    NotFound,
    /// The lookup could not be performed.
    Error,
}

/// What the operator sees after a scan or search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResult {
    /// Outcome tag.
    pub status: ScanStatus,
    /// Short label or error code.
    pub message: String,
    /// Matched fisher, the `UNKNOWN` placeholder, or nothing on error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Fisher>,
}

impl ScanResult {
    /// A failed lookup carrying an error code.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ScanStatus::Error,
            message: message.into(),
            data: None,
        }
    }

    /// The fisher attached to a successful match.
    #[must_use]
    pub fn matched_fisher(&self) -> Option<&Fisher> {
        match self.status {
            ScanStatus::Active | ScanStatus::Expired => self.data.as_ref(),
            ScanStatus::NotFound | ScanStatus::Error => None,
        }
    }
}
