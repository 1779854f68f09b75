use serde::{Deserialize, Serialize};

use crate::clock::is_iso_date;
use crate::error::{Error, Result};
use crate::storage::{Record, Table};

use super::ActivationStatus;

/// A registered port worker holding an insurance card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fisher {
    /// Immutable primary key, e.g. `F1001`.
    pub fisher_id: String,
    /// UID printed on the fisher's NFC card.
    pub card_uid: String,
    /// Full name.
    pub name: String,
    /// Boat the fisher works on.
    pub boat: String,
    /// Last day of insurance coverage, `YYYY-MM-DD`.
    pub insurance_expiry: String,
}

impl Fisher {
    /// Identifier given to the placeholder record of an unmatched lookup.
    pub const UNKNOWN_ID: &'static str = "UNKNOWN";

    /// Placeholder attached to a lookup that matched nobody.
    #[must_use]
    pub fn unknown(card_uid: impl Into<String>) -> Self {
        Self {
            fisher_id: Self::UNKNOWN_ID.to_string(),
            card_uid: card_uid.into(),
            name: "غير مسجل".to_string(),
            boat: "-".to_string(),
            insurance_expiry: String::new(),
        }
    }

    /// Activation status on the given day.
    ///
    /// Both dates are ISO strings, so the lexical comparison is also the
    /// calendar comparison.
    #[must_use]
    pub fn activation_on(&self, today: &str) -> ActivationStatus {
        if self.insurance_expiry.as_str() >= today {
            ActivationStatus::Active
        } else {
            ActivationStatus::Expired
        }
    }

    /// Check the form fields of a fisher before it is stored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] naming the first bad field.
    pub fn validate(&self) -> Result<()> {
        if self.fisher_id.trim().is_empty() {
            return Err(Error::validation("fisher_id", "is required"));
        }
        if self.fisher_id == Self::UNKNOWN_ID {
            return Err(Error::validation("fisher_id", "is reserved"));
        }
        if self.name.trim().is_empty() {
            return Err(Error::validation("name", "is required"));
        }
        if self.card_uid.trim().is_empty() {
            return Err(Error::validation("card_uid", "is required"));
        }
        if !is_iso_date(&self.insurance_expiry) {
            return Err(Error::validation(
                "insurance_expiry",
                format!("expected YYYY-MM-DD, got {:?}", self.insurance_expiry),
            ));
        }
        Ok(())
    }
}

impl Record for Fisher {
    const TABLE: Table = Table::Fishers;

    fn key(&self) -> String {
        self.fisher_id.clone()
    }
}
