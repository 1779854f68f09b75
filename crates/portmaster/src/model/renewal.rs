use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::{Record, Table};

/// A completed insurance renewal. Written once, never changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenewalRecord {
    /// Unique `TRX-...` identifier.
    pub transaction_id: String,
    /// Renewed fisher.
    pub fisher_id: String,
    /// Fisher name at renewal time.
    pub fisher_name: String,
    /// Boat at renewal time.
    pub boat: String,
    /// Social security number given at authorization.
    pub social_security_number: String,
    /// Amount paid, in dinars.
    pub amount: f64,
    /// Day of payment, `YYYY-MM-DD`.
    pub renewal_date: String,
    /// New last day of coverage, `YYYY-MM-DD`.
    pub new_expiry_date: String,
    /// Operator who took the payment.
    pub operator_name: String,
    /// File name of the printed authorization.
    pub authorization_pdf_path: String,
    /// File name of the printed receipt.
    pub receipt_pdf_path: String,
    /// When the renewal was committed.
    pub timestamp: DateTime<Utc>,
}

impl Record for RenewalRecord {
    const TABLE: Table = Table::Renewals;

    fn key(&self) -> String {
        self.transaction_id.clone()
    }
}
