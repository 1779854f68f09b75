use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::clock::is_iso_date;
use crate::error::{Error, Result};
use crate::storage::{Record, Table};

/// Unit a catch quantity is measured in.
///
/// Declaration order is the tie-break order used by reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    /// Kilograms.
    Kg,
    /// Metric tons.
    Ton,
    /// Individual fish.
    Piece,
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Self::Kg => "kg",
            Self::Ton => "ton",
            Self::Piece => "piece",
        })
    }
}

impl FromStr for Unit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "kg" => Ok(Self::Kg),
            "ton" => Ok(Self::Ton),
            "piece" => Ok(Self::Piece),
            other => Err(Error::validation(
                "unit",
                format!("expected kg, ton or piece, got {other:?}"),
            )),
        }
    }
}

/// One logged landing of fish.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatchRecord {
    /// Assigned by the store on creation.
    pub id: i64,
    /// Day of the landing, `YYYY-MM-DD`.
    pub date: String,
    /// Species or trade name.
    pub fish_type: String,
    /// Fisher who landed the catch.
    pub fisher_name: String,
    /// Boat the catch came from.
    pub boat: String,
    /// Amount landed, in `unit`.
    pub quantity: f64,
    /// Unit of `quantity`.
    pub unit: Unit,
    /// Email of the operator who logged it.
    pub created_by: String,
    /// When the record was created.
    pub timestamp: DateTime<Utc>,
}

impl CatchRecord {
    /// Replace every mutable field with the draft's values.
    ///
    /// `id`, `created_by` and `timestamp` are kept.
    pub fn apply(&mut self, draft: CatchDraft) {
        self.date = draft.date;
        self.fish_type = draft.fish_type;
        self.fisher_name = draft.fisher_name;
        self.boat = draft.boat;
        self.quantity = draft.quantity;
        self.unit = draft.unit;
    }
}

impl Record for CatchRecord {
    const TABLE: Table = Table::Catches;

    fn key(&self) -> String {
        self.id.to_string()
    }
}

/// The operator-editable part of a catch record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatchDraft {
    /// Day of the landing, `YYYY-MM-DD`.
    pub date: String,
    /// Species or trade name.
    pub fish_type: String,
    /// Fisher who landed the catch.
    pub fisher_name: String,
    /// Boat the catch came from.
    pub boat: String,
    /// Amount landed.
    pub quantity: f64,
    /// Unit of `quantity`.
    pub unit: Unit,
}

impl CatchDraft {
    /// Check the form before it is stored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] naming the first bad field.
    pub fn validate(&self) -> Result<()> {
        if self.fish_type.trim().is_empty() {
            return Err(Error::validation("fish_type", "is required"));
        }
        if !is_iso_date(&self.date) {
            return Err(Error::validation(
                "date",
                format!("expected YYYY-MM-DD, got {:?}", self.date),
            ));
        }
        if !self.quantity.is_finite() || self.quantity <= 0.0 {
            return Err(Error::validation("quantity", "must be a positive number"));
        }
        Ok(())
    }
}
