use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::{Record, Table};

use super::Unit;

/// Total landed quantity of one fish type in one unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRow {
    /// Species or trade name.
    pub fish_type: String,
    /// Unit of `total`.
    pub unit: Unit,
    /// Sum of quantities.
    pub total: f64,
}

/// An exported monthly report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRecord {
    /// Unique identifier.
    pub report_id: String,
    /// Reported month, `YYYY-MM`.
    pub month: String,
    /// When the report was exported.
    pub generated_at: DateTime<Utc>,
    /// Operator who exported it.
    pub generated_by: String,
    /// The summary rows as exported.
    pub data_snapshot: Vec<SummaryRow>,
    /// Where the file was saved.
    pub path: String,
}

impl Record for ReportRecord {
    const TABLE: Table = Table::Reports;

    fn key(&self) -> String {
        self.report_id.clone()
    }
}
