//! Monthly catch reports.

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::clock::is_year_month;
use crate::error::{Error, Result};
use crate::model::{CatchRecord, SummaryRow, Unit};

/// Fish types offered on the catch form before any catch is logged.
pub const DEFAULT_FISH_TYPES: [&str; 14] = [
    "Sardine",
    "Latcha",
    "Anchoïs",
    "Merlon",
    "Roggig",
    "Thon rouge",
    "Merlu",
    "Vivaneau rouge",
    "Sole",
    "Poulpe",
    "Calamar",
    "Seiche",
    "Grosses crevettes",
    "Merlan bleu",
];

/// Total quantity per fish type and unit for one month.
///
/// Rows are ordered by fish type, then unit. Quantities in different units
/// are never combined.
///
/// # Errors
///
/// Returns [`Error::Validation`] unless `month` is `YYYY-MM`.
pub fn monthly_summary(month: &str, catches: &[CatchRecord]) -> Result<Vec<SummaryRow>> {
    if !is_year_month(month) {
        return Err(Error::validation(
            "month",
            format!("expected YYYY-MM, got {month:?}"),
        ));
    }

    let prefix = format!("{month}-");
    let mut totals: BTreeMap<(&str, Unit), f64> = BTreeMap::new();
    for catch in catches.iter().filter(|c| c.date.starts_with(&prefix)) {
        *totals.entry((catch.fish_type.as_str(), catch.unit)).or_insert(0.0) += catch.quantity;
    }

    Ok(totals
        .into_iter()
        .map(|((fish_type, unit), total)| SummaryRow {
            fish_type: fish_type.to_string(),
            unit,
            total,
        })
        .collect())
}

/// Default fish types followed by any other type already logged.
#[must_use]
pub fn fish_types(catches: &[CatchRecord]) -> Vec<String> {
    let mut seen = HashSet::new();
    DEFAULT_FISH_TYPES
        .iter()
        .copied()
        .chain(catches.iter().map(|c| c.fish_type.as_str()))
        .filter(|fish_type| seen.insert(*fish_type))
        .map(str::to_string)
        .collect()
}

/// File name of an exported monthly report.
#[must_use]
pub fn report_filename(month: &str) -> String {
    format!("Report_{month}.json")
}

/// Document written when a monthly report is exported.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyReport<'a> {
    /// Reported month.
    pub month: &'a str,
    /// Export time.
    pub generated_at: DateTime<Utc>,
    /// Exporting operator.
    pub generated_by: &'a str,
    /// Summary rows.
    pub rows: &'a [SummaryRow],
}

impl MonthlyReport<'_> {
    /// Serialize the report for export.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }
}

/// Destination of exported report files.
#[async_trait]
pub trait ReportSink: Send + Sync + std::fmt::Debug {
    /// Save a file. `None` means the export was cancelled.
    async fn save(&self, filename: &str, content: &[u8]) -> Result<Option<PathBuf>>;
}

/// Writes reports into one directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    /// A sink writing into `dir`, created on first save.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

fn check_filename(filename: &str) -> Result<()> {
    if filename.trim().is_empty() {
        return Err(Error::validation("filename", "is required"));
    }
    if filename.contains(['/', '\\']) || filename == "." || filename == ".." {
        return Err(Error::validation(
            "filename",
            format!("{filename:?} must be a plain file name"),
        ));
    }
    Ok(())
}

#[async_trait]
impl ReportSink for DirectorySink {
    async fn save(&self, filename: &str, content: &[u8]) -> Result<Option<PathBuf>> {
        check_filename(filename)?;

        if !self.dir.exists() {
            debug!("Creating report directory {}", self.dir.display());
            tokio::fs::create_dir_all(&self.dir)
                .await
                .map_err(|source| Error::DirectoryCreate {
                    path: self.dir.clone(),
                    source,
                })?;
        }

        let path = self.dir.join(filename);
        tokio::fs::write(&path, content).await?;
        info!("Saved report {}", path.display());
        Ok(Some(path))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Sink whose operator always cancels the save dialog.
    #[derive(Debug, Default)]
    pub(crate) struct CancellingSink;

    #[async_trait]
    impl ReportSink for CancellingSink {
        async fn save(&self, _filename: &str, _content: &[u8]) -> Result<Option<PathBuf>> {
            Ok(None)
        }
    }

    fn catch(date: &str, fish_type: &str, unit: Unit, quantity: f64) -> CatchRecord {
        CatchRecord {
            id: 0,
            date: date.to_string(),
            fish_type: fish_type.to_string(),
            fisher_name: "ياسر".to_string(),
            boat: "الخيرات".to_string(),
            quantity,
            unit,
            created_by: "admin@port.com".to_string(),
            timestamp: Utc::now(),
        }
    }

    fn temp_dir(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("portmaster_reports_{tag}_{}", std::process::id()))
    }

    #[test]
    fn test_summary_groups_same_type_and_unit() {
        let catches = vec![
            catch("2024-06-05", "Sardine", Unit::Kg, 50.0),
            catch("2024-06-20", "Sardine", Unit::Kg, 30.0),
        ];
        let rows = monthly_summary("2024-06", &catches).unwrap();
        assert_eq!(
            rows,
            vec![SummaryRow {
                fish_type: "Sardine".to_string(),
                unit: Unit::Kg,
                total: 80.0,
            }]
        );
    }

    #[test]
    fn test_summary_keeps_units_apart_and_sorted() {
        let catches = vec![
            catch("2024-06-01", "Thon rouge", Unit::Piece, 3.0),
            catch("2024-06-02", "Merlu", Unit::Ton, 1.5),
            catch("2024-06-03", "Merlu", Unit::Kg, 200.0),
            catch("2024-06-04", "Calamar", Unit::Kg, 12.0),
        ];
        let rows = monthly_summary("2024-06", &catches).unwrap();
        let keys: Vec<_> = rows.iter().map(|r| (r.fish_type.as_str(), r.unit)).collect();
        assert_eq!(
            keys,
            vec![
                ("Calamar", Unit::Kg),
                ("Merlu", Unit::Kg),
                ("Merlu", Unit::Ton),
                ("Thon rouge", Unit::Piece),
            ]
        );
    }

    #[test]
    fn test_summary_filters_month() {
        let catches = vec![
            catch("2024-05-31", "Sardine", Unit::Kg, 10.0),
            catch("2024-06-01", "Sardine", Unit::Kg, 20.0),
            catch("2024-07-01", "Sardine", Unit::Kg, 40.0),
            catch("2023-06-15", "Sardine", Unit::Kg, 80.0),
        ];
        let rows = monthly_summary("2024-06", &catches).unwrap();
        assert_eq!(rows.len(), 1);
        assert!((rows[0].total - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_summary_is_idempotent() {
        let catches = vec![
            catch("2024-06-05", "Sole", Unit::Kg, 5.0),
            catch("2024-06-06", "Poulpe", Unit::Kg, 7.0),
        ];
        assert_eq!(
            monthly_summary("2024-06", &catches).unwrap(),
            monthly_summary("2024-06", &catches).unwrap()
        );
    }

    #[test]
    fn test_summary_empty_month() {
        assert!(monthly_summary("2024-01", &[]).unwrap().is_empty());
    }

    #[test]
    fn test_summary_rejects_bad_month() {
        for month in ["2024-6", "2024-13", "June", "2024-06-01", "٢٠٢٤-06"] {
            let err = monthly_summary(month, &[]).unwrap_err();
            assert!(err.is_validation(), "{month}");
        }
    }

    #[test]
    fn test_summary_row_serializes_camel_case() {
        let rows = monthly_summary("2024-06", &[catch("2024-06-05", "Sardine", Unit::Kg, 1.0)])
            .unwrap();
        let json = serde_json::to_value(&rows[0]).unwrap();
        assert_eq!(json["fishType"], "Sardine");
        assert_eq!(json["unit"], "kg");
    }

    #[test]
    fn test_fish_types_defaults_then_logged() {
        let catches = vec![
            catch("2024-06-05", "Sardine", Unit::Kg, 1.0),
            catch("2024-06-05", "Espadon", Unit::Kg, 1.0),
            catch("2024-06-06", "Espadon", Unit::Kg, 1.0),
        ];
        let types = fish_types(&catches);
        assert_eq!(types.len(), DEFAULT_FISH_TYPES.len() + 1);
        assert_eq!(types[0], "Sardine");
        assert_eq!(types.last().map(String::as_str), Some("Espadon"));
    }

    #[test]
    fn test_report_filename() {
        assert_eq!(report_filename("2024-06"), "Report_2024-06.json");
    }

    #[tokio::test]
    async fn test_directory_sink_writes_file() {
        let dir = temp_dir("write");
        let _ = std::fs::remove_dir_all(&dir);
        let sink = DirectorySink::new(&dir);

        let path = sink.save("Report_2024-06.json", b"{}").await.unwrap().unwrap();
        assert_eq!(path, dir.join("Report_2024-06.json"));
        assert_eq!(std::fs::read(&path).unwrap(), b"{}");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_directory_sink_rejects_paths() {
        let sink = DirectorySink::new(temp_dir("reject"));
        for name in ["", "../escape.json", "a/b.json", "..", "a\\b.json"] {
            let err = sink.save(name, b"x").await.unwrap_err();
            assert!(err.is_validation(), "{name}");
        }
    }

    #[tokio::test]
    async fn test_cancelling_sink() {
        assert!(CancellingSink.save("x.json", b"x").await.unwrap().is_none());
    }

    #[test]
    fn test_monthly_report_bytes() {
        let rows = vec![SummaryRow {
            fish_type: "Sole".to_string(),
            unit: Unit::Kg,
            total: 4.0,
        }];
        let report = MonthlyReport {
            month: "2024-06",
            generated_at: Utc::now(),
            generated_by: "admin@port.com",
            rows: &rows,
        };
        let value: serde_json::Value = serde_json::from_slice(&report.to_bytes().unwrap()).unwrap();
        assert_eq!(value["month"], "2024-06");
        assert_eq!(value["generatedBy"], "admin@port.com");
        assert_eq!(value["rows"][0]["fishType"], "Sole");
    }
}
