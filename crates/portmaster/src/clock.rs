//! Time source.
//!
//! Activation status and renewal dates depend on "today", so the clock is
//! injected rather than read from the system inside the domain code.

use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;

/// Format used for every calendar date stored by portmaster.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Something that knows the current time.
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// The current instant.
    fn now(&self) -> DateTime<Utc>;

    /// Today's date in UTC.
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }

    /// Today's date as an ISO `YYYY-MM-DD` string.
    fn today_iso(&self) -> String {
        self.today().format(DATE_FORMAT).to_string()
    }
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at a given instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    /// Freeze the clock at midday UTC on the given date.
    #[must_use]
    pub fn on(date: NaiveDate) -> Self {
        Self(date.and_hms_opt(12, 0, 0).unwrap_or_default().and_utc())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

fn iso_date_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}$").expect("valid date regex")
    })
}

fn year_month_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[0-9]{4}-(0[1-9]|1[0-2])$").expect("valid month regex"))
}

/// Parse a zero-padded ISO `YYYY-MM-DD` date.
#[must_use]
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    if !iso_date_pattern().is_match(value) {
        return None;
    }
    NaiveDate::parse_from_str(value, DATE_FORMAT).ok()
}

/// Whether `value` is a real calendar date written as `YYYY-MM-DD`.
///
/// Only this form keeps lexical order equal to calendar order.
#[must_use]
pub fn is_iso_date(value: &str) -> bool {
    parse_date(value).is_some()
}

/// Whether `value` is a month written as `YYYY-MM`.
#[must_use]
pub fn is_year_month(value: &str) -> bool {
    year_month_pattern().is_match(value)
}
