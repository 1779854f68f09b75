//! Card and manual lookup against the fisher registry.
//!
//! The functions here are pure: the caller supplies the registry snapshot,
//! today's date and the log id, then persists the returned [`NfcLog`].

use chrono::{DateTime, Utc};

use crate::config::Language;
use crate::model::{ActivationStatus, Fisher, MatchStatus, NfcLog, ScanResult, ScanStatus};

/// Probe recorded on the placeholder of an unmatched manual search.
pub const MANUAL_PROBE: &str = "MANUAL";

/// Error code of a scan the reader could not complete.
pub const DEVICE_ERROR: &str = "device_error";

/// Error code of a manual search with nothing to search for.
pub const EMPTY_QUERY: &str = "empty_query";

const UNKNOWN_CARD_NAME: &str = "Unknown Card";
const NO_VALUE: &str = "-";

/// How the fisher was looked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Probe<'a> {
    /// A UID read from a card.
    Card(&'a str),
    /// Free text typed by the operator.
    Manual(&'a str),
}

impl Probe<'_> {
    /// First fisher matching the probe, in registry order.
    #[must_use]
    pub fn find<'f>(&self, fishers: &'f [Fisher]) -> Option<&'f Fisher> {
        match self {
            Self::Card(uid) => find_by_card(fishers, uid),
            Self::Manual(query) => find_by_query(fishers, query),
        }
    }

    fn placeholder_uid(&self) -> &str {
        match self {
            Self::Card(uid) => uid,
            Self::Manual(_) => MANUAL_PROBE,
        }
    }
}

/// Fisher holding the card with exactly this UID.
#[must_use]
pub fn find_by_card<'f>(fishers: &'f [Fisher], uid: &str) -> Option<&'f Fisher> {
    fishers.iter().find(|fisher| fisher.card_uid == uid)
}

/// First fisher whose id or name contains the query, ignoring case.
///
/// Case folding is Unicode-aware, so accented Latin and Arabic names match
/// as typed.
#[must_use]
pub fn find_by_query<'f>(fishers: &'f [Fisher], query: &str) -> Option<&'f Fisher> {
    let needle = fold_query(query)?;
    fishers.iter().find(|fisher| {
        contains_folded(&fisher.fisher_id, &needle) || contains_folded(&fisher.name, &needle)
    })
}

/// Trimmed, lowercased search text, or `None` when nothing is left.
#[must_use]
pub fn fold_query(query: &str) -> Option<String> {
    let needle = query.trim().to_lowercase();
    (!needle.is_empty()).then_some(needle)
}

/// Whether `field` contains a needle produced by [`fold_query`].
#[must_use]
pub fn contains_folded(field: &str, needle: &str) -> bool {
    field.to_lowercase().contains(needle)
}

/// Short label shown for a lookup outcome.
#[must_use]
pub fn status_label(status: ScanStatus, language: Language) -> &'static str {
    match (status, language) {
        (ScanStatus::Active, Language::Arabic) => "مفعل",
        (ScanStatus::Active, Language::French) => "Actif",
        (ScanStatus::Expired, Language::Arabic) => "غير مفعل",
        (ScanStatus::Expired, Language::French) => "Expiré",
        (ScanStatus::NotFound, Language::Arabic) => "غير موجود",
        (ScanStatus::NotFound, Language::French) => "Introuvable",
        (ScanStatus::Error, Language::Arabic) => "خطأ",
        (ScanStatus::Error, Language::French) => "Erreur",
    }
}

/// Classify a lookup against today's date.
#[must_use]
pub fn resolve(
    found: Option<&Fisher>,
    probe: Probe<'_>,
    today: &str,
    language: Language,
) -> ScanResult {
    let (status, data) = match found {
        Some(fisher) => {
            let status = match fisher.activation_on(today) {
                ActivationStatus::Active => ScanStatus::Active,
                ActivationStatus::Expired | ActivationStatus::NotFound => ScanStatus::Expired,
            };
            (status, fisher.clone())
        }
        None => (
            ScanStatus::NotFound,
            Fisher::unknown(probe.placeholder_uid()),
        ),
    };

    ScanResult {
        status,
        message: status_label(status, language).to_string(),
        data: Some(data),
    }
}

/// Audit entry for a lookup outcome.
///
/// Error outcomes are logged as unmatched.
#[must_use]
pub fn audit_entry(
    log_id: i64,
    result: &ScanResult,
    operator_email: &str,
    timestamp: DateTime<Utc>,
) -> NfcLog {
    let (fisher_id, name, boat, expiry, match_status, activation_status) =
        match result.matched_fisher() {
            Some(fisher) => (
                fisher.fisher_id.clone(),
                fisher.name.clone(),
                fisher.boat.clone(),
                fisher.insurance_expiry.clone(),
                MatchStatus::Found,
                if result.status == ScanStatus::Active {
                    ActivationStatus::Active
                } else {
                    ActivationStatus::Expired
                },
            ),
            None => (
                Fisher::UNKNOWN_ID.to_string(),
                UNKNOWN_CARD_NAME.to_string(),
                NO_VALUE.to_string(),
                NO_VALUE.to_string(),
                MatchStatus::NotFound,
                ActivationStatus::NotFound,
            ),
        };

    NfcLog {
        log_id,
        fisher_id,
        name_from_card: name,
        boat_from_card: boat,
        insurance_expiry_from_card: expiry,
        match_status,
        activation_status,
        timestamp,
        operator_email: operator_email.to_string(),
    }
}
