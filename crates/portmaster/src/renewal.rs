//! Insurance renewal.
//!
//! A renewal runs as a three-step wizard: authorization, payment, receipt.
//! Only the payment confirmation writes anything; the new
//! [`RenewalRecord`] and the fisher's extended expiry are committed
//! together by the [`RenewalDesk`].

use async_trait::async_trait;
use chrono::{DateTime, Months, NaiveDate, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use crate::auth::{self, Action};
use crate::clock::DATE_FORMAT;
use crate::error::{Error, Result};
use crate::lookup::{contains_folded, fold_query};
use crate::model::{Fisher, RenewalRecord, ScanResult, ScanStatus, User};

/// Length of one coverage period.
const COVERAGE_MONTHS: u32 = 12;

/// Last day of coverage for a renewal paid on `renewal_date`.
///
/// A renewal on 29 February ends on 28 February of the next year.
///
/// # Errors
///
/// Returns [`Error::Validation`] if the date cannot be extended.
pub fn next_expiry(renewal_date: NaiveDate) -> Result<NaiveDate> {
    renewal_date
        .checked_add_months(Months::new(COVERAGE_MONTHS))
        .ok_or_else(|| Error::validation("renewal_date", "out of calendar range"))
}

/// A fresh `TRX-` transaction id.
#[must_use]
pub fn new_transaction_id() -> String {
    format!("TRX-{}", Uuid::new_v4())
}

/// A fresh authorization code.
#[must_use]
pub fn new_authorization_code() -> String {
    let raw = Uuid::new_v4().simple().to_string().to_uppercase();
    format!("AUTH-{}", &raw[..8])
}

/// Check the operator's renewal input.
///
/// # Errors
///
/// Returns [`Error::Validation`] for a blank social security number or a
/// non-positive amount.
pub fn validate_payment(social_security_number: &str, amount: f64) -> Result<()> {
    if social_security_number.trim().is_empty() {
        return Err(Error::validation("social_security_number", "is required"));
    }
    if !amount.is_finite() || amount <= 0.0 {
        return Err(Error::validation("amount", "must be a positive number"));
    }
    Ok(())
}

/// Inputs of one completed renewal.
#[derive(Debug, Clone, Copy)]
pub struct Payment<'a> {
    /// Social security number given at authorization.
    pub social_security_number: &'a str,
    /// Amount paid.
    pub amount: f64,
    /// Operator taking the payment.
    pub operator_email: &'a str,
    /// Day of payment.
    pub renewal_date: NaiveDate,
    /// Commit time.
    pub timestamp: DateTime<Utc>,
}

/// Build the record of a renewal and the fisher as it will be stored.
///
/// # Errors
///
/// Returns [`Error::Validation`] if the payment is invalid.
pub fn build_renewal(
    fisher: &Fisher,
    transaction_id: String,
    payment: Payment<'_>,
) -> Result<(RenewalRecord, Fisher)> {
    validate_payment(payment.social_security_number, payment.amount)?;
    let new_expiry = next_expiry(payment.renewal_date)?
        .format(DATE_FORMAT)
        .to_string();

    let record = RenewalRecord {
        authorization_pdf_path: format!("auth_{transaction_id}.pdf"),
        receipt_pdf_path: format!("rec_{transaction_id}.pdf"),
        transaction_id,
        fisher_id: fisher.fisher_id.clone(),
        fisher_name: fisher.name.clone(),
        boat: fisher.boat.clone(),
        social_security_number: payment.social_security_number.trim().to_string(),
        amount: payment.amount,
        renewal_date: payment.renewal_date.format(DATE_FORMAT).to_string(),
        new_expiry_date: new_expiry.clone(),
        operator_name: payment.operator_email.to_string(),
        timestamp: payment.timestamp,
    };

    let renewed = Fisher {
        insurance_expiry: new_expiry,
        ..fisher.clone()
    };

    Ok((record, renewed))
}

/// Whether a renewal's transaction id or fisher name contains the query,
/// ignoring case. A blank query matches every renewal.
#[must_use]
pub fn matches_query(record: &RenewalRecord, query: &str) -> bool {
    let Some(needle) = fold_query(query) else {
        return true;
    };
    contains_folded(&record.transaction_id, &needle)
        || contains_folded(&record.fisher_name, &needle)
}

/// The server side of the wizard.
#[async_trait]
pub trait RenewalDesk: Send + Sync {
    /// Issue an authorization code for renewing the fisher. Writes nothing.
    async fn begin_authorization(&self, fisher_id: &str, operator: &User) -> Result<String>;

    /// Record the payment and extend the fisher's coverage in one commit.
    async fn complete_renewal(
        &self,
        fisher_id: &str,
        amount: f64,
        operator: &User,
        social_security_number: &str,
    ) -> Result<RenewalRecord>;
}

/// Where a wizard currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenewalStep {
    /// Waiting for the social security number.
    Authorization,
    /// Waiting for the payment amount.
    Payment,
    /// Finished; the receipt is available.
    Receipt,
}

#[derive(Debug, Clone)]
enum State {
    Authorization,
    Payment {
        authorization_code: String,
        social_security_number: String,
    },
    Receipt(Box<RenewalRecord>),
}

/// One renewal in progress.
#[derive(Debug, Clone)]
pub struct RenewalWizard {
    fisher: Fisher,
    operator: User,
    state: State,
}

impl RenewalWizard {
    /// Start a renewal from the result of a scan or search.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Forbidden`] unless the operator may renew insurance,
    /// and [`Error::InvalidState`] unless the lookup found an expired fisher.
    pub fn begin(scan: &ScanResult, operator: &User) -> Result<Self> {
        auth::ensure(operator, Action::RenewInsurance)?;
        if scan.status != ScanStatus::Expired {
            return Err(Error::invalid_state(
                "only a fisher with expired insurance can be renewed",
            ));
        }
        let fisher = scan
            .matched_fisher()
            .ok_or_else(|| Error::invalid_state("scan result carries no fisher"))?;

        debug!(fisher_id = %fisher.fisher_id, "Renewal started");
        Ok(Self {
            fisher: fisher.clone(),
            operator: operator.clone(),
            state: State::Authorization,
        })
    }

    /// Current step.
    #[must_use]
    pub fn step(&self) -> RenewalStep {
        match self.state {
            State::Authorization => RenewalStep::Authorization,
            State::Payment { .. } => RenewalStep::Payment,
            State::Receipt(_) => RenewalStep::Receipt,
        }
    }

    /// Fisher being renewed.
    #[must_use]
    pub fn fisher(&self) -> &Fisher {
        &self.fisher
    }

    /// Authorization code, once issued.
    #[must_use]
    pub fn authorization_code(&self) -> Option<&str> {
        match &self.state {
            State::Payment {
                authorization_code, ..
            } => Some(authorization_code),
            State::Authorization | State::Receipt(_) => None,
        }
    }

    /// Completed renewal, once paid.
    #[must_use]
    pub fn receipt(&self) -> Option<&RenewalRecord> {
        match &self.state {
            State::Receipt(record) => Some(record),
            State::Authorization | State::Payment { .. } => None,
        }
    }

    /// Authorization step: record the social security number.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] outside the authorization step,
    /// [`Error::Validation`] for a blank number, or whatever the desk
    /// reports.
    pub async fn authorize(
        &mut self,
        desk: &dyn RenewalDesk,
        social_security_number: &str,
    ) -> Result<&str> {
        if !matches!(self.state, State::Authorization) {
            return Err(Error::invalid_state("authorization already issued"));
        }
        let social_security_number = social_security_number.trim();
        if social_security_number.is_empty() {
            return Err(Error::validation("social_security_number", "is required"));
        }

        let code = desk
            .begin_authorization(&self.fisher.fisher_id, &self.operator)
            .await?;
        self.state = State::Payment {
            authorization_code: code,
            social_security_number: social_security_number.to_string(),
        };
        Ok(self.authorization_code().unwrap_or_default())
    }

    /// Payment step: commit the renewal and move to the receipt.
    ///
    /// On failure the wizard stays at the payment step.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] outside the payment step,
    /// [`Error::Validation`] for a bad amount, or whatever the desk reports.
    pub async fn confirm_payment(
        &mut self,
        desk: &dyn RenewalDesk,
        amount: f64,
    ) -> Result<&RenewalRecord> {
        let State::Payment {
            social_security_number,
            ..
        } = &self.state
        else {
            return Err(Error::invalid_state("payment is not expected now"));
        };
        validate_payment(social_security_number, amount)?;

        let record = desk
            .complete_renewal(
                &self.fisher.fisher_id,
                amount,
                &self.operator,
                social_security_number,
            )
            .await?;
        info!(
            transaction_id = %record.transaction_id,
            fisher_id = %record.fisher_id,
            "Renewal paid"
        );
        self.fisher.insurance_expiry.clone_from(&record.new_expiry_date);
        self.state = State::Receipt(Box::new(record));

        self.receipt()
            .ok_or_else(|| Error::internal("renewal receipt missing after payment"))
    }

    /// Abandon the renewal.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] once the payment has been committed.
    pub fn cancel(self) -> Result<()> {
        match self.state {
            State::Receipt(_) => Err(Error::invalid_state(
                "renewal is already paid and cannot be cancelled",
            )),
            State::Authorization | State::Payment { .. } => {
                debug!(fisher_id = %self.fisher.fisher_id, "Renewal cancelled");
                Ok(())
            }
        }
    }
}
