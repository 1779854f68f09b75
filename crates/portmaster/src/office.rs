//! The port office.
//!
//! [`PortOffice`] is the single entry point the user interface talks to. It
//! owns the configured store, clock, card reader and report sink, enforces
//! role permissions, and keeps the scan audit trail complete.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::auth::{self, verify_password, Action};
use crate::clock::{is_iso_date, Clock, SystemClock};
use crate::config::{Config, Language};
use crate::error::{Error, Result};
use crate::lookup::{self, Probe, DEVICE_ERROR, EMPTY_QUERY};
use crate::model::{
    ActivationStatus, CatchDraft, CatchRecord, Fisher, NfcLog, RenewalRecord, ReportRecord, Role,
    ScanResult, SummaryRow, User, UserAccount,
};
use crate::reader::{CardReader, SimulatedReader};
use crate::renewal::{self, Payment, RenewalDesk};
use crate::report::{self, DirectorySink, MonthlyReport, ReportSink};
use crate::storage::{self, open_store, Batch, Store, Table};

/// Default cap on listed NFC log entries.
const DEFAULT_NFC_LOG_LIMIT: usize = 100;

/// Port office services over one backing store.
#[derive(Debug, Clone)]
pub struct PortOffice {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    reader: Arc<dyn CardReader>,
    sink: Arc<dyn ReportSink>,
    language: Language,
    nfc_log_limit: usize,
}

impl PortOffice {
    /// Compose an office from its collaborators.
    #[must_use]
    pub fn new(
        store: Arc<dyn Store>,
        clock: Arc<dyn Clock>,
        reader: Arc<dyn CardReader>,
        sink: Arc<dyn ReportSink>,
    ) -> Self {
        Self {
            store,
            clock,
            reader,
            sink,
            language: Language::default(),
            nfc_log_limit: DEFAULT_NFC_LOG_LIMIT,
        }
    }

    /// Build the office described by the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured store cannot be opened.
    pub fn from_config(config: &Config) -> Result<Self> {
        let store = open_store(config)?;
        debug!(backend = store.backend(), "Store opened");
        Ok(Self::new(
            store,
            Arc::new(SystemClock),
            Arc::new(SimulatedReader::from_config(&config.reader)),
            Arc::new(DirectorySink::new(config.reports_dir())),
        )
        .with_language(config.ui.language)
        .with_nfc_log_limit(config.history.nfc_log_limit))
    }

    /// Set the language of status labels.
    #[must_use]
    pub fn with_language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    /// Set how many NFC log entries a listing returns.
    #[must_use]
    pub fn with_nfc_log_limit(mut self, limit: usize) -> Self {
        self.nfc_log_limit = limit;
        self
    }

    /// The backing store.
    #[must_use]
    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    /// The time source.
    #[must_use]
    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    // === Accounts ===

    /// Log in. Email is matched case-insensitively; both inputs are trimmed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Auth`] for unknown emails, wrong passwords and
    /// accounts whose stored role is not recognised.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<User> {
        let email = email.trim().to_lowercase();
        let account: Option<UserAccount> = storage::load(self.store(), &email).await?;
        let Some(account) = account else {
            warn!(%email, "Login rejected: unknown account");
            return Err(Error::Auth);
        };

        if !verify_password(&account.email, password.trim(), &account.password_hash) {
            warn!(%email, "Login rejected: wrong password");
            return Err(Error::Auth);
        }

        let role: Role = account.role.parse().map_err(|_| {
            warn!(%email, role = %account.role, "Login rejected: unknown role");
            Error::Auth
        })?;

        info!(%email, %role, "Logged in");
        Ok(User {
            email: account.email,
            name: account.name,
            role,
        })
    }

    // === Fishers ===

    /// Every registered fisher, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Forbidden`] or a store error.
    pub async fn list_fishers(&self, actor: &User) -> Result<Vec<Fisher>> {
        auth::ensure(actor, Action::ManageFishers)?;
        self.fishers().await
    }

    async fn fishers(&self) -> Result<Vec<Fisher>> {
        let mut fishers: Vec<Fisher> = storage::load_all(self.store()).await?;
        fishers.sort_by(|a, b| a.fisher_id.cmp(&b.fisher_id));
        Ok(fishers)
    }

    /// Register a new fisher.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Forbidden`], [`Error::Validation`], or
    /// [`Error::Duplicate`] when the id is taken.
    pub async fn add_fisher(&self, actor: &User, fisher: Fisher) -> Result<Fisher> {
        auth::ensure(actor, Action::ManageFishers)?;
        let fisher = normalize_fisher(fisher);
        fisher.validate()?;

        if self
            .store
            .get(Table::Fishers, &fisher.fisher_id)
            .await?
            .is_some()
        {
            return Err(Error::Duplicate {
                entity: "fisher",
                key: fisher.fisher_id,
            });
        }

        storage::save(self.store(), &fisher).await?;
        info!(fisher_id = %fisher.fisher_id, by = %actor.email, "Fisher added");
        Ok(fisher)
    }

    /// Replace every field of an existing fisher except its id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Forbidden`], [`Error::Validation`], or
    /// [`Error::NotFound`] when no fisher has that id.
    pub async fn update_fisher(&self, actor: &User, fisher: Fisher) -> Result<Fisher> {
        auth::ensure(actor, Action::ManageFishers)?;
        let fisher = normalize_fisher(fisher);
        fisher.validate()?;

        if self
            .store
            .get(Table::Fishers, &fisher.fisher_id)
            .await?
            .is_none()
        {
            return Err(Error::not_found("fisher", fisher.fisher_id));
        }

        storage::save(self.store(), &fisher).await?;
        info!(fisher_id = %fisher.fisher_id, by = %actor.email, "Fisher updated");
        Ok(fisher)
    }

    /// Remove a fisher. Past scans and renewals keep their copies.
    ///
    /// Returns whether the fisher existed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Forbidden`] or a store error.
    pub async fn delete_fisher(&self, actor: &User, fisher_id: &str) -> Result<bool> {
        auth::ensure(actor, Action::ManageFishers)?;
        let existed = self.store.delete(Table::Fishers, fisher_id).await?;
        info!(fisher_id, existed, by = %actor.email, "Fisher deleted");
        Ok(existed)
    }

    // === Catches ===

    /// Every catch, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Forbidden`] or a store error.
    pub async fn list_catches(&self, actor: &User) -> Result<Vec<CatchRecord>> {
        auth::ensure(actor, Action::ManageCatches)?;
        self.catches().await
    }

    async fn catches(&self) -> Result<Vec<CatchRecord>> {
        let mut catches: Vec<CatchRecord> = storage::load_all(self.store()).await?;
        catches.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
        Ok(catches)
    }

    /// Catches landed on one day, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Forbidden`], or [`Error::Validation`] unless `date`
    /// is `YYYY-MM-DD`.
    pub async fn catches_on(&self, actor: &User, date: &str) -> Result<Vec<CatchRecord>> {
        auth::ensure(actor, Action::ManageCatches)?;
        if !is_iso_date(date) {
            return Err(Error::validation(
                "date",
                format!("expected YYYY-MM-DD, got {date:?}"),
            ));
        }
        let mut catches = self.catches().await?;
        catches.retain(|c| c.date == date);
        Ok(catches)
    }

    /// Log a new catch. Id and timestamp are assigned here.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Forbidden`], [`Error::Validation`] or a store error.
    pub async fn save_catch(&self, actor: &User, draft: CatchDraft) -> Result<CatchRecord> {
        auth::ensure(actor, Action::ManageCatches)?;
        draft.validate()?;

        let record = CatchRecord {
            id: self.store.next_id(Table::Catches).await?,
            date: draft.date,
            fish_type: draft.fish_type.trim().to_string(),
            fisher_name: draft.fisher_name,
            boat: draft.boat,
            quantity: draft.quantity,
            unit: draft.unit,
            created_by: actor.email.clone(),
            timestamp: self.clock.now(),
        };
        storage::save(self.store(), &record).await?;
        info!(id = record.id, fish_type = %record.fish_type, "Catch logged");
        Ok(record)
    }

    /// Replace the editable fields of a catch.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Forbidden`], [`Error::Validation`], or
    /// [`Error::NotFound`] when no catch has that id.
    pub async fn update_catch(
        &self,
        actor: &User,
        id: i64,
        draft: CatchDraft,
    ) -> Result<CatchRecord> {
        auth::ensure(actor, Action::ManageCatches)?;
        draft.validate()?;

        let key = id.to_string();
        let mut record: CatchRecord = storage::load(self.store(), &key)
            .await?
            .ok_or_else(|| Error::not_found("catch", key))?;
        record.apply(CatchDraft {
            fish_type: draft.fish_type.trim().to_string(),
            ..draft
        });
        storage::save(self.store(), &record).await?;
        info!(id, by = %actor.email, "Catch updated");
        Ok(record)
    }

    // === Lookup ===

    /// Read the presented card and classify its holder.
    ///
    /// A reader fault yields an `error` result. Either way one NFC log entry
    /// is appended.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Forbidden`] or a store error.
    pub async fn scan_card(&self, operator: &User) -> Result<ScanResult> {
        auth::ensure(operator, Action::LookupCards)?;

        let result = match self.reader.read_uid().await {
            Ok(uid) => {
                let fishers = self.fishers().await?;
                let probe = Probe::Card(&uid);
                lookup::resolve(
                    probe.find(&fishers),
                    probe,
                    &self.clock.today_iso(),
                    self.language,
                )
            }
            Err(err) => {
                warn!(reader = self.reader.name(), error = %err, "Card read failed");
                ScanResult::error(DEVICE_ERROR)
            }
        };

        self.record_lookup(&result, operator).await?;
        Ok(result)
    }

    /// Search the registry by fisher id or name.
    ///
    /// An empty query yields an `error` result. Either way one NFC log entry
    /// is appended.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Forbidden`] or a store error.
    pub async fn manual_search(&self, query: &str, operator: &User) -> Result<ScanResult> {
        auth::ensure(operator, Action::LookupCards)?;

        let result = if query.trim().is_empty() {
            ScanResult::error(EMPTY_QUERY)
        } else {
            let fishers = self.fishers().await?;
            let probe = Probe::Manual(query);
            lookup::resolve(
                probe.find(&fishers),
                probe,
                &self.clock.today_iso(),
                self.language,
            )
        };

        self.record_lookup(&result, operator).await?;
        Ok(result)
    }

    async fn record_lookup(&self, result: &ScanResult, operator: &User) -> Result<()> {
        let log_id = self.store.next_id(Table::NfcLogs).await?;
        let entry = lookup::audit_entry(log_id, result, &operator.email, self.clock.now());
        storage::save(self.store(), &entry).await?;
        debug!(log_id, status = ?result.status, "Lookup logged");
        Ok(())
    }

    /// Most recent NFC log entries, newest first, up to the configured limit.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Forbidden`] or a store error.
    pub async fn list_nfc_logs(&self, actor: &User) -> Result<Vec<NfcLog>> {
        auth::ensure(actor, Action::ViewNfcLogs)?;
        self.nfc_logs().await
    }

    async fn nfc_logs(&self) -> Result<Vec<NfcLog>> {
        let mut logs: Vec<NfcLog> = storage::load_all(self.store()).await?;
        logs.sort_by(|a, b| {
            b.timestamp
                .cmp(&a.timestamp)
                .then(b.log_id.cmp(&a.log_id))
        });
        logs.truncate(self.nfc_log_limit);
        Ok(logs)
    }

    // === Renewals ===

    /// Every completed renewal, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Forbidden`] or a store error.
    pub async fn list_renewals(&self, actor: &User) -> Result<Vec<RenewalRecord>> {
        auth::ensure(actor, Action::ViewRenewals)?;
        self.renewals().await
    }

    /// Completed renewals whose transaction id or fisher name contains
    /// `query`, ignoring case, newest first. A blank query lists them all.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Forbidden`] or a store error.
    pub async fn search_renewals(&self, actor: &User, query: &str) -> Result<Vec<RenewalRecord>> {
        auth::ensure(actor, Action::ViewRenewals)?;
        let mut renewals = self.renewals().await?;
        renewals.retain(|record| renewal::matches_query(record, query));
        debug!(query, matches = renewals.len(), "Renewals searched");
        Ok(renewals)
    }

    async fn renewals(&self) -> Result<Vec<RenewalRecord>> {
        let mut renewals: Vec<RenewalRecord> = storage::load_all(self.store()).await?;
        renewals.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(renewals)
    }

    async fn renewable_fisher(&self, fisher_id: &str, operator: &User) -> Result<Fisher> {
        auth::ensure(operator, Action::RenewInsurance)?;
        let fisher: Fisher = storage::load(self.store(), fisher_id)
            .await?
            .ok_or_else(|| Error::not_found("fisher", fisher_id))?;
        match fisher.activation_on(&self.clock.today_iso()) {
            ActivationStatus::Expired => Ok(fisher),
            ActivationStatus::Active | ActivationStatus::NotFound => Err(Error::invalid_state(
                format!("insurance of {fisher_id} has not expired"),
            )),
        }
    }

    async fn unused_transaction_id(&self) -> Result<String> {
        loop {
            let candidate = renewal::new_transaction_id();
            if self.store.get(Table::Renewals, &candidate).await?.is_none() {
                return Ok(candidate);
            }
            warn!(transaction_id = %candidate, "Transaction id collision");
        }
    }

    // === Reports ===

    /// Catch totals per fish type and unit for a `YYYY-MM` month.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Forbidden`], [`Error::Validation`] for a bad month,
    /// or a store error.
    pub async fn monthly_summary(&self, actor: &User, month: &str) -> Result<Vec<SummaryRow>> {
        auth::ensure(actor, Action::ViewReports)?;
        self.summary(month).await
    }

    async fn summary(&self, month: &str) -> Result<Vec<SummaryRow>> {
        let catches: Vec<CatchRecord> = storage::load_all(self.store()).await?;
        report::monthly_summary(month, &catches)
    }

    /// Fish types offered on the catch form.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Forbidden`] or a store error.
    pub async fn fish_types(&self, actor: &User) -> Result<Vec<String>> {
        auth::ensure(actor, Action::ManageCatches)?;
        let catches = self.catches().await?;
        Ok(report::fish_types(&catches))
    }

    /// Hand a rendered file to the report sink. `None` means cancelled.
    ///
    /// # Errors
    ///
    /// Returns an error if the sink fails.
    pub async fn export_report(&self, filename: &str, content: &[u8]) -> Result<Option<PathBuf>> {
        self.sink.save(filename, content).await
    }

    /// Export a month's summary and keep a copy in the report history.
    ///
    /// Returns `None` when the export was cancelled; nothing is recorded then.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Forbidden`], [`Error::Validation`] for a bad month,
    /// or a store or sink error.
    pub async fn export_monthly_report(
        &self,
        actor: &User,
        month: &str,
    ) -> Result<Option<ReportRecord>> {
        auth::ensure(actor, Action::ViewReports)?;
        let rows = self.summary(month).await?;
        let generated_at = self.clock.now();

        let content = MonthlyReport {
            month,
            generated_at,
            generated_by: &actor.email,
            rows: &rows,
        }
        .to_bytes()?;

        let Some(path) = self
            .export_report(&report::report_filename(month), &content)
            .await?
        else {
            info!(month, "Report export cancelled");
            return Ok(None);
        };

        let record = ReportRecord {
            report_id: format!("RPT-{}", Uuid::new_v4()),
            month: month.to_string(),
            generated_at,
            generated_by: actor.email.clone(),
            data_snapshot: rows,
            path: path.display().to_string(),
        };
        storage::save(self.store(), &record).await?;
        info!(report_id = %record.report_id, month, "Report exported");
        Ok(Some(record))
    }

    /// Every exported report, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Forbidden`] or a store error.
    pub async fn list_reports(&self, actor: &User) -> Result<Vec<ReportRecord>> {
        auth::ensure(actor, Action::ViewReports)?;
        self.reports().await
    }

    async fn reports(&self) -> Result<Vec<ReportRecord>> {
        let mut reports: Vec<ReportRecord> = storage::load_all(self.store()).await?;
        reports.sort_by(|a, b| b.generated_at.cmp(&a.generated_at));
        Ok(reports)
    }
}

#[async_trait]
impl RenewalDesk for PortOffice {
    async fn begin_authorization(&self, fisher_id: &str, operator: &User) -> Result<String> {
        let fisher = self.renewable_fisher(fisher_id, operator).await?;
        let code = renewal::new_authorization_code();
        info!(fisher_id = %fisher.fisher_id, %code, by = %operator.email, "Renewal authorized");
        Ok(code)
    }

    async fn complete_renewal(
        &self,
        fisher_id: &str,
        amount: f64,
        operator: &User,
        social_security_number: &str,
    ) -> Result<RenewalRecord> {
        renewal::validate_payment(social_security_number, amount)?;
        let fisher = self.renewable_fisher(fisher_id, operator).await?;
        let transaction_id = self.unused_transaction_id().await?;

        let (record, renewed) = renewal::build_renewal(
            &fisher,
            transaction_id,
            Payment {
                social_security_number,
                amount,
                operator_email: &operator.email,
                renewal_date: self.clock.today(),
                timestamp: self.clock.now(),
            },
        )?;

        let mut batch = Batch::new();
        batch.put(&record)?.put(&renewed)?;
        self.store.apply(batch).await?;

        info!(
            transaction_id = %record.transaction_id,
            fisher_id,
            new_expiry = %record.new_expiry_date,
            "Insurance renewed"
        );
        Ok(record)
    }
}

fn normalize_fisher(fisher: Fisher) -> Fisher {
    Fisher {
        fisher_id: fisher.fisher_id.trim().to_string(),
        card_uid: fisher.card_uid.trim().to_string(),
        name: fisher.name.trim().to_string(),
        boat: fisher.boat.trim().to_string(),
        insurance_expiry: fisher.insurance_expiry.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use chrono::NaiveDate;

    use super::*;
    use crate::clock::FixedClock;
    use crate::model::{MatchStatus, ScanStatus, Unit};
    use crate::reader::ScriptedReader;
    use crate::renewal::{RenewalStep, RenewalWizard};
    use crate::report::tests::CancellingSink;
    use crate::storage::MemoryStore;

    /// Wraps a memory store and fails on demand like an unreachable database.
    #[derive(Debug, Default)]
    struct FlakyStore {
        inner: MemoryStore,
        down: AtomicBool,
        fail_apply: AtomicBool,
    }

    impl FlakyStore {
        fn check(&self) -> Result<()> {
            if self.down.load(Ordering::SeqCst) {
                return Err(Error::Transport {
                    backend: "flaky",
                    message: "connection refused".to_string(),
                });
            }
            Ok(())
        }
    }

    #[async_trait]
    impl Store for FlakyStore {
        fn backend(&self) -> &'static str {
            "flaky"
        }

        async fn get(&self, table: Table, key: &str) -> Result<Option<String>> {
            self.check()?;
            self.inner.get(table, key).await
        }

        async fn put(&self, table: Table, key: &str, value: String) -> Result<()> {
            self.check()?;
            self.inner.put(table, key, value).await
        }

        async fn delete(&self, table: Table, key: &str) -> Result<bool> {
            self.check()?;
            self.inner.delete(table, key).await
        }

        async fn scan(&self, table: Table) -> Result<Vec<String>> {
            self.check()?;
            self.inner.scan(table).await
        }

        async fn apply(&self, batch: Batch) -> Result<()> {
            self.check()?;
            if self.fail_apply.load(Ordering::SeqCst) {
                // Nothing of the batch lands.
                return Err(Error::Transport {
                    backend: "flaky",
                    message: "connection reset during commit".to_string(),
                });
            }
            self.inner.apply(batch).await
        }

        async fn next_id(&self, table: Table) -> Result<i64> {
            self.check()?;
            self.inner.next_id(table).await
        }
    }

    fn june_first() -> Arc<dyn Clock> {
        Arc::new(FixedClock::on(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()))
    }

    async fn office_with(
        store: Arc<dyn Store>,
        reader: Arc<dyn CardReader>,
        sink: Arc<dyn ReportSink>,
    ) -> PortOffice {
        crate::seed::run(store.as_ref(), &Config::default())
            .await
            .unwrap();
        PortOffice::new(store, june_first(), reader, sink)
    }

    async fn office() -> PortOffice {
        crate::logging::init_test_logging();
        office_with(
            Arc::new(MemoryStore::new()),
            Arc::new(SimulatedReader::new("04:a1:b2:c3")),
            Arc::new(CancellingSink),
        )
        .await
    }

    async fn login(office: &PortOffice, email: &str) -> User {
        office.authenticate(email, "123456").await.unwrap()
    }

    fn draft(date: &str, fish_type: &str, quantity: f64) -> CatchDraft {
        CatchDraft {
            date: date.to_string(),
            fish_type: fish_type.to_string(),
            fisher_name: "ياسر".to_string(),
            boat: "الخيرات".to_string(),
            quantity,
            unit: Unit::Kg,
        }
    }

    fn temp_dir(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("portmaster_office_{tag}_{}", std::process::id()))
    }

    // --- authentication ---

    #[tokio::test]
    async fn test_authenticate_seeded_users() {
        let office = office().await;
        let admin = office.authenticate(" Admin@Port.com ", " 123456 ").await.unwrap();
        assert_eq!(admin.role, Role::Admin);
        assert_eq!(admin.email, "admin@port.com");

        let csns = login(&office, "csns@port.com").await;
        assert_eq!(csns.role, Role::CsnsOperator);
        assert_eq!(csns.name, "موظف التأمين");
    }

    #[tokio::test]
    async fn test_authenticate_failures() {
        let office = office().await;
        assert!(matches!(
            office.authenticate("admin@port.com", "wrong").await,
            Err(Error::Auth)
        ));
        assert!(matches!(
            office.authenticate("ghost@port.com", "123456").await,
            Err(Error::Auth)
        ));
    }

    #[tokio::test]
    async fn test_authenticate_unknown_role_denied() {
        let office = office().await;
        let account = UserAccount {
            email: "root@port.com".to_string(),
            name: "root".to_string(),
            role: "SUPERUSER".to_string(),
            password_hash: auth::hash_password("root@port.com", "123456"),
        };
        storage::save(office.store(), &account).await.unwrap();

        assert!(matches!(
            office.authenticate("root@port.com", "123456").await,
            Err(Error::Auth)
        ));
    }

    // --- lookup ---

    #[tokio::test]
    async fn test_scan_active_fisher() {
        let office = office().await;
        let nfc = login(&office, "nfc@port.com").await;

        let result = office.scan_card(&nfc).await.unwrap();
        assert_eq!(result.status, ScanStatus::Active);
        assert_eq!(result.message, "مفعل");
        assert_eq!(result.data.unwrap().fisher_id, "F1001");
    }

    #[tokio::test]
    async fn test_scan_expired_fisher() {
        let office = office_with(
            Arc::new(MemoryStore::new()),
            Arc::new(SimulatedReader::new("04:d4:e5:f6")),
            Arc::new(CancellingSink),
        )
        .await;
        let nfc = login(&office, "nfc@port.com").await;

        let result = office.scan_card(&nfc).await.unwrap();
        assert_eq!(result.status, ScanStatus::Expired);
        assert_eq!(result.data.unwrap().fisher_id, "F1002");
    }

    #[tokio::test]
    async fn test_scan_unknown_card() {
        let office = office_with(
            Arc::new(MemoryStore::new()),
            Arc::new(SimulatedReader::new("04:new:card:uid")),
            Arc::new(CancellingSink),
        )
        .await
        .with_language(Language::French);
        let nfc = login(&office, "nfc@port.com").await;

        let result = office.scan_card(&nfc).await.unwrap();
        assert_eq!(result.status, ScanStatus::NotFound);
        assert_eq!(result.message, "Introuvable");
        let placeholder = result.data.unwrap();
        assert_eq!(placeholder.fisher_id, Fisher::UNKNOWN_ID);
        assert_eq!(placeholder.card_uid, "04:new:card:uid");
    }

    #[tokio::test]
    async fn test_device_fault_still_logged() {
        let office = office_with(
            Arc::new(MemoryStore::new()),
            Arc::new(SimulatedReader::faulty()),
            Arc::new(CancellingSink),
        )
        .await;
        let nfc = login(&office, "nfc@port.com").await;

        let result = office.scan_card(&nfc).await.unwrap();
        assert_eq!(result, ScanResult::error(DEVICE_ERROR));

        let logs = office.nfc_logs().await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].match_status, MatchStatus::NotFound);
        assert_eq!(logs[0].operator_email, "nfc@port.com");
    }

    #[tokio::test]
    async fn test_every_lookup_logs_exactly_once() {
        let reader = ScriptedReader::new([
            Ok("04:a1:b2:c3".to_string()),
            Err(Error::device("jam")),
            Ok("04:ff:ff:ff".to_string()),
        ]);
        let office = office_with(
            Arc::new(MemoryStore::new()),
            Arc::new(reader),
            Arc::new(CancellingSink),
        )
        .await;
        let nfc = login(&office, "nfc@port.com").await;

        let mut expected = 0;
        for _ in 0..3 {
            office.scan_card(&nfc).await.unwrap();
            expected += 1;
            assert_eq!(office.nfc_logs().await.unwrap().len(), expected);
        }
        for query in ["أمين", "nobody", "", "F1002"] {
            office.manual_search(query, &nfc).await.unwrap();
            expected += 1;
            assert_eq!(office.nfc_logs().await.unwrap().len(), expected);
        }
    }

    #[tokio::test]
    async fn test_manual_search_unicode() {
        let office = office().await;
        let csns = login(&office, "csns@port.com").await;

        let result = office.manual_search("أمين", &csns).await.unwrap();
        assert_eq!(result.status, ScanStatus::Active);
        assert_eq!(result.data.unwrap().name, "محمد أمين");

        let result = office.manual_search("f1002", &csns).await.unwrap();
        assert_eq!(result.status, ScanStatus::Expired);

        // Latin spelling of an Arabic name is not transliterated.
        let result = office.manual_search("amine", &csns).await.unwrap();
        assert_eq!(result.status, ScanStatus::NotFound);
    }

    #[tokio::test]
    async fn test_manual_search_empty_query() {
        let office = office().await;
        let nfc = login(&office, "nfc@port.com").await;

        let result = office.manual_search("   ", &nfc).await.unwrap();
        assert_eq!(result.status, ScanStatus::Error);
        assert_eq!(result.message, EMPTY_QUERY);
    }

    #[tokio::test]
    async fn test_lookup_forbidden_for_admin() {
        let office = office().await;
        let admin = login(&office, "admin@port.com").await;

        assert!(matches!(
            office.scan_card(&admin).await,
            Err(Error::Forbidden { .. })
        ));
        assert!(office.nfc_logs().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_nfc_logs_newest_first_and_capped() {
        let office = office().await.with_nfc_log_limit(2);
        let nfc = login(&office, "nfc@port.com").await;
        for query in ["F1001", "F1002", "nobody"] {
            office.manual_search(query, &nfc).await.unwrap();
        }

        let logs = office.nfc_logs().await.unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].log_id, 3);
        assert_eq!(logs[0].fisher_id, Fisher::UNKNOWN_ID);
        assert_eq!(logs[1].fisher_id, "F1002");
    }

    // --- fishers ---

    #[tokio::test]
    async fn test_fisher_crud() {
        let office = office().await;
        let csns = login(&office, "csns@port.com").await;
        let fisher = Fisher {
            fisher_id: " F1003 ".to_string(),
            card_uid: "04:00:00:03".to_string(),
            name: "Karim".to_string(),
            boat: "Nour".to_string(),
            insurance_expiry: "2024-12-31".to_string(),
        };

        let added = office.add_fisher(&csns, fisher.clone()).await.unwrap();
        assert_eq!(added.fisher_id, "F1003");
        assert!(matches!(
            office.add_fisher(&csns, fisher).await,
            Err(Error::Duplicate { .. })
        ));

        let updated = office
            .update_fisher(
                &csns,
                Fisher {
                    boat: "Nour 2".to_string(),
                    ..added
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.boat, "Nour 2");

        let ids: Vec<_> = office
            .fishers()
            .await
            .unwrap()
            .into_iter()
            .map(|f| f.fisher_id)
            .collect();
        assert_eq!(ids, vec!["F1001", "F1002", "F1003"]);

        assert!(office.delete_fisher(&csns, "F1003").await.unwrap());
        assert!(!office.delete_fisher(&csns, "F1003").await.unwrap());
    }

    #[tokio::test]
    async fn test_update_missing_fisher() {
        let office = office().await;
        let csns = login(&office, "csns@port.com").await;
        let ghost = Fisher {
            fisher_id: "F9999".to_string(),
            ..seed_fisher()
        };
        let err = office.update_fisher(&csns, ghost).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_fisher_validation_and_role() {
        let office = office().await;
        let csns = login(&office, "csns@port.com").await;
        let nfc = login(&office, "nfc@port.com").await;

        let nameless = Fisher {
            fisher_id: "F2000".to_string(),
            name: String::new(),
            ..seed_fisher()
        };
        assert!(office.add_fisher(&csns, nameless).await.unwrap_err().is_validation());

        let fine = Fisher {
            fisher_id: "F2001".to_string(),
            ..seed_fisher()
        };
        assert!(matches!(
            office.add_fisher(&nfc, fine).await,
            Err(Error::Forbidden { .. })
        ));
    }

    fn seed_fisher() -> Fisher {
        crate::seed::demo_fishers().remove(0)
    }

    // --- catches ---

    #[tokio::test]
    async fn test_catch_save_and_update() {
        let office = office().await;
        let admin = login(&office, "admin@port.com").await;

        let first = office
            .save_catch(&admin, draft("2024-06-05", "Sardine", 50.0))
            .await
            .unwrap();
        let second = office
            .save_catch(&admin, draft("2024-06-20", "Sardine", 30.0))
            .await
            .unwrap();
        assert_eq!((first.id, second.id), (1, 2));
        assert_eq!(first.created_by, "admin@port.com");
        assert_eq!(first.timestamp, office.clock().now());

        let updated = office
            .update_catch(&admin, first.id, draft("2024-06-05", "Merlu", 12.5))
            .await
            .unwrap();
        assert_eq!(updated.id, first.id);
        assert_eq!(updated.fish_type, "Merlu");
        assert_eq!(updated.timestamp, first.timestamp);

        let ids: Vec<_> = office
            .catches()
            .await
            .unwrap()
            .iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec![2, 1]);
    }

    #[tokio::test]
    async fn test_catch_validation() {
        let office = office().await;
        let admin = login(&office, "admin@port.com").await;

        let err = office
            .save_catch(&admin, draft("2024-06-05", "", 5.0))
            .await
            .unwrap_err();
        assert!(err.is_validation());
        assert!(office.catches().await.unwrap().is_empty());

        let err = office
            .update_catch(&admin, 42, draft("2024-06-05", "Sole", 5.0))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_catches_on_day() {
        let office = office().await;
        let admin = login(&office, "admin@port.com").await;
        office
            .save_catch(&admin, draft("2024-06-05", "Sole", 5.0))
            .await
            .unwrap();
        office
            .save_catch(&admin, draft("2024-06-06", "Sole", 5.0))
            .await
            .unwrap();

        assert_eq!(office.catches_on(&admin, "2024-06-05").await.unwrap().len(), 1);
        assert!(office.catches_on(&admin, "2024-6-5").await.is_err());
    }

    // --- reports ---

    #[tokio::test]
    async fn test_monthly_summary_example() {
        let office = office().await;
        let admin = login(&office, "admin@port.com").await;
        office
            .save_catch(&admin, draft("2024-06-05", "Sardine", 50.0))
            .await
            .unwrap();
        office
            .save_catch(&admin, draft("2024-06-20", "Sardine", 30.0))
            .await
            .unwrap();

        let rows = office.monthly_summary(&admin, "2024-06").await.unwrap();
        assert_eq!(
            rows,
            vec![SummaryRow {
                fish_type: "Sardine".to_string(),
                unit: Unit::Kg,
                total: 80.0,
            }]
        );
    }

    #[tokio::test]
    async fn test_fish_types_include_logged() {
        let office = office().await;
        let admin = login(&office, "admin@port.com").await;
        office
            .save_catch(&admin, draft("2024-06-05", "Espadon", 5.0))
            .await
            .unwrap();

        let types = office.fish_types(&admin).await.unwrap();
        assert_eq!(types.first().map(String::as_str), Some("Sardine"));
        assert_eq!(types.last().map(String::as_str), Some("Espadon"));
    }

    #[tokio::test]
    async fn test_export_monthly_report_records_history() {
        let dir = temp_dir("export");
        let _ = std::fs::remove_dir_all(&dir);
        let office = office_with(
            Arc::new(MemoryStore::new()),
            Arc::new(SimulatedReader::new("04:a1:b2:c3")),
            Arc::new(DirectorySink::new(&dir)),
        )
        .await;
        let admin = login(&office, "admin@port.com").await;
        office
            .save_catch(&admin, draft("2024-06-05", "Sardine", 50.0))
            .await
            .unwrap();

        let record = office
            .export_monthly_report(&admin, "2024-06")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.month, "2024-06");
        assert_eq!(record.data_snapshot.len(), 1);
        assert!(record.path.ends_with("Report_2024-06.json"));
        assert!(dir.join("Report_2024-06.json").exists());

        let history = office.reports().await.unwrap();
        assert_eq!(history, vec![record]);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_cancelled_export_records_nothing() {
        let office = office().await;
        let admin = login(&office, "admin@port.com").await;

        assert!(office
            .export_monthly_report(&admin, "2024-06")
            .await
            .unwrap()
            .is_none());
        assert!(office.reports().await.unwrap().is_empty());
        assert!(office.export_report("x.pdf", b"%PDF").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_export_requires_admin() {
        let office = office().await;
        let csns = login(&office, "csns@port.com").await;
        assert!(matches!(
            office.export_monthly_report(&csns, "2024-06").await,
            Err(Error::Forbidden { .. })
        ));
    }

    // --- renewals ---

    #[tokio::test]
    async fn test_renewal_example() {
        let office = office().await;
        let csns = login(&office, "csns@port.com").await;

        let scan = office.manual_search("F1002", &csns).await.unwrap();
        let mut wizard = RenewalWizard::begin(&scan, &csns).unwrap();
        wizard.authorize(&office, "1850512345678").await.unwrap();
        assert!(office.renewals().await.unwrap().is_empty());

        let record = wizard.confirm_payment(&office, 500.0).await.unwrap().clone();
        assert_eq!(wizard.step(), RenewalStep::Receipt);
        assert_eq!(record.renewal_date, "2024-06-01");
        assert_eq!(record.new_expiry_date, "2025-06-01");
        assert!(record.transaction_id.starts_with("TRX-"));
        assert_eq!(record.operator_name, "csns@port.com");

        let fisher: Fisher = storage::load(office.store(), "F1002").await.unwrap().unwrap();
        assert_eq!(fisher.insurance_expiry, "2025-06-01");
        assert_eq!(office.renewals().await.unwrap(), vec![record]);

        let rescan = office.manual_search("F1002", &csns).await.unwrap();
        assert_eq!(rescan.status, ScanStatus::Active);
    }

    #[tokio::test]
    async fn test_search_renewals() {
        let office = office().await;
        let csns = login(&office, "csns@port.com").await;
        let record = office
            .complete_renewal("F1002", 500.0, &csns, "1")
            .await
            .unwrap();

        let by_trx = record.transaction_id[..12].to_uppercase();
        assert_eq!(
            office.search_renewals(&csns, &by_trx).await.unwrap(),
            vec![record.clone()]
        );
        assert_eq!(
            office.search_renewals(&csns, "ياسر").await.unwrap(),
            vec![record.clone()]
        );
        assert!(office
            .search_renewals(&csns, "أمين")
            .await
            .unwrap()
            .is_empty());
        assert_eq!(office.search_renewals(&csns, "  ").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_listings_enforce_roles() {
        let office = office().await;
        let admin = login(&office, "admin@port.com").await;
        let nfc = login(&office, "nfc@port.com").await;
        let csns = login(&office, "csns@port.com").await;

        let forbidden = |result: Result<usize>| matches!(result, Err(Error::Forbidden { .. }));

        assert!(forbidden(office.list_fishers(&nfc).await.map(|v| v.len())));
        assert!(forbidden(office.list_catches(&csns).await.map(|v| v.len())));
        assert!(forbidden(office.catches_on(&nfc, "2024-06-01").await.map(|v| v.len())));
        assert!(forbidden(office.list_nfc_logs(&admin).await.map(|v| v.len())));
        assert!(forbidden(office.list_renewals(&nfc).await.map(|v| v.len())));
        assert!(forbidden(office.search_renewals(&admin, "TRX").await.map(|v| v.len())));
        assert!(forbidden(office.monthly_summary(&csns, "2024-06").await.map(|v| v.len())));
        assert!(forbidden(office.fish_types(&nfc).await.map(|v| v.len())));
        assert!(forbidden(office.list_reports(&csns).await.map(|v| v.len())));

        assert_eq!(office.list_fishers(&csns).await.unwrap().len(), 2);
        assert!(office.list_catches(&admin).await.unwrap().is_empty());
        assert!(office.list_nfc_logs(&nfc).await.unwrap().is_empty());
        assert!(office.list_renewals(&csns).await.unwrap().is_empty());
        assert!(office.list_reports(&admin).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_transaction_ids_unique() {
        let office = office().await;
        let csns = login(&office, "csns@port.com").await;

        let first = office
            .complete_renewal("F1002", 500.0, &csns, "1")
            .await
            .unwrap();
        // Expire the fisher again so a second renewal is allowed.
        let mut fisher: Fisher = storage::load(office.store(), "F1002").await.unwrap().unwrap();
        fisher.insurance_expiry = "2024-01-01".to_string();
        storage::save(office.store(), &fisher).await.unwrap();

        let second = office
            .complete_renewal("F1002", 500.0, &csns, "1")
            .await
            .unwrap();
        assert_ne!(first.transaction_id, second.transaction_id);
        assert_eq!(office.renewals().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_renewal_rejects_active_or_missing() {
        let office = office().await;
        let csns = login(&office, "csns@port.com").await;

        assert!(matches!(
            office.begin_authorization("F1001", &csns).await,
            Err(Error::InvalidState { .. })
        ));
        assert!(office
            .begin_authorization("F9999", &csns)
            .await
            .unwrap_err()
            .is_not_found());
        assert!(office
            .complete_renewal("F1002", -5.0, &csns, "1")
            .await
            .unwrap_err()
            .is_validation());
    }

    #[tokio::test]
    async fn test_renewal_forbidden_for_nfc_operator() {
        let office = office().await;
        let nfc = login(&office, "nfc@port.com").await;
        assert!(matches!(
            office.complete_renewal("F1002", 500.0, &nfc, "1").await,
            Err(Error::Forbidden { .. })
        ));
    }

    #[tokio::test]
    async fn test_failed_commit_leaves_no_partial_renewal() {
        let store = Arc::new(FlakyStore::default());
        let office = office_with(
            store.clone(),
            Arc::new(SimulatedReader::new("04:d4:e5:f6")),
            Arc::new(CancellingSink),
        )
        .await;
        let csns = login(&office, "csns@port.com").await;

        let scan = office.scan_card(&csns).await.unwrap();
        let mut wizard = RenewalWizard::begin(&scan, &csns).unwrap();
        wizard.authorize(&office, "1").await.unwrap();

        store.fail_apply.store(true, Ordering::SeqCst);
        let err = wizard.confirm_payment(&office, 500.0).await.unwrap_err();
        assert!(err.is_transport());
        assert_eq!(wizard.step(), RenewalStep::Payment);

        store.fail_apply.store(false, Ordering::SeqCst);
        assert!(office.renewals().await.unwrap().is_empty());
        let fisher: Fisher = storage::load(office.store(), "F1002").await.unwrap().unwrap();
        assert_eq!(fisher.insurance_expiry, "2023-01-01");
    }

    #[tokio::test]
    async fn test_transport_failure_is_surfaced() {
        let store = Arc::new(FlakyStore::default());
        let office = office_with(
            store.clone(),
            Arc::new(SimulatedReader::new("04:a1:b2:c3")),
            Arc::new(CancellingSink),
        )
        .await;
        let nfc = login(&office, "nfc@port.com").await;

        store.down.store(true, Ordering::SeqCst);
        let err = office.scan_card(&nfc).await.unwrap_err();
        assert!(err.is_transport());
        assert!(office.fishers().await.unwrap_err().is_transport());

        store.down.store(false, Ordering::SeqCst);
        assert!(office.nfc_logs().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_fisher_keeps_history() {
        let office = office().await;
        let csns = login(&office, "csns@port.com").await;

        office.manual_search("F1002", &csns).await.unwrap();
        let renewal = office
            .complete_renewal("F1002", 500.0, &csns, "1")
            .await
            .unwrap();
        let logs_before = office.nfc_logs().await.unwrap();

        assert!(office.delete_fisher(&csns, "F1002").await.unwrap());

        assert_eq!(office.nfc_logs().await.unwrap(), logs_before);
        assert_eq!(office.renewals().await.unwrap(), vec![renewal]);
        assert_eq!(logs_before[0].name_from_card, "ياسر");
    }

    #[tokio::test]
    async fn test_sqlite_backed_office() {
        let store = Arc::new(crate::storage::SqliteStore::open_in_memory().unwrap());
        let office = office_with(
            store,
            Arc::new(SimulatedReader::new("04:d4:e5:f6")),
            Arc::new(CancellingSink),
        )
        .await;
        let csns = login(&office, "csns@port.com").await;

        let scan = office.scan_card(&csns).await.unwrap();
        let mut wizard = RenewalWizard::begin(&scan, &csns).unwrap();
        wizard.authorize(&office, "1").await.unwrap();
        wizard.confirm_payment(&office, 750.0).await.unwrap();

        assert_eq!(office.renewals().await.unwrap().len(), 1);
        assert_eq!(office.nfc_logs().await.unwrap().len(), 1);
    }
}
