//! Records kept by the port office.
//!
//! Every persisted type implements [`Record`](crate::storage::Record), which
//! names its table and primary key.

mod catch;
mod fisher;
mod nfc;
mod renewal;
mod report;
mod user;

pub use catch::{CatchDraft, CatchRecord, Unit};
pub use fisher::Fisher;
pub use nfc::{ActivationStatus, MatchStatus, NfcLog, ScanResult, ScanStatus};
pub use renewal::RenewalRecord;
pub use report::{ReportRecord, SummaryRow};
pub use user::{Role, User, UserAccount};
