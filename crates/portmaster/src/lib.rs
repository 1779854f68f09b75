//! `portmaster` - Record keeping for a fishing port office
//!
//! This library logs daily catches, keeps the registry of insured fishers,
//! looks fishers up by NFC card or by name, renews their insurance and
//! aggregates catches into monthly reports. Everything goes through
//! [`PortOffice`], backed by one configured [`Store`](storage::Store).

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod auth;
pub mod cli;
pub mod clock;
pub mod config;
pub mod error;
pub mod logging;
pub mod lookup;
pub mod model;
pub mod office;
pub mod reader;
pub mod renewal;
pub mod report;
pub mod seed;
pub mod storage;

pub use config::Config;
pub use error::{Error, Result};
pub use logging::init_logging;
pub use office::PortOffice;
pub use renewal::{RenewalDesk, RenewalStep, RenewalWizard};
