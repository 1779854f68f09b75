//! Card readers.
//!
//! The office never talks to NFC hardware directly. It asks a
//! [`CardReader`] for the UID of the card currently presented.

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::ReaderConfig;
use crate::error::{Error, Result};

/// A device that reads the UID of a presented card.
#[async_trait]
pub trait CardReader: Send + Sync + std::fmt::Debug {
    /// Human-readable device name.
    fn name(&self) -> &'static str;

    /// Read the UID of the card on the reader.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Device`] when the hardware reports a fault.
    async fn read_uid(&self) -> Result<String>;
}

/// Reader that always "reads" the same configured card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulatedReader {
    uid: String,
    fault: bool,
}

impl SimulatedReader {
    /// A reader that returns `uid` on every read.
    #[must_use]
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            fault: false,
        }
    }

    /// A reader that fails every read.
    #[must_use]
    pub fn faulty() -> Self {
        Self {
            uid: String::new(),
            fault: true,
        }
    }

    /// Build the reader described by the configuration.
    #[must_use]
    pub fn from_config(config: &ReaderConfig) -> Self {
        Self {
            uid: config.simulated_uid.clone(),
            fault: config.simulate_fault,
        }
    }
}

#[async_trait]
impl CardReader for SimulatedReader {
    fn name(&self) -> &'static str {
        "simulated"
    }

    async fn read_uid(&self) -> Result<String> {
        if self.fault {
            warn!("Simulated reader fault");
            return Err(Error::device("simulated reader fault"));
        }
        debug!(uid = %self.uid, "Simulated card read");
        Ok(self.uid.clone())
    }
}

/// Reader that plays back a fixed sequence of reads.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct ScriptedReader {
    reads: std::sync::Mutex<std::collections::VecDeque<Result<String>>>,
}

#[cfg(test)]
impl ScriptedReader {
    /// Queue the given outcomes, returned in order.
    pub fn new(reads: impl IntoIterator<Item = Result<String>>) -> Self {
        Self {
            reads: std::sync::Mutex::new(reads.into_iter().collect()),
        }
    }
}

#[cfg(test)]
#[async_trait]
impl CardReader for ScriptedReader {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn read_uid(&self) -> Result<String> {
        self.reads
            .lock()
            .map_err(|_| Error::internal("scripted reader lock poisoned"))?
            .pop_front()
            .unwrap_or_else(|| Err(Error::device("no card presented")))
    }
}
