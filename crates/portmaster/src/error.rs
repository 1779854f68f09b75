//! Error types for portmaster.
//!
//! This module defines all error types used throughout the portmaster crate.
//! Every variant can be rendered as a short status message in the active UI
//! language via [`Error::status_message`].

use std::path::PathBuf;
use thiserror::Error;

use crate::config::Language;

/// The main error type for portmaster operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Domain Errors ===
    /// Credentials did not match any known user.
    #[error("invalid credentials")]
    Auth,

    /// No record matched the requested key.
    #[error("{entity} not found: {key}")]
    NotFound {
        /// Kind of record that was looked up.
        entity: &'static str,
        /// The key that had no match.
        key: String,
    },

    /// A record with the same primary key already exists.
    #[error("{entity} already exists: {key}")]
    Duplicate {
        /// Kind of record being created.
        entity: &'static str,
        /// The conflicting key.
        key: String,
    },

    /// A required form field was missing or malformed.
    #[error("invalid {field}: {message}")]
    Validation {
        /// Name of the offending field.
        field: &'static str,
        /// Description of the problem.
        message: String,
    },

    /// The acting user's role does not allow the action.
    #[error("role {role} is not allowed to {action}")]
    Forbidden {
        /// Role of the acting user.
        role: String,
        /// The denied action.
        action: String,
    },

    /// An operation was attempted in the wrong renewal step.
    #[error("invalid renewal state: {message}")]
    InvalidState {
        /// Description of the misuse.
        message: String,
    },

    /// The card reader reported a fault.
    #[error("card reader error: {message}")]
    Device {
        /// Description of the fault.
        message: String,
    },

    // === Storage Errors ===
    /// The configured backing store could not be reached.
    #[error("{backend} store unavailable: {message}")]
    Transport {
        /// Name of the backing store.
        backend: &'static str,
        /// Description of the failure.
        message: String,
    },

    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for portmaster operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        use rusqlite::ErrorCode;

        match err.sqlite_error_code() {
            Some(
                ErrorCode::CannotOpen
                | ErrorCode::DatabaseBusy
                | ErrorCode::DatabaseLocked
                | ErrorCode::SystemIoFailure
                | ErrorCode::ReadOnly,
            ) => Self::Transport {
                backend: "sqlite",
                message: err.to_string(),
            },
            _ => Self::DatabaseQuery(err),
        }
    }
}

impl Error {
    /// Create a new not-found error.
    #[must_use]
    pub fn not_found(entity: &'static str, key: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            key: key.into(),
        }
    }

    /// Create a new validation error.
    #[must_use]
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    /// Create a new invalid-state error.
    #[must_use]
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Create a new device error.
    #[must_use]
    pub fn device(message: impl Into<String>) -> Self {
        Self::Device {
            message: message.into(),
        }
    }

    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Check if this error means the backing store was unreachable.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    /// Check if this error is a missing record.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this error is a rejected form field.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    /// Short status line shown to the operator in the given language.
    #[must_use]
    pub fn status_message(&self, language: Language) -> &'static str {
        match (self, language) {
            (Self::Auth, Language::Arabic) => "بيانات الاعتماد غير صحيحة",
            (Self::Auth, Language::French) => "Identifiants incorrects",
            (Self::NotFound { .. }, Language::Arabic) => "غير موجود",
            (Self::NotFound { .. }, Language::French) => "Introuvable",
            (Self::Duplicate { .. }, Language::Arabic) => "السجل موجود مسبقا",
            (Self::Duplicate { .. }, Language::French) => "Enregistrement déjà existant",
            (Self::Validation { .. }, Language::Arabic) => "يرجى ملء جميع الحقول المطلوبة",
            (Self::Validation { .. }, Language::French) => "Veuillez remplir les champs requis",
            (Self::Forbidden { .. }, Language::Arabic) => "غير مسموح",
            (Self::Forbidden { .. }, Language::French) => "Action non autorisée",
            (Self::Device { .. }, Language::Arabic) => "خطأ في قارئ البطاقات",
            (Self::Device { .. }, Language::French) => "Erreur du lecteur de cartes",
            (Self::Transport { .. }, Language::Arabic) => "تعذر الاتصال بقاعدة البيانات",
            (Self::Transport { .. }, Language::French) => "Base de données injoignable",
            (_, Language::Arabic) => "حدث خطأ",
            (_, Language::French) => "Une erreur est survenue",
        }
    }
}
