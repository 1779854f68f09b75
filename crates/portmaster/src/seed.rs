//! Seed data.
//!
//! The three operator accounts are ensured on every start. Demo fishers are
//! only inserted into an empty registry.

use tracing::{debug, info};

use crate::auth::hash_password;
use crate::config::Config;
use crate::error::Result;
use crate::model::{Fisher, Role, UserAccount};
use crate::storage::{self, Store, Table};

/// Accounts every deployment starts with: email, display name, role.
pub const SEED_USERS: [(&str, &str, Role); 3] = [
    ("admin@port.com", "مسؤول الحسابات", Role::Admin),
    ("nfc@port.com", "موظف الأمن", Role::NfcOperator),
    ("csns@port.com", "موظف التأمين", Role::CsnsOperator),
];

/// Fishers inserted into an empty registry for demonstrations.
#[must_use]
pub fn demo_fishers() -> Vec<Fisher> {
    vec![
        Fisher {
            fisher_id: "F1001".to_string(),
            card_uid: "04:a1:b2:c3".to_string(),
            name: "محمد أمين".to_string(),
            boat: "لؤلؤة البحر".to_string(),
            insurance_expiry: "2025-12-31".to_string(),
        },
        Fisher {
            fisher_id: "F1002".to_string(),
            card_uid: "04:d4:e5:f6".to_string(),
            name: "ياسر".to_string(),
            boat: "الخيرات".to_string(),
            insurance_expiry: "2023-01-01".to_string(),
        },
    ]
}

/// What a seeding pass inserted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    /// Accounts created.
    pub users: usize,
    /// Demo fishers created.
    pub fishers: usize,
}

/// Create any missing operator account with the given password.
///
/// Existing accounts are left untouched.
///
/// # Errors
///
/// Returns an error if the store fails.
pub async fn seed_users(store: &dyn Store, password: &str) -> Result<usize> {
    let mut created = 0;
    for (email, name, role) in SEED_USERS {
        if store.get(Table::Users, email).await?.is_some() {
            continue;
        }
        let account = UserAccount {
            email: email.to_string(),
            name: name.to_string(),
            role: role.to_string(),
            password_hash: hash_password(email, password.trim()),
        };
        storage::save(store, &account).await?;
        debug!(email, "Seeded account");
        created += 1;
    }
    Ok(created)
}

/// Insert the demo fishers if the registry is empty.
///
/// # Errors
///
/// Returns an error if the store fails.
pub async fn seed_demo_fishers(store: &dyn Store) -> Result<usize> {
    if !store.scan(Table::Fishers).await?.is_empty() {
        return Ok(0);
    }
    let fishers = demo_fishers();
    for fisher in &fishers {
        storage::save(store, fisher).await?;
    }
    Ok(fishers.len())
}

/// Run every seeding step the configuration enables.
///
/// # Errors
///
/// Returns an error if the store fails.
pub async fn run(store: &dyn Store, config: &Config) -> Result<SeedSummary> {
    let users = seed_users(store, &config.auth.seed_password).await?;
    let fishers = if config.seed.demo_fishers {
        seed_demo_fishers(store).await?
    } else {
        0
    };

    if users > 0 || fishers > 0 {
        info!(users, fishers, "Seed data inserted");
    }
    Ok(SeedSummary { users, fishers })
}
