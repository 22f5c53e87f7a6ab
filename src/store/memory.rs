//! In-memory credential store seeded from a YAML file
//!
//! ```yaml
//! service_accounts:
//!   - id: 1
//!     org_id: 7
//!     identifier: "billing-sync"
//!     client_id: "c1"
//!     client_secret_hash: "$2b$10$..."
//! internal_users:
//!   - id: 1
//!     email: "ops@example.com"
//!     password_hash: "$2b$10$..."
//! ```

use super::{CredentialStore, StoreError};
use crate::auth::secret::check_stored_hash;
use crate::model::{InternalUser, Principal, ServiceAccount};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

#[derive(Debug, Default, Deserialize)]
struct Seed {
    #[serde(default)]
    service_accounts: Vec<ServiceAccount>,
    #[serde(default)]
    internal_users: Vec<InternalUser>,
}

/// Immutable in-memory store
///
/// Built once at startup and shared read-only across requests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    service_accounts: Vec<ServiceAccount>,
    internal_users: Vec<InternalUser>,
    by_client_id: HashMap<String, usize>,
    by_email: HashMap<String, usize>,
}

impl MemoryStore {
    /// Build a store from records
    ///
    /// Rejects duplicate identifiers and any secret hash that is not bcrypt at
    /// the cost used for the dummy comparison.
    pub fn new(
        service_accounts: Vec<ServiceAccount>,
        internal_users: Vec<InternalUser>,
    ) -> Result<Self, StoreError> {
        let mut by_client_id = HashMap::with_capacity(service_accounts.len());
        for (idx, account) in service_accounts.iter().enumerate() {
            usable_hash(account, "client_id", &account.client_id)?;
            if by_client_id.insert(account.client_id.clone(), idx).is_some() {
                return Err(StoreError::Duplicate {
                    kind: "client_id",
                    key: account.client_id.clone(),
                });
            }
        }

        let mut by_email = HashMap::with_capacity(internal_users.len());
        for (idx, user) in internal_users.iter().enumerate() {
            usable_hash(user, "email", &user.email)?;
            if by_email.insert(user.email.clone(), idx).is_some() {
                return Err(StoreError::Duplicate {
                    kind: "email",
                    key: user.email.clone(),
                });
            }
        }

        Ok(Self {
            service_accounts,
            internal_users,
            by_client_id,
            by_email,
        })
    }

    /// Load a store from a YAML seed file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let store = Self::from_yaml_str(&content)?;
        info!(
            path = %path.as_ref().display(),
            service_accounts = store.service_accounts.len(),
            internal_users = store.internal_users.len(),
            "Loaded credential store"
        );
        Ok(store)
    }

    /// Parse a store from YAML text
    pub fn from_yaml_str(content: &str) -> Result<Self, StoreError> {
        let seed: Seed = serde_yaml::from_str(content)?;
        Self::new(seed.service_accounts, seed.internal_users)
    }
}

fn usable_hash<P: Principal>(principal: &P, kind: &'static str, key: &str) -> Result<(), StoreError> {
    check_stored_hash(principal.secret_hash()).map_err(|reason| StoreError::InvalidHash {
        kind,
        key: key.to_string(),
        reason,
    })
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn find_service_account_by_client_id(
        &self,
        client_id: &str,
    ) -> Result<Option<ServiceAccount>, StoreError> {
        Ok(self
            .by_client_id
            .get(client_id)
            .and_then(|&idx| self.service_accounts.get(idx))
            .filter(|account| !account.is_inactive())
            .cloned())
    }

    async fn find_internal_user_by_email(
        &self,
        email: &str,
    ) -> Result<Option<InternalUser>, StoreError> {
        Ok(self
            .by_email
            .get(email)
            .and_then(|&idx| self.internal_users.get(idx))
            .filter(|user| !user.is_inactive())
            .cloned())
    }

    async fn find_service_account_by_id(
        &self,
        id: i64,
    ) -> Result<Option<ServiceAccount>, StoreError> {
        Ok(self
            .service_accounts
            .iter()
            .find(|account| account.id == id)
            .cloned())
    }

    async fn find_internal_user_by_id(&self, id: i64) -> Result<Option<InternalUser>, StoreError> {
        Ok(self.internal_users.iter().find(|user| user.id == id).cloned())
    }

    async fn list_service_accounts(&self) -> Result<Vec<ServiceAccount>, StoreError> {
        Ok(self.service_accounts.clone())
    }

    async fn list_internal_users(&self) -> Result<Vec<InternalUser>, StoreError> {
        Ok(self.internal_users.clone())
    }
}
