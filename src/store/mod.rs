//! Credential store
//!
//! Lookup interface over the principal records owned by the configuration
//! store. The auth core only needs `find-by-identifier` style lookups; a SQL
//! backend can implement the same trait.

use crate::model::{InternalUser, ServiceAccount};
use async_trait::async_trait;
use thiserror::Error;

mod memory;

pub use memory::MemoryStore;

/// Store errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to read store file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse store file: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("Duplicate {kind} '{key}'")]
    Duplicate { kind: &'static str, key: String },

    #[error("Unusable secret hash for {kind} '{key}': {reason}")]
    InvalidHash {
        kind: &'static str,
        key: String,
        reason: String,
    },

    #[error("Store backend error: {0}")]
    Backend(String),
}

/// Read access to principal records
///
/// Lookups by credential identifier (`client_id`, `email`) only return active
/// principals. Lookups may block on I/O; callers must not hold locks across
/// them.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Find an active service account by client id
    async fn find_service_account_by_client_id(
        &self,
        client_id: &str,
    ) -> Result<Option<ServiceAccount>, StoreError>;

    /// Find an active internal user by email
    async fn find_internal_user_by_email(
        &self,
        email: &str,
    ) -> Result<Option<InternalUser>, StoreError>;

    /// Find a service account by id, active or not
    async fn find_service_account_by_id(
        &self,
        id: i64,
    ) -> Result<Option<ServiceAccount>, StoreError>;

    /// Find an internal user by id, active or not
    async fn find_internal_user_by_id(&self, id: i64) -> Result<Option<InternalUser>, StoreError>;

    /// List all service accounts
    async fn list_service_accounts(&self) -> Result<Vec<ServiceAccount>, StoreError>;

    /// List all internal users
    async fn list_internal_users(&self) -> Result<Vec<InternalUser>, StoreError>;
}
