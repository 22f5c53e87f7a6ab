//! Principal records
//!
//! Service accounts and internal users are owned by the configuration store;
//! this crate only reads them. Hash fields deserialize from the store but are
//! never serialized back out.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Something that can authenticate with a secret
pub trait Principal {
    /// Stored bcrypt hash of the principal's secret
    fn secret_hash(&self) -> &str;

    /// Whether the principal has been deactivated
    fn is_inactive(&self) -> bool;
}

/// External, org-scoped API caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceAccount {
    pub id: i64,
    pub org_id: i64,
    pub identifier: String,
    pub client_id: String,
    #[serde(skip_serializing, default)]
    pub client_secret_hash: String,
    #[serde(default)]
    pub inactivated_at: Option<DateTime<Utc>>,
}

impl Principal for ServiceAccount {
    fn secret_hash(&self) -> &str {
        &self.client_secret_hash
    }

    fn is_inactive(&self) -> bool {
        self.inactivated_at.is_some()
    }
}

/// Administrative operator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InternalUser {
    pub id: i64,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    #[serde(default)]
    pub inactivated_at: Option<DateTime<Utc>>,
}

impl Principal for InternalUser {
    fn secret_hash(&self) -> &str {
        &self.password_hash
    }

    fn is_inactive(&self) -> bool {
        self.inactivated_at.is_some()
    }
}
