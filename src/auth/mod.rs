//! Authentication module
//!
//! Credential verification, token issuance and token-based authorization for
//! the two principal kinds:
//!
//! - service accounts receive `external` tokens signed with the external secret
//! - internal users receive `internal` tokens signed with the admin secret
//!
//! A token signed for one audience never verifies against the other secret.

use crate::config::JwtConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub mod dispatcher;
pub mod guard;
pub mod secret;
pub mod token;

pub use dispatcher::{TokenEndpoint, TokenOutcome};
pub use guard::AuthorizationGuard;
pub use token::{AccessToken, TokenIssuer};

/// Fixed `iss` claim of every token this service issues
pub const ISSUER: &str = "apigate";

/// Lifetime of an issued token in seconds
pub const TOKEN_LIFETIME_SECS: i64 = 3600;

/// Audience a token was issued to; the sole basis for route authorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudienceType {
    /// Service accounts calling from outside
    External,
    /// Administrative operators
    Internal,
}

impl AudienceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AudienceType::External => "external",
            AudienceType::Internal => "internal",
        }
    }
}

impl fmt::Display for AudienceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AudienceType {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "external" => Ok(AudienceType::External),
            "internal" => Ok(AudienceType::Internal),
            _ => Err(AuthError::AudienceMismatch),
        }
    }
}

/// Claims embedded in a signed token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Principal id
    pub sub: String,
    /// Owning org, present only on external tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org_id: Option<i64>,
    #[serde(rename = "type")]
    pub audience: AudienceType,
    pub iss: String,
    /// Absolute expiry as a unix timestamp
    pub exp: i64,
}

/// Why a token failed verification
///
/// Only used for logs and metrics; callers always see the same message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenRejection {
    Expired,
    BadSignature,
    UnexpectedAlgorithm,
    Malformed,
}

impl TokenRejection {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenRejection::Expired => "expired",
            TokenRejection::BadSignature => "bad_signature",
            TokenRejection::UnexpectedAlgorithm => "unexpected_algorithm",
            TokenRejection::Malformed => "malformed",
        }
    }
}

/// Authorization errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Missing or malformed authorization header")]
    MissingOrMalformedHeader,

    #[error("Invalid or expired token")]
    InvalidSignatureOrExpired(TokenRejection),

    #[error("Token has no audience claim")]
    MissingAudienceClaim,

    #[error("Token audience not allowed")]
    AudienceMismatch,
}

impl AuthError {
    /// Short label for metrics and structured logs
    pub fn reason(&self) -> &'static str {
        match self {
            AuthError::MissingOrMalformedHeader => "missing_header",
            AuthError::InvalidSignatureOrExpired(rejection) => rejection.as_str(),
            AuthError::MissingAudienceClaim => "missing_audience",
            AuthError::AudienceMismatch => "audience_mismatch",
        }
    }
}

/// The two HMAC signing secrets, one per audience
///
/// Constructed once at startup and handed to the issuer and guards.
#[derive(Clone)]
pub struct SigningSecrets {
    external: Vec<u8>,
    internal: Vec<u8>,
}

impl SigningSecrets {
    pub fn new(external: impl Into<Vec<u8>>, internal: impl Into<Vec<u8>>) -> Self {
        Self {
            external: external.into(),
            internal: internal.into(),
        }
    }

    /// Build from validated JWT configuration
    pub fn from_config(config: &JwtConfig) -> Self {
        Self::new(
            config.signing_secret.as_bytes(),
            config.admin.signing_secret.as_bytes(),
        )
    }

    /// Secret scoped to an audience
    pub fn for_audience(&self, audience: AudienceType) -> &[u8] {
        match audience {
            AudienceType::External => &self.external,
            AudienceType::Internal => &self.internal,
        }
    }
}

impl fmt::Debug for SigningSecrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningSecrets")
            .field("external", &"<redacted>")
            .field("internal", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audience_serialization() {
        assert_eq!(
            serde_json::to_string(&AudienceType::External).unwrap(),
            "\"external\""
        );
        assert_eq!(
            serde_json::from_str::<AudienceType>("\"internal\"").unwrap(),
            AudienceType::Internal
        );
        assert!(serde_json::from_str::<AudienceType>("\"admin\"").is_err());
    }

    #[test]
    fn test_claims_wire_shape() {
        let claims = Claims {
            sub: "5".into(),
            org_id: None,
            audience: AudienceType::Internal,
            iss: ISSUER.into(),
            exp: 1_700_000_000,
        };

        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(json["type"], "internal");
        assert_eq!(json["iss"], "apigate");
        assert!(json.get("org_id").is_none());
    }

    #[test]
    fn test_secrets_scoped_by_audience() {
        let secrets = SigningSecrets::new("sa-key", "ops-key");
        assert_eq!(secrets.for_audience(AudienceType::External), b"sa-key");
        assert_eq!(secrets.for_audience(AudienceType::Internal), b"ops-key");

        let debug = format!("{:?}", secrets);
        assert!(!debug.contains("sa-key"));
        assert!(!debug.contains("ops-key"));
    }

    #[test]
    fn test_error_messages_do_not_leak_reason() {
        let expired = AuthError::InvalidSignatureOrExpired(TokenRejection::Expired);
        let forged = AuthError::InvalidSignatureOrExpired(TokenRejection::BadSignature);
        assert_eq!(expired.to_string(), forged.to_string());
        assert_ne!(expired.reason(), forged.reason());
    }
}
