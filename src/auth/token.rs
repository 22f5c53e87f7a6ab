//! Token issuance
//!
//! Builds claims for a verified principal and signs them with HS256, using the
//! secret scoped to the token's audience.

use super::{AudienceType, Claims, SigningSecrets, ISSUER, TOKEN_LIFETIME_SECS};
use crate::model::{InternalUser, ServiceAccount};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Token issuance errors
#[derive(Error, Debug)]
pub enum TokenError {
    #[error("Failed to sign token: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
}

/// Bearer credential returned to a caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    pub expires_in: i64,
}

impl Claims {
    /// Claims for a service account: external audience, org scoped
    pub fn for_service_account(account: &ServiceAccount, now: DateTime<Utc>) -> Self {
        Self {
            sub: account.id.to_string(),
            org_id: Some(account.org_id),
            audience: AudienceType::External,
            iss: ISSUER.to_string(),
            exp: expiry(now),
        }
    }

    /// Claims for an internal user: internal audience, no org
    pub fn for_internal_user(user: &InternalUser, now: DateTime<Utc>) -> Self {
        Self {
            sub: user.id.to_string(),
            org_id: None,
            audience: AudienceType::Internal,
            iss: ISSUER.to_string(),
            exp: expiry(now),
        }
    }
}

fn expiry(now: DateTime<Utc>) -> i64 {
    (now + Duration::seconds(TOKEN_LIFETIME_SECS)).timestamp()
}

/// Signs tokens for both audiences
///
/// # Example
///
/// ```
/// use apigate::auth::{SigningSecrets, TokenIssuer};
/// use apigate::model::InternalUser;
///
/// let secrets = SigningSecrets::new("external-secret", "internal-secret");
/// let issuer = TokenIssuer::new(&secrets);
///
/// let user = InternalUser {
///     id: 1,
///     email: "ops@example.com".into(),
///     password_hash: String::new(),
///     inactivated_at: None,
/// };
/// let token = issuer.issue_for_internal_user(&user).unwrap();
/// assert_eq!(token.expires_in, 3600);
/// ```
#[derive(Clone)]
pub struct TokenIssuer {
    external_key: EncodingKey,
    internal_key: EncodingKey,
}

impl TokenIssuer {
    pub fn new(secrets: &SigningSecrets) -> Self {
        Self {
            external_key: EncodingKey::from_secret(secrets.for_audience(AudienceType::External)),
            internal_key: EncodingKey::from_secret(secrets.for_audience(AudienceType::Internal)),
        }
    }

    /// Issue an external token for a verified service account
    pub fn issue_for_service_account(
        &self,
        account: &ServiceAccount,
    ) -> Result<AccessToken, TokenError> {
        let claims = Claims::for_service_account(account, Utc::now());
        self.issue(&claims)
    }

    /// Issue an internal token for a verified internal user
    pub fn issue_for_internal_user(&self, user: &InternalUser) -> Result<AccessToken, TokenError> {
        let claims = Claims::for_internal_user(user, Utc::now());
        self.issue(&claims)
    }

    fn issue(&self, claims: &Claims) -> Result<AccessToken, TokenError> {
        Ok(AccessToken {
            access_token: self.sign(claims)?,
            expires_in: TOKEN_LIFETIME_SECS,
        })
    }

    /// Sign claims with the key matching their audience
    pub fn sign(&self, claims: &Claims) -> Result<String, TokenError> {
        let key = match claims.audience {
            AudienceType::External => &self.external_key,
            AudienceType::Internal => &self.internal_key,
        };

        Ok(encode(&Header::new(Algorithm::HS256), claims, key)?)
    }
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{decode, DecodingKey, Validation};

    fn account() -> ServiceAccount {
        ServiceAccount {
            id: 11,
            org_id: 42,
            identifier: "billing-sync".into(),
            client_id: "c1".into(),
            client_secret_hash: String::new(),
            inactivated_at: None,
        }
    }

    #[test]
    fn test_service_account_claims() {
        let now = Utc::now();
        let claims = Claims::for_service_account(&account(), now);

        assert_eq!(claims.sub, "11");
        assert_eq!(claims.org_id, Some(42));
        assert_eq!(claims.audience, AudienceType::External);
        assert_eq!(claims.iss, ISSUER);
        assert_eq!(claims.exp, now.timestamp() + TOKEN_LIFETIME_SECS);
    }

    #[test]
    fn test_signed_with_external_secret_only() {
        let secrets = SigningSecrets::new("ext-secret", "int-secret");
        let token = TokenIssuer::new(&secrets)
            .issue_for_service_account(&account())
            .unwrap();

        let validation = Validation::new(Algorithm::HS256);
        assert!(decode::<Claims>(
            &token.access_token,
            &DecodingKey::from_secret(b"ext-secret"),
            &validation
        )
        .is_ok());
        assert!(decode::<Claims>(
            &token.access_token,
            &DecodingKey::from_secret(b"int-secret"),
            &validation
        )
        .is_err());
    }
}
