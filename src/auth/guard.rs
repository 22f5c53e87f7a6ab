//! Authorization guard
//!
//! Verifies bearer tokens for one required audience. Each guard holds only
//! the secret for its audience, so a token signed for the other audience
//! fails signature verification before its claims are ever read.

use super::{AudienceType, AuthError, Claims, SigningSecrets, TokenRejection, ISSUER};
use hyper::header::AUTHORIZATION;
use hyper::HeaderMap;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use tracing::debug;

const BEARER_PREFIX: &str = "Bearer ";

/// HMAC family accepted in token headers
const HMAC_ALGORITHMS: [Algorithm; 3] = [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];

/// Claims as they arrive on the wire, before the audience check
#[derive(Debug, Deserialize)]
struct RawClaims {
    sub: String,
    #[serde(default)]
    org_id: Option<i64>,
    #[serde(rename = "type", default)]
    audience: Option<String>,
    iss: String,
    exp: i64,
}

/// Extract the token from an `Authorization: Bearer <token>` header
pub fn extract_bearer(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingOrMalformedHeader)?
        .to_str()
        .map_err(|_| AuthError::MissingOrMalformedHeader)?;

    match value.strip_prefix(BEARER_PREFIX) {
        Some(token) if !token.trim().is_empty() => Ok(token.trim()),
        _ => Err(AuthError::MissingOrMalformedHeader),
    }
}

/// Request guard bound to a single required audience
///
/// # Example
///
/// ```
/// use apigate::auth::{AudienceType, AuthError, AuthorizationGuard, SigningSecrets};
/// use hyper::HeaderMap;
///
/// let secrets = SigningSecrets::new("external-secret", "internal-secret");
/// let guard = AuthorizationGuard::new(&secrets, AudienceType::Internal);
///
/// let result = guard.authorize(&HeaderMap::new());
/// assert!(matches!(result, Err(AuthError::MissingOrMalformedHeader)));
/// ```
#[derive(Clone)]
pub struct AuthorizationGuard {
    required: AudienceType,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl AuthorizationGuard {
    pub fn new(secrets: &SigningSecrets, required: AudienceType) -> Self {
        let decoding_key = DecodingKey::from_secret(secrets.for_audience(required));

        let mut validation = Validation::new(Algorithm::HS256);
        validation.algorithms = HMAC_ALGORITHMS.to_vec();
        validation.validate_exp = true;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.set_issuer(&[ISSUER]);
        validation.set_required_spec_claims(&["exp", "sub", "iss"]);

        Self {
            required,
            decoding_key,
            validation,
        }
    }

    /// Audience this guard admits
    pub fn required_audience(&self) -> AudienceType {
        self.required
    }

    /// Authorize a request from its headers
    pub fn authorize(&self, headers: &HeaderMap) -> Result<Claims, AuthError> {
        let token = extract_bearer(headers)?;
        self.verify_token(token)
    }

    /// Verify a raw token and check its audience
    pub fn verify_token(&self, token: &str) -> Result<Claims, AuthError> {
        let header = decode_header(token)
            .map_err(|_| AuthError::InvalidSignatureOrExpired(TokenRejection::Malformed))?;

        if !HMAC_ALGORITHMS.contains(&header.alg) {
            debug!(alg = ?header.alg, "Rejecting token with non-HMAC algorithm");
            return Err(AuthError::InvalidSignatureOrExpired(
                TokenRejection::UnexpectedAlgorithm,
            ));
        }

        let raw = decode::<RawClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| AuthError::InvalidSignatureOrExpired(rejection_for(e.kind())))?
            .claims;

        let audience = raw
            .audience
            .as_deref()
            .ok_or(AuthError::MissingAudienceClaim)?
            .parse::<AudienceType>()?;

        if audience != self.required {
            return Err(AuthError::AudienceMismatch);
        }

        Ok(Claims {
            sub: raw.sub,
            org_id: raw.org_id,
            audience,
            iss: raw.iss,
            exp: raw.exp,
        })
    }
}

fn rejection_for(kind: &ErrorKind) -> TokenRejection {
    match kind {
        ErrorKind::ExpiredSignature => TokenRejection::Expired,
        ErrorKind::InvalidSignature => TokenRejection::BadSignature,
        ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
            TokenRejection::UnexpectedAlgorithm
        }
        _ => TokenRejection::Malformed,
    }
}

impl std::fmt::Debug for AuthorizationGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizationGuard")
            .field("required", &self.required)
            .finish_non_exhaustive()
    }
}
