//! Token request dispatching
//!
//! Decodes a token request, runs lookup -> verify -> issue for the matching
//! principal kind and reduces the result to a [`TokenOutcome`]. Every attempt
//! is single-shot: there are no retries and no partial state.

use super::secret::verify_principal;
use super::token::{AccessToken, TokenIssuer};
use crate::metrics;
use crate::model::{InternalUser, Principal, ServiceAccount};
use crate::store::{CredentialStore, StoreError};
use hyper::StatusCode;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// Grant type accepted on the external token endpoint
pub const CLIENT_CREDENTIALS: &str = "client_credentials";

const FLOW_CLIENT_CREDENTIALS: &str = "client_credentials";
const FLOW_INTERNAL_PASSWORD: &str = "internal_password";

/// Body of `POST /oauth/token`
#[derive(Debug, Deserialize)]
pub struct ServiceAccountTokenRequest {
    #[serde(default)]
    pub grant_type: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
}

/// Body of `POST /admin/oauth/token`
#[derive(Debug, Deserialize)]
pub struct InternalTokenRequest {
    pub email: String,
    pub password: String,
}

/// Terminal state of a token request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenOutcome {
    Issued(AccessToken),
    BadRequest(&'static str),
    Unauthorized,
    InternalError,
}

impl TokenOutcome {
    pub fn status(&self) -> StatusCode {
        match self {
            TokenOutcome::Issued(_) => StatusCode::OK,
            TokenOutcome::BadRequest(_) => StatusCode::BAD_REQUEST,
            TokenOutcome::Unauthorized => StatusCode::UNAUTHORIZED,
            TokenOutcome::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            TokenOutcome::Issued(_) => "issued",
            TokenOutcome::BadRequest(_) => "bad_request",
            TokenOutcome::Unauthorized => "unauthorized",
            TokenOutcome::InternalError => "internal_error",
        }
    }
}

/// Errors inside a credential flow that are not the caller's fault
#[derive(Debug, thiserror::Error)]
enum FlowError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Token(#[from] super::token::TokenError),
}

/// Both token endpoints over one store and issuer
#[derive(Clone)]
pub struct TokenEndpoint {
    store: Arc<dyn CredentialStore>,
    issuer: TokenIssuer,
}

impl TokenEndpoint {
    pub fn new(store: Arc<dyn CredentialStore>, issuer: TokenIssuer) -> Self {
        Self { store, issuer }
    }

    /// Handle a service-account token request body
    pub async fn service_account_token(&self, body: &[u8]) -> TokenOutcome {
        let started = Instant::now();

        let outcome = match serde_json::from_slice::<ServiceAccountTokenRequest>(body) {
            Err(e) => {
                warn!(error = %e, "Undecodable service account token request");
                TokenOutcome::BadRequest("unable to read json request body")
            }
            Ok(request) if request.grant_type != CLIENT_CREDENTIALS => {
                warn!(grant_type = %request.grant_type, "Unsupported grant type");
                TokenOutcome::BadRequest("invalid grant type")
            }
            Ok(request) => finish(
                FLOW_CLIENT_CREDENTIALS,
                self.client_credentials(request).await,
            ),
        };

        metrics::record_token_request(FLOW_CLIENT_CREDENTIALS, outcome.label(), started.elapsed());
        outcome
    }

    /// Handle an internal-user token request body
    pub async fn internal_user_token(&self, body: &[u8]) -> TokenOutcome {
        let started = Instant::now();

        let outcome = match serde_json::from_slice::<InternalTokenRequest>(body) {
            Err(e) => {
                warn!(error = %e, "Undecodable internal token request");
                TokenOutcome::BadRequest("unable to read json request body")
            }
            Ok(request) => finish(
                FLOW_INTERNAL_PASSWORD,
                self.internal_password(request).await,
            ),
        };

        metrics::record_token_request(FLOW_INTERNAL_PASSWORD, outcome.label(), started.elapsed());
        outcome
    }

    async fn client_credentials(
        &self,
        request: ServiceAccountTokenRequest,
    ) -> Result<Option<AccessToken>, FlowError> {
        let Some(account) = self
            .authenticate_service_account(&request.client_id, request.client_secret)
            .await?
        else {
            return Ok(None);
        };

        let token = self.issuer.issue_for_service_account(&account)?;
        info!(
            subject = account.id,
            org_id = account.org_id,
            "Issued external token"
        );
        Ok(Some(token))
    }

    async fn internal_password(
        &self,
        request: InternalTokenRequest,
    ) -> Result<Option<AccessToken>, FlowError> {
        let Some(user) = self
            .authenticate_internal_user(&request.email, request.password)
            .await?
        else {
            return Ok(None);
        };

        let token = self.issuer.issue_for_internal_user(&user)?;
        info!(subject = user.id, "Issued internal token");
        Ok(Some(token))
    }

    /// Look up a service account by client id and verify its secret
    ///
    /// `Ok(None)` covers both an unknown client id and a wrong secret.
    pub async fn authenticate_service_account(
        &self,
        client_id: &str,
        client_secret: String,
    ) -> Result<Option<ServiceAccount>, StoreError> {
        let found = self.store.find_service_account_by_client_id(client_id).await?;
        verify_off_thread(found, client_secret).await
    }

    /// Look up an internal user by email and verify the password
    ///
    /// `Ok(None)` covers both an unknown email and a wrong password.
    pub async fn authenticate_internal_user(
        &self,
        email: &str,
        password: String,
    ) -> Result<Option<InternalUser>, StoreError> {
        let found = self.store.find_internal_user_by_email(email).await?;
        verify_off_thread(found, password).await
    }
}

/// Run bcrypt on the blocking pool; it is too slow for a request worker.
async fn verify_off_thread<P>(found: Option<P>, supplied: String) -> Result<Option<P>, StoreError>
where
    P: Principal + Send + 'static,
{
    tokio::task::spawn_blocking(move || verify_principal(found, &supplied))
        .await
        .map_err(|e| StoreError::Backend(format!("credential verification aborted: {}", e)))
}

fn finish(flow: &'static str, result: Result<Option<AccessToken>, FlowError>) -> TokenOutcome {
    match result {
        Ok(Some(token)) => TokenOutcome::Issued(token),
        Ok(None) => {
            info!(flow, "Credential verification failed");
            TokenOutcome::Unauthorized
        }
        Err(e) => {
            error!(flow, error = %e, "Token request failed");
            metrics::record_error(flow);
            TokenOutcome::InternalError
        }
    }
}

impl std::fmt::Debug for TokenEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenEndpoint")
            .field("issuer", &self.issuer)
            .finish_non_exhaustive()
    }
}
