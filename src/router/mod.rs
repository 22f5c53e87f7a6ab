//! API Router
//!
//! Maps a method and path to an API operation. Everything under `/admin/`
//! except the admin token endpoint is a protected operation; the guard runs
//! before the admin route itself is resolved.

use thiserror::Error;

/// Prefix of every protected route
pub const ADMIN_PREFIX: &str = "/admin";

/// Router errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RouterError {
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Method not allowed: {0}")]
    MethodNotAllowed(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

/// Public (unauthenticated) operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiRoute {
    /// GET /health
    Health,
    /// POST /oauth/token
    ServiceAccountToken,
    /// POST /admin/oauth/token
    InternalToken,
    /// Anything else under /admin, resolved after authorization
    Admin,
}

/// Operations behind the admin guard
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminRoute {
    /// GET /admin/whoami
    WhoAmI,
    /// GET /admin/service-accounts
    ListServiceAccounts,
    /// GET /admin/service-accounts/{id}
    GetServiceAccount { id: i64 },
    /// GET /admin/users
    ListInternalUsers,
    /// GET /admin/users/{id}
    GetInternalUser { id: i64 },
}

impl ApiRoute {
    /// Short label for logs and metrics
    pub fn label(&self) -> &'static str {
        match self {
            ApiRoute::Health => "health",
            ApiRoute::ServiceAccountToken => "oauth_token",
            ApiRoute::InternalToken => "admin_oauth_token",
            ApiRoute::Admin => "admin",
        }
    }
}

/// Request parser
pub struct RequestParser;

impl RequestParser {
    /// Resolve the outer route of a request
    pub fn parse(method: &str, path: &str) -> Result<ApiRoute, RouterError> {
        let path = normalize(path);

        match path {
            "/health" => expect_method(method, "GET", ApiRoute::Health),
            "/oauth/token" => expect_method(method, "POST", ApiRoute::ServiceAccountToken),
            "/admin/oauth/token" => expect_method(method, "POST", ApiRoute::InternalToken),
            _ if is_admin_path(path) => Ok(ApiRoute::Admin),
            _ => Err(RouterError::NotFound(path.to_string())),
        }
    }

    /// Resolve a protected route; only call after the guard has passed
    pub fn parse_admin(method: &str, path: &str) -> Result<AdminRoute, RouterError> {
        let path = normalize(path);
        let rest = path
            .strip_prefix(ADMIN_PREFIX)
            .ok_or_else(|| RouterError::NotFound(path.to_string()))?;

        let segments: Vec<&str> = rest.trim_start_matches('/').split('/').collect();

        let route = match segments.as_slice() {
            ["whoami"] => AdminRoute::WhoAmI,
            ["service-accounts"] => AdminRoute::ListServiceAccounts,
            ["service-accounts", id] => AdminRoute::GetServiceAccount { id: parse_id(id)? },
            ["users"] => AdminRoute::ListInternalUsers,
            ["users", id] => AdminRoute::GetInternalUser { id: parse_id(id)? },
            _ => return Err(RouterError::NotFound(path.to_string())),
        };

        expect_method(method, "GET", route)
    }
}

fn normalize(path: &str) -> &str {
    match path.trim_end_matches('/') {
        "" => "/",
        trimmed => trimmed,
    }
}

fn is_admin_path(path: &str) -> bool {
    path == ADMIN_PREFIX
        || path
            .strip_prefix(ADMIN_PREFIX)
            .is_some_and(|rest| rest.starts_with('/'))
}

fn expect_method<T>(method: &str, allowed: &str, route: T) -> Result<T, RouterError> {
    if method == allowed {
        Ok(route)
    } else {
        Err(RouterError::MethodNotAllowed(format!(
            "{} (allowed: {})",
            method, allowed
        )))
    }
}

fn parse_id(raw: &str) -> Result<i64, RouterError> {
    raw.parse()
        .map_err(|_| RouterError::InvalidPath(format!("invalid id '{}'", raw)))
}
