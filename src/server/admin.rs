//! Read-only admin operations
//!
//! Only reachable after the admin guard has accepted an internal token.

use super::handlers::{error_response, internal_error, json_response};
use super::AppState;
use crate::auth::Claims;
use crate::router::AdminRoute;
use crate::store::StoreError;
use hyper::{Response, StatusCode};
use serde::Serialize;
use tracing::{debug, error};

pub(super) async fn handle(route: AdminRoute, claims: &Claims, state: &AppState) -> Response<String> {
    debug!(subject = %claims.sub, route = ?route, "Admin request");

    match route {
        AdminRoute::WhoAmI => json_response(StatusCode::OK, claims),
        AdminRoute::ListServiceAccounts => respond(state.store.list_service_accounts().await),
        AdminRoute::GetServiceAccount { id } => {
            respond_found(state.store.find_service_account_by_id(id).await)
        }
        AdminRoute::ListInternalUsers => respond(state.store.list_internal_users().await),
        AdminRoute::GetInternalUser { id } => {
            respond_found(state.store.find_internal_user_by_id(id).await)
        }
    }
}

fn respond<T: Serialize>(result: Result<T, StoreError>) -> Response<String> {
    match result {
        Ok(body) => json_response(StatusCode::OK, &body),
        Err(e) => {
            error!(error = %e, "Store lookup failed");
            internal_error()
        }
    }
}

fn respond_found<T: Serialize>(result: Result<Option<T>, StoreError>) -> Response<String> {
    match result {
        Ok(Some(body)) => json_response(StatusCode::OK, &body),
        Ok(None) => error_response(StatusCode::NOT_FOUND, "not found"),
        Err(e) => {
            error!(error = %e, "Store lookup failed");
            internal_error()
        }
    }
}
