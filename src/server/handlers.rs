//! Request handling
//!
//! Routes each request, runs the admin guard in front of protected routes and
//! turns outcomes into JSON responses. Error bodies are generic: they never
//! say whether a principal exists or why a token was rejected.

use super::{admin, AppState};
use crate::auth::{Claims, TokenOutcome};
use crate::metrics;
use crate::router::{ApiRoute, RequestParser, RouterError};
use bytes::Bytes;
use http_body_util::{BodyExt, Limited};
use hyper::body::Incoming;
use hyper::header::{HeaderValue, CONTENT_TYPE, WWW_AUTHENTICATE};
use hyper::{Request, Response, StatusCode};
use serde::Serialize;
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Handle one HTTP request
pub async fn handle_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Result<Response<String>, Infallible> {
    let span = info_span!(
        "http.request",
        request.id = %Uuid::new_v4(),
        http.method = %req.method(),
        http.target = %req.uri().path(),
        auth.token_present = req.headers().contains_key(hyper::header::AUTHORIZATION),
    );

    async move {
        let (label, response) = route(req, &state).await;
        info!(status = response.status().as_u16(), route = label, "Request complete");
        metrics::record_response(label, response.status().as_u16());
        Ok(response)
    }
    .instrument(span)
    .await
}

async fn route(req: Request<Incoming>, state: &AppState) -> (&'static str, Response<String>) {
    let parsed = RequestParser::parse(req.method().as_str(), req.uri().path());

    let route = match parsed {
        Ok(route) => route,
        Err(e) => return ("unmatched", router_error_response(&e)),
    };

    let response = match route {
        ApiRoute::Health => json_response(StatusCode::OK, &json!({"status": "ok"})),
        ApiRoute::ServiceAccountToken => match read_body(req, state.max_body_bytes).await {
            Ok(body) => outcome_response(state.tokens.service_account_token(&body).await),
            Err(response) => response,
        },
        ApiRoute::InternalToken => match read_body(req, state.max_body_bytes).await {
            Ok(body) => outcome_response(state.tokens.internal_user_token(&body).await),
            Err(response) => response,
        },
        ApiRoute::Admin => guarded(req, state).await,
    };

    (route.label(), response)
}

/// Run the admin guard, attach claims, then dispatch the admin route
async fn guarded(mut req: Request<Incoming>, state: &AppState) -> Response<String> {
    let audience = state.admin_guard.required_audience();

    match state.admin_guard.authorize(req.headers()) {
        Ok(claims) => {
            metrics::record_guard_decision(audience.as_str(), "allowed");
            req.extensions_mut().insert(claims);
        }
        Err(e) => {
            warn!(reason = e.reason(), "Rejected admin request");
            metrics::record_guard_decision(audience.as_str(), e.reason());
            return unauthorized();
        }
    }

    let route = match RequestParser::parse_admin(req.method().as_str(), req.uri().path()) {
        Ok(route) => route,
        Err(e) => return router_error_response(&e),
    };

    let Some(claims) = req.extensions().get::<Claims>().cloned() else {
        return internal_error();
    };

    admin::handle(route, &claims, state).await
}

/// Collect a request body, bounded by `limit` bytes
async fn read_body(req: Request<Incoming>, limit: usize) -> Result<Bytes, Response<String>> {
    match Limited::new(req.into_body(), limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) => {
            warn!(error = %e, "Failed to read request body");
            Err(error_response(
                StatusCode::BAD_REQUEST,
                "unable to read request body",
            ))
        }
    }
}

/// Map a token request outcome onto a response
pub fn outcome_response(outcome: TokenOutcome) -> Response<String> {
    let status = outcome.status();
    match outcome {
        TokenOutcome::Issued(token) => json_response(status, &token),
        TokenOutcome::BadRequest(message) => error_response(status, message),
        TokenOutcome::Unauthorized => unauthorized(),
        TokenOutcome::InternalError => internal_error(),
    }
}

fn router_error_response(e: &RouterError) -> Response<String> {
    match e {
        RouterError::NotFound(_) => error_response(StatusCode::NOT_FOUND, "not found"),
        RouterError::MethodNotAllowed(_) => {
            error_response(StatusCode::METHOD_NOT_ALLOWED, "method not allowed")
        }
        RouterError::InvalidPath(_) => error_response(StatusCode::BAD_REQUEST, "invalid path"),
    }
}

/// Serialize `body` as a JSON response
pub(crate) fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<String> {
    match serde_json::to_string(body) {
        Ok(json) => with_json(status, json),
        Err(e) => {
            error!(error = %e, "Failed to serialize response body");
            internal_error()
        }
    }
}

pub(crate) fn error_response(status: StatusCode, message: &str) -> Response<String> {
    with_json(status, json!({ "error": message }).to_string())
}

pub(crate) fn internal_error() -> Response<String> {
    error_response(StatusCode::INTERNAL_SERVER_ERROR, "unexpected error")
}

fn unauthorized() -> Response<String> {
    let mut response = error_response(StatusCode::UNAUTHORIZED, "unauthorized");
    response
        .headers_mut()
        .insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
    response
}

fn with_json(status: StatusCode, body: String) -> Response<String> {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("application/json; charset=utf-8"),
    );
    response
}
