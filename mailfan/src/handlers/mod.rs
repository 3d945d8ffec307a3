//! HTTP handlers and router assembly
//!
//! The browser-facing API surface:
//!
//! | Route                 | Method | Purpose                                   |
//! |-----------------------|--------|-------------------------------------------|
//! | `/api/auth/login`     | GET    | Redirect to the identity provider         |
//! | `/api/auth/callback`  | GET    | Complete sign-in, set the session cookie  |
//! | `/api/auth/check`     | GET    | Report whether a live session exists      |
//! | `/api/auth/logout`    | GET    | Drop the session, redirect to sign-out    |
//! | `/api/send-emails`    | POST   | Dispatch a personalized batch             |
//!
//! Sign-in failures redirect the browser to `{base}/error?message=...`;
//! API failures return the JSON envelope described in [`crate::error`].

use axum::{
    extract::{DefaultBodyLimit, Query, State},
    http::{header::SET_COOKIE, HeaderMap, HeaderValue},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::dispatch::{DispatchRequest, Recipient};
use crate::error::MailfanError;
use crate::identity;
use crate::mail::Attachment;
use crate::session::cookie;
use crate::state::AppState;

/// Request body cap. Base64 inflates the attachment budget by a third, and
/// the cap leaves enough headroom that an over-budget attachment set still
/// reaches admission control and fails with a specific reason instead of a
/// generic 413.
const MAX_REQUEST_BYTES: usize = 64 * 1024 * 1024;

/// Build the application router
#[must_use]
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/auth/login", get(login))
        .route("/api/auth/callback", get(callback))
        .route("/api/auth/check", get(check))
        .route("/api/auth/logout", get(logout))
        .route("/api/send-emails", post(send_batch))
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// OAuth2 callback query parameters
#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    /// Authorization code from the provider
    pub code: Option<String>,
    /// CSRF state token round-tripped through the provider
    pub state: Option<String>,
    /// Error code reported by the provider
    pub error: Option<String>,
    /// Human-readable error description
    pub error_description: Option<String>,
}

/// Batch dispatch request body
///
/// `recipients` is a list of flat objects; every key is usable as a merge
/// field and the `email` key addresses the message. `cc` and `bcc` are
/// comma-separated address lists. When `testAddress` is set, only one
/// message is sent: the first recipient's merge data, delivered to that
/// address.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMailRequest {
    /// Subject line, may contain merge fields
    #[serde(default)]
    pub subject: String,
    /// HTML body, may contain merge fields
    #[serde(default)]
    pub email_body: String,
    /// Recipients to fan out to
    #[serde(default)]
    pub recipients: Vec<Recipient>,
    /// Comma-separated carbon-copy addresses
    #[serde(default)]
    pub cc: Option<String>,
    /// Comma-separated blind-carbon-copy addresses
    #[serde(default)]
    pub bcc: Option<String>,
    /// Attachments shared by every message
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    /// Reroute the batch as a single test delivery to this address
    #[serde(default)]
    pub test_address: Option<String>,
}

impl SendMailRequest {
    fn into_dispatch_request(self) -> DispatchRequest {
        let Self {
            subject,
            email_body,
            recipients,
            cc,
            bcc,
            attachments,
            test_address,
        } = self;

        let request = DispatchRequest {
            subject,
            body: email_body,
            recipients,
            cc: split_addresses(cc.as_deref()),
            bcc: split_addresses(bcc.as_deref()),
            attachments,
        };

        match test_address.as_deref() {
            Some(address) if !address.is_empty() => request.into_test_send(address),
            _ => request,
        }
    }
}

/// GET /api/auth/login
///
/// Sends the browser to the identity provider's authorization page and
/// plants a short-lived state cookie for CSRF validation on the way back.
async fn login(State(state): State<AppState>) -> Response {
    let token = identity::state_token();
    let url = state.identity().authorization_url(&token);

    tracing::debug!("redirecting to identity provider");
    let mut response = Redirect::to(&url).into_response();
    append_cookie(
        &mut response,
        &cookie::state_cookie(&state.config().session, &token),
    );
    response
}

/// GET /api/auth/callback
///
/// Completes sign-in: validates the round-tripped state token, exchanges
/// the authorization code for credentials, stores them server-side, and
/// hands the browser an opaque session cookie. Every failure redirects to
/// the error page rather than surfacing a raw status code.
async fn callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<CallbackParams>,
) -> Response {
    let config = state.config();
    let session = &config.session;

    if let Some(error) = params.error {
        tracing::warn!(
            error = %error,
            description = params.error_description.as_deref().unwrap_or_default(),
            "identity provider reported an authorization error"
        );
        return error_redirect(config, "Authentication_failed");
    }

    let Some(code) = params.code else {
        return error_redirect(config, "No_authorization_code");
    };

    let expected = cookie::cookie_value(&headers, &session.state_cookie_name);
    if expected.is_none() || params.state != expected {
        tracing::warn!("state token mismatch on callback");
        return error_redirect(config, "State_validation_failed");
    }

    match state.identity().exchange_code(&code).await {
        Ok(bundle) => {
            let handle = state.credentials().put(bundle, session.ttl());
            tracing::info!("sign-in completed");

            let mut response = Redirect::to(&config.service.public_base_url).into_response();
            append_cookie(&mut response, &cookie::session_cookie(session, &handle));
            append_cookie(&mut response, &cookie::clear_state_cookie(session));
            response
        }
        Err(e) => {
            tracing::error!(error = %e, "authorization code exchange failed");
            error_redirect(config, "Authentication_failed")
        }
    }
}

/// GET /api/auth/check
///
/// Reports whether the request carries a session that is still readable
/// server-side. A cookie pointing at an expired or deleted record counts
/// as signed out.
async fn check(State(state): State<AppState>, headers: HeaderMap) -> Json<serde_json::Value> {
    let authenticated = cookie::extract_handle(&headers, &state.config().session)
        .is_some_and(|handle| state.credentials().get(&handle).is_some());

    Json(json!({ "isAuthenticated": authenticated }))
}

/// GET /api/auth/logout
///
/// Deletes the server-side credential record, clears the session cookie,
/// and sends the browser to the provider's sign-out page. Runs to
/// completion even without a session, so logout is always safe to hit.
async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let session = &state.config().session;

    if let Some(handle) = cookie::extract_handle(&headers, session) {
        if state.credentials().delete(&handle) {
            tracing::info!("session deleted on logout");
        } else {
            tracing::warn!("logout for an unknown or already purged session");
        }
    } else {
        tracing::debug!("logout without a session cookie");
    }

    let mut response = Redirect::to(&state.identity().logout_url()).into_response();
    append_cookie(&mut response, &cookie::clear_session_cookie(session));
    response
}

/// POST /api/send-emails
///
/// Guards on a live session, refreshes an access token from the stored
/// credentials, and runs the batch. Validation failures are 400s, missing
/// or dead sessions are 401s, and per-recipient delivery failures are
/// reported in the 200 response body rather than failing the request.
async fn send_batch(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<SendMailRequest>,
) -> Result<Json<serde_json::Value>, MailfanError> {
    let session = &state.config().session;

    let handle =
        cookie::extract_handle(&headers, session).ok_or(MailfanError::AbsentSession)?;
    let bundle = state
        .credentials()
        .get(&handle)
        .ok_or(MailfanError::AbsentSession)?;
    let token = state.identity().acquire_token(&bundle).await?;

    let report = state
        .dispatcher()
        .dispatch(&token, &request.into_dispatch_request())
        .await?;
    let summary = report.summary();

    Ok(Json(json!({
        "success": true,
        "results": report,
        "summary": summary,
    })))
}

fn error_redirect(config: &crate::config::MailfanConfig, message: &str) -> Response {
    let base = config.service.public_base_url.trim_end_matches('/');
    Redirect::to(&format!("{base}/error?message={message}")).into_response()
}

fn append_cookie(response: &mut Response, cookie: &str) {
    if let Ok(value) = HeaderValue::from_str(cookie) {
        response.headers_mut().append(SET_COOKIE, value);
    }
}

fn split_addresses(raw: Option<&str>) -> Vec<String> {
    raw.map_or_else(Vec::new, |list| {
        list.split(',')
            .map(str::trim)
            .filter(|address| !address.is_empty())
            .map(str::to_string)
            .collect()
    })
}
