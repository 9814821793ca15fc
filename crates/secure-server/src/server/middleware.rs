//! The encryption middleware wrapped around every `/api` route.
//!
//! Per request:
//!
//! ```text
//! Start ─► CredentialExtracted ─► Decrypted ─► HandlerInvoked ─► Encrypted ─► Done
//!   │              │                   │                             │
//!   └─ no creds ───┼── bypass ─────────┼────────── plain ───────────►│
//!                  └───────────────────┴──────── Aborted ◄───────────┘
//! ```
//!
//! Missing or unusable credentials skip both directions: the handler sees
//! the raw request and the response goes out as-is. Decryption failures
//! abort with a generic 400; encryption failures abort with a generic 500.

use std::{collections::HashMap, time::Duration};

use axum::{
    body::{to_bytes, Body},
    extract::{Query, Request, State},
    http::{
        header::{AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE},
        HeaderMap, HeaderName, HeaderValue, Uri,
    },
    middleware::Next,
    response::Response,
};
use bytes::Bytes;
use common::{
    protocol::{ENCRYPTED_CONTENT_TYPE, HEADER_ENCRYPTED, HEADER_SESSION_ID, QUERY_ENCRYPTED},
    Payload, ServiceError,
};
use tracing::{debug, info_span, warn, Instrument};
use uuid::Uuid;

use super::{handlers::error_response, state::AppState};
use crate::keys::SessionCredential;

/// Default per-request timeout applied to all routes.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default bound on request and response bodies buffered for encryption.
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// Decrypted `encrypted=` query payload, available to handlers as an extension.
#[derive(Debug, Clone)]
pub struct DecryptedQuery(pub Payload);

/// Decrypted request body, available to handlers as an extension.
///
/// The request body itself is also replaced with this payload as JSON.
#[derive(Debug, Clone)]
pub struct DecryptedBody(pub Payload);

/// Axum middleware: decrypt the request, run the handler, encrypt the response.
pub async fn encryption(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let Some(credential) = extract_credential(req.headers()) else {
        return next.run(req).await;
    };

    let span = info_span!(
        "encryption",
        request_id = %Uuid::new_v4(),
        method = %req.method(),
        path = %req.uri().path(),
    );

    async move {
        let req = match decrypt_request(&state, &credential, req).await {
            Ok(req) => req,
            Err(err) => return error_response(&err),
        };

        let response = next.run(req).await;

        match encrypt_response(&state, &credential, response).await {
            Ok(response) => response,
            Err(err) => error_response(&err),
        }
    }
    .instrument(span)
    .await
}

/// `None` means bypass: either header is absent or the pair is unusable.
fn extract_credential(headers: &HeaderMap) -> Option<SessionCredential> {
    let authorization = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let session_id = headers.get(HEADER_SESSION_ID)?.to_str().ok()?;

    match SessionCredential::from_authorization(authorization, session_id) {
        Ok(credential) => Some(credential),
        Err(e) => {
            debug!(reason = %e, "credentials unusable; encryption bypassed");
            None
        }
    }
}

async fn decrypt_request(
    state: &AppState,
    credential: &SessionCredential,
    mut req: Request,
) -> Result<Request, ServiceError> {
    if let Some(encoded) = encrypted_query(req.uri()) {
        let payload = state.gateway.open_query(credential, &encoded).await?;
        req.extensions_mut().insert(DecryptedQuery(payload));
        return Ok(req);
    }

    if !flag_is_set(req.headers(), HEADER_ENCRYPTED) {
        return Ok(req);
    }

    let (mut parts, body) = req.into_parts();
    let bytes = to_bytes(body, state.max_body_bytes).await.map_err(|e| {
        warn!(target: "security", reason = %e, "request body unreadable");
        ServiceError::DecryptionFailed
    })?;
    let envelope = envelope_text(&bytes).ok_or_else(|| {
        warn!(target: "security", reason = "body is not UTF-8", "request decryption failed");
        ServiceError::DecryptionFailed
    })?;

    let payload = state.gateway.open_body(credential, envelope).await?;
    let json = serde_json::to_vec(&payload).map_err(|e| {
        warn!(reason = %e, "decrypted body could not be re-encoded");
        ServiceError::DecryptionFailed
    })?;

    parts
        .headers
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    parts.headers.insert(CONTENT_LENGTH, HeaderValue::from(json.len()));
    parts.extensions.insert(DecryptedBody(payload));
    Ok(Request::from_parts(parts, Body::from(json)))
}

async fn encrypt_response(
    state: &AppState,
    credential: &SessionCredential,
    response: Response,
) -> Result<Response, ServiceError> {
    if !is_json(response.headers()) {
        return Ok(response);
    }

    let (mut parts, body) = response.into_parts();
    let bytes: Bytes = to_bytes(body, state.max_body_bytes).await.map_err(|e| {
        warn!(reason = %e, "response body unreadable");
        ServiceError::EncryptionFailed
    })?;
    if bytes.is_empty() {
        return Ok(Response::from_parts(parts, Body::from(bytes)));
    }

    let payload: Payload = match serde_json::from_slice(&bytes) {
        Ok(payload) => payload,
        Err(_) => {
            debug!("response is not a JSON object; sent unencrypted");
            return Ok(Response::from_parts(parts, Body::from(bytes)));
        }
    };

    let envelope = state.gateway.seal(credential, &payload).await?;
    // A JSON string literal, so JSON-parsing clients read it as a string.
    let body = format!("\"{envelope}\"");

    parts
        .headers
        .insert(CONTENT_TYPE, HeaderValue::from_static(ENCRYPTED_CONTENT_TYPE));
    parts.headers.insert(
        HeaderName::from_static(HEADER_ENCRYPTED),
        HeaderValue::from_static("true"),
    );
    parts.headers.remove(CONTENT_LENGTH);
    Ok(Response::from_parts(parts, Body::from(body)))
}

fn encrypted_query(uri: &Uri) -> Option<String> {
    let Query(params) = Query::<HashMap<String, String>>::try_from_uri(uri).ok()?;
    params
        .get(QUERY_ENCRYPTED)
        .filter(|value| !value.is_empty())
        .cloned()
}

fn flag_is_set(headers: &HeaderMap, name: &str) -> bool {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim() == "true")
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("application/json"))
}

/// Body text with surrounding whitespace and one pair of JSON quotes removed.
fn envelope_text(body: &[u8]) -> Option<&str> {
    let text = std::str::from_utf8(body).ok()?.trim();
    Some(
        text.strip_prefix('"')
            .and_then(|t| t.strip_suffix('"'))
            .unwrap_or(text),
    )
}
