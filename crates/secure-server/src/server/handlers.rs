//! Axum request handlers.
//!
//! The `/api/data` handlers are demo collaborators. They only see plaintext:
//! the encryption middleware has already attached a [`DecryptedBody`] (or a
//! [`DecryptedQuery`]) and will encrypt whatever JSON they return. Without
//! credentials they fall back to the raw JSON body.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use common::{
    protocol::{ErrorResponse, HealthResponse},
    Payload, ServiceError,
};
use serde_json::{json, Value};
use tracing::{debug, info};

use super::{
    middleware::{DecryptedBody, DecryptedQuery},
    state::AppState,
};

/// Render a [`ServiceError`] as its status code and generic JSON body.
pub fn error_response(err: &ServiceError) -> Response {
    let status =
        StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(ErrorResponse::from(err))).into_response()
}

/// `POST /api/data` — acknowledge a submitted record.
pub async fn create(
    decrypted: Option<Extension<DecryptedBody>>,
    body: Result<Json<Payload>, JsonRejection>,
) -> Response {
    let body = match request_payload(decrypted, body) {
        Ok(body) => body,
        Err(resp) => return resp,
    };
    info!(fields = body.len(), "record received");

    let name = body
        .get("user")
        .and_then(|user| user.get("name"))
        .and_then(Value::as_str)
        .unwrap_or("unknown");

    Json(json!({
        "message": "data received and processed",
        "received_data_summary": format!("user name: {name}"),
        "action": field(&body, "action"),
    }))
    .into_response()
}

/// `GET /api/data` — search using the decrypted query parameters.
pub async fn search(query: Option<Extension<DecryptedQuery>>) -> Response {
    let Some(Extension(DecryptedQuery(params))) = query else {
        return error_response(&ServiceError::BadRequest(
            "encrypted query parameter expected".into(),
        ));
    };
    info!(params = params.len(), "query processed");

    Json(json!({
        "message": "query processed",
        "results_count": 42,
        "search_term": field(&params, "search"),
        "category": field(&params, "category"),
    }))
    .into_response()
}

/// `PUT /api/data` — replace a resource.
pub async fn replace(
    decrypted: Option<Extension<DecryptedBody>>,
    body: Result<Json<Payload>, JsonRejection>,
) -> Response {
    let body = match request_payload(decrypted, body) {
        Ok(body) => body,
        Err(resp) => return resp,
    };
    info!(fields = body.len(), "resource replaced");

    Json(json!({
        "message": "resource updated",
        "resource_id": field(&body, "id"),
        "updated_by": body
            .get("user")
            .and_then(|user| user.get("email"))
            .cloned()
            .unwrap_or(Value::Null),
    }))
    .into_response()
}

/// `PATCH /api/data` — partially update a resource.
pub async fn update(
    decrypted: Option<Extension<DecryptedBody>>,
    body: Result<Json<Payload>, JsonRejection>,
) -> Response {
    let body = match request_payload(decrypted, body) {
        Ok(body) => body,
        Err(resp) => return resp,
    };
    info!(fields = body.len(), "resource patched");

    Json(json!({
        "message": "resource partially updated",
        "resource_id": field(&body, "id"),
        "updates_applied": field(&body, "updates"),
    }))
    .into_response()
}

/// `DELETE /api/data` — delete a resource named in the body.
pub async fn remove(
    decrypted: Option<Extension<DecryptedBody>>,
    body: Result<Json<Payload>, JsonRejection>,
) -> Response {
    let body = match request_payload(decrypted, body) {
        Ok(body) => body,
        Err(resp) => return resp,
    };
    info!(fields = body.len(), "resource deleted");

    Json(json!({
        "message": "resource deleted",
        "resource_id": field(&body, "id"),
        "reason": field(&body, "reason"),
    }))
    .into_response()
}

/// `OPTIONS /api/data` — list the supported actions.
pub async fn capabilities() -> Response {
    Json(json!({
        "message": "api capabilities",
        "allowed_actions": ["GET", "POST", "PUT", "PATCH", "DELETE"],
    }))
    .into_response()
}

/// `GET /health` — liveness check.
pub async fn health(State(state): State<AppState>) -> Response {
    let body = HealthResponse {
        status: "ok".into(),
        cached_keys: state.gateway.keys().len().await,
    };
    (StatusCode::OK, Json(body)).into_response()
}

/// Catch-all 404 handler.
pub async fn not_found() -> impl IntoResponse {
    let err = ErrorResponse::new("not_found", "the requested resource does not exist");
    (StatusCode::NOT_FOUND, Json(err))
}

fn request_payload(
    decrypted: Option<Extension<DecryptedBody>>,
    body: Result<Json<Payload>, JsonRejection>,
) -> Result<Payload, Response> {
    if let Some(Extension(DecryptedBody(payload))) = decrypted {
        return Ok(payload);
    }
    body.map(|Json(payload)| payload).map_err(|rejection| {
        debug!(error = %rejection, "request body rejected");
        error_response(&ServiceError::BadRequest("invalid JSON body".into()))
    })
}

fn field(payload: &Payload, name: &str) -> Value {
    payload.get(name).cloned().unwrap_or(Value::Null)
}
