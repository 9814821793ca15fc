//! Axum router construction.

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower_http::{compression::CompressionLayer, timeout::TimeoutLayer, trace::TraceLayer};

use super::{handlers, middleware, state::AppState};

/// Build the application [`Router`] with all routes and middleware attached.
///
/// Only routes nested under `/api` pass through the encryption middleware.
pub fn build(state: AppState) -> Router {
    let api = Router::new()
        .route(
            "/data",
            post(handlers::create)
                .get(handlers::search)
                .put(handlers::replace)
                .patch(handlers::update)
                .delete(handlers::remove)
                .options(handlers::capabilities),
        )
        .route_layer(from_fn_with_state(state.clone(), middleware::encryption));

    Router::new()
        .nest("/api", api)
        .route("/health", get(handlers::health))
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(middleware::REQUEST_TIMEOUT))
        .layer(CompressionLayer::new())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    #[tokio::test]
    async fn unknown_route_returns_404() {
        let app = build(AppState::default());
        let req = Request::builder()
            .uri("/unknown")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), 404);
    }

    #[tokio::test]
    async fn health_route_is_not_encrypted() {
        let app = build(AppState::default());
        let req = Request::builder()
            .uri("/health")
            .header("authorization", "Bearer abc")
            .header("x-session-id", "s1")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), 200);
        assert!(resp.headers().get("x-encrypted").is_none());
    }

    #[tokio::test]
    async fn options_route_exists() {
        let app = build(AppState::default());
        let req = Request::builder()
            .method("OPTIONS")
            .uri("/api/data")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), 200);
    }
}
