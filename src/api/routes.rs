//! API Routes
//!
//! Configures the Axum router with all cache server endpoints.

use axum::{
    routing::{delete, get, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    add_handler, delete_handler, get_handler, health_handler, put_handler, set_handler,
    stats_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `PUT /put` - Store a key-value pair (insert or overwrite)
/// - `PUT /add` - Store a key-value pair only if the key is absent
/// - `PUT /set` - Replace the value of an existing key
/// - `GET /get/:key` - Retrieve a value by key
/// - `DELETE /del/:key` - Delete a key
/// - `GET /stats` - Cache and executor statistics
/// - `GET /health` - Health check endpoint
///
/// # Middleware
/// - CORS: Allows any origin (configurable for production)
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    // Configure CORS middleware
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/put", put(put_handler))
        .route("/add", put(add_handler))
        .route("/set", put(set_handler))
        .route("/get/:key", get(get_handler))
        .route("/del/:key", delete(delete_handler))
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ShardedStore;
    use crate::executor::{Executor, ExecutorConfig};
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use std::time::Duration;
    use tower::util::ServiceExt;

    fn create_test_state() -> AppState {
        let store = ShardedStore::build(2 * 1024 * 1024, 2).unwrap();
        let executor = Executor::new(ExecutorConfig::new(1, 2, 8, Duration::from_secs(1)));
        AppState::new(store, executor)
    }

    async fn status_of(app: &Router, method: &str, uri: &str, body: Option<&str>) -> StatusCode {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => request
                .header("content-type", "application/json")
                .body(Body::from(json.to_owned())),
            None => request.body(Body::empty()),
        };

        app.clone()
            .oneshot(request.unwrap())
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn test_add_existing_key_conflicts() {
        let app = create_router(create_test_state());
        let body = r#"{"key":"k","value":"v"}"#;

        assert_eq!(status_of(&app, "PUT", "/add", Some(body)).await, StatusCode::OK);
        assert_eq!(
            status_of(&app, "PUT", "/add", Some(body)).await,
            StatusCode::CONFLICT
        );
    }

    #[tokio::test]
    async fn test_set_missing_key_not_found() {
        let app = create_router(create_test_state());
        let body = r#"{"key":"k","value":"v"}"#;

        assert_eq!(
            status_of(&app, "PUT", "/set", Some(body)).await,
            StatusCode::NOT_FOUND
        );
        assert_eq!(status_of(&app, "PUT", "/put", Some(body)).await, StatusCode::OK);
        assert_eq!(status_of(&app, "PUT", "/set", Some(body)).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_del_then_get_not_found() {
        let app = create_router(create_test_state());
        let body = r#"{"key":"k","value":"v"}"#;

        assert_eq!(status_of(&app, "PUT", "/put", Some(body)).await, StatusCode::OK);
        assert_eq!(status_of(&app, "DELETE", "/del/k", None).await, StatusCode::OK);
        assert_eq!(
            status_of(&app, "GET", "/get/k", None).await,
            StatusCode::NOT_FOUND
        );
    }

    #[tokio::test]
    async fn test_store_routes_unavailable_after_executor_stops() {
        let state = create_test_state();
        state.executor.stop(true);
        let app = create_router(state);
        let body = r#"{"key":"k","value":"v"}"#;

        for (method, uri, body) in [
            ("PUT", "/put", Some(body)),
            ("PUT", "/add", Some(body)),
            ("PUT", "/set", Some(body)),
            ("GET", "/get/k", None),
            ("DELETE", "/del/k", None),
        ] {
            assert_eq!(
                status_of(&app, method, uri, body).await,
                StatusCode::SERVICE_UNAVAILABLE,
                "{method} {uri}"
            );
        }

        // Served without the executor
        assert_eq!(status_of(&app, "GET", "/stats", None).await, StatusCode::OK);
        assert_eq!(status_of(&app, "GET", "/health", None).await, StatusCode::OK);
    }
}
