//! API Handlers
//!
//! HTTP request handlers for each cache server endpoint.
//!
//! Store commands do not run on the async runtime: each one is submitted to
//! the executor as a task and the handler awaits its result.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use tokio::sync::oneshot;

use crate::cache::ShardedStore;
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::executor::Executor;
use crate::models::{
    validate_key, DeleteResponse, GetResponse, HealthResponse, StatsResponse, WriteRequest,
    WriteResponse,
};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Sharded cache; each shard carries its own lock
    pub store: Arc<ShardedStore>,
    /// Worker pool running store commands
    pub executor: Arc<Executor>,
}

impl AppState {
    /// Creates a new AppState from an already built store and executor.
    pub fn new(store: ShardedStore, executor: Executor) -> Self {
        Self {
            store: Arc::new(store),
            executor: Arc::new(executor),
        }
    }

    /// Creates a new AppState from configuration.
    ///
    /// Fails if the configured capacity leaves shards below the minimum size.
    pub fn from_config(config: &Config) -> Result<Self> {
        let store = ShardedStore::build(config.total_capacity, config.stripe_count)?;
        let executor = Executor::new(config.executor_config());
        Ok(Self::new(store, executor))
    }

    /// Runs a store command on the executor and waits for its result.
    ///
    /// Returns `Overloaded` if the executor refuses the task, and
    /// `Internal` if the task ends without producing a result.
    pub async fn run<T, F>(&self, command: F) -> Result<T>
    where
        F: FnOnce(&ShardedStore) -> T + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let store = Arc::clone(&self.store);

        let accepted = self.executor.submit(move || {
            // The receiver is gone if the client hung up; nothing to do.
            let _ = tx.send(command(&store));
        });
        if !accepted {
            return Err(CacheError::Overloaded(
                "command queue is full or the server is shutting down".to_string(),
            ));
        }

        rx.await.map_err(|_| {
            CacheError::Internal("command ended without producing a result".to_string())
        })
    }
}

/// Handler for PUT /put
///
/// Stores a key-value pair, overwriting any existing value.
pub async fn put_handler(
    State(state): State<AppState>,
    Json(req): Json<WriteRequest>,
) -> Result<Json<WriteResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let WriteRequest { key, value } = req;
    let k = key.clone();
    let stored = state
        .run(move |store| store.put(k.as_bytes(), value.as_bytes()))
        .await?;

    if stored {
        Ok(Json(WriteResponse::new(key, "stored")))
    } else {
        Err(too_large(&state, &key))
    }
}

/// Handler for PUT /add
///
/// Stores a key-value pair only if the key is not present yet.
pub async fn add_handler(
    State(state): State<AppState>,
    Json(req): Json<WriteRequest>,
) -> Result<Json<WriteResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let WriteRequest { key, value } = req;
    let fits = state.store.can_hold(key.as_bytes(), value.as_bytes());
    let k = key.clone();
    let added = state
        .run(move |store| store.put_if_absent(k.as_bytes(), value.as_bytes()))
        .await?;

    match (added, fits) {
        (true, _) => Ok(Json(WriteResponse::new(key, "added"))),
        (false, false) => Err(too_large(&state, &key)),
        (false, true) => Err(CacheError::AlreadyExists(key)),
    }
}

/// Handler for PUT /set
///
/// Replaces the value of an existing key; never creates one.
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<WriteRequest>,
) -> Result<Json<WriteResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let WriteRequest { key, value } = req;
    let fits = state.store.can_hold(key.as_bytes(), value.as_bytes());
    let k = key.clone();
    let updated = state
        .run(move |store| store.set(k.as_bytes(), value.as_bytes()))
        .await?;

    match (updated, fits) {
        (true, _) => Ok(Json(WriteResponse::new(key, "updated"))),
        (false, false) => Err(too_large(&state, &key)),
        (false, true) => Err(CacheError::NotFound(key)),
    }
}

/// Handler for GET /get/:key
///
/// Retrieves a value from the cache by key.
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>> {
    if let Some(error_msg) = validate_key(&key) {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let k = key.clone();
    let value = state.run(move |store| store.get(k.as_bytes())).await?;

    match value {
        Some(bytes) => {
            let value = String::from_utf8_lossy(&bytes).into_owned();
            Ok(Json(GetResponse::new(key, value)))
        }
        None => Err(CacheError::NotFound(key)),
    }
}

/// Handler for DELETE /del/:key
///
/// Deletes a key from the cache.
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<DeleteResponse>> {
    if let Some(error_msg) = validate_key(&key) {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let k = key.clone();
    let existed = state.run(move |store| store.delete(k.as_bytes())).await?;

    if existed {
        Ok(Json(DeleteResponse::new(key)))
    } else {
        Err(CacheError::NotFound(key))
    }
}

/// Handler for GET /stats
///
/// Returns cache totals and the executor's current occupancy. Runs inline
/// so that it still answers while the executor is saturated.
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse::new(
        state.store.stats(),
        state.store.stripe_count(),
        state.executor.stats(),
    ))
}

/// Handler for GET /health
///
/// Returns health status of the server.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

fn too_large(state: &AppState, key: &str) -> CacheError {
    CacheError::EntryTooLarge(format!(
        "entry for '{}' exceeds the shard capacity of {} bytes",
        key,
        state.store.shard_capacity()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::ExecutorConfig;
    use std::time::Duration;

    const MIB: usize = 1024 * 1024;

    fn test_state() -> AppState {
        let store = ShardedStore::build(4 * MIB, 4).unwrap();
        let executor = Executor::new(ExecutorConfig::new(1, 2, 16, Duration::from_secs(1)));
        AppState::new(store, executor)
    }

    fn write(key: &str, value: &str) -> Json<WriteRequest> {
        Json(WriteRequest {
            key: key.to_string(),
            value: value.to_string(),
        })
    }

    #[tokio::test]
    async fn test_put_and_get_handler() {
        let state = test_state();

        let result = put_handler(State(state.clone()), write("test_key", "test_value")).await;
        assert!(result.is_ok());

        let response = get_handler(State(state.clone()), Path("test_key".to_string()))
            .await
            .unwrap();
        assert_eq!(response.value, "test_value");
    }

    #[tokio::test]
    async fn test_get_nonexistent_key() {
        let state = test_state();

        let result = get_handler(State(state), Path("nonexistent".to_string())).await;
        assert!(matches!(result, Err(CacheError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_add_existing_key_conflicts() {
        let state = test_state();
        add_handler(State(state.clone()), write("k", "v1")).await.unwrap();

        let result = add_handler(State(state.clone()), write("k", "v2")).await;
        assert!(matches!(result, Err(CacheError::AlreadyExists(_))));

        let response = get_handler(State(state), Path("k".to_string())).await.unwrap();
        assert_eq!(response.value, "v1");
    }

    #[tokio::test]
    async fn test_set_missing_key_not_found() {
        let state = test_state();

        let result = set_handler(State(state.clone()), write("missing", "v")).await;
        assert!(matches!(result, Err(CacheError::NotFound(_))));
        assert!(state.store.is_empty());
    }

    #[tokio::test]
    async fn test_set_existing_key() {
        let state = test_state();
        put_handler(State(state.clone()), write("k", "old")).await.unwrap();

        let response = set_handler(State(state.clone()), write("k", "new")).await.unwrap();
        assert_eq!(response.key, "k");
        assert_eq!(state.store.get(b"k"), Some(b"new".to_vec()));
    }

    #[tokio::test]
    async fn test_put_too_large() {
        let state = test_state();
        let big = "x".repeat(MIB);

        let result = put_handler(State(state), write("big", &big)).await;
        assert!(matches!(result, Err(CacheError::EntryTooLarge(_))));
    }

    #[tokio::test]
    async fn test_delete_handler() {
        let state = test_state();
        put_handler(State(state.clone()), write("to_delete", "value")).await.unwrap();

        let result = delete_handler(State(state.clone()), Path("to_delete".to_string())).await;
        assert!(result.is_ok());

        let result = delete_handler(State(state), Path("to_delete".to_string())).await;
        assert!(matches!(result, Err(CacheError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_stopped_executor_overloads() {
        let state = test_state();
        state.executor.stop(true);

        let result = put_handler(State(state), write("k", "v")).await;
        assert!(matches!(result, Err(CacheError::Overloaded(_))));
    }

    #[tokio::test]
    async fn test_panicking_command_is_internal_error() {
        let state = test_state();

        let result: Result<()> = state.run(|_| panic!("command blew up")).await;
        assert!(matches!(result, Err(CacheError::Internal(_))));

        // The pool survives the panic
        put_handler(State(state), write("k", "v")).await.unwrap();
    }

    #[tokio::test]
    async fn test_stats_handler() {
        let state = test_state();
        put_handler(State(state.clone()), write("a", "1")).await.unwrap();
        get_handler(State(state.clone()), Path("a".to_string())).await.unwrap();
        let _ = get_handler(State(state.clone()), Path("b".to_string())).await;

        let response = stats_handler(State(state)).await;
        assert_eq!(response.cache.totals.hits, 1);
        assert_eq!(response.cache.totals.misses, 1);
        assert_eq!(response.cache.totals.total_entries, 1);
        assert_eq!(response.cache.stripe_count, 4);
        assert_eq!(response.executor.low_watermark, 1);
    }

    #[tokio::test]
    async fn test_health_handler() {
        let response = health_handler().await;
        assert_eq!(response.status, "healthy");
    }

    #[tokio::test]
    async fn test_put_invalid_request() {
        let state = test_state();

        let result = put_handler(State(state), write("", "value")).await;
        assert!(matches!(result, Err(CacheError::InvalidRequest(_))));
    }
}
