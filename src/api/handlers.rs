//! API Handlers
//!
//! HTTP request handlers for each cache server endpoint. Cache calls are
//! synchronous and may block on disk or network, so each one runs on the
//! blocking thread pool.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::warn;

use crate::cache::Cache;
use crate::config::ServerConfig;
use crate::error::{CacheError, Result};
use crate::models::{
    validate_key, DeleteResponse, FlushResponse, GetResponse, HealthResponse, SetRequest,
    SetResponse, StatsResponse,
};

/// Application state shared across all handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub cache: Arc<Cache>,
    /// TTL in minutes for writes that do not carry one
    pub default_minutes: u32,
    /// Driver name reported by `/stats`
    pub driver: String,
}

impl AppState {
    pub fn new(cache: Cache, driver: impl Into<String>, default_minutes: u32) -> Self {
        Self {
            cache: Arc::new(cache),
            default_minutes,
            driver: driver.into(),
        }
    }

    /// Builds the configured cache.
    pub fn from_config(config: &ServerConfig) -> Result<Self> {
        let cache = Cache::from_config(&config.cache)?;
        Ok(Self::new(
            cache,
            config.cache.driver.name(),
            config.default_minutes,
        ))
    }

    /// Runs a cache call on the blocking pool.
    async fn run<T, F>(&self, call: F) -> Result<T>
    where
        F: FnOnce(&Cache) -> T + Send + 'static,
        T: Send + 'static,
    {
        let cache = Arc::clone(&self.cache);
        tokio::task::spawn_blocking(move || call(&cache))
            .await
            .map_err(|e| CacheError::Internal(format!("cache task failed: {}", e)))
    }
}

fn checked_key(key: String) -> Result<String> {
    match validate_key(&key) {
        Some(message) => Err(CacheError::InvalidRequest(message)),
        None => Ok(key),
    }
}

/// Handler for PUT /cache/*key
///
/// Stores any JSON value, with the request's TTL or the server default.
pub async fn set_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    let key = checked_key(key)?;
    let minutes = req.minutes.unwrap_or(state.default_minutes);

    let stored = {
        let key = key.clone();
        state
            .run(move |cache| cache.set(&key, &req.value, minutes))
            .await??
    };
    if !stored {
        warn!(key = %key, "Driver refused write");
        return Err(CacheError::Unavailable(format!("Key '{}' could not be stored", key)));
    }

    Ok(Json(SetResponse::new(key, minutes)))
}

/// Handler for GET /cache/*key
///
/// Returns the live value with its creation and expiry timestamps.
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>> {
    let key = checked_key(key)?;

    let entry = {
        let key = key.clone();
        state.run(move |cache| cache.get_entry(&key)).await?
    };

    match entry {
        Some(entry) => Ok(Json(GetResponse::new(key, entry))),
        None => Err(CacheError::NotFound(key)),
    }
}

/// Handler for DELETE /cache/*key
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<DeleteResponse>> {
    let key = checked_key(key)?;

    let removed = {
        let key = key.clone();
        state.run(move |cache| cache.remove(&key)).await?
    };
    if !removed {
        return Err(CacheError::NotFound(key));
    }

    Ok(Json(DeleteResponse::new(key)))
}

/// Handler for DELETE /cache
///
/// Flushes the cache's namespace (the whole backend for Redis/Memcached).
pub async fn flush_handler(State(state): State<AppState>) -> Result<Json<FlushResponse>> {
    if !state.run(|cache| cache.flush()).await? {
        return Err(CacheError::Unavailable("Cache could not be flushed".to_string()));
    }
    Ok(Json(FlushResponse::flushed()))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse::new(state.driver.clone(), state.cache.stats()))
}

/// Handler for GET /health
///
/// 200 while the driver reports itself enabled, 503 otherwise.
pub async fn health_handler(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    match state.run(|cache| cache.enabled()).await {
        Ok(true) => (StatusCode::OK, Json(HealthResponse::healthy())),
        Ok(false) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthResponse::unavailable()),
        ),
        Err(e) => {
            warn!(error = %e, "Health probe failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse::unavailable()),
            )
        }
    }
}
