//! biohub-regions library
//!
//! Region Resolution Engine: given survey or project geometries, determine
//! every named administrative and ecological region they fall within,
//! drawing on four remote WFS layers plus a static cross-reference table.

pub mod api;
pub mod db;
pub mod error;
pub mod models;
pub mod services;

pub use crate::error::{ApiError, ApiResult, RegionError, RegionResult};

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::services::RegionResolver;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,
    /// Resolution engine (holds the read-only cross-reference table)
    pub resolver: Arc<RegionResolver>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(db: PgPool, resolver: Arc<RegionResolver>) -> Self {
        Self {
            db,
            resolver,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::region_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
