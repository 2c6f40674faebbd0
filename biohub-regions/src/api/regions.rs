//! Region resolution endpoints
//!
//! Both endpoints take a JSON array of GeoJSON features. The whole batch is
//! validated before the resolution engine runs; one bad feature rejects
//! the request.

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use serde::Serialize;

use crate::db::{search_regions, RegionRecord};
use crate::error::{ApiError, ApiResult};
use crate::models::feature::validate_features;
use crate::models::{InputFeature, RegionDetail};
use crate::AppState;

/// Response for POST /api/spatial/regions
#[derive(Debug, Serialize)]
pub struct RegionsResponse {
    pub regions: Vec<RegionDetail>,
}

/// Response for POST /api/spatial/regions/records
#[derive(Debug, Serialize)]
pub struct RegionRecordsResponse {
    pub regions: Vec<RegionRecord>,
}

fn accept_features(
    payload: Result<Json<Vec<InputFeature>>, JsonRejection>,
) -> ApiResult<Vec<InputFeature>> {
    let Json(features) = payload.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    validate_features(&features)?;
    Ok(features)
}

/// POST /api/spatial/regions
///
/// Resolves the deduplicated set of regions the features fall within.
pub async fn resolve_regions(
    State(state): State<AppState>,
    payload: Result<Json<Vec<InputFeature>>, JsonRejection>,
) -> ApiResult<Json<RegionsResponse>> {
    let features = accept_features(payload)?;
    let regions = state.resolver.resolve(&features).await?;
    Ok(Json(RegionsResponse { regions }))
}

/// POST /api/spatial/regions/records
///
/// Resolves regions, then returns the matching `region_lookup` rows.
pub async fn resolve_region_records(
    State(state): State<AppState>,
    payload: Result<Json<Vec<InputFeature>>, JsonRejection>,
) -> ApiResult<Json<RegionRecordsResponse>> {
    let features = accept_features(payload)?;
    let regions = state.resolver.resolve(&features).await?;
    let records = search_regions(&state.db, &regions).await?;
    Ok(Json(RegionRecordsResponse { regions: records }))
}

/// Build region routes
pub fn region_routes() -> Router<AppState> {
    Router::new()
        .route("/api/spatial/regions", post(resolve_regions))
        .route("/api/spatial/regions/records", post(resolve_region_records))
}
