//! Test Helper Utilities
//!
//! In-memory stand-ins for the spatial database and the feature service,
//! recording every call so tests can assert on what the engine did.

#![allow(dead_code)]

pub mod fake_database;
pub mod fake_feature_service;

pub use fake_database::{DbEvent, FakeDatabase};
pub use fake_feature_service::FakeFeatureService;

use biohub_regions::models::{Geometry, InputFeature};
use biohub_regions::services::{
    FeatureServiceClient, LayerExtractor, RegionCrossReference, RegionResolver,
};
use std::sync::Arc;

/// Point feature with no provenance
pub fn untagged_point(x: f64, y: f64) -> InputFeature {
    InputFeature::new(Geometry::Point {
        coordinates: vec![x, y],
    })
}

/// WKT the fake database produces for `untagged_point(x, y)`
pub fn wkt_for(x: f64, y: f64) -> String {
    format!("POINT({} {})", x, y)
}

/// Resolver wired to the fakes with the compiled-in cross-reference table
pub fn build_resolver(
    database: &FakeDatabase,
    service: &FakeFeatureService,
    max_concurrent_requests: usize,
) -> RegionResolver {
    let client = FeatureServiceClient::new("http://wfs.test/geo/pub/wfs", Arc::new(service.clone()))
        .expect("valid test url");

    RegionResolver::new(
        Arc::new(database.clone()),
        LayerExtractor::for_all_layers(&client),
        Arc::new(RegionCrossReference::builtin()),
        max_concurrent_requests,
    )
}
