//! Region Resolution Engine
//!
//! - `classifier`: known features resolved from their own properties
//! - `projector`: geometry → EPSG:3005 WKT via PostGIS, on one transaction
//! - `feature_service`: generic WFS client (request assembly, transport, XML)
//! - `layer_extractor`: the feature service bound to one layer's schema
//! - `cross_reference`: static region ↔ region associations
//! - `region_resolver`: the end-to-end pipeline

pub mod classifier;
pub mod cross_reference;
pub mod feature_service;
pub mod layer_extractor;
pub mod projector;
pub mod region_resolver;

pub use classifier::classify;
pub use cross_reference::{CrossReferenceEntry, RegionCrossReference};
pub use feature_service::{
    FeatureQuery, FeatureRequest, FeatureServiceClient, FeatureTransport, HttpMethod,
    HttpTransport, WfsOperation,
};
pub use layer_extractor::LayerExtractor;
pub use projector::{PgSpatialDatabase, SpatialDatabase, SpatialTransaction};
pub use region_resolver::{dedupe_regions, RegionResolver};
