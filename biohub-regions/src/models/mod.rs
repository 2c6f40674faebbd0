//! Data model for region resolution

pub mod feature;
pub mod region;

pub use feature::{FeatureId, Geometry, InputFeature, Position};
pub use region::{LayerDescriptor, LayerIdentifier, RegionDetail, WktGeometry, TARGET_SRID};
