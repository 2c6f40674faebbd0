//! Database access for biohub-regions
//!
//! Region records live in the shared `region_lookup` table, one row per
//! known region with `feature_name` holding the source layer's type name.

pub mod regions;

pub use regions::{search_regions, RegionRecord};
