//! Known feature classification
//!
//! Features drawn from one of the four layers already carry their region
//! name in their properties, so they resolve without any network call.

use crate::models::{InputFeature, LayerIdentifier, RegionDetail};

/// Classify a feature by provenance
///
/// Returns a region when the provenance id contains a known layer's type
/// name and the feature carries a non-empty value in that layer's name
/// field. Anything else is unknown and needs a spatial query.
pub fn classify(feature: &InputFeature) -> Option<RegionDetail> {
    let provenance = feature.provenance()?;

    LayerIdentifier::ALL
        .into_iter()
        .filter(|layer| provenance.contains(layer.type_name()))
        .find_map(|layer| {
            feature
                .property_text(layer.descriptor().name_field)
                .map(|name| RegionDetail::new(name, layer))
        })
}
