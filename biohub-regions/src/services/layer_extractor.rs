//! Per-layer region extraction
//!
//! One generic extractor, parameterised by a [`LayerDescriptor`], covers all
//! four remote layers.

use crate::error::RegionResult;
use crate::models::{LayerDescriptor, LayerIdentifier, RegionDetail, WktGeometry};
use crate::services::feature_service::FeatureServiceClient;
use tracing::debug;

/// Binds the feature service client to one layer's schema
#[derive(Clone)]
pub struct LayerExtractor {
    descriptor: &'static LayerDescriptor,
    client: FeatureServiceClient,
}

impl LayerExtractor {
    pub fn new(layer: LayerIdentifier, client: FeatureServiceClient) -> Self {
        Self {
            descriptor: layer.descriptor(),
            client,
        }
    }

    /// One extractor per known layer, all sharing `client`
    pub fn for_all_layers(client: &FeatureServiceClient) -> Vec<Self> {
        LayerIdentifier::ALL
            .into_iter()
            .map(|layer| Self::new(layer, client.clone()))
            .collect()
    }

    pub fn layer(&self) -> LayerIdentifier {
        self.descriptor.layer
    }

    /// `INTERSECTS(<geometry field>, <wkt>)`
    pub fn intersects_filter(&self, wkt: &WktGeometry) -> String {
        format!("INTERSECTS({}, {})", self.descriptor.geometry_field, wkt)
    }

    /// Names of every region in this layer intersecting `wkt`
    ///
    /// No intersection yields an empty list, not an error.
    pub async fn get_region_names(&self, wkt: &WktGeometry) -> RegionResult<Vec<String>> {
        let names = self
            .client
            .get_property_value(
                self.descriptor.type_name,
                self.descriptor.name_field,
                Some(self.intersects_filter(wkt)),
            )
            .await?;

        debug!(
            layer = self.descriptor.type_name,
            matches = names.len(),
            "Layer query complete"
        );

        Ok(names)
    }

    /// [`Self::get_region_names`] tagged with this layer
    pub async fn get_region_details(&self, wkt: &WktGeometry) -> RegionResult<Vec<RegionDetail>> {
        let layer = self.layer();
        Ok(self
            .get_region_names(wkt)
            .await?
            .into_iter()
            .map(|name| RegionDetail::new(name, layer))
            .collect())
    }
}
