//! Region resolution pipeline
//!
//! classify → [known | unknown: project → query × 4 layers] → merge →
//! cross-reference expand → dedupe
//!
//! Known features resolve from their own properties with no network call.
//! Unknown features are projected to EPSG:3005 one after another inside a
//! single transaction; only once every projection has succeeded are the
//! layers queried. Each layer fans out across all projected geometries
//! (bounded), and the four layers run concurrently. The first failure
//! anywhere aborts the whole resolution and no partial result is returned.

use crate::error::RegionResult;
use crate::models::{InputFeature, RegionDetail, WktGeometry, TARGET_SRID};
use crate::services::classifier::classify;
use crate::services::cross_reference::RegionCrossReference;
use crate::services::layer_extractor::LayerExtractor;
use crate::services::projector::SpatialDatabase;
use futures::future::try_join_all;
use futures::stream::{self, StreamExt, TryStreamExt};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Drives region resolution for a batch of features
pub struct RegionResolver {
    database: Arc<dyn SpatialDatabase>,
    extractors: Vec<LayerExtractor>,
    cross_reference: Arc<RegionCrossReference>,
    max_concurrent_requests: usize,
}

impl RegionResolver {
    /// `max_concurrent_requests` caps in-flight requests per layer (minimum 1)
    pub fn new(
        database: Arc<dyn SpatialDatabase>,
        extractors: Vec<LayerExtractor>,
        cross_reference: Arc<RegionCrossReference>,
        max_concurrent_requests: usize,
    ) -> Self {
        Self {
            database,
            extractors,
            cross_reference,
            max_concurrent_requests: max_concurrent_requests.max(1),
        }
    }

    pub fn cross_reference(&self) -> &RegionCrossReference {
        &self.cross_reference
    }

    /// Resolve every region the features fall within
    ///
    /// The result holds each `(region_name, source_layer)` pair once.
    /// Ordering is unspecified.
    pub async fn resolve(&self, features: &[InputFeature]) -> RegionResult<Vec<RegionDetail>> {
        let request_id = Uuid::new_v4();
        let span = info_span!("resolve_regions", %request_id);

        async move {
            let (known, unknown): (Vec<_>, Vec<_>) = features
                .iter()
                .map(|feature| (feature, classify(feature)))
                .partition(|(_, region)| region.is_some());

            let known: Vec<RegionDetail> = known.into_iter().filter_map(|(_, r)| r).collect();
            let unknown: Vec<&InputFeature> = unknown.into_iter().map(|(f, _)| f).collect();

            debug!(
                known = known.len(),
                unknown = unknown.len(),
                "Classified features"
            );

            let wkts = self.project_unknown(&unknown).await?;
            let queried = self.query_layers(&wkts).await?;

            let mut merged = known;
            let known_count = merged.len();
            merged.extend(queried);

            let regions = dedupe_regions(self.cross_reference.expand(&merged));

            info!(
                features = features.len(),
                known = known_count,
                unknown = unknown.len(),
                regions = regions.len(),
                "Resolved regions"
            );

            Ok(regions)
        }
        .instrument(span)
        .await
    }

    /// Project unknown features in request order on one transaction
    ///
    /// Rolls back and returns the first projection error; commits only after
    /// the last projection succeeds. No transaction is opened for an empty
    /// slice.
    async fn project_unknown(&self, features: &[&InputFeature]) -> RegionResult<Vec<WktGeometry>> {
        if features.is_empty() {
            return Ok(Vec::new());
        }

        let mut tx = self.database.begin().await?;
        let mut wkts = Vec::with_capacity(features.len());

        for (index, feature) in features.iter().enumerate() {
            match tx.project_to_wkt(&feature.geometry, TARGET_SRID).await {
                Ok(wkt) => wkts.push(wkt),
                Err(e) => {
                    warn!(
                        index,
                        geometry = feature.geometry.type_name(),
                        error = %e,
                        "Projection failed, rolling back"
                    );
                    if let Err(rollback_err) = tx.rollback().await {
                        error!(error = %rollback_err, "Rollback after projection failure failed");
                    }
                    return Err(e);
                }
            }
        }

        tx.commit().await?;
        debug!(projected = wkts.len(), "Projection transaction committed");

        Ok(wkts)
    }

    /// Query every layer for every geometry; layers run concurrently
    async fn query_layers(&self, wkts: &[WktGeometry]) -> RegionResult<Vec<RegionDetail>> {
        if wkts.is_empty() {
            return Ok(Vec::new());
        }

        let per_layer = self
            .extractors
            .iter()
            .map(|extractor| self.query_layer(extractor, wkts));

        let results = try_join_all(per_layer).await?;
        Ok(results.into_iter().flatten().collect())
    }

    /// Fan one layer out across all geometries, fail-fast
    async fn query_layer(
        &self,
        extractor: &LayerExtractor,
        wkts: &[WktGeometry],
    ) -> RegionResult<Vec<RegionDetail>> {
        // Owned geometries keep the stream's futures Send for any caller lifetime
        let batches: Vec<Vec<RegionDetail>> = stream::iter(wkts.iter().cloned())
            .map(|wkt| async move { extractor.get_region_details(&wkt).await })
            .buffer_unordered(self.max_concurrent_requests)
            .try_collect()
            .await
            .map_err(|e| {
                warn!(layer = %extractor.layer(), error = %e, "Layer query failed");
                e
            })?;

        Ok(batches.into_iter().flatten().collect())
    }
}

/// Drop repeated `(region_name, source_layer)` pairs, keeping first occurrences
pub fn dedupe_regions(regions: Vec<RegionDetail>) -> Vec<RegionDetail> {
    let mut seen = HashSet::with_capacity(regions.len());
    regions
        .into_iter()
        .filter(|region| seen.insert(region.clone()))
        .collect()
}
