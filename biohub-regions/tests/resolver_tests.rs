//! Integration tests for the region resolution pipeline
//!
//! The spatial database and the feature service are replaced by recording
//! fakes, so these tests observe exactly which projections, transactions
//! and remote requests each resolution performs.

mod helpers;

use biohub_regions::models::{Geometry, InputFeature, LayerIdentifier, RegionDetail};
use biohub_regions::services::HttpMethod;
use biohub_regions::RegionError;
use helpers::{build_resolver, untagged_point, wkt_for, DbEvent, FakeDatabase, FakeFeatureService};
use std::collections::HashSet;
use std::time::Duration;

use biohub_regions::models::LayerIdentifier::{
    EnvRegions as ENV, NrmRegions as NRM, ParksAndEcoreserves as PARKS,
    WildlifeManagementUnits as WMU,
};

fn as_set(regions: &[RegionDetail]) -> HashSet<RegionDetail> {
    regions.iter().cloned().collect()
}

fn assert_no_duplicates(regions: &[RegionDetail]) {
    assert_eq!(
        as_set(regions).len(),
        regions.len(),
        "result contains duplicate regions: {:?}",
        regions
    );
}

fn env_tagged(name: &str) -> InputFeature {
    untagged_point(-123.36, 48.42)
        .with_id("WHSE_ADMIN_BOUNDARIES.EADM_WLAP_REGION_BND_AREA_SVW.fid-3")
        .with_property("REGION_NAME", name)
}

// =============================================================================
// Known features
// =============================================================================

#[tokio::test]
async fn test_known_feature_resolves_without_network_or_database() {
    // Given: a feature tagged with the ENV layer and a region name
    let database = FakeDatabase::new();
    let service = FakeFeatureService::new();
    let resolver = build_resolver(&database, &service, 4);

    // When: resolved
    let regions = resolver
        .resolve(&[env_tagged("Vancouver Island")])
        .await
        .unwrap();

    // Then: the region plus its cross-reference, no calls out
    assert_eq!(
        as_set(&regions),
        HashSet::from([
            RegionDetail::new("Vancouver Island", ENV),
            RegionDetail::new("West Coast Natural Resource Region", NRM),
        ])
    );
    assert_eq!(service.request_count(), 0);
    assert!(database.events().is_empty(), "no transaction for known features");
}

#[tokio::test]
async fn test_known_region_without_cross_reference_passes_through() {
    let database = FakeDatabase::new();
    let service = FakeFeatureService::new();
    let resolver = build_resolver(&database, &service, 4);

    let park = untagged_point(-125.5, 49.6)
        .with_id("WHSE_TANTALIS.TA_PARK_ECORES_PA_SVW.4412")
        .with_property("PROTECTED_LANDS_NAME", "STRATHCONA PARK");

    let regions = resolver.resolve(&[park]).await.unwrap();

    assert_eq!(regions, vec![RegionDetail::new("STRATHCONA PARK", PARKS)]);
    assert_eq!(service.request_count(), 0);
}

// =============================================================================
// Unknown features
// =============================================================================

#[tokio::test]
async fn test_unknown_feature_with_no_intersections_is_empty() {
    let database = FakeDatabase::new();
    let service = FakeFeatureService::new();
    let resolver = build_resolver(&database, &service, 4);

    let regions = resolver
        .resolve(&[untagged_point(-140.0, 30.0)])
        .await
        .unwrap();

    assert!(regions.is_empty());
    // One request per layer
    assert_eq!(service.request_count(), 4);
    assert_eq!(
        database.events(),
        vec![
            DbEvent::Begin,
            DbEvent::Project(wkt_for(-140.0, 30.0)),
            DbEvent::Commit,
        ]
    );
}

#[tokio::test]
async fn test_unknown_feature_queries_every_layer_with_intersects_post() {
    let database = FakeDatabase::new();
    let service = FakeFeatureService::new();
    let resolver = build_resolver(&database, &service, 4);

    resolver
        .resolve(&[untagged_point(1.0, 2.0)])
        .await
        .unwrap();

    let requests = service.requests();
    let layers: HashSet<String> = requests
        .iter()
        .filter_map(|r| r.param("typeNames"))
        .collect();
    assert_eq!(
        layers,
        LayerIdentifier::ALL
            .iter()
            .map(|l| l.type_name().to_string())
            .collect()
    );

    for request in &requests {
        assert_eq!(request.method, HttpMethod::Post);
        assert_eq!(request.param("request").as_deref(), Some("GetPropertyValue"));

        let layer = LayerIdentifier::from_type_name(&request.param("typeNames").unwrap()).unwrap();
        let descriptor = layer.descriptor();
        assert_eq!(
            request.param("valueReference").as_deref(),
            Some(descriptor.name_field)
        );
        assert_eq!(
            request.param("CQL_FILTER"),
            Some(format!("INTERSECTS({}, POINT(1 2))", descriptor.geometry_field))
        );
    }
}

#[tokio::test]
async fn test_overlapping_results_across_features_are_deduplicated() {
    // Given: three untagged features whose layers report overlapping names
    let (a, b, c) = ((1.0, 1.0), (2.0, 2.0), (3.0, 3.0));
    let database = FakeDatabase::new();
    let service = FakeFeatureService::new()
        .with_regions(ENV, &wkt_for(a.0, a.1), &["Cariboo"])
        .with_regions(ENV, &wkt_for(b.0, b.1), &["Cariboo", "Thompson"])
        .with_regions(ENV, &wkt_for(c.0, c.1), &["Thompson"])
        .with_regions(WMU, &wkt_for(a.0, a.1), &["5-2"])
        .with_regions(WMU, &wkt_for(b.0, b.1), &["5-2"])
        .with_regions(WMU, &wkt_for(c.0, c.1), &["5-2", "3-31"]);
    let resolver = build_resolver(&database, &service, 2);

    // When
    let regions = resolver
        .resolve(&[
            untagged_point(a.0, a.1),
            untagged_point(b.0, b.1),
            untagged_point(c.0, c.1),
        ])
        .await
        .unwrap();

    // Then: each distinct pair exactly once, cross-references included
    assert_no_duplicates(&regions);
    assert_eq!(
        as_set(&regions),
        HashSet::from([
            RegionDetail::new("Cariboo", ENV),
            RegionDetail::new("Thompson", ENV),
            RegionDetail::new("5-2", WMU),
            RegionDetail::new("3-31", WMU),
            RegionDetail::new("Cariboo Natural Resource Region", NRM),
            RegionDetail::new("Thompson-Okanagan Natural Resource Region", NRM),
        ])
    );
    assert_eq!(service.request_count(), 12);
}

#[tokio::test]
async fn test_known_and_queried_duplicate_collapses() {
    // The untagged feature's ENV query returns the same region the tagged
    // feature already carries
    let database = FakeDatabase::new();
    let service = FakeFeatureService::new()
        .with_regions(ENV, &wkt_for(5.0, 5.0), &["Vancouver Island"])
        .with_regions(NRM, &wkt_for(5.0, 5.0), &["West Coast Natural Resource Region"]);
    let resolver = build_resolver(&database, &service, 4);

    let regions = resolver
        .resolve(&[env_tagged("Vancouver Island"), untagged_point(5.0, 5.0)])
        .await
        .unwrap();

    assert_no_duplicates(&regions);
    assert_eq!(
        as_set(&regions),
        HashSet::from([
            RegionDetail::new("Vancouver Island", ENV),
            RegionDetail::new("West Coast Natural Resource Region", NRM),
        ])
    );
    // Only the untagged feature reached the network and the database
    assert_eq!(service.request_count(), 4);
    assert_eq!(database.projection_count(), 1);
}

#[tokio::test]
async fn test_projection_runs_once_per_unknown_feature_in_order() {
    let database = FakeDatabase::new();
    let service = FakeFeatureService::new();
    let resolver = build_resolver(&database, &service, 4);

    let features = vec![
        untagged_point(3.0, 0.0),
        env_tagged("Skeena"),
        untagged_point(1.0, 0.0),
        untagged_point(2.0, 0.0),
    ];
    resolver.resolve(&features).await.unwrap();

    assert_eq!(
        database.events(),
        vec![
            DbEvent::Begin,
            DbEvent::Project(wkt_for(3.0, 0.0)),
            DbEvent::Project(wkt_for(1.0, 0.0)),
            DbEvent::Project(wkt_for(2.0, 0.0)),
            DbEvent::Commit,
        ]
    );
}

#[tokio::test]
async fn test_resolving_twice_yields_same_set() {
    let database = FakeDatabase::new();
    let service = FakeFeatureService::new()
        .with_regions(PARKS, &wkt_for(7.0, 7.0), &["GARIBALDI PARK"])
        .with_regions(ENV, &wkt_for(7.0, 7.0), &["Lower Mainland"])
        .with_regions(ENV, &wkt_for(8.0, 8.0), &["Lower Mainland"]);
    let resolver = build_resolver(&database, &service, 3);
    let features = vec![untagged_point(7.0, 7.0), untagged_point(8.0, 8.0)];

    let first = resolver.resolve(&features).await.unwrap();
    let second = resolver.resolve(&features).await.unwrap();

    assert_eq!(as_set(&first), as_set(&second));
    assert_eq!(first.len(), second.len());
}

#[tokio::test]
async fn test_empty_batch_does_nothing() {
    let database = FakeDatabase::new();
    let service = FakeFeatureService::new();
    let resolver = build_resolver(&database, &service, 4);

    let regions = resolver.resolve(&[]).await.unwrap();

    assert!(regions.is_empty());
    assert!(database.events().is_empty());
    assert_eq!(service.request_count(), 0);
}

// =============================================================================
// Failures
// =============================================================================

#[tokio::test]
async fn test_projection_failure_rolls_back_and_skips_queries() {
    // Given: projection fails for the second of three unknown features
    let database = FakeDatabase::failing_on(2);
    let service = FakeFeatureService::new();
    let resolver = build_resolver(&database, &service, 4);

    // When
    let result = resolver
        .resolve(&[
            untagged_point(1.0, 1.0),
            untagged_point(2.0, 2.0),
            untagged_point(3.0, 3.0),
        ])
        .await;

    // Then: error surfaced, transaction rolled back, nothing queried
    assert!(matches!(result, Err(RegionError::Projection(_))));
    assert_eq!(
        database.events(),
        vec![
            DbEvent::Begin,
            DbEvent::Project(wkt_for(1.0, 1.0)),
            DbEvent::Project(wkt_for(2.0, 2.0)),
            DbEvent::Rollback,
        ]
    );
    assert_eq!(service.request_count(), 0);
}

#[tokio::test]
async fn test_remote_failure_aborts_whole_batch() {
    let database = FakeDatabase::new();
    let service = FakeFeatureService::new()
        .with_regions(ENV, &wkt_for(1.0, 1.0), &["Cariboo"])
        .failing_layer(WMU);
    let resolver = build_resolver(&database, &service, 4);

    let result = resolver
        .resolve(&[untagged_point(1.0, 1.0), env_tagged("Skeena")])
        .await;

    // No partial result, even though other layers and the known feature succeeded
    assert!(matches!(result, Err(RegionError::RemoteQuery(_))));
}

#[tokio::test]
async fn test_malformed_response_fails_with_schema_error() {
    let database = FakeDatabase::new();
    let service = FakeFeatureService::new()
        .with_raw_body(NRM, "<html><body>502 Bad Gateway</body></html>");
    let resolver = build_resolver(&database, &service, 4);

    let result = resolver.resolve(&[untagged_point(1.0, 1.0)]).await;

    assert!(matches!(result, Err(RegionError::ResponseSchema(_))));
}

#[tokio::test]
async fn test_non_point_geometries_are_projected() {
    let database = FakeDatabase::new();
    let service = FakeFeatureService::new();
    let resolver = build_resolver(&database, &service, 4);

    let polygon = InputFeature::new(Geometry::Polygon {
        coordinates: vec![vec![
            vec![0.0, 0.0],
            vec![1.0, 0.0],
            vec![1.0, 1.0],
            vec![0.0, 0.0],
        ]],
    });

    resolver.resolve(&[polygon]).await.unwrap();

    assert_eq!(database.projection_count(), 1);
    assert!(service
        .requests()
        .iter()
        .all(|r| r.param("CQL_FILTER").unwrap().contains("POLYGON(...)")));
}

// =============================================================================
// Concurrency
// =============================================================================

#[tokio::test]
async fn test_fan_out_is_capped_per_layer() {
    let database = FakeDatabase::new();
    let service = FakeFeatureService::new().with_delay(Duration::from_millis(20));
    let resolver = build_resolver(&database, &service, 2);

    let features: Vec<InputFeature> = (0..6).map(|i| untagged_point(i as f64, 0.0)).collect();
    resolver.resolve(&features).await.unwrap();

    assert_eq!(service.request_count(), 24);
    for layer in LayerIdentifier::ALL {
        let max = service.max_in_flight(layer);
        assert!(max >= 1 && max <= 2, "{} had {} requests in flight", layer, max);
    }
}

#[tokio::test]
async fn test_resolution_runs_on_spawned_task() {
    // Handlers run resolution inside spawned tasks, so the future must be Send
    let database = FakeDatabase::new();
    let service = FakeFeatureService::new()
        .with_regions(ENV, &wkt_for(6.0, 6.0), &["Peace"]);
    let resolver = std::sync::Arc::new(build_resolver(&database, &service, 2));
    let features = vec![untagged_point(6.0, 6.0), untagged_point(7.0, 7.0)];

    let task = tokio::spawn({
        let resolver = resolver.clone();
        async move { resolver.resolve(&features).await }
    });
    let regions = task.await.unwrap().unwrap();

    assert_eq!(
        as_set(&regions),
        HashSet::from([
            RegionDetail::new("Peace", ENV),
            RegionDetail::new("Northeast Natural Resource Region", NRM),
        ])
    );
    assert_eq!(service.request_count(), 8);
}
