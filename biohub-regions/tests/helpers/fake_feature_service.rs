//! Feature service double
//!
//! Answers `GetPropertyValue` requests from a table of
//! `(layer, wkt) → region names`, rendered as a WFS ValueCollection.

use async_trait::async_trait;
use biohub_regions::models::LayerIdentifier;
use biohub_regions::services::{FeatureRequest, FeatureTransport};
use biohub_regions::{RegionError, RegionResult};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct State {
    regions: HashMap<(LayerIdentifier, String), Vec<String>>,
    raw_bodies: HashMap<LayerIdentifier, String>,
    failing_layers: Vec<LayerIdentifier>,
    requests: Vec<FeatureRequest>,
    in_flight: HashMap<LayerIdentifier, usize>,
    max_in_flight: HashMap<LayerIdentifier, usize>,
    delay: Option<Duration>,
}

#[derive(Clone, Default)]
pub struct FakeFeatureService {
    state: Arc<Mutex<State>>,
}

impl FakeFeatureService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Geometry `wkt` intersects `names` in `layer`
    pub fn with_regions(self, layer: LayerIdentifier, wkt: &str, names: &[&str]) -> Self {
        self.state.lock().unwrap().regions.insert(
            (layer, wkt.to_string()),
            names.iter().map(|n| n.to_string()).collect(),
        );
        self
    }

    /// Every request to `layer` fails at the transport level
    pub fn failing_layer(self, layer: LayerIdentifier) -> Self {
        self.state.lock().unwrap().failing_layers.push(layer);
        self
    }

    /// Every request to `layer` returns `body` verbatim
    pub fn with_raw_body(self, layer: LayerIdentifier, body: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .raw_bodies
            .insert(layer, body.to_string());
        self
    }

    /// Hold each request open for `delay` so concurrency can be observed
    pub fn with_delay(self, delay: Duration) -> Self {
        self.state.lock().unwrap().delay = Some(delay);
        self
    }

    pub fn requests(&self) -> Vec<FeatureRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn request_count(&self) -> usize {
        self.state.lock().unwrap().requests.len()
    }

    pub fn max_in_flight(&self, layer: LayerIdentifier) -> usize {
        self.state
            .lock()
            .unwrap()
            .max_in_flight
            .get(&layer)
            .copied()
            .unwrap_or(0)
    }
}

fn value_collection(name_field: &str, names: &[String]) -> String {
    let members: String = names
        .iter()
        .map(|name| format!("<wfs:member><pub:{0}>{1}</pub:{0}></wfs:member>", name_field, name))
        .collect();

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><wfs:ValueCollection xmlns:wfs="http://www.opengis.net/wfs/2.0" xmlns:pub="http://delivery.openmaps.gov.bc.ca/pub">{}</wfs:ValueCollection>"#,
        members
    )
}

#[async_trait]
impl FeatureTransport for FakeFeatureService {
    async fn send(&self, request: &FeatureRequest) -> RegionResult<String> {
        let layer = request
            .param("typeNames")
            .and_then(|name| LayerIdentifier::from_type_name(&name))
            .expect("request names a known layer");
        let filter = request.param("CQL_FILTER").unwrap_or_default();

        let delay = {
            let mut state = self.state.lock().unwrap();
            state.requests.push(request.clone());
            let current = {
                let count = state.in_flight.entry(layer).or_insert(0);
                *count += 1;
                *count
            };
            let max = state.max_in_flight.entry(layer).or_insert(0);
            *max = (*max).max(current);
            state.delay
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock().unwrap();
        if let Some(count) = state.in_flight.get_mut(&layer) {
            *count -= 1;
        }

        if state.failing_layers.contains(&layer) {
            return Err(RegionError::RemoteQuery(format!(
                "connection refused: {}",
                layer
            )));
        }

        if let Some(body) = state.raw_bodies.get(&layer) {
            return Ok(body.clone());
        }

        let names: Vec<String> = state
            .regions
            .iter()
            .filter(|((l, wkt), _)| *l == layer && filter.contains(wkt.as_str()))
            .flat_map(|(_, names)| names.clone())
            .collect();

        Ok(value_collection(layer.descriptor().name_field, &names))
    }
}
