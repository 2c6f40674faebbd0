//! Spatial database double

use async_trait::async_trait;
use biohub_regions::models::{Geometry, WktGeometry};
use biohub_regions::services::{SpatialDatabase, SpatialTransaction};
use biohub_regions::{RegionError, RegionResult};
use std::sync::{Arc, Mutex};

/// Transaction lifecycle and projection calls, in order
#[derive(Debug, Clone, PartialEq)]
pub enum DbEvent {
    Begin,
    Project(String),
    Commit,
    Rollback,
}

/// Projects points to `POINT(x y)`; can be told to fail the nth projection
#[derive(Clone, Default)]
pub struct FakeDatabase {
    events: Arc<Mutex<Vec<DbEvent>>>,
    /// 1-based index of the projection call that fails
    fail_on: Option<usize>,
}

impl FakeDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(call: usize) -> Self {
        Self {
            fail_on: Some(call),
            ..Self::default()
        }
    }

    pub fn events(&self) -> Vec<DbEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn projection_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, DbEvent::Project(_)))
            .count()
    }
}

#[async_trait]
impl SpatialDatabase for FakeDatabase {
    async fn begin(&self) -> RegionResult<Box<dyn SpatialTransaction>> {
        self.events.lock().unwrap().push(DbEvent::Begin);
        Ok(Box::new(FakeTransaction {
            events: self.events.clone(),
            fail_on: self.fail_on,
            calls: 0,
        }))
    }
}

struct FakeTransaction {
    events: Arc<Mutex<Vec<DbEvent>>>,
    fail_on: Option<usize>,
    calls: usize,
}

#[async_trait]
impl SpatialTransaction for FakeTransaction {
    async fn project_to_wkt(
        &mut self,
        geometry: &Geometry,
        target_srid: i32,
    ) -> RegionResult<WktGeometry> {
        assert_eq!(target_srid, 3005);
        self.calls += 1;

        let wkt = match geometry {
            Geometry::Point { coordinates } => format!("POINT({} {})", coordinates[0], coordinates[1]),
            other => format!("{}(...)", other.type_name().to_uppercase()),
        };
        self.events.lock().unwrap().push(DbEvent::Project(wkt.clone()));

        if self.fail_on == Some(self.calls) {
            return Err(RegionError::Projection(
                "expected exactly 1 projected row, found 0".to_string(),
            ));
        }
        Ok(WktGeometry::new(wkt))
    }

    async fn commit(self: Box<Self>) -> RegionResult<()> {
        self.events.lock().unwrap().push(DbEvent::Commit);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> RegionResult<()> {
        self.events.lock().unwrap().push(DbEvent::Rollback);
        Ok(())
    }
}
