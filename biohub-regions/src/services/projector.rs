//! Coordinate projection through the spatial database
//!
//! Geometries arrive as GeoJSON in EPSG:4326; the feature service is
//! queried in EPSG:3005. PostGIS performs the transform and renders WKT.
//! All projections for one request run on a single transaction, opened
//! through [`SpatialDatabase::begin`].

use crate::error::{RegionError, RegionResult};
use crate::models::{Geometry, WktGeometry};
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::debug;

/// Force to 2D and transform; input GeoJSON carries no CRS so 4326 is set
const PROJECT_TO_WKT_SQL: &str = r#"
    SELECT public.ST_AsText(
        public.ST_Transform(
            public.ST_Force2D(
                public.ST_SetSRID(public.ST_GeomFromGeoJSON($1::text), 4326)
            ),
            $2::integer
        )
    ) AS wkt
"#;

/// Opens transactions against the spatial database
#[async_trait]
pub trait SpatialDatabase: Send + Sync {
    async fn begin(&self) -> RegionResult<Box<dyn SpatialTransaction>>;
}

/// One open transaction
///
/// Dropping without commit rolls back and returns the connection to the pool.
#[async_trait]
pub trait SpatialTransaction: Send {
    /// Convert a geometry to WKT in the target spatial reference
    async fn project_to_wkt(
        &mut self,
        geometry: &Geometry,
        target_srid: i32,
    ) -> RegionResult<WktGeometry>;

    async fn commit(self: Box<Self>) -> RegionResult<()>;

    async fn rollback(self: Box<Self>) -> RegionResult<()>;
}

/// Postgres/PostGIS implementation backed by the shared pool
#[derive(Clone)]
pub struct PgSpatialDatabase {
    pool: PgPool,
}

impl PgSpatialDatabase {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SpatialDatabase for PgSpatialDatabase {
    async fn begin(&self) -> RegionResult<Box<dyn SpatialTransaction>> {
        let tx = self.pool.begin().await?;
        debug!("Opened projection transaction");
        Ok(Box::new(PgSpatialTransaction { tx }))
    }
}

struct PgSpatialTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl SpatialTransaction for PgSpatialTransaction {
    async fn project_to_wkt(
        &mut self,
        geometry: &Geometry,
        target_srid: i32,
    ) -> RegionResult<WktGeometry> {
        let geojson = geometry.to_geojson()?;

        let rows: Vec<(Option<String>,)> = sqlx::query_as(PROJECT_TO_WKT_SQL)
            .bind(geojson)
            .bind(target_srid)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| RegionError::Projection(e.to_string()))?;

        single_wkt(rows.into_iter().map(|(wkt,)| wkt).collect())
    }

    async fn commit(self: Box<Self>) -> RegionResult<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> RegionResult<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}

/// The projection query must yield exactly one non-null row
pub(crate) fn single_wkt(rows: Vec<Option<String>>) -> RegionResult<WktGeometry> {
    match rows.as_slice() {
        [Some(wkt)] if !wkt.is_empty() => Ok(WktGeometry::new(wkt.clone())),
        [_] => Err(RegionError::Projection(
            "projection returned an empty geometry".to_string(),
        )),
        _ => Err(RegionError::Projection(format!(
            "expected exactly 1 projected row, found {}",
            rows.len()
        ))),
    }
}
