//! Region lookup search

use crate::error::RegionResult;
use crate::models::RegionDetail;
use serde::Serialize;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::debug;

/// One `region_lookup` row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RegionRecord {
    pub region_id: i32,
    pub region_name: String,
    pub org_unit: Option<String>,
    pub org_unit_name: Option<String>,
    pub feature_code: Option<String>,
    /// Source layer type name
    pub feature_name: String,
    pub object_id: Option<i32>,
}

const SEARCH_PREFIX: &str = "SELECT region_id, region_name, org_unit, org_unit_name, \
     feature_code, feature_name, object_id \
     FROM region_lookup \
     WHERE (region_name, feature_name) IN ";

/// `... WHERE (region_name, feature_name) IN (($1, $2), ...)`
pub(crate) fn build_search_query(details: &[RegionDetail]) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new(SEARCH_PREFIX);
    builder.push_tuples(details.iter().cloned(), |mut tuple, detail| {
        tuple.push_bind(detail.region_name);
        tuple.push_bind(detail.source_layer.type_name());
    });
    builder.push(" ORDER BY region_name, feature_name");
    builder
}

/// Rows matching any of `details` by name and layer
///
/// Empty input issues no query.
pub async fn search_regions(
    pool: &PgPool,
    details: &[RegionDetail],
) -> RegionResult<Vec<RegionRecord>> {
    if details.is_empty() {
        return Ok(Vec::new());
    }

    let mut builder = build_search_query(details);
    let records = builder
        .build_query_as::<RegionRecord>()
        .fetch_all(pool)
        .await?;

    debug!(
        requested = details.len(),
        found = records.len(),
        "Searched region_lookup"
    );

    Ok(records)
}
