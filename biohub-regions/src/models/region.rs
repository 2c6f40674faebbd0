//! Layers, region details and projected geometries

use serde::{Deserialize, Serialize};
use std::fmt;

/// Spatial reference all remote queries are expressed in (NAD83 / BC Albers)
pub const TARGET_SRID: i32 = 3005;

/// The four remote layers regions can be resolved from
///
/// Serialises as the layer's type name so API consumers and the
/// cross-reference file see the same identifier the feature service uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LayerIdentifier {
    /// Ministry of Environment administrative regions
    #[serde(rename = "WHSE_ADMIN_BOUNDARIES.EADM_WLAP_REGION_BND_AREA_SVW")]
    EnvRegions,
    /// Natural resource management regions
    #[serde(rename = "WHSE_ADMIN_BOUNDARIES.ADM_NR_REGIONS_SPG")]
    NrmRegions,
    /// Parks, ecological reserves and protected areas
    #[serde(rename = "WHSE_TANTALIS.TA_PARK_ECORES_PA_SVW")]
    ParksAndEcoreserves,
    /// Wildlife management units
    #[serde(rename = "WHSE_WILDLIFE_MANAGEMENT.WAA_WILDLIFE_MGMT_UNITS_SVW")]
    WildlifeManagementUnits,
}

/// Schema binding for one remote layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerDescriptor {
    pub layer: LayerIdentifier,
    /// Feature type name the service knows the layer by
    pub type_name: &'static str,
    /// Spatial column used in INTERSECTS filters
    pub geometry_field: &'static str,
    /// Column holding the human-readable region name
    pub name_field: &'static str,
}

const DESCRIPTORS: [LayerDescriptor; 4] = [
    LayerDescriptor {
        layer: LayerIdentifier::EnvRegions,
        type_name: "WHSE_ADMIN_BOUNDARIES.EADM_WLAP_REGION_BND_AREA_SVW",
        geometry_field: "GEOMETRY",
        name_field: "REGION_NAME",
    },
    LayerDescriptor {
        layer: LayerIdentifier::NrmRegions,
        type_name: "WHSE_ADMIN_BOUNDARIES.ADM_NR_REGIONS_SPG",
        geometry_field: "SHAPE",
        name_field: "REGION_NAME",
    },
    LayerDescriptor {
        layer: LayerIdentifier::ParksAndEcoreserves,
        type_name: "WHSE_TANTALIS.TA_PARK_ECORES_PA_SVW",
        geometry_field: "SHAPE",
        name_field: "PROTECTED_LANDS_NAME",
    },
    LayerDescriptor {
        layer: LayerIdentifier::WildlifeManagementUnits,
        type_name: "WHSE_WILDLIFE_MANAGEMENT.WAA_WILDLIFE_MGMT_UNITS_SVW",
        geometry_field: "GEOMETRY",
        name_field: "WILDLIFE_MGMT_UNIT_ID",
    },
];

impl LayerIdentifier {
    /// Every layer, in classification order
    pub const ALL: [LayerIdentifier; 4] = [
        LayerIdentifier::EnvRegions,
        LayerIdentifier::NrmRegions,
        LayerIdentifier::ParksAndEcoreserves,
        LayerIdentifier::WildlifeManagementUnits,
    ];

    pub fn descriptor(self) -> &'static LayerDescriptor {
        match self {
            LayerIdentifier::EnvRegions => &DESCRIPTORS[0],
            LayerIdentifier::NrmRegions => &DESCRIPTORS[1],
            LayerIdentifier::ParksAndEcoreserves => &DESCRIPTORS[2],
            LayerIdentifier::WildlifeManagementUnits => &DESCRIPTORS[3],
        }
    }

    pub fn type_name(self) -> &'static str {
        self.descriptor().type_name
    }

    pub fn from_type_name(type_name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|layer| layer.type_name() == type_name)
    }
}

impl fmt::Display for LayerIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// One resolved region
///
/// Equality and hashing are by value over `(region_name, source_layer)`;
/// deduplication relies on this.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionDetail {
    pub region_name: String,
    pub source_layer: LayerIdentifier,
}

impl RegionDetail {
    pub fn new(region_name: impl Into<String>, source_layer: LayerIdentifier) -> Self {
        Self {
            region_name: region_name.into(),
            source_layer,
        }
    }
}

/// Well-Known-Text geometry in EPSG:3005
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WktGeometry(String);

impl WktGeometry {
    pub fn new(wkt: impl Into<String>) -> Self {
        Self(wkt.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WktGeometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
