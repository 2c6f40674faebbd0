//! Static region cross-reference table
//!
//! Associates a region in one layer with the regions known to correspond
//! to it in other layers. Built once at startup (compiled-in, or from an
//! operator-supplied TOML file) and shared read-only afterwards.

use crate::models::{LayerIdentifier, RegionDetail};
use biohub_common::{Error, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

use crate::models::LayerIdentifier::{EnvRegions as ENV, NrmRegions as NRM};

/// Environment region ↔ natural resource region correspondences
const BUILTIN_LINKS: &[((&str, LayerIdentifier), (&str, LayerIdentifier))] = &[
    (("Vancouver Island", ENV), ("West Coast Natural Resource Region", NRM)),
    (("Lower Mainland", ENV), ("South Coast Natural Resource Region", NRM)),
    (("Thompson", ENV), ("Thompson-Okanagan Natural Resource Region", NRM)),
    (("Okanagan", ENV), ("Thompson-Okanagan Natural Resource Region", NRM)),
    (("Kootenay", ENV), ("Kootenay-Boundary Natural Resource Region", NRM)),
    (("Cariboo", ENV), ("Cariboo Natural Resource Region", NRM)),
    (("Skeena", ENV), ("Skeena Natural Resource Region", NRM)),
    (("Omineca", ENV), ("Omineca Natural Resource Region", NRM)),
    (("Peace", ENV), ("Northeast Natural Resource Region", NRM)),
];

/// One directional entry of a cross-reference file
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CrossReferenceEntry {
    pub from: RegionDetail,
    #[serde(default)]
    pub to: Vec<RegionDetail>,
}

#[derive(Debug, Deserialize)]
struct CrossReferenceFile {
    #[serde(default)]
    entries: Vec<CrossReferenceEntry>,
}

/// Immutable lookup keyed by `(region_name, source_layer)`
#[derive(Debug, Clone, Default)]
pub struct RegionCrossReference {
    links: HashMap<RegionDetail, Vec<RegionDetail>>,
}

impl RegionCrossReference {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Compiled-in table, linked in both directions
    pub fn builtin() -> Self {
        let mut table = Self::empty();
        for &((from_name, from_layer), (to_name, to_layer)) in BUILTIN_LINKS {
            let from = RegionDetail::new(from_name, from_layer);
            let to = RegionDetail::new(to_name, to_layer);
            table.insert(from.clone(), to.clone());
            table.insert(to, from);
        }
        table
    }

    /// Directional entries; repeated `from` keys are merged
    pub fn from_entries(entries: Vec<CrossReferenceEntry>) -> Self {
        let mut table = Self::empty();
        for entry in entries {
            table.links.entry(entry.from.clone()).or_default();
            for to in entry.to {
                table.insert(entry.from.clone(), to);
            }
        }
        table
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: CrossReferenceFile = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Parse cross-reference TOML failed: {}", e)))?;
        Ok(Self::from_entries(file.entries))
    }

    /// Load a replacement table from disk
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let table = Self::from_toml_str(&content)?;
        info!(
            path = %path.display(),
            entries = table.len(),
            "Loaded region cross-reference table"
        );
        Ok(table)
    }

    fn insert(&mut self, from: RegionDetail, to: RegionDetail) {
        let targets = self.links.entry(from).or_default();
        if !targets.contains(&to) {
            targets.push(to);
        }
    }

    /// Regions associated with `region`, empty when it has no entry
    pub fn lookup(&self, region: &RegionDetail) -> &[RegionDetail] {
        self.links.get(region).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Input regions followed by every association found for them
    ///
    /// Not deduplicated.
    pub fn expand(&self, regions: &[RegionDetail]) -> Vec<RegionDetail> {
        let mut expanded = regions.to_vec();
        for region in regions {
            expanded.extend_from_slice(self.lookup(region));
        }
        expanded
    }

    /// Number of source regions with an entry
    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}
