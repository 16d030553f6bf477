//! Rendition planning: which renditions a job encodes.

use std::collections::HashSet;

use ladder_models::{RenditionCatalog, RenditionSpec};
use tracing::warn;

/// Selects renditions for a source from the catalog plus caller extras.
#[derive(Debug, Clone, Default)]
pub struct RenditionPlanner {
    catalog: RenditionCatalog,
}

impl RenditionPlanner {
    pub fn new(catalog: RenditionCatalog) -> Self {
        Self { catalog }
    }

    /// Catalog entries the source is tall enough for (catalog order), then
    /// every extra in the order given.
    ///
    /// Extras are never filtered by source height. An extra whose label is
    /// already planned is dropped, since outcomes are keyed by label.
    pub fn plan(&self, source_height: u32, extras: &[RenditionSpec]) -> Vec<RenditionSpec> {
        let mut plan: Vec<RenditionSpec> = self
            .catalog
            .entries()
            .iter()
            .filter(|entry| entry.fits_source(source_height))
            .cloned()
            .collect();

        let mut labels: HashSet<String> = plan.iter().map(|s| s.label.clone()).collect();

        for extra in extras {
            if !labels.insert(extra.label.clone()) {
                warn!(
                    label = %extra.label,
                    "Skipping extra rendition: label already planned"
                );
                continue;
            }
            plan.push(extra.clone());
        }

        plan
    }
}
