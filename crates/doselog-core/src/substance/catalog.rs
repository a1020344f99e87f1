use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use super::{Substance, SubstanceLookup};
use crate::error::CatalogError;

/// Sample dataset shipped with the library.
const BUNDLED_CATALOG: &str = include_str!("../../data/substances.json");

#[derive(Deserialize)]
struct CatalogFile {
    substances: Vec<Substance>,
}

/// In-memory substance dataset with case-insensitive name lookup.
#[derive(Debug, Clone, Default)]
pub struct SubstanceCatalog {
    substances: Vec<Substance>,
    by_name: HashMap<String, usize>,
}

impl SubstanceCatalog {
    /// Build a catalog from already parsed substances.
    ///
    /// Entries without a name and repeated names are dropped.
    pub fn new(substances: Vec<Substance>) -> Self {
        let mut catalog = Self::default();
        for substance in substances {
            let key = substance.name.trim().to_lowercase();
            if key.is_empty() {
                tracing::warn!("skipping substance without a name");
                continue;
            }
            if catalog.by_name.contains_key(&key) {
                tracing::warn!(name = %substance.name, "skipping duplicate substance");
                continue;
            }
            catalog.by_name.insert(key, catalog.substances.len());
            catalog.substances.push(substance);
        }
        catalog
    }

    /// Parse a `{ "substances": [...] }` document.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_json::from_str(json)?;
        Ok(Self::new(file.substances))
    }

    /// Load a catalog file from disk.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path).map_err(|source| CatalogError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let catalog = Self::from_json(&content)?;
        tracing::debug!(path = %path.display(), count = catalog.len(), "loaded substance catalog");
        Ok(catalog)
    }

    /// The sample dataset compiled into the library.
    pub fn bundled() -> Self {
        // The bundled file is covered by tests; a parse failure here means a broken build.
        Self::from_json(BUNDLED_CATALOG).unwrap_or_else(|err| {
            tracing::error!(%err, "bundled substance catalog is malformed");
            Self::default()
        })
    }

    pub fn len(&self) -> usize {
        self.substances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.substances.is_empty()
    }

    /// Like [`SubstanceLookup::get_substance`] but failing with a catalog error.
    pub fn require(&self, name: &str) -> Result<&Substance, CatalogError> {
        self.get_substance(name)
            .ok_or_else(|| CatalogError::UnknownSubstance(name.to_string()))
    }
}

impl SubstanceLookup for SubstanceCatalog {
    fn get_substance(&self, name: &str) -> Option<&Substance> {
        let index = self.by_name.get(&name.trim().to_lowercase())?;
        self.substances.get(*index)
    }

    fn all_substances(&self) -> &[Substance] {
        &self.substances
    }
}
