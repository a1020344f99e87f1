//! Drug checking services, grouped by country.
//!
//! A small directory compiled into the library, loaded the same way as the
//! substance catalog.

use serde::{Deserialize, Serialize};

use crate::error::CatalogError;

const BUNDLED_SERVICES: &str = include_str!("../data/testing_services.json");

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestingService {
    pub name: String,
    /// City or a short location note ("Various locations").
    pub city: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestingCountry {
    pub country: String,
    pub services: Vec<TestingService>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TestingServiceDirectory {
    countries: Vec<TestingCountry>,
}

impl TestingServiceDirectory {
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn bundled() -> Self {
        Self::from_json(BUNDLED_SERVICES).unwrap_or_else(|err| {
            tracing::error!(%err, "bundled testing service list is malformed");
            Self::default()
        })
    }

    pub fn countries(&self) -> &[TestingCountry] {
        &self.countries
    }

    /// Countries whose name matches `query`, or which have a service whose
    /// name or city matches it. Matching is case-insensitive substring;
    /// an empty query returns everything. Only matching services are kept
    /// unless the country itself matched.
    pub fn search(&self, query: &str) -> Vec<TestingCountry> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return self.countries.clone();
        }
        let matches = |text: &str| text.to_lowercase().contains(&query);
        self.countries
            .iter()
            .filter_map(|country| {
                if matches(&country.country) {
                    return Some(country.clone());
                }
                let services: Vec<TestingService> = country
                    .services
                    .iter()
                    .filter(|s| matches(&s.name) || matches(&s.city))
                    .cloned()
                    .collect();
                (!services.is_empty()).then(|| TestingCountry {
                    country: country.country.clone(),
                    services,
                })
            })
            .collect()
    }
}
