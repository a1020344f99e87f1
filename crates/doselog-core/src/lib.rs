//! # Doselog Core Library
//!
//! This library provides the core logic for doselog, a personal substance
//! journal. All operations are available through the standalone `doselog`
//! CLI, which is a thin layer over this crate.
//!
//! ## Architecture
//!
//! - **Timeline**: Composite effect curves built from phase durations,
//!   scaled per substance or across all substances of an experience
//! - **Substance**: Reference data (routes, dose ranges, durations) and search
//! - **Journal**: Experiences, ingestions, grouping and quick-add suggestions
//! - **Stats**: Per-substance usage over a selectable period
//! - **Storage**: SQLite journal storage and TOML-based configuration
//! - **Testing**: Drug checking services by country
//!
//! ## Key Components
//!
//! - [`FullTimeline`]: Superposition of per-ingestion effect curves
//! - [`EffectTimelines`]: All timelines of one experience
//! - [`Database`]: Journal persistence
//! - [`Config`]: Application configuration management
//! - [`SubstanceLookup`]: Trait for substance reference data

pub mod error;
pub mod journal;
pub mod stats;
pub mod storage;
pub mod substance;
pub mod testing;
pub mod timeline;
pub mod views;

pub use error::{CatalogError, ConfigError, CoreError, DatabaseError, ValidationError};
pub use journal::{Experience, Ingestion, NewExperience, NewIngestion};
pub use stats::{compute_stats, StatsModel, StatsPeriod};
pub use storage::{Config, Database, IngestionStore};
pub use substance::{AdministrationRoute, DoseClass, Substance, SubstanceCatalog, SubstanceLookup};
pub use timeline::{EffectTimelines, FinalPoint, FullTimeline, HeightMode, WeightedLine};
