pub mod config;
pub mod dose;
pub mod experience;
pub mod ingestion;
pub mod search;
pub mod stats;
pub mod testing;
pub mod timeline;
