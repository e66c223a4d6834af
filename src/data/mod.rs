//! Incident record ingestion

pub mod loader;
pub mod preprocessing;
pub mod record;

pub use preprocessing::Ingested;
pub use record::{IncidentRecord, RawIncidentRecord};
