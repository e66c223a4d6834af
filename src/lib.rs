//! Core library functions for the disaster link analyzer

pub mod analysis;
pub mod cluster;
pub mod config;
pub mod data;
pub mod error;
pub mod graph;
pub mod report;
pub mod storage;
pub mod viz;

pub use config::AnalysisConfig;
pub use data::{IncidentRecord, RawIncidentRecord};
pub use error::{EngineError, Result};
pub use report::{analyze, analyze_raw, Analysis, Report};
