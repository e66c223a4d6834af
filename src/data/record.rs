//! Incident record types and required-field validation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// A validated disaster incident record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentRecord {
    /// Affected location name
    pub location: String,

    /// Disaster category (flood, earthquake, ...)
    pub disaster_type: String,

    /// Severity; higher is more severe
    pub alert_level: f64,

    /// When the incident was reported, if known
    pub timestamp: Option<DateTime<Utc>>,
}

impl IncidentRecord {
    /// Create a record without a timestamp
    pub fn new(
        location: impl Into<String>,
        disaster_type: impl Into<String>,
        alert_level: f64,
    ) -> Self {
        Self {
            location: location.into(),
            disaster_type: disaster_type.into(),
            alert_level,
            timestamp: None,
        }
    }

    /// Attach a timestamp
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

/// Untyped record as it arrives from ingestion; every field may be absent
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawIncidentRecord {
    #[serde(default)]
    pub location: Option<String>,

    #[serde(default)]
    pub disaster_type: Option<String>,

    #[serde(default)]
    pub alert_level: Option<f64>,

    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl RawIncidentRecord {
    /// Names of the required fields this record lacks.
    ///
    /// Blank strings and non-finite alert levels count as absent.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();

        if self.location.as_deref().map_or(true, |s| s.trim().is_empty()) {
            missing.push("location");
        }
        if self.disaster_type.as_deref().map_or(true, |s| s.trim().is_empty()) {
            missing.push("disaster_type");
        }
        if !self.alert_level.map_or(false, f64::is_finite) {
            missing.push("alert_level");
        }

        missing
    }

    /// Convert into a typed record, failing if any required field is absent
    pub fn validate(self) -> Result<IncidentRecord> {
        let missing = self.missing_fields();

        match (self.location, self.disaster_type, self.alert_level) {
            (Some(location), Some(disaster_type), Some(alert_level)) if missing.is_empty() => {
                Ok(IncidentRecord {
                    location,
                    disaster_type,
                    alert_level,
                    timestamp: self.timestamp,
                })
            }
            _ => Err(EngineError::MissingField { fields: missing }),
        }
    }
}

impl From<IncidentRecord> for RawIncidentRecord {
    fn from(record: IncidentRecord) -> Self {
        Self {
            location: Some(record.location),
            disaster_type: Some(record.disaster_type),
            alert_level: Some(record.alert_level),
            timestamp: record.timestamp,
        }
    }
}
