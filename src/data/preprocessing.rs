//! Record validation, time-window filtering and per-location aggregates

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Duration, Utc};
use log;
use statrs::statistics::Statistics;

use crate::data::record::{IncidentRecord, RawIncidentRecord};
use crate::error::{EngineError, Result};

/// Records that passed validation plus the number that did not
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ingested {
    pub records: Vec<IncidentRecord>,
    pub skipped: usize,
}

/// Validate raw records, skipping malformed ones.
///
/// Fails only when the input is non-empty and no record is usable; the
/// error then names every field that was found missing.
pub fn ingest(raw: Vec<RawIncidentRecord>) -> Result<Ingested> {
    let total = raw.len();
    let mut records = Vec::with_capacity(total);
    let mut missing_seen: BTreeSet<&'static str> = BTreeSet::new();

    for (row, record) in raw.into_iter().enumerate() {
        match record.validate() {
            Ok(record) => records.push(record),
            Err(EngineError::MissingField { fields }) => {
                log::warn!("Skipping record {}: missing {}", row, fields.join(", "));
                missing_seen.extend(fields);
            }
            Err(e) => return Err(e),
        }
    }

    let skipped = total - records.len();
    if total > 0 && records.is_empty() {
        return Err(EngineError::MissingField {
            fields: order_fields(missing_seen),
        });
    }

    if skipped > 0 {
        log::warn!("Skipped {} of {} records with missing required fields", skipped, total);
    }

    Ok(Ingested { records, skipped })
}

fn order_fields(seen: BTreeSet<&'static str>) -> Vec<&'static str> {
    ["location", "disaster_type", "alert_level"]
        .into_iter()
        .filter(|f| seen.contains(f))
        .collect()
}

/// Keep records reported within `days_back` days of `now`.
///
/// Records without a timestamp are kept.
pub fn filter_recent(
    records: Vec<IncidentRecord>,
    days_back: u32,
    now: DateTime<Utc>,
) -> Vec<IncidentRecord> {
    let cutoff = now - Duration::days(i64::from(days_back));
    log::info!("Filtering for records after {}", cutoff);

    let before = records.len();
    let kept: Vec<IncidentRecord> = records
        .into_iter()
        .filter(|r| r.timestamp.map_or(true, |ts| ts >= cutoff))
        .collect();

    log::info!(
        "After date filtering: {} records (removed {})",
        kept.len(),
        before - kept.len()
    );

    kept
}

/// Mean alert level for every location
pub fn mean_alert_levels(records: &[IncidentRecord]) -> BTreeMap<String, f64> {
    let mut levels: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for record in records {
        levels
            .entry(record.location.as_str())
            .or_default()
            .push(record.alert_level);
    }

    levels
        .into_iter()
        .map(|(location, values)| (location.to_string(), values.iter().mean()))
        .collect()
}

/// Distinct disaster types across the records
pub fn disaster_types(records: &[IncidentRecord]) -> BTreeSet<String> {
    records.iter().map(|r| r.disaster_type.clone()).collect()
}
