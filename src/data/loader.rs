//! File ingestion for incident records (CSV, Parquet, NDJSON, JSON)

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use log;
use polars::prelude::*;

use crate::data::record::RawIncidentRecord;

const NAIVE_TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
];

/// Load raw incident records from a file, choosing the reader by extension
pub fn load_records(path: impl AsRef<Path>) -> Result<Vec<RawIncidentRecord>> {
    let path = path.as_ref();
    log::info!("Reading incident records from {}", path.display());

    if !path.exists() {
        return Err(anyhow!("File not found: {}", path.display()));
    }

    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();

    if is_blank(path)? {
        log::warn!("Input file {} is empty", path.display());
        return Ok(Vec::new());
    }

    let df = match extension.as_str() {
        "csv" => CsvReadOptions::default()
            .with_has_header(true)
            .try_into_reader_with_file_path(Some(PathBuf::from(path)))?
            .finish()?,
        "parquet" => LazyFrame::scan_parquet(path, Default::default())?.collect()?,
        "ndjson" | "jsonl" => JsonLineReader::from_path(path)?.finish()?,
        "json" => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open {}", path.display()))?;
            JsonReader::new(file).finish()?
        }
        other => return Err(anyhow!("Unsupported input format '{}' for {}", other, path.display())),
    };

    log::debug!("File schema: {:?}", df.schema());
    log::info!("Loaded {} rows", df.height());

    records_from_frame(&df)
}

/// True if the file has no bytes or only ASCII whitespace
fn is_blank(path: &Path) -> Result<bool> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    if file.metadata()?.len() == 0 {
        return Ok(true);
    }

    for byte in BufReader::new(file).bytes() {
        if !byte?.is_ascii_whitespace() {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Timestamp column as text to parse, or as epoch milliseconds
enum TimestampColumn {
    Text(Column),
    Millis(Column),
}

impl TimestampColumn {
    fn from_frame(df: &DataFrame) -> Result<Option<Self>> {
        let column = match df.column("timestamp") {
            Ok(column) => column,
            Err(_) => return Ok(None),
        };

        Ok(Some(match column.dtype() {
            DataType::Datetime(_, _) | DataType::Date => TimestampColumn::Millis(
                column
                    .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?
                    .cast(&DataType::Int64)?,
            ),
            _ => TimestampColumn::Text(column.cast(&DataType::String)?),
        }))
    }

    fn get(&self, i: usize) -> Result<Option<DateTime<Utc>>> {
        Ok(match self {
            TimestampColumn::Text(c) => c.str()?.get(i).and_then(parse_timestamp),
            TimestampColumn::Millis(c) => {
                c.i64()?.get(i).and_then(DateTime::from_timestamp_millis)
            }
        })
    }
}

/// Convert a data frame into raw records.
///
/// Absent columns leave the corresponding field empty on every row so that
/// validation can name them.
pub fn records_from_frame(df: &DataFrame) -> Result<Vec<RawIncidentRecord>> {
    let locations = string_column(df, "location")?;
    let disaster_types = string_column(df, "disaster_type")?;
    let timestamps = TimestampColumn::from_frame(df)?;

    let alert_levels = match df.column("alert_level") {
        Ok(column) => Some(column.cast(&DataType::Float64)?),
        Err(_) => None,
    };
    let alert_levels = match &alert_levels {
        Some(column) => Some(column.f64()?),
        None => None,
    };

    let mut records = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        let text = |column: &Option<Column>| -> Result<Option<String>> {
            Ok(match column {
                Some(c) => c.str()?.get(i).map(str::to_string),
                None => None,
            })
        };

        let timestamp = match &timestamps {
            Some(column) => column.get(i)?,
            None => None,
        };

        records.push(RawIncidentRecord {
            location: text(&locations)?,
            disaster_type: text(&disaster_types)?,
            alert_level: alert_levels.and_then(|ca| ca.get(i)),
            timestamp,
        });
    }

    Ok(records)
}

fn string_column(df: &DataFrame, name: &str) -> Result<Option<Column>> {
    match df.column(name) {
        Ok(column) => Ok(Some(column.cast(&DataType::String)?)),
        Err(_) => {
            log::debug!("Column '{}' not present in input", name);
            Ok(None)
        }
    }
}

/// Parse an RFC 3339 or naive (UTC) timestamp
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }

    NAIVE_TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::io::Write;

    #[test]
    fn parses_rfc3339_and_naive_timestamps() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();

        assert_eq!(parse_timestamp("2024-03-01T12:30:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-01T14:30:00+02:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-01 12:30:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-01T12:30:00.000"), Some(expected));
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn loads_csv_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alerts.csv");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "location,disaster_type,alert_level,timestamp").unwrap();
        writeln!(file, "Manila,flood,3,2024-03-01T12:30:00Z").unwrap();
        writeln!(file, "Cebu,flood,2,2024-03-02T08:00:00Z").unwrap();
        drop(file);

        let records = load_records(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].location.as_deref(), Some("Manila"));
        assert_eq!(records[1].alert_level, Some(2.0));
        assert!(records[0].timestamp.is_some());
    }

    #[test]
    fn absent_column_leaves_field_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alerts.csv");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "location,alert_level").unwrap();
        writeln!(file, "Manila,3").unwrap();
        drop(file);

        let records = load_records(&path).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].missing_fields(), vec!["disaster_type"]);
    }

    fn timestamped_frame() -> DataFrame {
        let timestamps = Series::new("timestamp".into(), &[1_709_296_200_000i64, 1_709_366_400_000])
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
            .unwrap();
        DataFrame::new(vec![
            Series::new("location".into(), &["Manila", "Cebu"]).into(),
            Series::new("disaster_type".into(), &["flood", "flood"]).into(),
            Series::new("alert_level".into(), &[3.0, 2.0]).into(),
            timestamps.into(),
        ])
        .unwrap()
    }

    #[test]
    fn blank_files_load_as_no_records() {
        let dir = tempfile::tempdir().unwrap();
        for ext in ["csv", "json", "ndjson", "jsonl", "parquet"] {
            for (i, contents) in ["", "  \n\t\n"].iter().enumerate() {
                let path = dir.path().join(format!("blank{}.{}", i, ext));
                std::fs::write(&path, contents).unwrap();

                let records = load_records(&path).unwrap();
                assert!(records.is_empty(), "{} with {:?}", ext, contents);
            }
        }
    }

    #[test]
    fn loads_json_array_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alerts.json");
        std::fs::write(
            &path,
            r#"[
                {"location": "Manila", "disaster_type": "flood", "alert_level": 3,
                 "timestamp": "2024-03-01T12:30:00Z"},
                {"location": "Cebu", "alert_level": 2.5}
            ]"#,
        )
        .unwrap();

        let records = load_records(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].disaster_type.as_deref(), Some("flood"));
        assert_eq!(records[0].alert_level, Some(3.0));
        assert!(records[0].timestamp.is_some());
        assert_eq!(records[1].location.as_deref(), Some("Cebu"));
        assert_eq!(records[1].disaster_type, None);
        assert_eq!(records[1].missing_fields(), vec!["disaster_type"]);
    }

    #[test]
    fn loads_ndjson_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alerts.ndjson");
        std::fs::write(
            &path,
            concat!(
                r#"{"location": "Manila", "disaster_type": "flood", "alert_level": 3.0}"#,
                "\n",
                r#"{"location": "Cebu", "disaster_type": "storm", "alert_level": 1.5}"#,
                "\n",
            ),
        )
        .unwrap();

        let records = load_records(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].disaster_type.as_deref(), Some("storm"));
        assert_eq!(records[1].alert_level, Some(1.5));
        assert_eq!(records[0].timestamp, None);
    }

    #[test]
    fn loads_parquet_with_datetime_timestamps() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alerts.parquet");
        let mut df = timestamped_frame();
        ParquetWriter::new(File::create(&path).unwrap()).finish(&mut df).unwrap();

        let records = load_records(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].location.as_deref(), Some("Manila"));
        assert_eq!(
            records[0].timestamp,
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap())
        );
        assert_eq!(
            records[1].timestamp,
            Some(Utc.with_ymd_and_hms(2024, 3, 2, 8, 0, 0).unwrap())
        );
    }

    #[test]
    fn date_and_datetime_columns_become_timestamps() {
        let records = records_from_frame(&timestamped_frame()).unwrap();
        assert_eq!(
            records[0].timestamp,
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap())
        );

        let dates = Series::new("timestamp".into(), &[19_783i32])
            .cast(&DataType::Date)
            .unwrap();
        let df = DataFrame::new(vec![
            Series::new("location".into(), &["Manila"]).into(),
            dates.into(),
        ])
        .unwrap();

        let records = records_from_frame(&df).unwrap();
        assert_eq!(
            records[0].timestamp,
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(records[0].missing_fields(), vec!["disaster_type", "alert_level"]);
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(load_records("/nonexistent/alerts.csv").is_err());
    }

    #[test]
    fn unsupported_extension_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alerts.txt");
        File::create(&path).unwrap();

        assert!(load_records(&path).is_err());
    }
}
