use std::{fs::File, io::Read, path::PathBuf};

use consumption_client::domain::ConsumptionRecord;
use csv::StringRecord;

use crate::{coordinator::request::parse_timestamp, error::ServiceError};

/// CSV export of meter readings.
///
/// Expected header columns (by name, any order):
/// - id
/// - meter_id (integer)
/// - active_energy
/// - reactive_energy
/// - capacitive_reactive
/// - solar
/// - date (`YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS[+00]` or RFC3339)
pub struct ConsumptionCsvFile {
    path: PathBuf,
}

impl ConsumptionCsvFile {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn open(&self) -> Result<File, ServiceError> {
        File::open(&self.path)
            .map_err(|e| ServiceError::Import(format!("failed to open CSV file {}: {e}", self.path.display())))
    }

    pub fn read(&self) -> Result<Vec<ConsumptionRecord>, ServiceError> {
        read_consumption_csv(self.open()?)
    }
}

fn parse_f64(name: &str, raw: &str) -> Result<f64, ServiceError> {
    raw.trim()
        .parse()
        .map_err(|e| ServiceError::Import(format!("invalid {name} '{raw}': {e}")))
}

fn record_to_consumption(record: &StringRecord, headers: &StringRecord) -> Result<ConsumptionRecord, ServiceError> {
    let get = |name: &str| -> Result<&str, ServiceError> {
        headers
            .iter()
            .position(|h| h.trim() == name)
            .and_then(|idx| record.get(idx))
            .ok_or_else(|| ServiceError::Import(format!("missing column '{name}' in CSV record")))
    };

    let meter_raw = get("meter_id")?;
    let meter_id: i64 = meter_raw
        .trim()
        .parse()
        .map_err(|e| ServiceError::Import(format!("invalid meter_id '{meter_raw}': {e}")))?;

    let date_raw = get("date")?;
    let ts = parse_timestamp(date_raw)
        .map_err(|e| ServiceError::Import(format!("invalid date '{date_raw}': {e}")))?;

    Ok(ConsumptionRecord {
        id: get("id")?.trim().to_string(),
        meter_id,
        active_energy: parse_f64("active_energy", get("active_energy")?)?,
        reactive_energy: parse_f64("reactive_energy", get("reactive_energy")?)?,
        capacitive_reactive: parse_f64("capacitive_reactive", get("capacitive_reactive")?)?,
        solar_exported: parse_f64("solar", get("solar")?)?,
        ts,
    })
}

/// Parse every row; the first malformed row aborts the whole read.
pub fn read_consumption_csv<R: Read>(reader: R) -> Result<Vec<ConsumptionRecord>, ServiceError> {
    let mut rdr = csv::Reader::from_reader(reader);
    let headers = rdr
        .headers()
        .map_err(|e| ServiceError::Import(format!("failed to read CSV headers: {e}")))?
        .clone();

    let mut out = Vec::new();
    for (idx, result) in rdr.records().enumerate() {
        let row = idx + 1;
        let record = result.map_err(|e| ServiceError::Import(format!("failed to read CSV row {row}: {e}")))?;

        match record_to_consumption(&record, &headers) {
            Ok(r) => out.push(r),
            Err(e) => {
                metrics::counter!("consumption_csv_parse_errors_total").increment(1);
                tracing::error!(row, error = %e, "csv row rejected");
                return Err(ServiceError::Import(format!("row {row}: {e}")));
            }
        }
    }

    tracing::info!(records = out.len(), "csv parsed into consumption records");
    Ok(out)
}
