//! CSV arrival-schedule loader.
//!
//! # CSV format
//!
//! One row per load entering the line from outside.
//!
//! ```csv
//! time_secs,segment,length,width
//! 0.0,infeed,1.2,0.8
//! 3.0,infeed,1.2,0.8
//! 6.0,infeed,1.2,0.8
//! ```
//!
//! `segment` is the name given to the segment in the layout; the engine
//! resolves it when the schedule is attached.  Rows are returned sorted by
//! `time_secs` (stable, so rows with equal times keep file order).

use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use crate::ScheduleError;

// ── CSV record ────────────────────────────────────────────────────────────────

/// One scheduled arrival.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ArrivalRecord {
    pub time_secs: f64,
    pub segment:   String,
    pub length:    f64,
    pub width:     f64,
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Load an arrival schedule from a CSV file.
pub fn load_arrivals_csv(path: &Path) -> Result<Vec<ArrivalRecord>, ScheduleError> {
    let file = std::fs::File::open(path).map_err(ScheduleError::Io)?;
    load_arrivals_reader(file)
}

/// Like [`load_arrivals_csv`] but accepts any `Read` source.
///
/// Useful for testing (pass a `std::io::Cursor`) or for schedules embedded in
/// a binary.
pub fn load_arrivals_reader<R: Read>(reader: R) -> Result<Vec<ArrivalRecord>, ScheduleError> {
    let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut rows = Vec::new();

    for (line, result) in csv_reader.deserialize::<ArrivalRecord>().enumerate() {
        let row = result.map_err(|e| ScheduleError::Parse(e.to_string()))?;
        validate(&row, line + 2)?;
        rows.push(row);
    }

    rows.sort_by(|a, b| a.time_secs.total_cmp(&b.time_secs));
    tracing::debug!(arrivals = rows.len(), "arrival schedule loaded");
    Ok(rows)
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn validate(row: &ArrivalRecord, line: usize) -> Result<(), ScheduleError> {
    if !(row.time_secs.is_finite() && row.time_secs >= 0.0) {
        return Err(ScheduleError::Parse(format!(
            "line {line}: time_secs must be a non-negative number, got {}",
            row.time_secs
        )));
    }
    if !(row.length > 0.0 && row.width > 0.0) {
        return Err(ScheduleError::Parse(format!(
            "line {line}: load dimensions must be positive, got {} x {}",
            row.length, row.width
        )));
    }
    if row.segment.is_empty() {
        return Err(ScheduleError::Parse(format!("line {line}: empty segment name")));
    }
    Ok(())
}
