//! CSV output backend.
//!
//! Creates two files in the configured output directory:
//! - `events.csv`
//! - `trains.csv`

use std::fs::File;
use std::path::Path;

use csv::Writer;

use crate::writer::OutputWriter;
use crate::{EventRow, OutputResult, TrainRow};

/// Writes run output to two CSV files.
pub struct CsvWriter {
    events:   Writer<File>,
    trains:   Writer<File>,
    finished: bool,
}

impl CsvWriter {
    /// Open (or create) the two CSV files in `dir` and write the header rows.
    pub fn new(dir: &Path) -> OutputResult<Self> {
        let mut events = Writer::from_path(dir.join("events.csv"))?;
        events.write_record(["tick", "time_secs", "segment", "load", "event", "detail"])?;

        let mut trains = Writer::from_path(dir.join("trains.csv"))?;
        trains.write_record(["tick", "time_secs", "segment", "size", "complete", "forced", "loads"])?;

        Ok(Self {
            events,
            trains,
            finished: false,
        })
    }
}

impl OutputWriter for CsvWriter {
    fn write_events(&mut self, rows: &[EventRow]) -> OutputResult<()> {
        for row in rows {
            self.events.write_record(&[
                row.tick.to_string(),
                format!("{:.3}", row.time_secs),
                row.segment.clone(),
                row.load.map(|l| l.to_string()).unwrap_or_default(),
                row.event.clone(),
                row.detail.clone(),
            ])?;
        }
        Ok(())
    }

    fn write_train(&mut self, row: &TrainRow) -> OutputResult<()> {
        self.trains.write_record(&[
            row.tick.to_string(),
            format!("{:.3}", row.time_secs),
            row.segment.clone(),
            row.size.to_string(),
            (row.complete as u8).to_string(),
            (row.forced as u8).to_string(),
            row.loads_field(),
        ])?;
        Ok(())
    }

    fn finish(&mut self) -> OutputResult<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.events.flush()?;
        self.trains.flush()?;
        Ok(())
    }
}
