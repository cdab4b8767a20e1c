//! SQLite output backend (feature `sqlite`).
//!
//! Creates a single `output.db` file in the configured output directory with
//! two tables: `events` and `trains`.

use std::path::Path;

use rusqlite::Connection;

use crate::writer::OutputWriter;
use crate::{EventRow, OutputResult, TrainRow};

/// Writes run output to an SQLite database.
pub struct SqliteWriter {
    conn:     Connection,
    finished: bool,
}

impl SqliteWriter {
    /// Open (or create) `output.db` in `dir` and initialise the schema.
    pub fn new(dir: &Path) -> OutputResult<Self> {
        let conn = Connection::open(dir.join("output.db"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous  = NORMAL;
             CREATE TABLE IF NOT EXISTS events (
                 tick      INTEGER NOT NULL,
                 time_secs REAL    NOT NULL,
                 segment   TEXT    NOT NULL,
                 load      INTEGER,
                 event     TEXT    NOT NULL,
                 detail    TEXT    NOT NULL
             );
             CREATE TABLE IF NOT EXISTS trains (
                 tick      INTEGER NOT NULL,
                 time_secs REAL    NOT NULL,
                 segment   TEXT    NOT NULL,
                 size      INTEGER NOT NULL,
                 complete  INTEGER NOT NULL,
                 forced    INTEGER NOT NULL,
                 loads     TEXT    NOT NULL
             );",
        )?;

        Ok(Self { conn, finished: false })
    }
}

impl OutputWriter for SqliteWriter {
    fn write_events(&mut self, rows: &[EventRow]) -> OutputResult<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO events (tick, time_secs, segment, load, event, detail) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for row in rows {
                stmt.execute(rusqlite::params![
                    row.tick as i64,
                    row.time_secs,
                    row.segment,
                    row.load,
                    row.event,
                    row.detail,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn write_train(&mut self, row: &TrainRow) -> OutputResult<()> {
        self.conn.execute(
            "INSERT INTO trains (tick, time_secs, segment, size, complete, forced, loads) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            rusqlite::params![
                row.tick as i64,
                row.time_secs,
                row.segment,
                row.size,
                row.complete as i64,
                row.forced as i64,
                row.loads_field(),
            ],
        )?;
        Ok(())
    }

    fn finish(&mut self) -> OutputResult<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
        Ok(())
    }
}
