//! The `OutputWriter` trait implemented by all backend writers.

use crate::{EventRow, OutputResult, TrainRow};

/// Trait implemented by the CSV and SQLite writers.
///
/// Errors are not propagated through the observer.  They are stored
/// internally and retrieved with [`SimOutputObserver::take_error`][crate::SimOutputObserver::take_error].
pub trait OutputWriter {
    /// Write a batch of events, in the order they happened.
    fn write_events(&mut self, rows: &[EventRow]) -> OutputResult<()>;

    /// Write one train release.
    fn write_train(&mut self, row: &TrainRow) -> OutputResult<()>;

    /// Flush and close all underlying file handles.
    ///
    /// Safe to call more than once.
    fn finish(&mut self) -> OutputResult<()>;
}
