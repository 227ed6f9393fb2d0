//! Tabular outputs for finalized aggregates
//!
//! Write-only, best-effort collaborators: each finalized [`Average`] is
//! appended as one CSV row, and the end-of-run [`Centroid`] becomes a
//! single row in its own table. Bin bounds are rendered as RFC 3339
//! timestamps. A failed write surfaces as
//! [`SinkError::Output`](plume_core::SinkError::Output) and is reported by
//! the pipeline without disturbing aggregation state.

use std::io::Write;

use chrono::{DateTime, SecondsFormat};

use plume_core::{
    errors::SinkError,
    sink::{
        spatial::{Centroid, CentroidOutput},
        windowed::{Average, AverageOutput},
    },
    time::Timestamp,
};

fn output_error(e: std::io::Error) -> SinkError {
    SinkError::Output(e.to_string())
}

fn format_timestamp(ts: Timestamp) -> String {
    match DateTime::from_timestamp_millis(ts as i64) {
        Some(instant) => instant.to_rfc3339_opts(SecondsFormat::Millis, true),
        None => ts.to_string(),
    }
}

/// CSV log of finalized bin averages
///
/// Columns: `Bin Start,Bin End,Average Value`. The header is written with
/// the first row; every row is flushed so a truncated run still leaves a
/// readable table.
pub struct CsvAverageLog<W: Write> {
    out: W,
    header_written: bool,
}

impl<W: Write> CsvAverageLog<W> {
    /// Create a log writing to `out`
    pub fn new(out: W) -> Self {
        Self {
            out,
            header_written: false,
        }
    }
}

impl<W: Write> AverageOutput for CsvAverageLog<W> {
    fn record(&mut self, average: &Average) -> Result<(), SinkError> {
        if !self.header_written {
            writeln!(self.out, "Bin Start,Bin End,Average Value").map_err(output_error)?;
            self.header_written = true;
        }
        writeln!(
            self.out,
            "{},{},{}",
            format_timestamp(average.start),
            format_timestamp(average.end),
            average.value
        )
        .map_err(output_error)?;
        self.out.flush().map_err(output_error)
    }
}

/// CSV log of the end-of-run weighted average position
///
/// Columns: `x,y`, one row per completed pass.
pub struct CsvCentroidLog<W: Write> {
    out: W,
    header_written: bool,
}

impl<W: Write> CsvCentroidLog<W> {
    /// Create a log writing to `out`
    pub fn new(out: W) -> Self {
        Self {
            out,
            header_written: false,
        }
    }
}

impl<W: Write> CentroidOutput for CsvCentroidLog<W> {
    fn record(&mut self, centroid: &Centroid) -> Result<(), SinkError> {
        if !self.header_written {
            writeln!(self.out, "x,y").map_err(output_error)?;
            self.header_written = true;
        }
        writeln!(self.out, "{},{}", centroid.x, centroid.y).map_err(output_error)?;
        self.out.flush().map_err(output_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn average_rows_with_header() {
        let mut log = CsvAverageLog::new(Vec::new());

        log.record(&Average {
            start: 0,
            end: 10_000,
            value: 5.0,
        })
        .unwrap();
        log.record(&Average {
            start: 10_000,
            end: 20_000,
            value: 0.0,
        })
        .unwrap();

        let written = String::from_utf8(log.out).unwrap();
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "Bin Start,Bin End,Average Value");
        assert_eq!(lines[1], "1970-01-01T00:00:00.000Z,1970-01-01T00:00:10.000Z,5");
        assert_eq!(lines[2], "1970-01-01T00:00:10.000Z,1970-01-01T00:00:20.000Z,0");
    }

    #[test]
    fn centroid_single_row() {
        let mut log = CsvCentroidLog::new(Vec::new());
        log.record(&Centroid { x: 7.5, y: 0.0 }).unwrap();

        let written = String::from_utf8(log.out).unwrap();
        assert_eq!(written, "x,y\n7.5,0\n");
    }

    #[test]
    fn failed_write_maps_to_output_error() {
        /// Writer that always fails
        struct BrokenPipe;

        impl Write for BrokenPipe {
            fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
                Err(std::io::Error::new(
                    std::io::ErrorKind::BrokenPipe,
                    "pipe closed",
                ))
            }

            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let mut log = CsvAverageLog::new(BrokenPipe);
        let result = log.record(&Average {
            start: 0,
            end: 1,
            value: 1.0,
        });
        assert!(matches!(result, Err(SinkError::Output(_))));
    }
}
