//! Result persistence: the tabular measurement file.
//!
//! One row per completed sweep point, field order fixed:
//! `timestamp,band,power_level,RSRP,RSRQ,DL_Throughput,UL_Throughput`.
//! Throughputs are written as fixed two-decimal Mbps values.
//! Persisting zero records is a reportable condition, not a silently
//! header-only file.

use crate::error::{AppResult, SweepError};
use crate::sweep::MeasurementRecord;
use log::info;
use std::fs::File;
use std::path::{Path, PathBuf};

/// CSV result store. Exclusively owns the destination file; the
/// controller only ever hands it completed records, never mutates past
/// rows.
pub struct CsvResultStore {
    path: PathBuf,
}

impl CsvResultStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Overwrites the destination with a header row followed by one row
    /// per record, in order. Fails with [`SweepError::EmptyResult`] when
    /// `records` is empty and with [`SweepError::Io`] when the
    /// destination cannot be written.
    pub fn write_all(&self, records: &[MeasurementRecord]) -> AppResult<()> {
        if records.is_empty() {
            return Err(SweepError::EmptyResult);
        }

        let file = File::create(&self.path)?;
        let mut writer = csv::Writer::from_writer(file);
        writer.write_record([
            "timestamp",
            "band",
            "power_level",
            "RSRP",
            "RSRQ",
            "DL_Throughput",
            "UL_Throughput",
        ])?;

        for record in records {
            writer.write_record(&[
                record.timestamp.to_rfc3339(),
                record.band.clone(),
                record.power_dbm.to_string(),
                record.rsrp_dbm.to_string(),
                record.rsrq_db.to_string(),
                format!("{:.2}", record.dl_mbps),
                format!("{:.2}", record.ul_mbps),
            ])?;
        }
        writer.flush()?;

        info!(
            "{} measurement(s) saved to {}",
            records.len(),
            self.path.display()
        );
        Ok(())
    }
}

impl From<csv::Error> for SweepError {
    fn from(e: csv::Error) -> Self {
        match e.into_kind() {
            csv::ErrorKind::Io(io) => SweepError::Io(io),
            other => SweepError::Io(std::io::Error::other(format!("CSV error: {:?}", other))),
        }
    }
}
