//! Batched, timed persistence with day-based file rollover.
//!
//! Records accumulate in memory; disk is touched only on the timed flush
//! (or a forced one at shutdown), as one write call for the whole batch.
//! Files are opened in append mode so a restart on the same date continues
//! the same file. Format is fixed for the lifetime of a run:
//!
//! - text: `<unix_timestamp_float>,<value>\n`, value at 7 decimal digits
//! - binary: consecutive 16-byte records, two little-endian f64s
//!   (timestamp, value)

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use voltlog_config::FileFormat;

use crate::error::PipelineError;
use crate::frame::Sample;

/// One persisted unit: wall-clock seconds since epoch and a value in
/// physical units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchRecord {
    pub timestamp: f64,
    pub value: f64,
}

impl BatchRecord {
    /// Record for `sample`, persisting `value` (which may be the filtered
    /// value computed for this sample rather than the raw one).
    pub fn new(sample: &Sample, value: f64) -> Self {
        Self {
            timestamp: sample.epoch_seconds(),
            value,
        }
    }
}

pub struct BatchWriter {
    format: FileFormat,
    dir: PathBuf,
    file: File,
    open_date: NaiveDate,
    pending: Vec<BatchRecord>,
    interval: Duration,
    last_flush: Instant,
}

impl BatchWriter {
    /// Open (append) today's file under `dir`, creating the directory if
    /// needed. `now` seeds the flush timer.
    pub fn open(
        dir: &Path,
        format: FileFormat,
        interval: Duration,
        now: Instant,
        today: NaiveDate,
    ) -> Result<Self, PipelineError> {
        std::fs::create_dir_all(dir)?;
        let path = Self::day_path(dir, today, format);
        let file = Self::open_append(&path)?;
        tracing::info!(path = %path.display(), "output file open");
        Ok(Self {
            format,
            dir: dir.to_path_buf(),
            file,
            open_date: today,
            pending: Vec::new(),
            interval,
            last_flush: now,
        })
    }

    /// Filename derived from the calendar date: `DD-MM-YYYY.<ext>`.
    pub fn day_path(dir: &Path, date: NaiveDate, format: FileFormat) -> PathBuf {
        dir.join(format!(
            "{}.{}",
            date.format("%d-%m-%Y"),
            format.extension()
        ))
    }

    /// Path of the currently open file.
    pub fn current_path(&self) -> PathBuf {
        Self::day_path(&self.dir, self.open_date, self.format)
    }

    /// Queue one record; no disk I/O on this call.
    pub fn accept(&mut self, record: BatchRecord) {
        self.pending.push(record);
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Reopen the output when the calendar date has advanced. Idempotent:
    /// calling twice within the same date reopens at most once.
    pub fn roll_over_if_needed(&mut self, today: NaiveDate) -> Result<bool, PipelineError> {
        if today == self.open_date {
            return Ok(false);
        }
        let path = Self::day_path(&self.dir, today, self.format);
        self.file = Self::open_append(&path)?;
        self.open_date = today;
        tracing::info!(path = %path.display(), "rolled over to new day file");
        Ok(true)
    }

    /// Timed flush check: when the interval has elapsed, roll over if the
    /// date advanced, write the whole pending batch in one call, clear it,
    /// and reset the timer to `now`. Returns whether a flush happened.
    pub fn flush_if_due(&mut self, now: Instant, today: NaiveDate) -> Result<bool, PipelineError> {
        if now.saturating_duration_since(self.last_flush) < self.interval {
            return Ok(false);
        }
        self.roll_over_if_needed(today)?;
        self.write_pending()?;
        self.last_flush = now;
        Ok(true)
    }

    /// Unconditional flush, for clean shutdown and terminal link loss.
    /// Nothing accepted before this call is lost.
    pub fn force_flush(&mut self, today: NaiveDate) -> Result<(), PipelineError> {
        self.roll_over_if_needed(today)?;
        self.write_pending()
    }

    fn open_append(path: &Path) -> Result<File, PipelineError> {
        Ok(OpenOptions::new().create(true).append(true).open(path)?)
    }

    fn write_pending(&mut self) -> Result<(), PipelineError> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let mut buf: Vec<u8> = Vec::with_capacity(self.pending.len() * 32);
        match self.format {
            FileFormat::Text => {
                for r in &self.pending {
                    // 7 decimal digits on the value, matching the on-disk
                    // contract consumers parse.
                    let line = format!("{},{:.7}\n", r.timestamp, r.value);
                    buf.extend_from_slice(line.as_bytes());
                }
            }
            FileFormat::Binary => {
                for r in &self.pending {
                    buf.extend_from_slice(&r.timestamp.to_le_bytes());
                    buf.extend_from_slice(&r.value.to_le_bytes());
                }
            }
        }
        self.file.write_all(&buf)?;
        self.file.flush()?;
        tracing::info!(
            records = self.pending.len(),
            at = %chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            "batch written"
        );
        self.pending.clear();
        Ok(())
    }
}
