//! Pipeline driver: one state machine owning the whole chain.
//!
//! `Running` pulls frames from the reader thread and pushes accepted
//! samples through filter → buffer → batch writer, with periodic handoffs
//! to the visualization sink. `Reconnecting` asks the link manager for a
//! fresh transport within its bounded retry budget. `Terminated` is final.
//!
//! The buffer and writer are owned exclusively by this driver, so they
//! need no locking; the only concurrency is the reader thread on the far
//! side of a bounded channel.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::Local;
use crossbeam_channel::RecvTimeoutError;
use voltlog_config::{Config, Mode};
use voltlog_traits::{Clock, Link};

use crate::error::{PipelineError, Result as CoreResult};
use crate::filter::SampleFilter;
use crate::frame::{Frame, FrameParser, Sample};
use crate::gain::Gain;
use crate::link::{ConnectResult, LinkManager};
use crate::reader::{LineReader, LinkEvent};
use crate::ring::CircularBuffer;
use crate::sink::VisualizationSink;
use crate::spectrum::spectral_magnitudes;
use crate::writer::{BatchRecord, BatchWriter};

/// Driver state machine. `Terminated` is final; the process exits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Running,
    Reconnecting,
    Terminated,
}

/// Counters reported at the end of a run.
#[derive(Debug, Default, Clone, Copy)]
pub struct PipelineStats {
    pub accepted: u64,
    pub discarded: u64,
    pub gain_changes: u64,
    pub flushes: u64,
    pub reconnects: u64,
}

type BoxedLink = Box<dyn Link + Send>;

pub struct PipelineDriver<C, K, F>
where
    C: Clock + Clone + Send + Sync + 'static,
    K: VisualizationSink,
    F: FnMut() -> ConnectResult<BoxedLink>,
{
    mode: Mode,
    parser: FrameParser,
    filter: Option<SampleFilter>,
    raw: CircularBuffer,
    writer: Option<BatchWriter>,
    manager: LinkManager<BoxedLink, F>,
    reader: Option<LineReader<C>>,
    sink: K,
    clock: C,
    shutdown: Arc<AtomicBool>,
    state: DriverState,
    stats: PipelineStats,
    read_timeout: Duration,
    stall_timeout_ms: u64,
    sample_rate_hz: f64,
    render_every: u32,
    spectrum_every: u32,
    since_render: u32,
    renders: u64,
    /// Stop after this many accepted samples; 0 = unlimited.
    frame_limit: u64,
}

impl<C, K, F> PipelineDriver<C, K, F>
where
    C: Clock + Clone + Send + Sync + 'static,
    K: VisualizationSink,
    F: FnMut() -> ConnectResult<BoxedLink>,
{
    /// Build the driver from a validated config. Fails with a typed
    /// `Config` error before any I/O except opening the output file.
    pub fn new(
        cfg: &Config,
        connector: F,
        sink: K,
        clock: C,
        shutdown: Arc<AtomicBool>,
    ) -> Result<Self, PipelineError> {
        let initial_gain: Gain = cfg
            .acquisition
            .initial_gain
            .parse()
            .map_err(|e| PipelineError::Config(format!("{e}")))?;
        let capacity = cfg.acquisition.buffer_capacity;
        let filter = SampleFilter::from_cfg(&cfg.filter, capacity)?;

        let writer = if storage_active(cfg.mode) {
            Some(BatchWriter::open(
                std::path::Path::new(&cfg.storage.out_dir),
                cfg.storage.format,
                Duration::from_secs(cfg.storage.flush_interval_s),
                clock.now(),
                Local::now().date_naive(),
            )?)
        } else {
            None
        };

        let manager = LinkManager::new(
            connector,
            cfg.link.connect_attempts,
            Duration::from_millis(cfg.link.retry_delay_ms),
        );

        Ok(Self {
            mode: cfg.mode,
            parser: FrameParser::new(initial_gain),
            filter,
            raw: CircularBuffer::new(capacity),
            writer,
            manager,
            reader: None,
            sink,
            clock,
            shutdown,
            state: DriverState::Reconnecting,
            stats: PipelineStats::default(),
            read_timeout: Duration::from_millis(cfg.link.read_timeout_ms),
            stall_timeout_ms: cfg.link.stall_timeout_ms,
            sample_rate_hz: cfg.acquisition.sample_rate_hz,
            render_every: cfg.display.render_every,
            spectrum_every: cfg.display.spectrum_every,
            since_render: 0,
            renders: 0,
            frame_limit: 0,
        })
    }

    /// Stop after `n` accepted samples (0 = unlimited). Used for bounded
    /// capture runs and tests.
    pub fn with_frame_limit(mut self, n: u64) -> Self {
        self.frame_limit = n;
        self
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn current_gain(&self) -> Gain {
        self.parser.current_gain()
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    /// Drive the pipeline until clean shutdown, the frame limit, or an
    /// unrecoverable link failure.
    pub fn run(&mut self) -> CoreResult<PipelineStats> {
        tracing::info!(
            mode = ?self.mode,
            gain = %self.parser.current_gain(),
            sample_rate_hz = self.sample_rate_hz,
            "pipeline starting"
        );
        loop {
            if self.shutdown.load(Ordering::Relaxed) && self.state != DriverState::Terminated {
                self.terminate("shutdown requested")?;
            }
            match self.state {
                DriverState::Running => self.step()?,
                DriverState::Reconnecting => self.reconnect()?,
                DriverState::Terminated => break,
            }
        }
        Ok(self.stats)
    }

    fn reconnect(&mut self) -> CoreResult<()> {
        match self.manager.connect(&self.clock) {
            Ok(link) => {
                self.reader = Some(LineReader::spawn(
                    link,
                    self.read_timeout,
                    self.clock.clone(),
                ));
                self.state = DriverState::Running;
                Ok(())
            }
            Err(e) => {
                // Retry budget exhausted: flush what we hold, close the
                // output, and report the terminal condition.
                self.close_output()?;
                self.state = DriverState::Terminated;
                tracing::error!(
                    error = %e,
                    "file closed due to connection loss at {}",
                    Local::now().format("%Y-%m-%d %H:%M:%S")
                );
                Err(e.into())
            }
        }
    }

    fn step(&mut self) -> CoreResult<()> {
        let event = match &self.reader {
            Some(reader) => reader.recv_timeout(self.read_timeout),
            None => {
                self.state = DriverState::Reconnecting;
                return Ok(());
            }
        };
        match event {
            Ok(LinkEvent::Line(line)) => self.handle_line(&line),
            Ok(LinkEvent::Lost) => self.enter_reconnecting("transport disconnected"),
            Err(RecvTimeoutError::Timeout) => {
                let stalled = self
                    .reader
                    .as_ref()
                    .map(|r| r.stalled_for_now())
                    .unwrap_or(u64::MAX);
                if stalled > self.stall_timeout_ms {
                    self.enter_reconnecting("link stalled beyond watchdog threshold");
                }
            }
            Err(RecvTimeoutError::Disconnected) => {
                self.enter_reconnecting("reader thread gone");
            }
        }

        if let Some(writer) = &mut self.writer
            && writer.flush_if_due(self.clock.now(), Local::now().date_naive())?
        {
            self.stats.flushes += 1;
        }

        if self.frame_limit > 0 && self.stats.accepted >= self.frame_limit {
            self.terminate("frame limit reached")?;
        }
        Ok(())
    }

    fn enter_reconnecting(&mut self, why: &str) {
        tracing::warn!("{why}; attempting to reconnect");
        // Samples lost during the gap are accepted, not backfilled.
        self.reader = None;
        self.stats.reconnects += 1;
        self.state = DriverState::Reconnecting;
    }

    fn handle_line(&mut self, line: &str) {
        match self.parser.classify(line, chrono::Utc::now()) {
            Frame::Sample(sample) => self.accept_sample(&sample),
            Frame::GainChanged(change) => {
                self.stats.gain_changes += 1;
                self.sink.gain_changed(&change);
            }
            Frame::Discarded(reason) => {
                self.stats.discarded += 1;
                tracing::debug!(?reason, line, "frame dropped");
            }
        }
    }

    fn accept_sample(&mut self, sample: &Sample) {
        self.raw.push(sample.millivolts);
        self.stats.accepted += 1;

        // When filtering, the persisted value is the one just computed for
        // this sample: the newest element of the filtered window.
        let (filtered_window, persisted) = match &mut self.filter {
            Some(filter) => {
                let view = self.raw.chronological_view();
                let fw = filter.process(&view, sample.millivolts);
                let newest = fw.last().copied().unwrap_or(sample.millivolts);
                (Some(fw), newest)
            }
            None => (None, sample.millivolts),
        };

        if let Some(writer) = &mut self.writer {
            writer.accept(BatchRecord::new(sample, persisted));
        }

        if self.mode == Mode::Print {
            self.sink.sample(sample, self.raw.populated_mean());
        }

        if matches!(self.mode, Mode::Visualize | Mode::Both) {
            self.since_render += 1;
            if self.since_render >= self.render_every {
                self.since_render = 0;
                self.renders += 1;
                let window = filtered_window.unwrap_or_else(|| self.raw.chronological_view());
                let spectrum = if self.renders % u64::from(self.spectrum_every) == 0 {
                    Some(spectral_magnitudes(&window, self.sample_rate_hz))
                } else {
                    None
                };
                self.sink.render(&window, spectrum.as_ref());
            }
        }
    }

    fn terminate(&mut self, why: &str) -> CoreResult<()> {
        self.close_output()?;
        self.reader = None;
        self.state = DriverState::Terminated;
        tracing::info!(
            accepted = self.stats.accepted,
            discarded = self.stats.discarded,
            flushes = self.stats.flushes,
            reconnects = self.stats.reconnects,
            "pipeline terminated: {why}"
        );
        Ok(())
    }

    /// Flush the pending batch and drop the file handle. Nothing already
    /// accepted into the batch is lost on a clean shutdown.
    fn close_output(&mut self) -> Result<(), PipelineError> {
        if let Some(mut writer) = self.writer.take() {
            writer.force_flush(Local::now().date_naive())?;
        }
        Ok(())
    }
}

fn storage_active(mode: Mode) -> bool {
    matches!(mode, Mode::Acquire | Mode::Both)
}
