//! Test and helper mocks for voltlog_core

use std::collections::VecDeque;
use std::time::Duration;

use voltlog_traits::Link;

use crate::frame::{GainChange, Sample};
use crate::sink::VisualizationSink;
use crate::spectrum::SpectralView;

/// One scripted transport interaction.
#[derive(Debug, Clone)]
pub enum ScriptStep {
    Line(String),
    Timeout,
    Disconnect,
}

/// Deterministic in-memory link for tests: plays back a script, then
/// reports disconnection forever.
pub struct ScriptedLink {
    steps: VecDeque<ScriptStep>,
}

impl ScriptedLink {
    pub fn new(steps: impl IntoIterator<Item = ScriptStep>) -> Self {
        Self {
            steps: steps.into_iter().collect(),
        }
    }

    /// Script that yields these lines in order, then disconnects.
    pub fn lines<S: Into<String>>(lines: impl IntoIterator<Item = S>) -> Self {
        Self::new(lines.into_iter().map(|l| ScriptStep::Line(l.into())))
    }
}

/// Sink that records every handoff for assertions.
#[derive(Default)]
pub struct RecordingSink {
    /// (window length, spectrum attached) per render call.
    pub renders: Vec<(usize, bool)>,
    pub samples: Vec<f64>,
    pub gain_changes: Vec<GainChange>,
}

impl VisualizationSink for RecordingSink {
    fn render(&mut self, window: &[f64], spectrum: Option<&SpectralView>) {
        self.renders.push((window.len(), spectrum.is_some()));
    }

    fn sample(&mut self, sample: &Sample, _buffer_mean: f64) {
        self.samples.push(sample.millivolts);
    }

    fn gain_changed(&mut self, change: &GainChange) {
        self.gain_changes.push(*change);
    }
}

impl Link for ScriptedLink {
    fn read_line(
        &mut self,
        _timeout: Duration,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        match self.steps.pop_front() {
            Some(ScriptStep::Line(l)) => Ok(l),
            Some(ScriptStep::Timeout) => Err(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "read timed out",
            )
            .into()),
            Some(ScriptStep::Disconnect) | None => {
                Err(std::io::Error::other("link disconnected").into())
            }
        }
    }
}
