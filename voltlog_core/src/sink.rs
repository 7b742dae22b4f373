//! Visualization sink seam.
//!
//! Rendering itself is an external collaborator; the pipeline only hands
//! over ready-to-draw data at a bounded rate. Implementations must
//! tolerate windows that are not yet fully populated (leading zeros).

use crate::frame::{GainChange, Sample};
use crate::spectrum::SpectralView;

pub trait VisualizationSink {
    /// Periodic handoff of the chronological (filtered-or-raw) window,
    /// with a spectral view on the less frequent cadence.
    fn render(&mut self, window: &[f64], spectrum: Option<&SpectralView>);

    /// Per-sample callback; `buffer_mean` is the mean over populated slots.
    /// Used by console-print mode. Default: ignore.
    fn sample(&mut self, sample: &Sample, buffer_mean: f64) {
        let _ = (sample, buffer_mean);
    }

    /// The device changed gain; plot ranges should be refreshed from
    /// `change.new.range()`. Default: ignore.
    fn gain_changed(&mut self, change: &GainChange) {
        let _ = change;
    }
}

/// Sink that discards everything (acquire-only mode).
pub struct NullSink;

impl VisualizationSink for NullSink {
    fn render(&mut self, _window: &[f64], _spectrum: Option<&SpectralView>) {}
}
