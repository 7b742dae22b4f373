//! Console rendering of pipeline handoffs.
//!
//! Print mode writes one line per accepted sample, marking readings that
//! sit close to zero (steady contact) and readings far from the window
//! mean (likely motion or a loose lead). Visualize mode gets a compact
//! window summary instead of a plot; the plot itself is out of scope for
//! a terminal binary.

use voltlog_core::frame::{GainChange, Sample};
use voltlog_core::sink::VisualizationSink;
use voltlog_core::spectrum::SpectralView;

/// A reading within this band of zero counts as steady.
const STEADY_MV: f64 = 1.0;
/// Deviation from the window mean that gets a sample flagged.
const DEVIATION_MV: f64 = 5.0;

#[derive(Default)]
pub struct ConsoleSink;

impl VisualizationSink for ConsoleSink {
    fn render(&mut self, window: &[f64], spectrum: Option<&SpectralView>) {
        if window.is_empty() {
            return;
        }
        let n = window.len() as f64;
        let mean = window.iter().sum::<f64>() / n;
        let (mut min, mut max) = (f64::INFINITY, f64::NEG_INFINITY);
        for &v in window {
            min = min.min(v);
            max = max.max(v);
        }
        match spectrum.and_then(dominant_tone) {
            Some((hz, mag)) => println!(
                "window: min {min:.4} mV  max {max:.4} mV  mean {mean:.4} mV  peak {hz:.2} Hz ({mag:.3})"
            ),
            None => println!("window: min {min:.4} mV  max {max:.4} mV  mean {mean:.4} mV"),
        }
    }

    fn sample(&mut self, sample: &Sample, buffer_mean: f64) {
        let mv = sample.millivolts;
        let tag = classify(mv, buffer_mean);
        println!(
            "{}  {mv:>12.7} mV{tag}",
            sample.at.format("%H:%M:%S%.3f")
        );
    }

    fn gain_changed(&mut self, change: &GainChange) {
        println!(
            "gain {} -> {}  (range \u{00b1}{} mV)",
            change.old,
            change.new,
            change.new.range()
        );
    }
}

/// Steady contact wins: a reading parked near zero is reported steady
/// even while the window mean is still far away from it.
fn classify(mv: f64, buffer_mean: f64) -> &'static str {
    if mv.abs() <= STEADY_MV {
        "  (steady)"
    } else if (mv - buffer_mean).abs() >= DEVIATION_MV {
        "  !! off window mean"
    } else {
        ""
    }
}

/// Strongest non-DC bin, skipping bin 0.
fn dominant_tone(view: &SpectralView) -> Option<(f64, f64)> {
    view.frequencies_hz
        .iter()
        .zip(&view.magnitudes)
        .skip(1)
        .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(&hz, &mag)| (hz, mag))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn near_zero_reading_is_steady_even_far_from_the_window_mean() {
        assert_eq!(classify(0.4, 120.0), "  (steady)");
    }

    #[test]
    fn reading_far_from_the_window_mean_is_flagged() {
        assert_eq!(classify(30.0, 120.0), "  !! off window mean");
    }

    #[test]
    fn ordinary_reading_gets_no_tag() {
        assert_eq!(classify(10.0, 12.0), "");
    }
}
