//! Spectral magnitude view of a sample window.
//!
//! Pure function over a chronological window; consumed only by the
//! visualization sink. Bin layout follows the usual real-input convention:
//! the first N/2 bins, spaced at sample_rate / N.

use rustfft::{FftPlanner, num_complex::Complex64};

#[derive(Debug, Clone, PartialEq)]
pub struct SpectralView {
    pub frequencies_hz: Vec<f64>,
    pub magnitudes: Vec<f64>,
}

/// Magnitude-of-frequency-components transform of `window`.
///
/// Tolerates a buffer not yet fully populated; leading zeros simply
/// contribute nothing.
pub fn spectral_magnitudes(window: &[f64], sample_rate_hz: f64) -> SpectralView {
    let n = window.len();
    if n == 0 {
        return SpectralView {
            frequencies_hz: Vec::new(),
            magnitudes: Vec::new(),
        };
    }
    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(n);
    let mut buffer: Vec<Complex64> = window.iter().map(|&v| Complex64::new(v, 0.0)).collect();
    fft.process(&mut buffer);

    let bins = n / 2;
    let frequencies_hz = (0..bins)
        .map(|k| k as f64 * sample_rate_hz / n as f64)
        .collect();
    let magnitudes = buffer
        .iter()
        .take(bins)
        .map(|c| c.norm() / n as f64)
        .collect();
    SpectralView {
        frequencies_hz,
        magnitudes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pure_tone_peaks_at_its_bin() {
        let n = 256;
        let fs = 64.0;
        let tone_bin = 16; // 4 Hz
        let window: Vec<f64> = (0..n)
            .map(|i| (2.0 * std::f64::consts::PI * tone_bin as f64 * i as f64 / n as f64).sin())
            .collect();
        let view = spectral_magnitudes(&window, fs);
        assert_eq!(view.magnitudes.len(), n / 2);
        let peak = view
            .magnitudes
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .unwrap()
            .0;
        assert_eq!(peak, tone_bin);
        assert!((view.frequencies_hz[peak] - 4.0).abs() < 1e-9);
    }

    #[test]
    fn empty_window_yields_empty_view() {
        let view = spectral_magnitudes(&[], 32.0);
        assert!(view.magnitudes.is_empty());
        assert!(view.frequencies_hz.is_empty());
    }

    #[test]
    fn dc_signal_lands_in_bin_zero() {
        let view = spectral_magnitudes(&[3.0; 64], 32.0);
        assert!((view.magnitudes[0] - 3.0).abs() < 1e-9);
        assert!(view.magnitudes[1..].iter().all(|m| *m < 1e-9));
    }
}
