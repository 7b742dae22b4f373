//! Optional smoothing of the sample window.
//!
//! Two interchangeable strategies, selected by configuration:
//!
//! - **Savitzky-Golay**: local-polynomial regression over a sliding window,
//!   recomputed over the entire chronological window on every sample. Edge
//!   regions are filled by evaluating a polynomial fit to the first/last
//!   window, so the output never shrinks. O(window) per interior point is
//!   fine at tens of Hz.
//! - **Kalman**: scalar steady-state predict/update recursion with fixed
//!   process and measurement noise, genuinely incremental. It keeps its own
//!   ring of past estimates so it can still hand out a full filtered
//!   window.
//!
//! Filtering is purely computational; no I/O happens here.

use voltlog_config::{FilterCfg, FilterStrategy};

use crate::error::PipelineError;
use crate::ring::CircularBuffer;

pub enum SampleFilter {
    Savgol(Savgol),
    Kalman(Kalman),
}

impl SampleFilter {
    /// Build the configured strategy; `None` when filtering is disabled.
    /// `capacity` is the circular buffer capacity, used to size the Kalman
    /// estimate history.
    pub fn from_cfg(cfg: &FilterCfg, capacity: usize) -> Result<Option<Self>, PipelineError> {
        if !cfg.enabled {
            return Ok(None);
        }
        let filter = match cfg.strategy {
            FilterStrategy::Savgol => SampleFilter::Savgol(Savgol::new(cfg.window, cfg.order)?),
            FilterStrategy::Kalman => SampleFilter::Kalman(Kalman::new(
                cfg.process_noise,
                cfg.measurement_noise,
                capacity,
            )),
        };
        Ok(Some(filter))
    }

    /// Produce the filtered window for the current state of the buffer.
    ///
    /// `raw_chronological` is the time-ordered raw window whose last element
    /// is `newest`, the sample just accepted. The returned window has the
    /// same length; its last element is the filtered value for `newest`.
    pub fn process(&mut self, raw_chronological: &[f64], newest: f64) -> Vec<f64> {
        match self {
            SampleFilter::Savgol(s) => s.smooth(raw_chronological),
            SampleFilter::Kalman(k) => k.step(newest),
        }
    }
}

/// Savitzky-Golay smoother with precomputed center coefficients.
pub struct Savgol {
    window: usize,
    order: usize,
    /// Least-squares evaluation weights for the window midpoint.
    center: Vec<f64>,
}

impl Savgol {
    pub fn new(window: usize, order: usize) -> Result<Self, PipelineError> {
        if window < 2 || order >= window {
            return Err(PipelineError::Config(format!(
                "savgol filter needs order < window and window >= 2, got window={window} order={order}"
            )));
        }
        let center = center_weights(window, order).ok_or_else(|| {
            PipelineError::Config(format!(
                "savgol normal equations singular for window={window} order={order}"
            ))
        })?;
        Ok(Self {
            window,
            order,
            center,
        })
    }

    /// Smooth a whole window. Pure: same input, same output.
    pub fn smooth(&self, x: &[f64]) -> Vec<f64> {
        let n = x.len();
        if n == 0 {
            return Vec::new();
        }
        if n < self.window {
            // Window does not fit yet: fit one polynomial to everything.
            let order = self.order.min(n - 1);
            return match polyfit(x, order) {
                Some(coeffs) => (0..n).map(|i| polyval(&coeffs, i as f64)).collect(),
                None => x.to_vec(),
            };
        }

        let w = self.window;
        let half_lo = (w - 1) / 2;
        let half_hi = w - 1 - half_lo;
        let mut out = vec![0.0; n];

        // Interior: dot product with the precomputed midpoint weights.
        for i in half_lo..n - half_hi {
            let start = i - half_lo;
            out[i] = self
                .center
                .iter()
                .zip(&x[start..start + w])
                .map(|(c, v)| c * v)
                .sum();
        }

        // Edges: polynomial fit to the first/last window, evaluated at the
        // uncovered positions (no output shrinkage).
        if let Some(head) = polyfit(&x[..w], self.order) {
            for i in 0..half_lo {
                out[i] = polyval(&head, i as f64);
            }
        } else {
            out[..half_lo].copy_from_slice(&x[..half_lo]);
        }
        if let Some(tail) = polyfit(&x[n - w..], self.order) {
            for i in n - half_hi..n {
                out[i] = polyval(&tail, (i - (n - w)) as f64);
            }
        } else {
            out[n - half_hi..].copy_from_slice(&x[n - half_hi..]);
        }
        out
    }
}

/// Scalar steady-state estimator with persistent state and covariance.
pub struct Kalman {
    x: f64,
    p: f64,
    q: f64,
    r: f64,
    history: CircularBuffer,
}

impl Kalman {
    pub fn new(process_noise: f64, measurement_noise: f64, capacity: usize) -> Self {
        Self {
            x: 0.0,
            // Large initial covariance: trust the first measurements.
            p: 100.0,
            q: process_noise,
            r: measurement_noise,
            history: CircularBuffer::new(capacity),
        }
    }

    /// One predict/update cycle; O(1).
    pub fn update(&mut self, z: f64) -> f64 {
        self.p += self.q;
        let k = self.p / (self.p + self.r);
        self.x += k * (z - self.x);
        self.p *= 1.0 - k;
        self.x
    }

    fn step(&mut self, newest: f64) -> Vec<f64> {
        let est = self.update(newest);
        self.history.push(est);
        self.history.chronological_view()
    }
}

/// Least-squares weights that evaluate an order-`order` fit of `window`
/// equally spaced samples at the window midpoint `(window-1)/2`.
fn center_weights(window: usize, order: usize) -> Option<Vec<f64>> {
    let t0 = (window as f64 - 1.0) / 2.0;
    let m = order + 1;
    // Normal matrix N[j][k] = sum_i t_i^(j+k), rhs = powers of t0.
    let mut moments = vec![0.0; 2 * order + 1];
    for i in 0..window {
        let t = i as f64;
        let mut pw = 1.0;
        for moment in moments.iter_mut() {
            *moment += pw;
            pw *= t;
        }
    }
    let a: Vec<Vec<f64>> = (0..m)
        .map(|j| (0..m).map(|k| moments[j + k]).collect())
        .collect();
    let rhs: Vec<f64> = (0..m).map(|j| t0.powi(j as i32)).collect();
    let z = solve_linear(a, rhs)?;
    // weight_i = sum_j z_j * t_i^j  (symmetry of the normal matrix)
    Some((0..window).map(|i| polyval(&z, i as f64)).collect())
}

/// Ordinary least-squares polynomial fit of `y` against implicit positions
/// 0..len, via the normal equations. Coefficients are low-order first.
fn polyfit(y: &[f64], order: usize) -> Option<Vec<f64>> {
    let m = order + 1;
    if y.len() < m {
        return None;
    }
    let mut moments = vec![0.0; 2 * order + 1];
    let mut rhs = vec![0.0; m];
    for (i, &v) in y.iter().enumerate() {
        let t = i as f64;
        let mut pw = 1.0;
        for (j, moment) in moments.iter_mut().enumerate() {
            *moment += pw;
            if j < m {
                rhs[j] += pw * v;
            }
            pw *= t;
        }
    }
    let a: Vec<Vec<f64>> = (0..m)
        .map(|j| (0..m).map(|k| moments[j + k]).collect())
        .collect();
    solve_linear(a, rhs)
}

#[inline]
fn polyval(coeffs: &[f64], t: f64) -> f64 {
    coeffs.iter().rev().fold(0.0, |acc, c| acc * t + c)
}

/// Gaussian elimination with partial pivoting. None on a singular system.
fn solve_linear(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Option<Vec<f64>> {
    let n = b.len();
    for col in 0..n {
        let pivot = (col..n).max_by(|&i, &j| {
            a[i][col]
                .abs()
                .partial_cmp(&a[j][col].abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        })?;
        if a[pivot][col].abs() < 1e-12 {
            return None;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);
        for row in col + 1..n {
            let factor = a[row][col] / a[col][col];
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }
    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let mut acc = b[row];
        for col in row + 1..n {
            acc -= a[row][col] * x[col];
        }
        x[row] = acc / a[row][row];
    }
    Some(x)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quadratic(n: usize) -> Vec<f64> {
        (0..n).map(|i| 0.5 * (i as f64).powi(2) - 3.0 * i as f64 + 7.0).collect()
    }

    #[test]
    fn savgol_reproduces_a_quadratic_exactly() {
        // An order-2 fit of order-2 data is exact everywhere, edges included.
        let data = quadratic(64);
        let filter = Savgol::new(11, 2).unwrap();
        let out = filter.smooth(&data);
        assert_eq!(out.len(), data.len());
        for (a, b) in out.iter().zip(&data) {
            assert!((a - b).abs() < 1e-6, "{a} != {b}");
        }
    }

    #[test]
    fn savgol_is_deterministic() {
        let data: Vec<f64> = (0..128).map(|i| ((i * 37) % 101) as f64 * 0.1).collect();
        let filter = Savgol::new(20, 2).unwrap();
        assert_eq!(filter.smooth(&data), filter.smooth(&data));
    }

    #[test]
    fn savgol_preserves_length_below_window_size() {
        let filter = Savgol::new(20, 2).unwrap();
        for n in [0usize, 1, 2, 5, 19] {
            let data = quadratic(n.max(1))[..n].to_vec();
            assert_eq!(filter.smooth(&data).len(), n);
        }
    }

    #[test]
    fn savgol_rejects_order_not_below_window() {
        assert!(Savgol::new(5, 5).is_err());
        assert!(Savgol::new(1, 0).is_err());
    }

    #[test]
    fn savgol_smooths_toward_local_trend() {
        // Constant signal with one spike: the spike must shrink.
        let mut data = vec![10.0; 41];
        data[20] = 50.0;
        let filter = Savgol::new(11, 2).unwrap();
        let out = filter.smooth(&data);
        assert!(out[20] < 40.0, "spike not attenuated: {}", out[20]);
        assert!((out[0] - 10.0).abs() < 1.0);
    }

    #[test]
    fn kalman_converges_to_a_constant_signal() {
        let mut k = Kalman::new(1.0, 5.0, 16);
        let mut est = 0.0;
        for _ in 0..200 {
            est = k.update(42.0);
        }
        assert!((est - 42.0).abs() < 0.5, "estimate {est}");
    }

    #[test]
    fn kalman_state_persists_across_calls() {
        let mut k = Kalman::new(1.0, 5.0, 4);
        let first = k.update(100.0);
        let second = k.update(100.0);
        // Second estimate must build on the first, not restart from zero.
        assert!(second > first);
        let window = k.step(100.0);
        assert_eq!(window.len(), 4);
        assert!(window[3] > second);
    }

    #[test]
    fn disabled_filter_config_builds_none() {
        let cfg = FilterCfg::default();
        assert!(SampleFilter::from_cfg(&cfg, 500).unwrap().is_none());
    }
}
