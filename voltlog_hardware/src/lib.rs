pub mod error;
pub mod framing;
#[cfg(feature = "hardware")]
pub mod serial;

#[cfg(feature = "hardware")]
pub use serial::SerialLink;

use std::time::Duration;
use voltlog_traits::Link;

/// Simulated ADC link for development and tests.
///
/// Emits newline-framed decimal counts tracing a sine wave, paced at the
/// configured sample rate, and announces a gain identifier every
/// `gain_announce_every` frames the way the real firmware does after a
/// range change. Deterministic: no randomness, phase only.
pub struct SimulatedLink {
    period: Duration,
    phase: f64,
    phase_step: f64,
    amplitude: f64,
    frames: u64,
    gain_announce_every: Option<u64>,
    gain_name: &'static str,
}

impl SimulatedLink {
    pub fn new(sample_rate_hz: f64) -> Self {
        let rate = if sample_rate_hz > 0.0 {
            sample_rate_hz
        } else {
            32.0
        };
        Self {
            period: Duration::from_secs_f64(1.0 / rate),
            phase: 0.0,
            phase_step: 2.0 * std::f64::consts::PI * 1.0 / rate, // 1 Hz tone
            amplitude: 800.0,
            frames: 0,
            gain_announce_every: None,
            gain_name: "GAIN_ONE",
        }
    }

    /// Announce `gain_name` every `every` frames, interleaved with data.
    pub fn with_gain_announcements(mut self, gain_name: &'static str, every: u64) -> Self {
        self.gain_announce_every = Some(every.max(1));
        self.gain_name = gain_name;
        self
    }
}

impl Link for SimulatedLink {
    fn read_line(
        &mut self,
        _timeout: Duration,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        std::thread::sleep(self.period);
        self.frames += 1;
        if let Some(every) = self.gain_announce_every
            && self.frames % every == 0
        {
            return Ok(self.gain_name.to_string());
        }
        let count = (self.phase.sin() * self.amplitude).round();
        self.phase += self.phase_step;
        Ok(format!("{count}"))
    }
}
