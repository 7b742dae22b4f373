#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema and firmware introspection for the voltage logger.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - The firmware sketch parser recovers baud rate, sampling rate, and the
//!   initial gain index from the device-side Arduino sketch, so the logger
//!   never disagrees with the firmware about link parameters.

use serde::Deserialize;

pub mod firmware;

/// Gain identifiers the device firmware may announce, in firmware table
/// order. The scale/range table itself lives in `voltlog_core::gain`.
pub const GAIN_NAMES: [&str; 6] = [
    "GAIN_TWOTHIRDS",
    "GAIN_ONE",
    "GAIN_TWO",
    "GAIN_FOUR",
    "GAIN_EIGHT",
    "GAIN_SIXTEEN",
];

/// Operating mode of the pipeline driver.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Persist to disk only; no visualization handoff.
    #[default]
    Acquire,
    /// Visualization handoff only; nothing written to disk.
    Visualize,
    /// Single cadence that both persists and visualizes.
    Both,
    /// Print each accepted sample to the console.
    Print,
}

/// On-disk serialization format, fixed for the lifetime of a run.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    #[default]
    Text,
    Binary,
}

impl FileFormat {
    pub fn extension(self) -> &'static str {
        match self {
            FileFormat::Text => "txt",
            FileFormat::Binary => "bin",
        }
    }
}

/// Which smoothing strategy runs when filtering is enabled.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FilterStrategy {
    /// Local-polynomial (Savitzky-Golay) smoother over the whole window.
    #[default]
    Savgol,
    /// Scalar steady-state Kalman estimator, incremental per sample.
    Kalman,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LinkCfg {
    /// Serial port identifier (e.g. "/dev/ttyUSB0", "COM5"). Required for
    /// real hardware; ignored by the simulated link.
    pub port: Option<String>,
    /// Baud rate. Normally derived from the firmware sketch; a value here
    /// is used only when no sketch is configured.
    pub baud: u32,
    /// Max connect attempts before the pipeline is considered unrecoverable.
    pub connect_attempts: u32,
    /// Fixed delay between connect attempts (ms).
    pub retry_delay_ms: u64,
    /// Per-read timeout (ms); a read may never block forever.
    pub read_timeout_ms: u64,
    /// Silence beyond this is classified as link loss (ms).
    pub stall_timeout_ms: u64,
    /// Optional path to the device firmware sketch; when set, baud,
    /// sample rate, and initial gain are read from it (see `firmware`).
    pub firmware_sketch: Option<String>,
}

impl Default for LinkCfg {
    fn default() -> Self {
        Self {
            port: None,
            baud: 115_200,
            connect_attempts: 5,
            retry_delay_ms: 500,
            read_timeout_ms: 1_000,
            stall_timeout_ms: 5_000,
            firmware_sketch: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AcquisitionCfg {
    /// Sampling rate in Hz. Derived from the firmware sketch when present.
    pub sample_rate_hz: f64,
    /// Circular buffer capacity in samples.
    pub buffer_capacity: usize,
    /// Initial gain identifier; must be one of `GAIN_NAMES`. Overridden by
    /// the firmware sketch when present.
    pub initial_gain: String,
}

impl Default for AcquisitionCfg {
    fn default() -> Self {
        Self {
            sample_rate_hz: 32.0,
            buffer_capacity: 500,
            initial_gain: "GAIN_ONE".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct FilterCfg {
    pub enabled: bool,
    pub strategy: FilterStrategy,
    /// Savitzky-Golay sliding window width in samples.
    pub window: usize,
    /// Savitzky-Golay polynomial order; must be < window.
    pub order: usize,
    /// Kalman process noise variance.
    pub process_noise: f64,
    /// Kalman measurement noise variance.
    pub measurement_noise: f64,
}

impl Default for FilterCfg {
    fn default() -> Self {
        Self {
            enabled: false,
            strategy: FilterStrategy::Savgol,
            window: 20,
            order: 2,
            process_noise: 1.0,
            measurement_noise: 5.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageCfg {
    pub format: FileFormat,
    /// Seconds between timed batch flushes.
    pub flush_interval_s: u64,
    /// Directory where day files are created.
    pub out_dir: String,
}

impl Default for StorageCfg {
    fn default() -> Self {
        Self {
            format: FileFormat::Text,
            flush_interval_s: 15,
            out_dir: ".".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DisplayCfg {
    /// Hand a chronological window to the sink every N accepted samples.
    pub render_every: u32,
    /// Hand a spectral view along every N renders.
    pub spectrum_every: u32,
}

impl Default for DisplayCfg {
    fn default() -> Self {
        Self {
            render_every: 50,
            spectrum_every: 1,
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Config {
    pub mode: Mode,
    pub link: LinkCfg,
    pub acquisition: AcquisitionCfg,
    pub filter: FilterCfg,
    pub storage: StorageCfg,
    pub display: DisplayCfg,
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Link
        if self.link.baud == 0 {
            eyre::bail!("link.baud must be > 0");
        }
        if self.link.connect_attempts == 0 {
            eyre::bail!("link.connect_attempts must be >= 1");
        }
        if self.link.read_timeout_ms == 0 {
            eyre::bail!("link.read_timeout_ms must be >= 1");
        }
        if self.link.stall_timeout_ms < self.link.read_timeout_ms {
            eyre::bail!("link.stall_timeout_ms must be >= link.read_timeout_ms");
        }

        // Acquisition
        if !(self.acquisition.sample_rate_hz > 0.0) {
            eyre::bail!("acquisition.sample_rate_hz must be > 0");
        }
        if self.acquisition.buffer_capacity == 0 {
            eyre::bail!("acquisition.buffer_capacity must be >= 1");
        }
        if !GAIN_NAMES.contains(&self.acquisition.initial_gain.as_str()) {
            eyre::bail!(
                "acquisition.initial_gain must be one of {}, got {:?}",
                GAIN_NAMES.join(", "),
                self.acquisition.initial_gain
            );
        }

        // Filter
        if self.filter.window < 2 {
            eyre::bail!("filter.window must be >= 2");
        }
        if self.filter.order >= self.filter.window {
            eyre::bail!("filter.order must be < filter.window");
        }
        if !(self.filter.process_noise > 0.0) {
            eyre::bail!("filter.process_noise must be > 0");
        }
        if !(self.filter.measurement_noise > 0.0) {
            eyre::bail!("filter.measurement_noise must be > 0");
        }

        // Storage
        if self.storage.flush_interval_s == 0 {
            eyre::bail!("storage.flush_interval_s must be >= 1");
        }
        if self.storage.flush_interval_s > 24 * 60 * 60 {
            eyre::bail!("storage.flush_interval_s is unreasonably large (>24h)");
        }

        // Display
        if self.display.render_every == 0 {
            eyre::bail!("display.render_every must be >= 1");
        }
        if self.display.spectrum_every == 0 {
            eyre::bail!("display.spectrum_every must be >= 1");
        }

        Ok(())
    }

    /// Overlay firmware-derived link parameters onto this config.
    ///
    /// Values present in the sketch win over the TOML values, matching the
    /// rule that baud, sampling rate, and initial gain are device-side
    /// configuration rather than independently settable.
    pub fn apply_firmware(&mut self, fw: &firmware::FirmwareParams) -> eyre::Result<()> {
        if let Some(baud) = fw.baud {
            self.link.baud = baud;
        }
        if let Some(fs) = fw.sample_rate_hz {
            self.acquisition.sample_rate_hz = fs;
        }
        if let Some(idx) = fw.gain_index {
            let name = GAIN_NAMES.get(idx).ok_or_else(|| {
                eyre::eyre!("firmware gain index {idx} outside the gain table (0..=5)")
            })?;
            self.acquisition.initial_gain = (*name).to_string();
        }
        Ok(())
    }
}
