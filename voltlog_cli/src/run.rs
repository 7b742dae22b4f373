//! Run-command wiring: config overrides, transport assembly, and the
//! pipeline run itself.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Instant;

use eyre::WrapErr;
use voltlog_config::Config;
use voltlog_core::pipeline::PipelineDriver;
use voltlog_traits::{Link, MonotonicClock};

use crate::cli::{FilterArg, FormatArg, ModeArg};
use crate::console::ConsoleSink;

pub struct RunArgs {
    pub mode: Option<ModeArg>,
    pub format: Option<FormatArg>,
    pub flush_interval: Option<u64>,
    pub port: Option<String>,
    pub no_filter: bool,
    pub filter: Option<FilterArg>,
    pub frames: u64,
    pub out_dir: Option<PathBuf>,
    pub print_runtime: bool,
}

/// CLI flags win over the TOML, which already absorbed the firmware
/// sketch overlay.
pub fn apply_overrides(cfg: &mut Config, args: &RunArgs) {
    if let Some(mode) = args.mode {
        cfg.mode = mode.into();
    }
    if let Some(format) = args.format {
        cfg.storage.format = format.into();
    }
    if let Some(secs) = args.flush_interval {
        cfg.storage.flush_interval_s = secs;
    }
    if let Some(port) = &args.port {
        cfg.link.port = Some(port.clone());
    }
    if args.no_filter {
        cfg.filter.enabled = false;
    }
    if let Some(strategy) = args.filter {
        cfg.filter.enabled = true;
        cfg.filter.strategy = strategy.into();
    }
    if let Some(dir) = &args.out_dir {
        cfg.storage.out_dir = dir.to_string_lossy().into_owned();
    }
}

type BoxedLink = Box<dyn Link + Send>;
type ConnectResult = Result<BoxedLink, Box<dyn std::error::Error + Send + Sync>>;

#[cfg(feature = "hardware")]
fn connector(cfg: &Config) -> eyre::Result<impl FnMut() -> ConnectResult + use<>> {
    let port = cfg
        .link
        .port
        .clone()
        .ok_or_else(|| eyre::eyre!("link.port is required when built with hardware support"))?;
    let baud = cfg.link.baud;
    let read_timeout = std::time::Duration::from_millis(cfg.link.read_timeout_ms);
    Ok(move || {
        let link = voltlog_hardware::SerialLink::open(&port, baud, read_timeout)?;
        Ok(Box::new(link) as BoxedLink)
    })
}

#[cfg(not(feature = "hardware"))]
fn connector(cfg: &Config) -> eyre::Result<impl FnMut() -> ConnectResult + use<>> {
    let sample_rate_hz = cfg.acquisition.sample_rate_hz;
    Ok(move || Ok(Box::new(voltlog_hardware::SimulatedLink::new(sample_rate_hz)) as BoxedLink))
}

pub fn run(cfg: &Config, args: &RunArgs, shutdown: Arc<AtomicBool>) -> eyre::Result<()> {
    let connect = connector(cfg)?;
    let mut driver = PipelineDriver::new(
        cfg,
        connect,
        ConsoleSink::default(),
        MonotonicClock::new(),
        shutdown,
    )
    .wrap_err("failed to assemble the acquisition pipeline")?
    .with_frame_limit(args.frames);

    let started = Instant::now();
    let stats = driver.run()?;

    tracing::info!(
        accepted = stats.accepted,
        discarded = stats.discarded,
        gain_changes = stats.gain_changes,
        flushes = stats.flushes,
        reconnects = stats.reconnects,
        "run finished"
    );
    if args.print_runtime {
        println!(
            "runtime: {:.3} s ({} samples)",
            started.elapsed().as_secs_f64(),
            stats.accepted
        );
    }
    Ok(())
}

/// One connect attempt plus one read, then hang up. Proves the transport
/// (or the simulation) is usable without starting a full run.
pub fn self_check(cfg: &Config) -> eyre::Result<()> {
    let mut connect = connector(cfg)?;
    let mut link = connect().map_err(|e| eyre::eyre!("transport unavailable: {e}"))?;
    let timeout = std::time::Duration::from_millis(cfg.link.read_timeout_ms);
    let line = link
        .read_line(timeout)
        .map_err(|e| eyre::eyre!("transport opened but produced no frame: {e}"))?;
    println!("self-check ok (first frame: {line:?})");
    Ok(())
}
