//! End-to-end driver scenarios against scripted transports.

use std::fs;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tempfile::tempdir;
use voltlog_config::{Config, FileFormat, FilterStrategy, Mode};
use voltlog_core::mocks::{RecordingSink, ScriptedLink};
use voltlog_core::pipeline::{DriverState, PipelineDriver};
use voltlog_core::sink::NullSink;
use voltlog_core::{Gain, PipelineError};
use voltlog_traits::clock::test_clock::TestClock;
use voltlog_traits::Link;

type BoxedLink = Box<dyn Link + Send>;
type ConnectResult = Result<BoxedLink, Box<dyn std::error::Error + Send + Sync>>;

fn boxed(link: ScriptedLink) -> ConnectResult {
    Ok(Box::new(link))
}

/// Connector that serves the given links in order, failing once each one
/// is taken.
fn serve_links(
    links: Vec<ScriptedLink>,
) -> impl FnMut() -> ConnectResult {
    let mut queue: std::collections::VecDeque<ScriptedLink> = links.into();
    move || match queue.pop_front() {
        Some(link) => boxed(link),
        None => Err(std::io::Error::other("no device").into()),
    }
}

fn base_config(out_dir: &std::path::Path) -> Config {
    let mut cfg = Config::default();
    cfg.link.read_timeout_ms = 50;
    cfg.link.stall_timeout_ms = 200;
    cfg.link.retry_delay_ms = 10;
    cfg.storage.out_dir = out_dir.to_string_lossy().into_owned();
    // Timed flushes out of the way; termination flushes are under test.
    cfg.storage.flush_interval_s = 3_600;
    cfg
}

#[test]
fn samples_and_gain_changes_flow_to_a_binary_day_file() {
    let dir = tempdir().unwrap();
    let mut cfg = base_config(dir.path());
    cfg.mode = Mode::Acquire;
    cfg.storage.format = FileFormat::Binary;

    let connector = serve_links(vec![ScriptedLink::lines(["100", "GAIN_FOUR", "50"])]);
    let mut driver = PipelineDriver::new(
        &cfg,
        connector,
        RecordingSink::default(),
        TestClock::new(),
        Arc::new(AtomicBool::new(false)),
    )
    .unwrap()
    .with_frame_limit(2);

    let stats = driver.run().unwrap();
    assert_eq!(stats.accepted, 2);
    assert_eq!(stats.gain_changes, 1);
    assert_eq!(driver.state(), DriverState::Terminated);
    assert_eq!(driver.current_gain(), Gain::Four);

    let change = driver.sink().gain_changes[0];
    assert_eq!(change.old, Gain::One);
    assert_eq!(change.new, Gain::Four);

    // Two 16-byte records; values scaled by the gain in force at arrival.
    let files: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].extension().unwrap(), "bin");
    let bytes = fs::read(&files[0]).unwrap();
    assert_eq!(bytes.len(), 32);
    let first = f64::from_le_bytes(bytes[8..16].try_into().unwrap());
    let second = f64::from_le_bytes(bytes[24..32].try_into().unwrap());
    assert_eq!(first, 12.5); // 100 counts at GAIN_ONE
    assert_eq!(second, 1.5625); // 50 counts at GAIN_FOUR
}

#[test]
fn junk_lines_are_counted_but_never_persisted() {
    let dir = tempdir().unwrap();
    let mut cfg = base_config(dir.path());
    cfg.mode = Mode::Acquire;

    let connector = serve_links(vec![ScriptedLink::lines(["100", "bogus", "12.3.4", "8"])]);
    let mut driver = PipelineDriver::new(
        &cfg,
        connector,
        NullSink,
        TestClock::new(),
        Arc::new(AtomicBool::new(false)),
    )
    .unwrap()
    .with_frame_limit(2);

    let stats = driver.run().unwrap();
    assert_eq!(stats.accepted, 2);
    assert_eq!(stats.discarded, 2);

    let text = fs::read_to_string(
        fs::read_dir(dir.path())
            .unwrap()
            .next()
            .unwrap()
            .unwrap()
            .path(),
    )
    .unwrap();
    assert_eq!(text.lines().count(), 2);
}

#[test]
fn transport_loss_within_the_retry_budget_resumes_acquisition() {
    let dir = tempdir().unwrap();
    let mut cfg = base_config(dir.path());
    cfg.mode = Mode::Acquire;

    // First link dies after two samples; the replacement carries on.
    let connector = serve_links(vec![
        ScriptedLink::lines(["1", "2"]),
        ScriptedLink::lines(["3"]),
    ]);
    let mut driver = PipelineDriver::new(
        &cfg,
        connector,
        NullSink,
        TestClock::new(),
        Arc::new(AtomicBool::new(false)),
    )
    .unwrap()
    .with_frame_limit(3);

    let stats = driver.run().unwrap();
    assert_eq!(stats.accepted, 3);
    assert_eq!(stats.reconnects, 1);
    assert_eq!(driver.state(), DriverState::Terminated);
}

/// Link that stays connected but never produces a frame. Each poll
/// advances the shared test clock so the watchdog sees time passing.
struct SilentLink {
    clock: TestClock,
}

impl Link for SilentLink {
    fn read_line(
        &mut self,
        _timeout: Duration,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        std::thread::sleep(Duration::from_millis(1));
        self.clock.advance(Duration::from_millis(50));
        Err(std::io::Error::new(std::io::ErrorKind::TimedOut, "read timed out").into())
    }
}

#[test]
fn a_silent_link_trips_the_stall_watchdog_and_reconnects() {
    let dir = tempdir().unwrap();
    let mut cfg = base_config(dir.path());
    cfg.mode = Mode::Acquire;
    cfg.link.read_timeout_ms = 20;
    cfg.link.stall_timeout_ms = 200;

    // First link times out forever without disconnecting; only the
    // watchdog can get the driver off it. The replacement delivers.
    let clock = TestClock::new();
    let mut silent = Some(SilentLink {
        clock: clock.clone(),
    });
    let connector = move || -> ConnectResult {
        match silent.take() {
            Some(link) => Ok(Box::new(link) as BoxedLink),
            None => boxed(ScriptedLink::lines(["7"])),
        }
    };

    let mut driver = PipelineDriver::new(
        &cfg,
        connector,
        NullSink,
        clock,
        Arc::new(AtomicBool::new(false)),
    )
    .unwrap()
    .with_frame_limit(1);

    let stats = driver.run().unwrap();
    assert_eq!(stats.reconnects, 1);
    assert_eq!(stats.accepted, 1);
    assert_eq!(driver.state(), DriverState::Terminated);
}

#[test]
fn exhausting_the_connect_budget_is_terminal_and_closes_the_file() {
    let dir = tempdir().unwrap();
    let mut cfg = base_config(dir.path());
    cfg.mode = Mode::Acquire;
    cfg.link.connect_attempts = 2;

    let connector = serve_links(vec![]);
    let clock = TestClock::new();
    let mut driver = PipelineDriver::new(
        &cfg,
        connector,
        NullSink,
        clock.clone(),
        Arc::new(AtomicBool::new(false)),
    )
    .unwrap();

    let err = driver.run().unwrap_err();
    match err.downcast_ref::<PipelineError>() {
        Some(PipelineError::LinkUnavailable { attempts }) => assert_eq!(*attempts, 2),
        other => panic!("expected LinkUnavailable, got {other:?}"),
    }
    assert_eq!(driver.state(), DriverState::Terminated);
    // One sleep between the two attempts, none after the last.
    assert_eq!(clock.elapsed(), Duration::from_millis(10));
    // The day file was opened up front and survives the failed run.
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[test]
fn shutdown_request_terminates_cleanly_before_connecting() {
    let dir = tempdir().unwrap();
    let mut cfg = base_config(dir.path());
    cfg.mode = Mode::Acquire;

    let shutdown = Arc::new(AtomicBool::new(false));
    shutdown.store(true, Ordering::Relaxed);
    let mut driver = PipelineDriver::new(
        &cfg,
        serve_links(vec![ScriptedLink::lines(["1"])]),
        NullSink,
        TestClock::new(),
        shutdown,
    )
    .unwrap();

    let stats = driver.run().unwrap();
    assert_eq!(stats.accepted, 0);
    assert_eq!(driver.state(), DriverState::Terminated);
}

#[test]
fn visualize_mode_hands_windows_at_the_configured_cadence() {
    let dir = tempdir().unwrap();
    let mut cfg = base_config(dir.path());
    cfg.mode = Mode::Visualize;
    cfg.acquisition.buffer_capacity = 8;
    cfg.display.render_every = 2;
    cfg.display.spectrum_every = 2;

    let connector = serve_links(vec![ScriptedLink::lines(["1", "2", "3", "4"])]);
    let mut driver = PipelineDriver::new(
        &cfg,
        connector,
        RecordingSink::default(),
        TestClock::new(),
        Arc::new(AtomicBool::new(false)),
    )
    .unwrap()
    .with_frame_limit(4);

    driver.run().unwrap();
    // Two renders of the full window; the spectral view rides every second
    // render.
    assert_eq!(driver.sink().renders, vec![(8, false), (8, true)]);
    // Visualize mode writes nothing.
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn print_mode_reports_each_sample_and_writes_nothing() {
    let dir = tempdir().unwrap();
    let mut cfg = base_config(dir.path());
    cfg.mode = Mode::Print;

    let connector = serve_links(vec![ScriptedLink::lines(["8", "16"])]);
    let mut driver = PipelineDriver::new(
        &cfg,
        connector,
        RecordingSink::default(),
        TestClock::new(),
        Arc::new(AtomicBool::new(false)),
    )
    .unwrap()
    .with_frame_limit(2);

    driver.run().unwrap();
    assert_eq!(driver.sink().samples, vec![1.0, 2.0]);
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn filtered_runs_persist_the_estimate_for_the_current_sample() {
    let dir = tempdir().unwrap();
    let mut cfg = base_config(dir.path());
    cfg.mode = Mode::Acquire;
    cfg.filter.enabled = true;
    cfg.filter.strategy = FilterStrategy::Kalman;
    cfg.filter.process_noise = 1.0;
    cfg.filter.measurement_noise = 5.0;

    let connector = serve_links(vec![ScriptedLink::lines(["84.8"])]);
    let mut driver = PipelineDriver::new(
        &cfg,
        connector,
        NullSink,
        TestClock::new(),
        Arc::new(AtomicBool::new(false)),
    )
    .unwrap()
    .with_frame_limit(1);

    driver.run().unwrap();

    // First Kalman step from x=0, p=100: x' = z * (p+q)/(p+q+r).
    let z = 84.8_f64 * 0.125;
    let expected = (101.0 / 106.0) * z;
    let text = fs::read_to_string(
        fs::read_dir(dir.path())
            .unwrap()
            .next()
            .unwrap()
            .unwrap()
            .path(),
    )
    .unwrap();
    let persisted: f64 = text.trim_end().rsplit(',').next().unwrap().parse().unwrap();
    assert!((persisted - expected).abs() < 1e-6, "persisted {persisted}");
}
