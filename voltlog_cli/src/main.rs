//! `voltlog` binary: argument parsing, logging setup, signal handling,
//! and dispatch into the acquisition pipeline.

mod cli;
mod console;
mod error_fmt;
mod run;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use eyre::WrapErr;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use cli::{Cli, Commands, FILE_GUARD, JSON_MODE};
use voltlog_config::{Config, firmware};

fn main() {
    if let Err(e) = color_eyre::install() {
        eprintln!("failed to install error reporter: {e}");
    }
    let args = Cli::parse();
    let _ = JSON_MODE.set(args.json);

    match real_main(args) {
        Ok(()) => {}
        Err(e) => {
            if JSON_MODE.get().copied().unwrap_or(false) {
                eprintln!("{}", error_fmt::format_error_json(&e));
            } else {
                eprintln!("{}", error_fmt::humanize(&e));
            }
            std::process::exit(error_fmt::exit_code_for_error(&e));
        }
    }
}

fn real_main(args: Cli) -> eyre::Result<()> {
    let mut cfg = load_config(&args)?;
    init_tracing(&args, &cfg.logging)?;

    if let Some(sketch) = cfg.link.firmware_sketch.clone() {
        let params = firmware::load_sketch(std::path::Path::new(&sketch))
            .wrap_err_with(|| format!("failed to read firmware sketch {sketch}"))?;
        cfg.apply_firmware(&params)?;
        tracing::info!(
            sketch,
            baud = cfg.link.baud,
            sample_rate_hz = cfg.acquisition.sample_rate_hz,
            gain = %cfg.acquisition.initial_gain,
            "link parameters taken from firmware sketch"
        );
    }

    match args.cmd {
        Commands::Run {
            mode,
            format,
            flush_interval,
            port,
            no_filter,
            filter,
            frames,
            out_dir,
            print_runtime,
        } => {
            let run_args = run::RunArgs {
                mode,
                format,
                flush_interval,
                port,
                no_filter,
                filter,
                frames,
                out_dir,
                print_runtime,
            };
            run::apply_overrides(&mut cfg, &run_args);
            cfg.validate()?;
            let shutdown = install_shutdown_handler()?;
            run::run(&cfg, &run_args, shutdown)
        }
        Commands::SelfCheck => {
            cfg.validate()?;
            run::self_check(&cfg)
        }
    }
}

fn load_config(args: &Cli) -> eyre::Result<Config> {
    if !args.config.exists() {
        // Defaults are a complete simulated setup; a missing file is not
        // an error for development runs.
        return Ok(Config::default());
    }
    let text = std::fs::read_to_string(&args.config)
        .wrap_err_with(|| format!("failed to read config {}", args.config.display()))?;
    voltlog_config::load_toml(&text)
        .wrap_err_with(|| format!("invalid config {}", args.config.display()))
}

fn init_tracing(args: &Cli, logging: &voltlog_config::Logging) -> eyre::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(logging.level.as_deref().unwrap_or(&args.log_level)));

    let mut layers = Vec::new();
    let console = if args.json {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };
    layers.push(console);

    if let Some(path) = &logging.file {
        let path = std::path::Path::new(path);
        let dir = path.parent().unwrap_or(std::path::Path::new("."));
        let name = path
            .file_name()
            .ok_or_else(|| eyre::eyre!("logging.file must name a file"))?;
        let appender = match logging.rotation.as_deref() {
            Some("daily") => tracing_appender::rolling::daily(dir, name),
            Some("hourly") => tracing_appender::rolling::hourly(dir, name),
            Some("never") | None => tracing_appender::rolling::never(dir, name),
            Some(other) => eyre::bail!("logging.rotation must be never|daily|hourly, got {other:?}"),
        };
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let _ = FILE_GUARD.set(guard);
        layers.push(
            tracing_subscriber::fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(writer)
                .boxed(),
        );
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .init();
    Ok(())
}

fn install_shutdown_handler() -> eyre::Result<Arc<AtomicBool>> {
    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = shutdown.clone();
    ctrlc::set_handler(move || {
        // Second Ctrl-C while the pipeline is flushing kills the process.
        if flag.swap(true, Ordering::Relaxed) {
            std::process::exit(130);
        }
        tracing::info!("shutdown requested; flushing pending batch");
    })
    .wrap_err("failed to install Ctrl-C handler")?;
    Ok(shutdown)
}
