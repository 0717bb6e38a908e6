// SPDX-License-Identifier: MIT
// svcdispatchd: runs a set of background services until SIGINT/SIGTERM
//
// - Every service gets its own worker thread from the dispatcher.
// - On a shutdown signal all services are interrupted, then joined.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use log::{error, info};
use nix::sys::signal::{SigSet, Signal};
use svcdispatch::{Dispatcher, Runnable};

pub mod global_config;
pub mod services;

use crate::global_config::{ServiceDecl, ServiceKind};
use crate::services::deadline::Deadline;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Service to run (repeatable). Defaults to a single heartbeat.
    #[arg(long = "service", value_enum, conflicts_with = "config")]
    services: Vec<ServiceKind>,

    /// JSON file with an array of service declarations. Excludes --service.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Interval for services declared without one
    #[arg(long, value_name = "MS", default_value_t = global_config::DEFAULT_INTERVAL_MS)]
    interval_ms: u64,

    /// Path for status-file services declared without one
    #[arg(long, value_name = "PATH", default_value = global_config::DEFAULT_STATUS_FILE)]
    status_file: PathBuf,

    /// Shut down on our own after this many milliseconds
    #[arg(long, value_name = "MS")]
    run_for_ms: Option<u64>,
}

fn validate_args(args: &Args) -> Result<(), String> {
    if args.interval_ms == 0 {
        return Err("--interval-ms must be greater than zero".into());
    }

    if args.status_file.as_os_str().is_empty() {
        return Err("--status-file must not be empty".into());
    }

    Ok(())
}

fn service_decls(args: &Args) -> anyhow::Result<Vec<ServiceDecl>> {
    if let Some(config) = &args.config {
        return global_config::load_service_decls(config);
    }

    let kinds = if args.services.is_empty() {
        vec![ServiceKind::Heartbeat]
    } else {
        args.services.clone()
    };
    Ok(kinds.into_iter().map(ServiceDecl::from).collect())
}

fn register_services(
    dispatcher: &Dispatcher,
    decls: &[ServiceDecl],
    run_for: Option<Duration>,
) -> anyhow::Result<()> {
    for decl in decls {
        let runnable = services::build_runnable(decl);
        let name = runnable.name().to_string();
        dispatcher
            .add_service(runnable)
            .with_context(|| format!("failed to start service {name:?}"))?;
    }

    if let Some(after) = run_for {
        dispatcher
            .add_service(Runnable::shared(Deadline::new(after)))
            .context("failed to start the deadline service")?;
    }

    Ok(())
}

fn shutdown(dispatcher: &Dispatcher) {
    dispatcher.stop_services();
    dispatcher.join_services();
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    if let Err(e) = validate_args(&args) {
        eprintln!("Error: {e}");
        std::process::exit(2);
    }

    global_config::initialize_global_config(
        Duration::from_millis(args.interval_ms),
        args.status_file.clone(),
    )?;
    let decls = service_decls(&args)?;

    // Blocked before the first worker exists, so every thread inherits the
    // mask and the signals stay pending until sigwait below.
    let mut shutdown_signals = SigSet::empty();
    shutdown_signals.add(Signal::SIGINT);
    shutdown_signals.add(Signal::SIGTERM);
    shutdown_signals
        .thread_block()
        .context("failed to block shutdown signals")?;

    let dispatcher = Dispatcher::instance();
    if let Err(e) = register_services(
        dispatcher,
        &decls,
        args.run_for_ms.map(Duration::from_millis),
    ) {
        error!("{e:#}");
        shutdown(dispatcher);
        return Err(e);
    }

    info!(
        "Starting svcdispatchd with services {:?}",
        dispatcher.service_names()
    );

    let signal = shutdown_signals
        .wait()
        .context("failed to wait for a shutdown signal")?;
    info!("Received {signal:?}, stopping services");

    shutdown(dispatcher);
    info!("Stopping svcdispatchd");

    Ok(())
}
