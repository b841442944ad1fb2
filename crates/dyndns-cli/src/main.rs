//! dyndns command line interface
//!
//! Runs one update cycle and exits. Meant to be invoked periodically, from
//! cron or a systemd timer; the persisted-state cache keeps the repeated
//! runs cheap.
//!
//! Exit codes: 0 for a clean run (published or nothing to do), 1 for a
//! configuration problem, 2 for a runtime failure.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use dyndns_core::{
    store_from_config, Config, Engine, Error, Platform, StubZoneResolver, TcpTransport,
    UpdateDispatcher, UpdateOutcome,
};
use dyndns_ifaces::SystemAddressSource;

/// Publishes this machine's addresses into its DNS zone.
#[derive(Debug, Parser)]
#[command(name = "dyndns", version, about)]
struct Args {
    /// Configuration file; defaults to the platform's conventional location
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Send the update even when nothing changed
    #[arg(short = 'f', long = "force")]
    force: bool,

    /// Interfaces to collect addresses from; all of them when omitted
    interfaces: Vec<String>,
}

/// Exit codes, following systemd conventions.
#[derive(Debug, Clone, Copy)]
enum CliExitCode {
    /// Clean run, records are up to date
    CleanShutdown = 0,
    /// Configuration error
    ConfigError = 1,
    /// The run itself failed
    RuntimeError = 2,
}

impl From<CliExitCode> for ExitCode {
    fn from(code: CliExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    let platform = Platform::current();

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| platform.default_config_path());
    let config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return CliExitCode::ConfigError.into();
        }
    };

    let log_level = match config.logging.level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        other => {
            eprintln!(
                "invalid log level {:?}, valid levels: trace, debug, info, warn, error",
                other
            );
            return CliExitCode::ConfigError.into();
        }
    };
    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("failed to set tracing subscriber: {}", e);
        return CliExitCode::ConfigError.into();
    }

    // One shot, no concurrency: a single-threaded runtime is all it takes.
    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("failed to create tokio runtime: {}", e);
            return CliExitCode::RuntimeError.into();
        }
    };

    rt.block_on(run(&args, &config, platform)).into()
}

/// Wires the engine together. Everything that can fail here is a
/// configuration problem.
fn build_engine(config: &Config, platform: Platform) -> anyhow::Result<Engine> {
    let dispatcher = UpdateDispatcher::new(
        Box::new(StubZoneResolver::new()),
        Box::new(TcpTransport::default()),
        config.ttl,
        config.tsig.as_ref(),
    )
    .context("failed to set up the update dispatcher")?;

    let store = store_from_config(&config.cache, platform);
    Engine::new(
        config,
        platform,
        Box::new(SystemAddressSource::new()),
        store,
        dispatcher,
    )
    .context("failed to set up the update engine")
}

async fn run(args: &Args, config: &Config, platform: Platform) -> CliExitCode {
    let engine = match build_engine(config, platform) {
        Ok(engine) => engine,
        Err(e) => {
            error!("{:#}", e);
            return CliExitCode::ConfigError;
        }
    };

    match engine.run(&args.interfaces, args.force).await {
        UpdateOutcome::Skipped => {
            info!("records for {} already up to date", engine.hostname());
            CliExitCode::CleanShutdown
        }
        UpdateOutcome::Published => {
            info!("published records for {}", engine.hostname());
            CliExitCode::CleanShutdown
        }
        // The nameserver accepted the update; only the local cache write
        // failed. Say so, or operators chase a DNS failure that never
        // happened.
        UpdateOutcome::Failed(Error::StateStore(reason)) => {
            error!(
                "published records for {}, but saving the state file failed: {}",
                engine.hostname(),
                reason
            );
            CliExitCode::RuntimeError
        }
        UpdateOutcome::Failed(e) => {
            error!("update failed: {}", e);
            CliExitCode::RuntimeError
        }
    }
}
