//! # Quark Diagnostic Runner
//!
//! Installs the tracing failure hook, runs one or all failure scenarios
//! under the top-level handler and exits with the handler's code.
//!
//! # Usage
//!
//! ```bash
//! # Run every recoverable scenario with the default configuration
//! quark_diagnostic
//!
//! # Custom configuration, verbose, JSON failure reports
//! quark_diagnostic --config diagnostic.toml -v --json
//!
//! # Let a failure escape to the top-level handler (exit code 101)
//! quark_diagnostic --scenario uncaught
//! ```

#![deny(warnings)]

mod scenarios;

use clap::Parser;
use quark_core::boundary::top_level;
use quark_core::config::{
    ConfigError, ConfigLoader, DiagnosticsConfig, FailureConfig, LogLevel, ReportFormat,
    SharedConfig,
};
use quark_core::consts::DEFAULT_CONFIG_PATH;
use quark_core::hook::{self, TracingHook};
use scenarios::Scenario;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{Level, debug, error, info};
use tracing_subscriber::EnvFilter;

/// Quark Diagnostic - exercises the structured-failure core
#[derive(Parser, Debug)]
#[command(name = "quark_diagnostic")]
#[command(author = "RTS007")]
#[command(version)]
#[command(about = "Runs failure scenarios through the structured-failure core")]
#[command(long_about = None)]
struct Args {
    /// Path to the diagnostics configuration file.
    /// Falls back to built-in defaults when omitted and the default path is absent.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Output logs and failure reports in JSON format
    #[arg(long)]
    json: bool,

    /// Scenario to run
    #[arg(long, value_enum, default_value_t = Scenario::All)]
    scenario: Scenario,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let config = match load_config(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            setup_tracing(&args, LogLevel::default());
            error!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    setup_tracing(&args, config.shared.log_level);
    info!(
        "Quark Diagnostic v{} starting ({})",
        env!("CARGO_PKG_VERSION"),
        config.shared.service_name
    );

    let mut failure = config.failure.clone();
    if args.json {
        failure.report_format = ReportFormat::Json;
    }
    debug!("Failure reporting: {:?}", failure);

    if let Err(e) = hook::install(TracingHook::new(failure)) {
        error!("Failed to install failure hook: {}", e);
        return ExitCode::FAILURE;
    }

    top_level(|| scenarios::run(args.scenario))
}

/// Load and validate the configuration.
///
/// An explicit path must exist. Without one, the default path is tried and
/// built-in defaults are used if it does not exist.
fn load_config(path: Option<&Path>) -> Result<DiagnosticsConfig, ConfigError> {
    let config = match path {
        Some(path) => DiagnosticsConfig::load(path)?,
        None => match DiagnosticsConfig::load(Path::new(DEFAULT_CONFIG_PATH)) {
            Ok(config) => config,
            Err(ConfigError::FileNotFound) => default_config(),
            Err(e) => return Err(e),
        },
    };
    config.validate()?;
    Ok(config)
}

fn default_config() -> DiagnosticsConfig {
    DiagnosticsConfig {
        shared: SharedConfig {
            log_level: LogLevel::Info,
            service_name: env!("CARGO_PKG_NAME").to_string(),
        },
        failure: FailureConfig::default(),
    }
}

/// Setup tracing subscriber based on CLI arguments and configured level.
fn setup_tracing(args: &Args, configured: LogLevel) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        Level::from(configured)
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
