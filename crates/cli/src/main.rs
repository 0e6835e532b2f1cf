//! bankstress: concurrent bank-transfer consistency harness.
//!
//! Loads the harness config (`--config` file, then flag overrides), runs
//! the workload against an in-process OCC cluster serving every `--alpha`
//! endpoint and prints the run report. Exits 1 on any failure.

mod commands;
mod format;

use std::path::Path;
use std::process;
use std::sync::Arc;

use anyhow::Context;
use bank_concurrency::MemoryCluster;
use bank_harness::{Harness, HarnessConfig};
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use commands::build_cli;
use format::{format_error, format_report, OutputMode};

fn main() {
    let matches = build_cli().get_matches();

    let output_mode = if matches.get_flag("json") {
        OutputMode::Json
    } else {
        OutputMode::Human
    };

    let config = match load_config(&matches) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("(error) {:#}", e);
            process::exit(1);
        }
    };

    if let Some(path) = matches.get_one::<String>("write-config") {
        match config.write_to_file(Path::new(path)) {
            Ok(()) => {
                eprintln!("Wrote config to {}", path);
                return;
            }
            Err(e) => {
                eprintln!("(error) {}", e);
                process::exit(1);
            }
        }
    }

    init_logging(config.verbose);

    let cluster = match config.credentials() {
        Some(credentials) => MemoryCluster::with_acl(config.endpoints(), credentials),
        None => MemoryCluster::new(config.endpoints()),
    };
    let harness = Harness::new(config, Arc::new(cluster));
    info!(target: "bank::harness", run_id = %harness.run_id(), "run starting");

    match harness.run() {
        Ok(report) => println!("{}", format_report(&report, output_mode)),
        Err(e) => {
            error!(target: "bank::harness", run_id = %harness.run_id(), error = %e, "run failed");
            println!("{}", format_error(&e, output_mode));
            process::exit(1);
        }
    }
}

/// Config file (if any) with command-line overrides applied.
fn load_config(matches: &clap::ArgMatches) -> anyhow::Result<HarnessConfig> {
    let mut config = match matches.get_one::<String>("config") {
        Some(path) => HarnessConfig::from_file(Path::new(path))
            .with_context(|| format!("loading config from {}", path))?,
        None => HarnessConfig::default(),
    };

    if let Some(users) = matches.get_one::<u64>("users") {
        config.users = *users;
    }
    if let Some(txns) = matches.get_one::<usize>("txns") {
        config.txns = *txns;
    }
    if let Some(dur) = matches.get_one::<String>("dur") {
        config.dur = dur.clone();
    }
    if let Some(alpha) = matches.get_one::<String>("alpha") {
        config.alpha = alpha.clone();
    }
    if let Some(verbose) = matches.get_one::<bool>("verbose") {
        config.verbose = *verbose;
    }
    if let Some(login) = matches.get_one::<bool>("login") {
        config.login = *login;
    }
    if let Some(user) = matches.get_one::<String>("user") {
        config.user = user.clone();
    }
    if let Some(password) = matches.get_one::<String>("password") {
        config.password = password.clone();
    }
    if let Some(balance) = matches.get_one::<u64>("balance") {
        config.starting_balance = *balance;
    }
    if let Some(seed) = matches.get_one::<u64>("seed") {
        config.seed = Some(*seed);
    }

    config.validate().context("invalid configuration")?;
    Ok(config)
}

/// Filter used when `RUST_LOG` is unset
///
/// Verbose raises only the harness target; store internals stay at info.
fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "info,bank::harness=debug"
    } else {
        "info"
    }
}

/// Log to stderr so `--json` output on stdout stays parseable.
fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .compact(),
        )
        .try_init();
}
