//! Clap command definition.

use clap::{value_parser, Arg, ArgAction, Command};

/// Build the CLI command.
///
/// Every harness knob is optional here; anything left unset keeps the value
/// from `--config` or the built-in default.
pub fn build_cli() -> Command {
    Command::new("bankstress")
        .about("Concurrent bank-transfer consistency harness for OCC transactional stores")
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .help("TOML config file; flags override its values"),
        )
        .arg(
            Arg::new("users")
                .long("users")
                .help("Number of accounts (default: 2)")
                .value_parser(value_parser!(u64)),
        )
        .arg(
            Arg::new("txns")
                .long("txns")
                .help("Concurrent workers per endpoint (default: 3)")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("dur")
                .long("dur")
                .help("How long to run transfers, e.g. 90s or 1m30s (default: 1m)"),
        )
        .arg(
            Arg::new("alpha")
                .long("alpha")
                .help("Comma-separated store endpoints (default: localhost:9080)"),
        )
        .arg(bool_flag("verbose", "Log every transfer and abort (default: true)"))
        .arg(bool_flag("login", "Log in on every connection (default: true)"))
        .arg(
            Arg::new("user")
                .long("user")
                .help("Login user (default: groot)"),
        )
        .arg(
            Arg::new("password")
                .long("password")
                .help("Login password (default: password)"),
        )
        .arg(
            Arg::new("balance")
                .long("balance")
                .help("Starting balance of each account (default: 10)")
                .value_parser(value_parser!(u64)),
        )
        .arg(
            Arg::new("seed")
                .long("seed")
                .help("Fixed seed for reproducible picks (default: random)")
                .value_parser(value_parser!(u64)),
        )
        .arg(
            Arg::new("write-config")
                .long("write-config")
                .help("Write the effective config to this path and exit"),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .help("JSON output mode")
                .action(ArgAction::SetTrue),
        )
}

/// `--name`, `--name=true` or `--name=false`
fn bool_flag(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name)
        .long(name)
        .help(help)
        .value_parser(value_parser!(bool))
        .num_args(0..=1)
        .require_equals(true)
        .default_missing_value("true")
}
