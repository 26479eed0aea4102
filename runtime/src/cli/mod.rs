//! CLI subcommand implementations for the `pricewatch` binary.

pub mod catalog_cmd;
pub mod check_cmd;
pub mod doctor;
pub mod history_cmd;
pub mod latest_cmd;
pub mod output;
pub mod watch_cmd;

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber. Logs go to stderr so stdout stays
/// clean for tables and JSON.
pub fn init_tracing(verbose: bool, json: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("pricewatch_runtime={level},pricewatch={level},warn"))
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    // A second init (e.g. in tests) is harmless.
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}
