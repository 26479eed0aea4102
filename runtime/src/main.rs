// Copyright 2026 Pricewatch Contributors
// SPDX-License-Identifier: Apache-2.0

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use pricewatch_runtime::cli;
use pricewatch_runtime::config::Settings;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(
    name = "pricewatch",
    about = "Pricewatch — track product prices with a headless browser",
    version,
    after_help = "Run 'pricewatch <command> --help' for details on each command."
)]
struct Cli {
    /// Output results as JSON (machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Suppress non-essential output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Enable verbose/debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// SQLite database path (overrides PRICEWATCH_DB)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// JSON catalog path (overrides PRICEWATCH_CATALOG)
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Acquire every catalog price once and record the ones that changed
    Check {
        /// Report what would be recorded without writing
        #[arg(long)]
        dry_run: bool,
    },
    /// Run checks on a fixed interval until interrupted
    Watch {
        /// Seconds between checks (overrides PRICEWATCH_INTERVAL_SECS)
        #[arg(long)]
        interval: Option<u64>,
        /// Report what would be recorded without writing
        #[arg(long)]
        dry_run: bool,
    },
    /// Show recorded observations, newest first
    History {
        /// Only this product (display name)
        #[arg(long)]
        product: Option<String>,
        /// Maximum number of rows
        #[arg(long, default_value = "50")]
        limit: usize,
    },
    /// Show the latest price of every product and the basket total
    Latest,
    /// Show the configured catalog
    Catalog,
    /// Check environment and diagnose issues
    Doctor,
    /// Generate shell completion scripts
    Completions {
        /// Shell type (bash, zsh, fish, powershell)
        shell: Shell,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set global flags via environment variables so all modules can check them
    if cli.json {
        std::env::set_var("PRICEWATCH_JSON", "1");
    }
    if cli.quiet {
        std::env::set_var("PRICEWATCH_QUIET", "1");
    }
    if cli.no_color {
        std::env::set_var("PRICEWATCH_NO_COLOR", "1");
    }

    cli::init_tracing(cli.verbose, cli.json);

    let mut settings = Settings::from_env();
    if let Some(db) = cli.db {
        settings.db_path = db;
    }
    if let Some(catalog) = cli.catalog {
        settings.catalog_path = Some(catalog);
    }

    let result = match cli.command {
        Commands::Check { dry_run } => cli::check_cmd::run(&settings, dry_run).await,
        Commands::Watch { interval, dry_run } => {
            let interval = interval
                .map(|secs| Duration::from_secs(secs.max(1)))
                .unwrap_or(settings.check_interval);
            cli::watch_cmd::run(&settings, interval, dry_run).await
        }
        Commands::History { product, limit } => {
            cli::history_cmd::run(&settings, product.as_deref(), Some(limit))
        }
        Commands::Latest => cli::latest_cmd::run(&settings),
        Commands::Catalog => cli::catalog_cmd::run(&settings),
        Commands::Doctor => cli::doctor::run(&settings),
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "pricewatch", &mut std::io::stdout());
            Ok(())
        }
    };

    // Consistent exit codes: 0=success, 1=error
    if let Err(e) = &result {
        if !cli::output::is_quiet() && !cli::output::is_json() {
            eprintln!("  Error: {e:#}");
        }
        if cli::output::is_json() {
            cli::output::print_json(&serde_json::json!({
                "error": true,
                "message": format!("{e:#}"),
            }));
        }
        std::process::exit(1);
    }

    result
}
