//! Mantra CLI
//!
//! Command-line interface for Mantra - a quote collection kept in sync
//! with a remote quote service.

use std::fs::OpenOptions;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use mantra_core::{Config, QuoteStore};

mod commands;
mod output;
mod prompt;

use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "mantra")]
#[command(about = "Mantra - Quote collection with remote sync")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Use this config file instead of the default
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a quote
    Add {
        /// Quote text
        text: String,
        /// Category (defaults to "general")
        #[arg(short, long, default_value = "")]
        category: String,
        /// Don't post the quote to the server
        #[arg(long)]
        no_push: bool,
    },
    /// Show a random quote from the selected category (default)
    Random,
    /// List quotes
    #[command(alias = "ls")]
    List {
        /// Only this category, ignoring the saved filter
        #[arg(short, long)]
        category: Option<String>,
    },
    /// List categories with quote counts
    Categories,
    /// Set the category filter ("all" to clear it)
    Filter {
        /// Category name
        category: String,
    },
    /// Search quote text and categories
    Search {
        /// Search term
        term: String,
    },
    /// Show collection statistics
    Stats,
    /// Export quotes to a JSON file
    Export {
        /// Output file (defaults to quotes-export-<date>.json)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Only export this category
        #[arg(short, long)]
        category: Option<String>,
    },
    /// Import quotes from a JSON file
    Import {
        /// File to import
        file: PathBuf,
    },
    /// Remove every quote
    Clear {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Show collection and sync status
    Status,
    /// Run one sync cycle
    Sync,
    /// Sync periodically until interrupted
    Watch {
        /// Seconds between cycles (defaults to sync_interval_secs)
        #[arg(short, long)]
        interval: Option<u64>,
    },
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, api_url, sync_enabled, sync_interval_secs, ...)
        key: String,
        /// Configuration value
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));
    let config_path = cli.config.as_ref();

    // Config commands don't need the store
    if let Some(Commands::Config { command }) = &cli.command {
        return handle_config_command(command.clone(), config_path, &output);
    }

    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;
    init_logging(&config, cli.verbose);

    let mut store = QuoteStore::open_with_config(&config)?;

    match cli.command.unwrap_or(Commands::Random) {
        Commands::Add {
            text,
            category,
            no_push,
        } => commands::quote::add(store, &text, &category, !no_push, &config, &output).await,
        Commands::Random => commands::quote::random(&mut store, &output),
        Commands::List { category } => commands::quote::list(&store, category, &output),
        Commands::Categories => commands::category::list(&store, &output),
        Commands::Filter { category } => commands::category::filter(&mut store, &category, &output),
        Commands::Search { term } => commands::quote::search(&store, &term, &output),
        Commands::Stats => commands::quote::stats(&store, &output),
        Commands::Export {
            output: path,
            category,
        } => commands::transfer::export(&store, path, category, &output),
        Commands::Import { file } => commands::transfer::import(&mut store, &file, &output),
        Commands::Clear { yes } => commands::quote::clear(&mut store, yes, &output),
        Commands::Status => commands::status::show(&store, &config, &output),
        Commands::Sync => commands::sync::sync(store, &config, &output).await,
        Commands::Watch { interval } => {
            commands::sync::watch(store, &config, interval, &output).await
        }
        Commands::Config { .. } => unreachable!(), // Handled above
    }
}

fn handle_config_command(
    command: Option<ConfigCommands>,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(config_path, output),
        Some(ConfigCommands::Set { key, value }) => {
            commands::config::set(key, value, config_path, output)
        }
    }
}

/// Install the tracing subscriber
///
/// `RUST_LOG` wins over `--verbose`. Logs go to `log_file` when one is
/// configured and can be opened, otherwise to stderr.
fn init_logging(config: &Config, verbose: u8) {
    let log_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("mantra_core={},mantra_cli={}", log_level, log_level))
    });

    if let Some(log_path) = &config.log_file {
        match OpenOptions::new().create(true).append(true).open(log_path) {
            Ok(log_file) => {
                let _ = tracing_subscriber::fmt()
                    .with_env_filter(env_filter)
                    .with_target(false)
                    .with_ansi(false)
                    .with_writer(log_file)
                    .try_init();
                return;
            }
            Err(e) => {
                eprintln!("Warning: Could not open log file {:?}: {}", log_path, e);
            }
        }
    }

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
