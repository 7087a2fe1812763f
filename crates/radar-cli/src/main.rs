use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod input;
mod prompter;
mod renderer;

#[derive(Parser)]
#[command(name = "radar")]
#[command(about = "Memory-polling entity radar", version)]
struct Args {
    /// Directory holding config.json (defaults to the platform config dir)
    #[arg(long, global = true, env = "RADAR_CONFIG_DIR")]
    config_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Attach to the target and run the radar (default)
    Run {
        /// Read from a memory image file instead of a live target
        #[arg(long)]
        image: Option<PathBuf>,

        /// Override the configured target process name
        #[arg(short, long)]
        target: Option<String>,

        /// Reset unreadable configuration to defaults without asking
        #[arg(long)]
        reset_on_corruption: bool,
    },
    /// Inspect or reset the stored configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Inspect or clear the affiliation cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the stored configuration as JSON
    Show,
    /// Overwrite the stored configuration with defaults
    Reset,
    /// Print the configuration file path
    Path,
}

#[derive(Subcommand)]
enum CacheAction {
    /// Print cached group affiliations
    Show,
    /// Remove all cached affiliations
    Clear,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let directive = if args.verbose {
        "radar=debug"
    } else {
        "radar=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(directive.parse()?))
        .with_writer(std::io::stderr)
        .init();

    let config_dir = args
        .config_dir
        .unwrap_or_else(commands::default_config_dir);

    match args.command {
        None => commands::run::run(&config_dir, commands::run::RunOptions::default()),
        Some(Command::Run {
            image,
            target,
            reset_on_corruption,
        }) => commands::run::run(
            &config_dir,
            commands::run::RunOptions {
                image,
                target,
                reset_on_corruption,
            },
        ),
        Some(Command::Config { action }) => match action {
            ConfigAction::Show => commands::config::show(&config_dir),
            ConfigAction::Reset => commands::config::reset(&config_dir),
            ConfigAction::Path => commands::config::path(&config_dir),
        },
        Some(Command::Cache { action }) => match action {
            CacheAction::Show => commands::cache::show(&config_dir),
            CacheAction::Clear => commands::cache::clear(&config_dir),
        },
    }
}
