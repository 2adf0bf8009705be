//! Shelf CLI
//!
//! Command-line interface for shelf - save, version and reload artifacts.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use shelf_core::{ArtifactId, Config, Selector, Shelf};

mod commands;
mod output;
mod prompt;

use commands::artifact::SaveArgs;
use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "shelf")]
#[command(about = "Shelf - versioned storage for experiment artifacts")]
#[command(version)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Save a JSON value as a new version
    Save {
        /// JSON payload (e.g. '[1,2,3]')
        value: Option<String>,
        /// Read the JSON payload from a file
        #[arg(short, long)]
        file: Option<PathBuf>,
        /// Topic the artifact belongs to
        #[arg(short, long, default_value = "")]
        topic: String,
        /// Artifact name (generated when empty)
        #[arg(short, long, default_value = "")]
        name: String,
        /// Comment stored with this version
        #[arg(short, long, default_value = "")]
        comment: String,
        /// Replace a version instead of appending (latest, first, or a number)
        #[arg(short, long)]
        replace: Option<Selector>,
        /// Type tag to record instead of the JSON kind
        #[arg(long = "type")]
        type_tag: Option<String>,
    },
    /// Load a version by artifact ID
    Load {
        /// Artifact ID
        id: ArtifactId,
        /// Version selector (latest, first, or a number)
        #[arg(short = 'V', long, default_value = "latest")]
        version: Selector,
    },
    /// Load a version by artifact name
    Find {
        /// Artifact name
        name: String,
        /// Version selector (latest, first, or a number)
        #[arg(short = 'V', long, default_value = "latest")]
        version: Selector,
    },
    /// List all artifacts
    #[command(alias = "ls")]
    List,
    /// Show every version of an artifact
    Show {
        /// Artifact ID
        id: ArtifactId,
    },
    /// Delete one version of an artifact
    #[command(alias = "rm")]
    Delete {
        /// Artifact ID
        id: ArtifactId,
        /// Version selector (latest, first, or a number)
        #[arg(short = 'V', long, default_value = "latest")]
        version: Selector,
    },
    /// Rename or move an artifact (applies to all versions)
    Update {
        /// Artifact ID
        id: ArtifactId,
        /// New name
        #[arg(short, long)]
        name: Option<String>,
        /// New topic
        #[arg(short, long)]
        topic: Option<String>,
    },
    /// Delete every artifact
    Clear {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
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
        /// Configuration key (data_dir, busy_timeout_ms, codec, log_level)
        key: String,
        /// Configuration value
        value: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));
    let config_path = cli.config.as_ref();

    // Config commands must work even when the config file is broken
    if let Commands::Config { command } = &cli.command {
        init_logging(cli.verbose, None);
        return match command.clone() {
            Some(ConfigCommands::Show) | None => commands::config::show(config_path, &output),
            Some(ConfigCommands::Set { key, value }) => {
                commands::config::set(config_path, key, value, &output)
            }
        };
    }

    let config = Config::load_with_cli_override(config_path)?;
    init_logging(cli.verbose, config.log_level.as_deref());
    debug!("using catalog at {:?}", config.catalog_path());

    let shelf = Shelf::open_with_config(config)?;

    match cli.command {
        Commands::Save {
            value,
            file,
            topic,
            name,
            comment,
            replace,
            type_tag,
        } => {
            let args = SaveArgs {
                value,
                file,
                topic,
                name,
                comment,
                replace,
                type_tag,
            };
            commands::artifact::save(&shelf, args, &output)
        }
        Commands::Load { id, version } => commands::artifact::load(&shelf, id, version, &output),
        Commands::Find { name, version } => {
            commands::artifact::find(&shelf, &name, version, &output)
        }
        Commands::List => commands::artifact::list(&shelf, &output),
        Commands::Show { id } => commands::artifact::show(&shelf, id, &output),
        Commands::Delete { id, version } => {
            commands::artifact::delete(&shelf, id, version, &output)
        }
        Commands::Update { id, name, topic } => {
            commands::artifact::update(&shelf, id, name, topic, &output)
        }
        Commands::Clear { yes } => commands::artifact::clear(&shelf, yes, &output),
        Commands::Config { .. } => unreachable!(), // Handled above
    }
}

/// Initialize stderr logging
///
/// RUST_LOG wins, then --verbose, then the configured level, then "warn".
fn init_logging(verbose: bool, configured: Option<&str>) {
    let level = if verbose {
        "debug"
    } else {
        configured.unwrap_or("warn")
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("shelf_core={},shelf_cli={}", level, level))
    });

    // Ignore error if already initialized
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_ansi(atty::is(atty::Stream::Stderr))
        .with_writer(std::io::stderr)
        .try_init();
}
