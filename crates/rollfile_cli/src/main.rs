//! rollfile CLI
//!
//! Command-line tools around the rotating file writer.
//!
//! # Commands
//!
//! - `pipe` - Copy stdin into a rotating log file
//! - `rotate-file` - Rotate an active log file once
//! - `config` - Print the effective writer configuration

mod commands;

use clap::{Parser, Subcommand};
use commands::{PeriodArg, PolicyArg};
use rollfile::{Config, WriterMode, WriterOption};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Rotating file writer tools.
#[derive(Parser)]
#[command(name = "rollfile")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON configuration file; flags override its values
    #[arg(global = true, short, long)]
    config: Option<PathBuf>,

    /// Directory holding the log files
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Base name of the log file
    #[arg(global = true, short, long)]
    name: Option<String>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Copy stdin into a rotating log file until EOF
    Pipe {
        /// Write strategy (none, lock, async, buffer)
        #[arg(short, long)]
        mode: Option<WriterMode>,

        /// Rotation policy
        #[arg(short, long, value_enum)]
        rotate: Option<PolicyArg>,

        /// Rotation period for time rotation
        #[arg(long, value_enum, default_value = "daily")]
        period: PeriodArg,

        /// Size threshold for size rotation, e.g. `64MB`
        #[arg(long)]
        size: Option<String>,

        /// Historical files to keep (0 keeps all)
        #[arg(long)]
        max_remain: Option<usize>,

        /// Gzip rotated files
        #[arg(long)]
        compress: bool,
    },

    /// Rotate an active log file once
    RotateFile {
        /// Historical file name; defaults to a time-tagged name
        #[arg(short, long)]
        target: Option<PathBuf>,
    },

    /// Print the effective configuration
    Config {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show version information
    Version,
}

impl Cli {
    /// Loads the configuration file, if any, then applies the global flags.
    fn base_config(&self) -> Result<Config, Box<dyn std::error::Error>> {
        let mut config = match &self.config {
            Some(path) => Config::from_json_file(path)?,
            None => Config::default(),
        };
        if let Some(path) = &self.path {
            WriterOption::LogPath(path.clone()).apply(&mut config);
        }
        if let Some(name) = &self.name {
            WriterOption::FileName(name.clone()).apply(&mut config);
        }
        Ok(config)
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = cli.base_config()?;

    match cli.command {
        Commands::Pipe {
            mode,
            rotate,
            period,
            size,
            max_remain,
            compress,
        } => {
            let mut options = Vec::new();
            if let Some(mode) = mode {
                options.push(WriterOption::Mode(mode));
            }
            match rotate {
                Some(PolicyArg::Time) => options.push(WriterOption::TimeRotation(period.into())),
                Some(PolicyArg::Size) => {
                    let size = size.ok_or("--size is required for size rotation")?;
                    options.push(WriterOption::SizeRotation(rollfile::parse_size(&size)?));
                }
                Some(PolicyArg::Never) | None => {}
            }
            if let Some(count) = max_remain {
                options.push(WriterOption::MaxRemain(count));
            }
            if compress {
                options.push(WriterOption::Compress);
            }
            commands::pipe::run(config, options)?;
        }
        Commands::RotateFile { target } => {
            commands::rotate::run(config, target)?;
        }
        Commands::Config { format } => {
            commands::config::run(&config, &format)?;
        }
        Commands::Version => {
            println!("rollfile CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("rollfile v{}", rollfile::VERSION);
        }
    }

    Ok(())
}
