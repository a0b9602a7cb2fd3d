//! Bitcoin data pipeline - main entry point
//!
//! This binary provides three subcommands:
//! - fetch: Download every dataset and its metadata from Nasdaq Data Link
//! - display: Print the metadata store
//! - transform: Merge all datasets into one table indexed by date

use anyhow::Result;
use bitcoin_data::{Config, DatasetCode, WriteMode};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;

#[derive(Parser, Debug)]
#[command(name = "bitcoin-data")]
#[command(about = "Fetch, describe and merge Bitcoin network metric datasets", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to a JSON configuration file (defaults are used when omitted)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Data directory (overrides config file)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Download every dataset and write the metadata store
    Fetch {
        /// Fail instead of replacing existing files
        #[arg(long)]
        no_clobber: bool,
    },

    /// Print code, name and description of every fetched dataset
    Display,

    /// Merge all datasets into a single table indexed by date
    Transform {
        /// Dataset whose dates become the row index (overrides config file)
        #[arg(short, long)]
        reference: Option<DatasetCode>,

        /// Output file (defaults to <data_dir>/bitcoin.csv)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Fail instead of replacing an existing output file
        #[arg(long)]
        no_clobber: bool,
    },
}

fn setup_logging(verbose: bool, command_name: &str) -> Result<()> {
    std::fs::create_dir_all("logs")?;

    // {command}_{date}.log
    let log_filename = format!(
        "{}_{}.log",
        command_name,
        chrono::Local::now().format("%Y-%m-%d_%H-%M-%S")
    );
    let log_path = PathBuf::from("logs").join(&log_filename);

    // Filter out noisy HTTP crates
    let level = if verbose { "debug" } else { "info" };
    let filter_str = format!(
        "{},hyper=warn,hyper_util=warn,reqwest=warn,rustls=warn,h2=warn",
        level
    );
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    let file_appender = tracing_appender::rolling::never("logs", &log_filename);

    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(true);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(file_appender)
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    info!("Log file: {}", log_path.display());
    Ok(())
}

fn load_config(path: Option<&PathBuf>, data_dir: Option<PathBuf>) -> Result<Config> {
    let mut config = match path {
        Some(path) => {
            let config = Config::from_file(path)?;
            info!("Loaded configuration from: {}", path.display());
            config
        }
        None => Config::default(),
    };

    if let Some(dir) = data_dir {
        info!("Overriding data directory to: {}", dir.display());
        config.data_dir = dir;
    }

    config.validate()?;
    Ok(config)
}

fn write_mode(config: &Config, no_clobber: bool) -> WriteMode {
    if no_clobber {
        WriteMode::CreateNew
    } else {
        config.write_mode
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let command_name = match &cli.command {
        Commands::Fetch { .. } => "fetch",
        Commands::Display => "display",
        Commands::Transform { .. } => "transform",
    };
    setup_logging(cli.verbose, command_name)?;

    let config = load_config(cli.config.as_ref(), cli.data_dir)?;

    match cli.command {
        Commands::Fetch { no_clobber } => {
            let mode = write_mode(&config, no_clobber);
            commands::fetch::run(config, mode)
        }

        Commands::Display => commands::display::run(config),

        Commands::Transform {
            reference,
            output,
            no_clobber,
        } => {
            let mode = write_mode(&config, no_clobber);
            commands::transform::run(config, reference, output, mode)
        }
    }
}
