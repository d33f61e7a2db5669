use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

mod commands;
mod output;

#[derive(Parser)]
#[command(name = "timevault")]
#[command(about = "Encrypt data that opens only with a password, and only after a point in time")]
#[command(version)]
struct Cli {
    /// Output format
    #[arg(long, global = true)]
    json: bool,

    /// Configuration file
    #[arg(long, global = true, env = "TIMEVAULT_CONFIG", default_value = timevault_core::config::DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Fall back to drand quicknet for any beacon option not configured
    #[arg(long, global = true)]
    quicknet: bool,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encrypt a file into a bundle
    Encrypt(commands::encrypt::EncryptArgs),
    /// Decrypt a bundle
    Decrypt(commands::decrypt::DecryptArgs),
    /// Show the beacon round for an unlock time
    Round(commands::round::RoundArgs),
    /// Lock "Hello" for a few seconds and watch both gates
    Demo(commands::demo::DemoArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        "timevault=debug,timevault_core=debug,timevault_tlock=debug,timevault_crypto=debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // stdout carries bundles and plaintext
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let ctx = commands::Context {
        json_output: cli.json,
        config_path: cli.config,
        quicknet: cli.quicknet,
    };

    match cli.command {
        Commands::Encrypt(args) => commands::encrypt::run(args, &ctx).await,
        Commands::Decrypt(args) => commands::decrypt::run(args, &ctx).await,
        Commands::Round(args) => commands::round::run(args, &ctx).await,
        Commands::Demo(args) => commands::demo::run(args, &ctx).await,
    }
}
