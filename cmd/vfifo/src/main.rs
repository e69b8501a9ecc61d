//! vfifo CLI - Demos for the in-process virtual FIFO device.

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{
    AutoCommand, BlockingCommand, ConfigCommand, MmapCommand, RoundtripCommand, ScenarioCommand,
};

/// vfifo CLI - Demos for the in-process virtual FIFO device.
///
/// Each command creates a device, runs one scenario against it and shuts it
/// down again:
///   - Round-trip write and read
///   - A reader blocked until a delayed write arrives
///   - Auto-generation through control commands
///   - Writing through the direct memory view
///   - The capacity-8 fill, backpressure and drain sequence
///
/// Settings come from an optional YAML config file; the flags below override it.
#[derive(Parser)]
#[command(name = "vfifo")]
#[command(about = "Virtual FIFO device demo tool")]
#[command(version)]
pub struct Cli {
    /// Config file (YAML)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Queue capacity in bytes
    #[arg(long, global = true)]
    pub capacity: Option<usize>,

    /// Producer interval in milliseconds
    #[arg(long, global = true)]
    pub interval_ms: Option<u64>,

    /// Producer payload
    #[arg(long, global = true)]
    pub payload: Option<String>,

    /// Verbose output
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the effective configuration
    Config(ConfigCommand),
    /// Write a message and read it back
    Roundtrip(RoundtripCommand),
    /// Block a reader until a delayed write arrives
    Blocking(BlockingCommand),
    /// Enable auto-generation, wait, then read what was produced
    Auto(AutoCommand),
    /// Write through the direct memory view
    Mmap(MmapCommand),
    /// Replay the capacity-8 fill, backpressure and drain sequence
    Scenario(ScenarioCommand),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    if cli.verbose {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_target(false)
            .init();
    }

    match &cli.command {
        Commands::Config(cmd) => cmd.run(&cli),
        Commands::Roundtrip(cmd) => cmd.run(&cli).await,
        Commands::Blocking(cmd) => cmd.run(&cli).await,
        Commands::Auto(cmd) => cmd.run(&cli).await,
        Commands::Mmap(cmd) => cmd.run(&cli).await,
        Commands::Scenario(cmd) => cmd.run(&cli).await,
    }
}
