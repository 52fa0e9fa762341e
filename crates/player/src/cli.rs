//! Command-line options for the helix player

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "helix")]
#[command(about = "Generative step sequencer with look-ahead scheduling")]
pub struct Cli {
    /// Config file (defaults to ./helix.toml, then the user config dir)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Starting tempo, overrides the config
    #[arg(long)]
    pub bpm: Option<u32>,

    /// DNA preset to start from instead of the baseline
    #[arg(long)]
    pub dna: Option<PathBuf>,

    /// Seed for probability gates and the procedural provider
    #[arg(long)]
    pub seed: Option<u64>,

    /// Simulated provider latency in milliseconds
    #[arg(long, default_value_t = 0)]
    pub latency_ms: u64,

    /// Render offline to this WAV file instead of playing live
    #[arg(long)]
    pub render: Option<PathBuf>,

    /// Length of an offline render
    #[arg(long, default_value_t = 30.0)]
    pub seconds: f64,

    /// Log file (defaults to helix.log in the temp dir)
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Write the effective config to the config path and exit
    #[arg(long)]
    pub write_config: bool,
}
