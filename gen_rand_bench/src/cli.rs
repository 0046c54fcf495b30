use std::path::PathBuf;

use beamtrace_cli::LogLevel;
use clap::Parser;

#[derive(Parser)]
#[command(name = "gen_rand_bench")]
#[command(about = "Generate a random optical bench and write it as JSON")]
pub struct Args {
    /// Where to write the bench JSON
    pub file: PathBuf,

    /// Dimension of the bench
    #[arg(long, default_value = "2", value_parser = clap::value_parser!(u8).range(2..=3))]
    pub dim: u8,

    /// Number of reflectors
    #[arg(long, default_value = "12")]
    pub reflectors: usize,

    /// Number of beams
    #[arg(long, default_value = "4")]
    pub beams: usize,

    /// Seed for a reproducible bench, a random one is used otherwise
    #[arg(long)]
    pub seed: Option<u64>,

    #[arg(long, default_value = "warn", help = "Set the logging level")]
    pub log_level: LogLevel,
}
