use std::path::PathBuf;

use beamtrace_cli::LogLevel;
use clap::Parser;

#[derive(Parser)]
#[command(name = "run_bench_json")]
#[command(about = "Trace every beam of a JSON optical bench and print the results")]
pub struct Args {
    /// Path to the bench JSON file
    pub file: PathBuf,

    /// Override the bench-wide bounce limit
    #[arg(long)]
    pub max_bounces: Option<usize>,

    /// Index of the reflector to scan for the best alignment
    #[arg(long, requires = "scan_beam")]
    pub scan_reflector: Option<usize>,

    /// Index of the beam used for the alignment scan
    #[arg(long, requires = "scan_reflector")]
    pub scan_beam: Option<usize>,

    /// Largest normal offset tried, along each tangent direction
    #[arg(long, default_value = "0.1")]
    pub span: f64,

    /// Number of offsets tried along each tangent direction
    #[arg(long, default_value = "21")]
    pub steps: usize,

    #[arg(long, default_value = "warn", help = "Set the logging level")]
    pub log_level: LogLevel,

    /// Pretty-print the output
    #[arg(long)]
    pub pretty: bool,
}
