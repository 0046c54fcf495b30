mod cli;

use anyhow::{bail, Context};
use beamtrace_cli::init_logger;
use beamtrace_json::{serialize_bench, write_json};
use beamtrace_random::{
    rand::{rngs::StdRng, thread_rng, SeedableRng},
    random_bench,
};
use clap::Parser;
use log::info;

use cli::Args;

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logger(args.log_level);

    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_rng(thread_rng())?,
    };

    let json = match args.dim {
        2 => serialize_bench(&random_bench::<2>(&mut rng, args.reflectors, args.beams)),
        3 => serialize_bench(&random_bench::<3>(&mut rng, args.reflectors, args.beams)),
        dim => bail!("dimension must be 2 or 3, found {dim}"),
    };

    write_json(&args.file, &json)
        .with_context(|| format!("failed to write {}", args.file.display()))?;

    info!(
        "wrote a {}D bench with {} reflector(s) and {} beam(s) to {}",
        args.dim,
        args.reflectors,
        args.beams,
        args.file.display(),
    );

    Ok(())
}
