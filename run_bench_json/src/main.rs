mod cli;

use anyhow::{anyhow, bail, ensure, Context};
use beamtrace_cli::init_logger;
use beamtrace_json::{bench_dim, deserialize_bench, read_json, serde_json, JsonSer};
use clap::Parser;
use log::info;

use cli::Args;

fn run_bench<const D: usize>(args: &Args, json: &serde_json::Value) -> anyhow::Result<serde_json::Value> {
    let mut bench = deserialize_bench::<D>(json)?;

    if let Some(max_bounces) = args.max_bounces {
        ensure!(max_bounces > 0, "--max-bounces must be at least 1");
        bench.params_mut().max_bounces = max_bounces;
    }

    let results = bench.tick()?;

    for (i, result) in results.iter().enumerate() {
        info!(
            "beam {i}: {:?} after {} bounce(s), coupling power {}",
            result.outcome,
            result.bounces(),
            result.coupling_power(),
        );
    }

    let results = results.to_json();

    let (Some(reflector), Some(beam)) = (args.scan_reflector, args.scan_beam) else {
        return Ok(results);
    };

    let reflector = bench
        .reflectors()
        .id(reflector)
        .ok_or_else(|| anyhow!("no reflector at index {reflector}"))?;
    let beam = bench
        .beam_id(beam)
        .ok_or_else(|| anyhow!("no beam at index {beam}"))?;

    let scan = bench.scan_alignment(beam, reflector, args.span, args.steps)?;

    if let Some(best) = &scan.best {
        info!(
            "best orientation for reflector {}: {:?} (efficiency {})",
            reflector.index(),
            best.normal.as_slice(),
            best.efficiency,
        );
    }

    Ok(serde_json::json!({
        "results": results,
        "scan": scan.to_json(),
    }))
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logger(args.log_level);

    let json = read_json(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;

    let output = match bench_dim(&json)? {
        2 => run_bench::<2>(&args, &json)?,
        3 => run_bench::<3>(&args, &json)?,
        dim => bail!("dimension must be 2 or 3, found {dim}"),
    };

    let output = if args.pretty {
        serde_json::to_string_pretty(&output)?
    } else {
        serde_json::to_string(&output)?
    };
    println!("{output}");

    Ok(())
}
