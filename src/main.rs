// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use serde::Serialize;

use eikonal_fmm::api::{self, AnisotropySpec, GridSpec, SourcePoint};
use eikonal_fmm::core::node_count;
use eikonal_fmm::io;
use eikonal_fmm::options::{Scheme, SolverOptions};
use eikonal_fmm::solver::{FmmSolver, ProgressInfo, SolveStats};

#[derive(Clone, Copy, ValueEnum)]
enum SchemeArg {
    Isotropic,
    Vti,
}

impl From<SchemeArg> for Scheme {
    fn from(arg: SchemeArg) -> Self {
        match arg {
            SchemeArg::Isotropic => Scheme::Isotropic,
            SchemeArg::Vti => Scheme::Vti,
        }
    }
}

#[derive(Parser)]
#[command(name = "eikonal-fmm", about = "Fast Marching Method eikonal solver")]
struct Cli {
    /// Dimensionality (2 or 3)
    #[arg(short = 'd', long)]
    dim: usize,

    /// Grid size, comma-separated (e.g., 256,256 or 128,128,128)
    #[arg(short = 's', long)]
    size: String,

    /// Source as "x,y[,z]" with an optional seed time "@t" (repeatable)
    #[arg(long, num_args = 1)]
    source: Vec<String>,

    /// Grid spacing: one value for all axes or one per axis, comma-separated
    #[arg(long, default_value = "1.0")]
    spacing: String,

    /// Coordinate of the first node, comma-separated
    #[arg(long)]
    origin: Option<String>,

    /// Velocity field: "uniform:<v>" or a .npy/.mat file (MAT variable "velocity")
    #[arg(long, default_value = "uniform:1.0")]
    velocity: String,

    /// Thomsen epsilon: "uniform:<x>" or a .npy/.mat file (MAT variable "epsilon")
    #[arg(long)]
    epsilon: Option<String>,

    /// Thomsen delta: "uniform:<x>" or a .npy/.mat file (MAT variable "delta")
    #[arg(long)]
    delta: Option<String>,

    /// Grid axis aligned with the VTI symmetry axis (default: last axis)
    #[arg(long)]
    symmetry_axis: Option<usize>,

    /// Solver options as JSON; flags below override its fields
    #[arg(long)]
    config: Option<PathBuf>,

    /// Local update scheme
    #[arg(long, value_enum)]
    scheme: Option<SchemeArg>,

    /// Radius in grid cells seeded analytically around each source
    #[arg(long)]
    source_radius: Option<f64>,

    /// Stop marching past this travel time
    #[arg(long)]
    max_time: Option<f64>,

    /// Solve every source as its own shot instead of one combined field
    #[arg(long, conflicts_with_all = ["max_pops", "progress"])]
    per_shot: bool,

    /// Number of Rayon worker threads for --per-shot
    #[arg(long, requires = "per_shot")]
    threads: Option<usize>,

    /// Safety limit on total heap pops before aborting
    #[arg(long)]
    max_pops: Option<u64>,

    /// Output file path (.npy)
    #[arg(short = 'o', long, default_value = "output.npy")]
    output: PathBuf,

    /// Write a JSON report of options and solve statistics
    #[arg(long)]
    report: Option<PathBuf>,

    /// Print march progress to stderr
    #[arg(long)]
    progress: bool,

    /// Increase log verbosity (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Serialize)]
struct Report<'a> {
    grid_shape: &'a [usize],
    sources: &'a [SourcePoint],
    options: &'a SolverOptions,
    per_shot: bool,
    elapsed_secs: f64,
    shots: Vec<SolveStats>,
}

fn parse_list<T: std::str::FromStr>(s: &str, what: &str) -> Result<Vec<T>>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    s.split(',')
        .map(|p| p.trim().parse::<T>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .with_context(|| format!("invalid {}: expected comma-separated numbers", what))
}

fn parse_size(s: &str, dim: usize) -> Result<Vec<usize>> {
    let parts: Vec<usize> = parse_list(s, "--size")?;
    if parts.len() != dim {
        bail!("--size has {} components but --dim is {}", parts.len(), dim);
    }
    Ok(parts)
}

fn parse_per_axis(s: &str, dim: usize, what: &str) -> Result<Vec<f64>> {
    let parts: Vec<f64> = parse_list(s, what)?;
    match parts.len() {
        1 => Ok(vec![parts[0]; dim]),
        n if n == dim => Ok(parts),
        n => bail!("{} has {} components but --dim is {}", what, n, dim),
    }
}

fn parse_source(s: &str, dim: usize) -> Result<SourcePoint> {
    let (coords, time) = match s.split_once('@') {
        Some((c, t)) => (
            c,
            t.trim()
                .parse::<f64>()
                .with_context(|| format!("invalid seed time in --source {}", s))?,
        ),
        None => (s, 0.0),
    };
    let coord: Vec<f64> = parse_list(coords, "--source")?;
    if coord.len() != dim {
        bail!(
            "--source has {} components but --dim is {}",
            coord.len(),
            dim
        );
    }
    Ok(SourcePoint { coord, time })
}

/// Load a per-node field from "uniform:<x>" or a file.
fn load_field(spec: &str, shape: &[usize], mat_var: &str) -> Result<Vec<f64>> {
    if let Some(val_str) = spec.strip_prefix("uniform:") {
        let val: f64 = val_str
            .parse()
            .with_context(|| format!("invalid uniform {} value", mat_var))?;
        let Some(num_nodes) = node_count(shape) else {
            bail!("grid {:?} has too many nodes", shape);
        };
        return Ok(vec![val; num_nodes]);
    }
    io::load_field(Path::new(spec), mat_var, shape)
        .with_context(|| format!("loading {} from {}", mat_var, spec))
}

fn build_options(cli: &Cli) -> Result<SolverOptions> {
    let mut options = match &cli.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("parsing solver options in {}", path.display()))?
        }
        None => SolverOptions::default(),
    };
    if let Some(scheme) = cli.scheme {
        options.scheme = scheme.into();
    }
    if let Some(radius) = cli.source_radius {
        options.source_radius = radius;
    }
    if cli.max_time.is_some() {
        options.max_time = cli.max_time;
    }
    options.validate()?;
    Ok(options)
}

fn build_grid_spec(cli: &Cli, shape: Vec<usize>) -> Result<GridSpec> {
    let spacing = parse_per_axis(&cli.spacing, cli.dim, "--spacing")?;
    let origin = cli
        .origin
        .as_deref()
        .map(|o| parse_per_axis(o, cli.dim, "--origin"))
        .transpose()?;
    let velocity = load_field(&cli.velocity, &shape, "velocity")?;
    let anisotropy = match (&cli.epsilon, &cli.delta) {
        (None, None) => None,
        (Some(eps), Some(del)) => Some(AnisotropySpec {
            epsilon: load_field(eps, &shape, "epsilon")?,
            delta: load_field(del, &shape, "delta")?,
            symmetry_axis: cli.symmetry_axis,
        }),
        _ => bail!("--epsilon and --delta must be given together"),
    };
    Ok(GridSpec {
        shape,
        spacing,
        origin,
        velocity,
        anisotropy,
    })
}

fn progress_printer() -> Box<dyn Fn(ProgressInfo) + Send + Sync> {
    Box::new(|info: ProgressInfo| {
        eprintln!(
            "[{:.1}s] accepted={} band={} front={:.4}",
            info.elapsed.as_secs_f64(),
            info.accepted,
            info.band_size,
            info.front_time,
        );
    })
}

/// Combined solve: first arrival from any source.
fn run<const N: usize>(
    cli: &Cli,
    spec: &GridSpec,
    sources: &[SourcePoint],
    options: &SolverOptions,
) -> Result<(Vec<f64>, SolveStats)> {
    let grid = spec.build::<N>()?;
    let mut solver = FmmSolver::new(&grid, options.clone())?;
    if let Some(max_pops) = cli.max_pops {
        solver = solver.with_max_pops(max_pops);
    }
    if cli.progress {
        solver = solver.with_progress(progress_printer());
    }
    for source in sources {
        let shot = source.to_point_source::<N>()?;
        solver.add_source(shot.coord, shot.time)?;
    }
    let field = solver.solve()?;
    let stats = field.stats().clone();
    Ok((field.into_vec(), stats))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    if cli.dim != 2 && cli.dim != 3 {
        bail!("--dim must be 2 or 3, got {}", cli.dim);
    }
    if cli.source.is_empty() {
        bail!("at least one --source must be specified");
    }

    let shape = parse_size(&cli.size, cli.dim)?;
    let sources = cli
        .source
        .iter()
        .map(|s| parse_source(s, cli.dim))
        .collect::<Result<Vec<_>>>()?;
    let options = build_options(&cli)?;
    let spec = build_grid_spec(&cli, shape)?;

    let start = Instant::now();
    let (fields, shots): (Vec<Vec<f64>>, Vec<SolveStats>) = if cli.per_shot {
        let results = api::solve_travel_times_per_shot(&spec, &sources, &options, cli.threads)?;
        results.into_iter().map(|r| (r.times, r.stats)).unzip()
    } else {
        let (times, stats) = match cli.dim {
            2 => run::<2>(&cli, &spec, &sources, &options)?,
            _ => run::<3>(&cli, &spec, &sources, &options)?,
        };
        (vec![times], vec![stats])
    };
    let elapsed = start.elapsed();
    log::info!(
        "solved {} field(s) on {:?} in {:.3}s",
        fields.len(),
        spec.shape,
        elapsed.as_secs_f64()
    );
    for (i, stats) in shots.iter().enumerate() {
        if stats.unreached > 0 {
            log::warn!("field {}: {} nodes unreached", i, stats.unreached);
        }
    }

    io::save_travel_times(&cli.output, &spec.shape, &fields)
        .with_context(|| format!("writing {}", cli.output.display()))?;

    if let Some(path) = &cli.report {
        let report = Report {
            grid_shape: &spec.shape,
            sources: &sources,
            options: &options,
            per_shot: cli.per_shot,
            elapsed_secs: elapsed.as_secs_f64(),
            shots,
        };
        io::save_report(path, &report)
            .with_context(|| format!("writing report {}", path.display()))?;
    }

    Ok(())
}
