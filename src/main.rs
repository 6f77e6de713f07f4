use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use neighbors_rs::harness::{RunOptions, RunReport, run_primitive};
use neighbors_rs::atoms::complete_cell;
use neighbors_rs::{Atoms, Primitive, build_neighborlists, io};
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PrimitiveArg {
    /// Cell list (the newer primitive)
    Binned,
    /// Replicated images in a k-d tree (the original primitive)
    Tree,
    /// Run both and compare
    Both,
}

impl PrimitiveArg {
    fn primitives(self) -> Vec<Primitive> {
        match self {
            PrimitiveArg::Binned => vec![Primitive::Binned],
            PrimitiveArg::Tree => vec![Primitive::Tree],
            PrimitiveArg::Both => vec![Primitive::Binned, Primitive::Tree],
        }
    }
}

/// Builds neighbor lists for a structure file and reports their size and cost.
#[derive(Parser, Debug)]
#[command(name = "neighbors", version, about)]
struct Cli {
    /// Structure file (XYZ/extended XYZ, POSCAR/CONTCAR, CIF)
    file: PathBuf,

    /// Pair cutoff in Å; each atom gets half of it as its radius
    #[arg(short, long, env = "NEIGHBORS_CUTOFF", default_value_t = 3.0)]
    cutoff: f64,

    /// Neighbor-list primitive
    #[arg(short, long, value_enum, default_value = "both")]
    primitive: PrimitiveArg,

    /// Skin distance added to every pair cutoff
    #[arg(long, default_value_t = 0.0)]
    skin: f64,

    /// List every atom as its own neighbor
    #[arg(long, default_value_t = false)]
    self_interaction: bool,

    /// Report each pair once instead of from both atoms
    #[arg(long, default_value_t = false)]
    half: bool,

    /// Process every frame of a trajectory instead of the last one
    #[arg(long, default_value_t = false)]
    all_frames: bool,

    /// Worker threads (defaults to the number of cores)
    #[arg(short = 'j', long, env = "NEIGHBORS_THREADS")]
    threads: Option<usize>,

    /// Log level when RUST_LOG is unset
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    neighbors_rs::init_logging(Some(cli.log_level.clone()));

    if let Some(n) = cli.threads
        && !neighbors_rs::set_num_threads(n)
    {
        warn!(threads = n, "thread pool already initialised");
    }
    if !cli.cutoff.is_finite() || cli.cutoff <= 0.0 {
        bail!("cutoff must be positive and finite, got {}", cli.cutoff);
    }

    let frames = if cli.all_frames {
        io::read_frames(&cli.file)
    } else {
        io::read(&cli.file).map(|atoms| vec![atoms])
    }
    .with_context(|| format!("cannot load {}", cli.file.display()))?;
    info!(frames = frames.len(), threads = neighbors_rs::get_num_threads(), "loaded structure");

    let options = RunOptions {
        skin: cli.skin,
        self_interaction: cli.self_interaction,
        bothways: !cli.half,
    };

    for (index, atoms) in frames.iter().enumerate() {
        println!(
            "frame {index}: {} atoms, periodic: {}",
            atoms.len(),
            atoms.is_periodic()
        );
        let mut reports: Vec<RunReport> = Vec::new();
        for primitive in cli.primitive.primitives() {
            let report = run_primitive(atoms, cli.cutoff, primitive, options)
                .with_context(|| format!("{primitive} neighbor list failed on frame {index}"))?;
            println!(
                "  {:<7} {:>10} neighbors  {:>10.3} ms",
                report.primitive.to_string(),
                report.visited,
                report.elapsed.as_secs_f64() * 1e3
            );
            reports.push(report);
        }
        if let [first, second] = reports.as_slice() {
            let agree = first.list.matches(&second.list);
            println!("  primitives agree: {agree}");
            if !agree {
                warn!(frame = index, "binned and tree neighbor lists differ");
            }
        }
        if options.skin == 0.0 && !options.self_interaction {
            cross_check(atoms, cli.cutoff, &reports)?;
        }
    }
    Ok(())
}

/// Compares the pair count with the flat edge-list API.
fn cross_check(atoms: &Atoms, cutoff: f64, reports: &[RunReport]) -> Result<()> {
    let Some(report) = reports.first() else {
        return Ok(());
    };
    let positions: Vec<[f64; 3]> = atoms.positions.iter().map(|p| [p.x, p.y, p.z]).collect();
    let rows = atoms.cell.filter(|_| atoms.is_periodic()).map(complete_cell);
    let edges = build_neighborlists(&positions, cutoff, rows.as_ref().map(|r| (r, atoms.pbc)), true)
        .context("edge list search failed")?;

    let entries = report.list.nneighbors();
    // a full list holds every pair twice
    let pairs = if report.list.is_bothways() { entries / 2 } else { entries };
    println!("  edge list: {} pairs", edges.num_edges());
    if edges.num_edges() != pairs {
        warn!(edges = edges.num_edges(), pairs, "edge list and neighbor list disagree");
    }
    Ok(())
}
