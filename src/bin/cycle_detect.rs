//! Run distributed cycle detection on a generated input graph.
//!
//! Without MPI the partitions run as threads of this process; with
//! `--features mpi-support` and `--mpi` each MPI rank is one partition.

use std::path::PathBuf;

use clap::Parser;
use hypercube_cycle::prelude::*;

#[derive(Parser, Debug)]
#[command(
    name = "cycle-detect",
    about = "Detect directed cycles in a partitioned graph with a hypercube merge"
)]
struct Cli {
    /// Total number of vertices.
    #[arg(default_value_t = 1024)]
    n: usize,
    /// Partitions to run as threads.
    #[arg(short, long, default_value_t = 4)]
    partitions: usize,
    /// Input graph family.
    #[arg(long, value_enum, default_value_t = InputGraph::Lattice)]
    input: InputGraph,
    /// Leave out the arc that closes the input's cycle.
    #[arg(long)]
    acyclic: bool,
    /// Seed of the random-dag generator.
    #[arg(long, default_value_t = 1)]
    seed: u64,
    /// Reachability summary; overrides the config file.
    #[arg(long, value_enum)]
    reach_mode: Option<ReachMode>,
    /// JSON file with a `DetectConfig`.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Print the leader's report as JSON.
    #[arg(long)]
    json: bool,
    /// One partition per MPI rank instead of threads.
    #[cfg(feature = "mpi-support")]
    #[arg(long)]
    mpi: bool,
}

impl Cli {
    fn detect_config(&self) -> Result<DetectConfig, CycleError> {
        let mut cfg = match &self.config {
            Some(path) => DetectConfig::from_json_file(path)?,
            None => DetectConfig::default(),
        };
        match self.reach_mode {
            Some(mode) => cfg.reach_mode = mode,
            // random arcs do not reach label-contiguous exits
            None if self.config.is_none() && self.input == InputGraph::RandomDag => {
                cfg.reach_mode = ReachMode::Exact;
            }
            None => {}
        }
        cfg.validate()?;
        Ok(cfg)
    }
}

fn print_report(cli: &Cli, report: &CycleReport) -> Result<(), CycleError> {
    if cli.json {
        let text = serde_json::to_string_pretty(report)
            .map_err(|e| CycleError::InvalidInput(e.to_string()))?;
        println!("{text}");
        return Ok(());
    }
    println!(
        "Input: {} and {:12} vertices",
        cli.input.name(!cli.acyclic),
        cli.n
    );
    println!("{}", report.result_line());
    for line in report.timing_lines() {
        println!("{line}");
    }
    println!("TIME {:>14}: {:12.6} s", "total", report.total_seconds());
    Ok(())
}

fn run_threads(cli: &Cli, cfg: &DetectConfig) -> Result<CycleReport, CycleError> {
    let parts = cli.partitions;
    // build every partition up front so bad input fails before any collective
    let graphs = (0..parts)
        .map(|rank| cli.input.build(cli.n, rank, parts, !cli.acyclic, cli.seed))
        .collect::<Result<Vec<_>, _>>()?;
    let world = LocalComm::world(parts);

    let results: Vec<Result<CycleReport, CycleError>> = std::thread::scope(|s| {
        let handles: Vec<_> = world
            .into_iter()
            .zip(graphs)
            .map(|(comm, mut graph)| s.spawn(move || detect_cycle(&comm, &mut graph, cfg)))
            .collect();
        handles
            .into_iter()
            .enumerate()
            .map(|(rank, h)| {
                h.join().unwrap_or_else(|_| {
                    Err(CycleError::CommError {
                        neighbor: rank,
                        message: "partition thread panicked".into(),
                    })
                })
            })
            .collect()
    });

    let mut leader = None;
    for r in results {
        let report = r?;
        if let Some(w) = report.witness {
            log::info!("rank {}: {w:?}", report.rank);
        }
        if report.rank == 0 {
            leader = Some(report);
        }
    }
    leader.ok_or_else(|| CycleError::InvalidInput("no partitions to run".into()))
}

#[cfg(feature = "mpi-support")]
fn run_mpi(cli: &Cli, cfg: &DetectConfig) -> Result<Option<CycleReport>, CycleError> {
    let comm = MpiComm::new()?;
    let mut graph = cli
        .input
        .build(cli.n, comm.rank(), comm.size(), !cli.acyclic, cli.seed)?;
    let report = detect_cycle(&comm, &mut graph, cfg)?;
    Ok((comm.rank() == 0).then_some(report))
}

fn run(cli: &Cli) -> Result<(), CycleError> {
    let cfg = cli.detect_config()?;
    #[cfg(feature = "mpi-support")]
    if cli.mpi {
        if let Some(report) = run_mpi(cli, &cfg)? {
            print_report(cli, &report)?;
        }
        return Ok(());
    }
    let report = run_threads(cli, &cfg)?;
    print_report(cli, &report)
}

/// Log to stderr at `info` unless the environment's filter says otherwise.
fn logger(env: env_logger::Env<'_>) -> env_logger::Builder {
    env_logger::Builder::from_env(env.default_filter_or("info"))
}

fn main() {
    logger(env_logger::Env::default()).init();
    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        eprintln!("ERROR: {e}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::{Level, LevelFilter, Log, Metadata};

    fn enabled(logger: &env_logger::Logger, level: Level) -> bool {
        logger.enabled(&Metadata::builder().level(level).target("hypercube_cycle").build())
    }

    #[test]
    fn witnesses_are_logged_by_default() {
        let env = env_logger::Env::new().filter("CYCLE_DETECT_UNSET_FILTER");
        let logger = logger(env).build();
        assert_eq!(logger.filter(), LevelFilter::Info);
        assert!(enabled(&logger, Level::Info));
        assert!(!enabled(&logger, Level::Debug));
    }

    #[test]
    fn random_dags_default_to_exact_reachability() {
        let cli = Cli::parse_from(["cycle-detect", "96", "--input", "random-dag"]);
        assert_eq!(cli.detect_config().unwrap().reach_mode, ReachMode::Exact);
        let cli = Cli::parse_from(["cycle-detect", "96", "--reach-mode", "convex"]);
        assert_eq!(cli.detect_config().unwrap().reach_mode, ReachMode::Convex);
    }
}
