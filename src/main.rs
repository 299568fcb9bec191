use std::path::PathBuf;

use cacheplan::parse::{read_placement, read_problem};
use cacheplan::{SolverConfig, output, score};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "cacheplan",
    about = "Decide which videos to store in which edge caches",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve a problem file and write the placement.
    Solve {
        /// Problem file.
        input: PathBuf,
        /// Where to write the placement.
        #[arg(short, long, default_value = "videos.out")]
        output: PathBuf,
        /// YAML file with solver settings.
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Relative optimality gap tolerance.
        #[arg(long)]
        gap: Option<f64>,
        /// Wall-clock time limit in seconds.
        #[arg(long)]
        time_limit: Option<u64>,
        /// Number of solver threads.
        #[arg(long)]
        threads: Option<u32>,
        /// Show the solver's own log.
        #[arg(long)]
        solver_log: bool,
    },
    /// Check and score an existing placement file.
    Score {
        /// Problem file.
        input: PathBuf,
        /// Placement file to score.
        placement: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match Cli::parse().command {
        Commands::Solve {
            input,
            output: output_path,
            config,
            gap,
            time_limit,
            threads,
            solver_log,
        } => {
            let mut solver_config = match config {
                Some(path) => SolverConfig::from_file(&path)?,
                None => SolverConfig::default(),
            };
            if let Some(gap) = gap {
                solver_config.mip_gap = gap;
            }
            if let Some(time_limit) = time_limit {
                solver_config.time_limit_secs = time_limit;
            }
            if threads.is_some() {
                solver_config.threads = threads;
            }
            solver_config.solver_log |= solver_log;

            tracing::info!(path = %input.display(), "reading input");
            let problem = read_problem(&input)?;
            tracing::info!(
                videos = problem.video_count(),
                endpoints = problem.endpoints.len(),
                requests = problem.requests.len(),
                caches = problem.cache_count,
                "parsed problem"
            );

            let solution = problem.solve(&solver_config)?;

            output::write_placement_file(&solution.placement, &output_path)?;
            tracing::info!(
                path = %output_path.display(),
                caches = solution.placement.len(),
                "wrote placement"
            );

            println!("{}", serde_yaml::to_string(&solution)?);
        }
        Commands::Score { input, placement } => {
            let problem = read_problem(&input)?;
            let placement = read_placement(&placement)?;
            let score = score::score(&problem, &placement)?;

            println!("{}", serde_yaml::to_string(&score)?);
        }
    }
    Ok(())
}
