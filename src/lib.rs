pub mod config;
pub mod error;
pub mod extract;
pub mod formulation;
pub mod output;
pub mod parse;
pub mod relevance;
pub mod score;
pub mod solver;
pub mod types;

pub use config::SolverConfig;
pub use error::Error;
pub use formulation::{Formulation, FormulationStats};
pub use score::Score;
pub use solver::SolveStatus;
pub use types::{CacheId, Endpoint, EndpointId, Placement, Problem, Request, VideoId};

use formulation::VariableIndex;
use good_lp::Solution as LpSolution;
use serde::Serialize;
use solver::SolverRun;

/// Outcome of solving a [`Problem`].
#[derive(Debug, Clone, Serialize)]
pub struct Solution {
    pub status: SolveStatus,
    /// Number of incumbents the solver handed back (0 or 1).
    pub solution_count: usize,
    pub stats: FormulationStats,
    /// Objective value of the model at the returned assignment.
    pub objective: f64,
    /// Latency saved by `placement`, computed from the placement alone.
    pub score: Score,
    pub placement: Placement,
}

impl Problem {
    pub fn solve(&self, config: &SolverConfig) -> Result<Solution, Error> {
        config.validate()?;

        // Build variables, capacity constraints and the marginal gain objective
        let Formulation {
            model,
            index,
            stats,
        } = Formulation::build(self);
        tracing::info!(
            demand_pairs = stats.demand_pairs,
            placement_variables = stats.placement_variables,
            gain_variables = stats.gain_variables,
            constraints = stats.capacity_constraints + stats.cover_constraints,
            "built model"
        );

        // Nothing to decide: the empty placement is trivially optimal
        if index.placements.is_empty() {
            return Ok(Solution {
                status: SolveStatus::Optimal,
                solution_count: 0,
                stats,
                objective: 0.0,
                score: score::evaluate(self, &Placement::default()),
                placement: Placement::default(),
            });
        }

        // Solve
        let run = solver::solve(model, config)?;

        Ok(self.create_solution(run, &index, stats))
    }

    /// Convert the solver's assignment into a cache → videos map
    fn create_solution<S: LpSolution>(
        &self,
        mut run: SolverRun<S>,
        index: &VariableIndex,
        stats: FormulationStats,
    ) -> Solution {
        // A run stopped on time may hand back a relaxation instead of an incumbent
        if run.status == SolveStatus::Timeout {
            run.retain_incumbent(|solution| extract::is_incumbent(solution, index, self));
        }
        tracing::info!(
            proven_optimal = run.is_proven_optimal(),
            solutions = run.solution_count(),
            "extracting placement"
        );

        let solution = run.solution.as_ref();
        let placement = extract::create_placement(solution, &index.placements);
        let objective = extract::objective_value(solution, index);

        Solution {
            status: run.status,
            solution_count: run.solution_count(),
            stats,
            objective,
            score: score::evaluate(self, &placement),
            placement,
        }
    }
}
