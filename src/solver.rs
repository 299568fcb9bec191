use crate::config::{ConfigError, SolverConfig};
use crate::formulation::LinearModel;
use good_lp::solvers::coin_cbc::{CoinCbcProblem, CoinCbcSolution, coin_cbc};
use good_lp::solvers::{WithMipGap, WithTimeLimit};
use good_lp::{ResolutionError, Solution as LpSolution, SolutionStatus, SolverModel};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SolveError {
    #[error("the placement model is unbounded")]
    Unbounded,
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// How the search ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SolveStatus {
    /// The incumbent is proven optimal.
    Optimal,
    /// The incumbent is within the configured gap but not proven optimal.
    Feasible,
    /// No feasible assignment exists.
    Infeasible,
    /// The time budget ran out. An incumbent may or may not exist.
    Timeout,
}

/// Result of one optimize call.
#[derive(Debug)]
pub struct SolverRun<S> {
    pub status: SolveStatus,
    /// Best assignment found, if any.
    pub solution: Option<S>,
}

impl<S> SolverRun<S> {
    pub fn solution_count(&self) -> usize {
        usize::from(self.solution.is_some())
    }

    pub fn is_proven_optimal(&self) -> bool {
        self.status == SolveStatus::Optimal
    }

    /// Drop the returned assignment unless `is_incumbent` accepts it.
    ///
    /// A run stopped on time hands back whatever column values the solver
    /// holds, which may be a fractional relaxation rather than a solution.
    pub fn retain_incumbent(&mut self, is_incumbent: impl FnOnce(&S) -> bool) {
        if self.solution.as_ref().is_some_and(|s| !is_incumbent(s)) {
            tracing::warn!(
                status = ?self.status,
                "solver stopped before finding an incumbent"
            );
            self.solution = None;
        }
    }
}

/// Maximise the model with CBC under the configured time and gap limits.
///
/// Running out of time or finding nothing feasible is reported through
/// [`SolveStatus`]; only an unusable configuration or an unbounded model is an
/// error.
pub fn solve(
    model: LinearModel,
    config: &SolverConfig,
) -> Result<SolverRun<CoinCbcSolution>, SolveError> {
    config.validate()?;
    let problem = create_model(model, config)?;

    tracing::info!(
        time_limit_secs = config.time_limit_secs,
        mip_gap = config.mip_gap,
        "optimizing"
    );

    let run = match problem.solve() {
        Ok(solution) => SolverRun {
            status: status_of(&solution),
            solution: Some(solution),
        },
        Err(ResolutionError::Infeasible) => SolverRun {
            status: SolveStatus::Infeasible,
            solution: None,
        },
        Err(ResolutionError::Unbounded) => return Err(SolveError::Unbounded),
        Err(err) => {
            tracing::warn!(%err, "solver stopped without an incumbent");
            SolverRun {
                status: SolveStatus::Timeout,
                solution: None,
            }
        }
    };

    tracing::info!(
        status = ?run.status,
        solutions = run.solution_count(),
        "optimization finished"
    );
    Ok(run)
}

fn status_of(solution: &impl LpSolution) -> SolveStatus {
    match solution.status() {
        SolutionStatus::Optimal => SolveStatus::Optimal,
        SolutionStatus::TimeLimit => SolveStatus::Timeout,
        SolutionStatus::GapLimit => SolveStatus::Feasible,
    }
}

/// Create a CBC model maximising the objective, with every constraint added
fn create_model(
    model: LinearModel,
    config: &SolverConfig,
) -> Result<CoinCbcProblem, SolveError> {
    let LinearModel {
        variables,
        objective,
        constraints,
    } = model;

    let mut problem = variables
        .maximise(objective)
        .using(coin_cbc)
        .with_time_limit(config.time_limit_secs as f64)
        .with_mip_gap(config.mip_gap as f32)
        .map_err(|e| ConfigError::Validation(e.to_string()))?;
    problem.set_parameter("loglevel", if config.solver_log { "1" } else { "0" });
    if let Some(threads) = config.threads {
        problem.set_parameter("threads", &threads.to_string());
    }

    Ok(constraints.into_iter().fold(problem, |m, c| m.with(c)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formulation::Formulation;
    use crate::parse::parse_problem;

    use good_lp::Variable;
    use std::collections::HashMap;

    const INPUT: &str = "2 1 2 1 10\n6 6\n100 1\n0 10\n0 0 3\n1 0 5\n";

    /// An assignment that only reports how the search stopped.
    struct Stopped(SolutionStatus);

    impl LpSolution for Stopped {
        fn status(&self) -> SolutionStatus {
            match &self.0 {
                SolutionStatus::Optimal => SolutionStatus::Optimal,
                SolutionStatus::TimeLimit => SolutionStatus::TimeLimit,
                SolutionStatus::GapLimit => SolutionStatus::GapLimit,
            }
        }

        fn value(&self, _variable: Variable) -> f64 {
            0.0
        }
    }

    #[test]
    fn only_a_finished_search_counts_as_optimal() {
        assert_eq!(status_of(&Stopped(SolutionStatus::Optimal)), SolveStatus::Optimal);
        assert_eq!(status_of(&Stopped(SolutionStatus::GapLimit)), SolveStatus::Feasible);
        assert_eq!(status_of(&Stopped(SolutionStatus::TimeLimit)), SolveStatus::Timeout);
    }

    #[test]
    fn rejected_assignment_leaves_no_solution() {
        let mut run = SolverRun {
            status: SolveStatus::Timeout,
            solution: Some(HashMap::<Variable, f64>::new()),
        };
        assert!(!run.is_proven_optimal());

        run.retain_incumbent(|_| false);

        assert_eq!(run.status, SolveStatus::Timeout);
        assert_eq!(run.solution_count(), 0);
    }

    #[test]
    fn accepted_assignment_is_kept() {
        let mut run = SolverRun {
            status: SolveStatus::Timeout,
            solution: Some(HashMap::<Variable, f64>::new()),
        };

        run.retain_incumbent(|_| true);

        assert_eq!(run.solution_count(), 1);
    }

    #[test]
    fn rejects_invalid_config_before_solving() {
        let problem = parse_problem(INPUT).unwrap();
        let formulation = Formulation::build(&problem);
        let config = SolverConfig {
            time_limit_secs: 0,
            ..SolverConfig::default()
        };

        assert!(matches!(
            solve(formulation.model, &config),
            Err(SolveError::Config(_))
        ));
    }

    #[test]
    fn returns_an_incumbent_for_a_feasible_model() {
        let problem = parse_problem(INPUT).unwrap();
        let Formulation { model, index, .. } = Formulation::build(&problem);
        let config = SolverConfig {
            mip_gap: 0.0,
            ..SolverConfig::default()
        };

        let run = solve(model, &config).unwrap();

        assert_eq!(run.solution_count(), 1);
        assert_ne!(run.status, SolveStatus::Infeasible);
        let solution = run.solution.as_ref().unwrap();
        assert!(solution.value(index.placements[&(0, 1)]) > 0.5);
        assert!(solution.value(index.placements[&(0, 0)]) < 0.5);
    }
}
