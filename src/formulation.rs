//! Integer program for the placement problem.
//!
//! A request for video `v` at endpoint `e` saves `L_dc - L_c` where `c` is the
//! fastest cache reachable from `e` that stores `v`. That "best available
//! cache" objective is concave in the placement variables, so it is written as
//! a telescoping sum instead: with the beneficial caches of `e` sorted by
//! latency and `value[i] = L_dc - latency[i]`, each rank `i` gets a binary
//! `z[v, e, i]` worth `value[i] - value[i + 1]` (the last one worth
//! `value[k - 1]`) and bounded by
//!
//! ```text
//! z[v, e, i] <= x[c_0, v] + ... + x[c_i, v]
//! ```
//!
//! Maximising drives every coverable `z` to 1, and the gains of the ranks at
//! or after the best storing cache add back up to exactly its `value`.

use crate::relevance::{aggregate_demand, relevant_pairs};
use crate::types::{CacheId, Endpoint, EndpointId, Problem, VideoId};
use good_lp::{Constraint, Expression, ProblemVariables, Variable, constraint, variable, variables};
use serde::Serialize;
use std::collections::BTreeMap;

/// `(cache, video)` → `x[c, v]`, stored iff the pair is relevant.
pub type PlacementVariableMap = BTreeMap<(CacheId, VideoId), Variable>;

/// Identifies `z[v, e, i]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GainKey {
    pub video: VideoId,
    pub endpoint: EndpointId,
    pub rank: usize,
}

#[derive(Debug, Clone)]
pub struct GainTerm {
    pub variable: Variable,
    /// Objective coefficient: marginal gain times aggregated demand.
    pub coefficient: f64,
    /// The `rank + 1` best caches whose placement variables bound this term.
    pub covering_caches: Vec<CacheId>,
}

/// One rung of an endpoint's ladder of caches that beat the datacenter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GainStep {
    pub cache: CacheId,
    pub latency: u64,
    pub marginal_gain: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FormulationStats {
    pub demand_pairs: usize,
    pub placement_variables: usize,
    pub gain_variables: usize,
    pub capacity_constraints: usize,
    pub cover_constraints: usize,
}

/// The linear model handed to the solver.
pub struct LinearModel {
    pub variables: ProblemVariables,
    pub objective: Expression,
    pub constraints: Vec<Constraint>,
}

/// Lookup tables from problem entities to solver variables.
#[derive(Debug, Clone, Default)]
pub struct VariableIndex {
    pub placements: PlacementVariableMap,
    pub gains: BTreeMap<GainKey, GainTerm>,
}

pub struct Formulation {
    pub model: LinearModel,
    pub index: VariableIndex,
    pub stats: FormulationStats,
}

impl Formulation {
    /// Build the full model: placement variables, one capacity constraint per
    /// cache, and the marginal gain objective with its cover constraints.
    pub fn build(problem: &Problem) -> Self {
        let demand = aggregate_demand(&problem.requests);

        let (mut variables, placements) = init_placement_variables(problem);
        let mut constraints = constrain_cache_capacities(problem, &placements);
        let capacity_constraints = constraints.len();

        let ladders: Vec<Vec<GainStep>> = problem.endpoints.iter().map(gain_ladder).collect();

        let mut objective = Expression::from(0.0);
        let mut gains = BTreeMap::new();

        for (&(video, endpoint), &count) in &demand {
            let ladder = &ladders[endpoint];
            let mut covered = Expression::from(0.0);

            for (rank, step) in ladder.iter().enumerate() {
                covered += placements[&(step.cache, video)];
                if step.marginal_gain == 0 {
                    continue;
                }

                let coefficient = step.marginal_gain as f64 * count as f64;
                let z = variables.add(variable().binary());
                objective += z * coefficient;
                constraints.push(constraint!(z <= covered.clone()));

                gains.insert(
                    GainKey {
                        video,
                        endpoint,
                        rank,
                    },
                    GainTerm {
                        variable: z,
                        coefficient,
                        covering_caches: ladder[..=rank].iter().map(|s| s.cache).collect(),
                    },
                );
            }
        }

        let stats = FormulationStats {
            demand_pairs: demand.len(),
            placement_variables: placements.len(),
            gain_variables: gains.len(),
            capacity_constraints,
            cover_constraints: constraints.len() - capacity_constraints,
        };
        tracing::debug!(?stats, "built formulation");

        Formulation {
            model: LinearModel {
                variables,
                objective,
                constraints,
            },
            index: VariableIndex { placements, gains },
            stats,
        }
    }
}

fn init_placement_variables(problem: &Problem) -> (ProblemVariables, PlacementVariableMap) {
    let mut problem_vars = variables!();
    let placements = relevant_pairs(problem)
        .into_iter()
        .map(|pair| (pair, problem_vars.add(variable().binary())))
        .collect();
    (problem_vars, placements)
}

/// `sum(size[v] * x[c, v]) <= X` for every cache, including caches no
/// variable refers to.
fn constrain_cache_capacities(
    problem: &Problem,
    placements: &PlacementVariableMap,
) -> Vec<Constraint> {
    (0..problem.cache_count)
        .map(|cache| {
            let zero = Expression::from(0.0);
            let used = placements
                .range((cache, VideoId::MIN)..=(cache, VideoId::MAX))
                .fold(zero, |sum, (&(_, video), &x)| {
                    sum + x * problem.video_sizes[video] as f64
                });
            used.leq(problem.cache_capacity as f64)
        })
        .collect()
}

/// Caches strictly faster than the datacenter, best first, each with the extra
/// saving it offers over the next one down the ladder.
///
/// Equal latencies are ordered by cache id.
pub fn gain_ladder(endpoint: &Endpoint) -> Vec<GainStep> {
    let mut beneficial: Vec<(CacheId, u64)> = endpoint
        .cache_latencies
        .iter()
        .filter(|&(_, &latency)| latency < endpoint.datacenter_latency)
        .map(|(&cache, &latency)| (cache, latency))
        .collect();
    beneficial.sort_by_key(|&(_, latency)| latency);

    let value = |latency: u64| endpoint.datacenter_latency - latency;
    beneficial
        .iter()
        .enumerate()
        .map(|(i, &(cache, latency))| {
            let next_value = beneficial.get(i + 1).map_or(0, |&(_, next)| value(next));
            GainStep {
                cache,
                latency,
                marginal_gain: value(latency) - next_value,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_problem;

    const SMALL: &str = "\
5 2 4 3 100
50 50 80 30 110
1000 3
0 100
2 200
1 300
500 0
3 0 1500
0 1 1000
4 0 500
1 0 1000
";

    fn endpoint(datacenter_latency: u64, caches: &[(CacheId, u64)]) -> Endpoint {
        Endpoint {
            datacenter_latency,
            cache_latencies: caches.iter().copied().collect(),
        }
    }

    #[test]
    fn ladder_sorts_and_drops_slow_caches() {
        let e = endpoint(1000, &[(0, 100), (1, 300), (2, 200), (3, 1000), (4, 1200)]);
        let ladder = gain_ladder(&e);

        let caches: Vec<_> = ladder.iter().map(|s| s.cache).collect();
        let gains: Vec<_> = ladder.iter().map(|s| s.marginal_gain).collect();
        assert_eq!(caches, vec![0, 2, 1]);
        assert_eq!(gains, vec![100, 100, 700]);
        assert_eq!(gains.iter().sum::<u64>(), 1000 - 100);
    }

    #[test]
    fn ladder_ties_yield_zero_gain_steps() {
        let e = endpoint(100, &[(4, 50), (1, 50)]);
        let ladder = gain_ladder(&e);
        assert_eq!(
            ladder,
            vec![
                GainStep {
                    cache: 1,
                    latency: 50,
                    marginal_gain: 0
                },
                GainStep {
                    cache: 4,
                    latency: 50,
                    marginal_gain: 50
                },
            ]
        );
    }

    #[test]
    fn ladder_is_empty_without_beneficial_caches() {
        assert!(gain_ladder(&endpoint(100, &[])).is_empty());
        assert!(gain_ladder(&endpoint(100, &[(0, 100), (1, 150)])).is_empty());
    }

    #[test]
    fn model_counts_match_small_problem() {
        let problem = parse_problem(SMALL).unwrap();
        let formulation = Formulation::build(&problem);

        assert_eq!(
            formulation.stats,
            FormulationStats {
                demand_pairs: 4,
                placement_variables: 9,
                gain_variables: 9,
                capacity_constraints: 3,
                cover_constraints: 9,
            }
        );
        assert_eq!(formulation.model.constraints.len(), 12);
    }

    #[test]
    fn gain_coefficients_telescope_to_best_saving() {
        let problem = parse_problem(SMALL).unwrap();
        let formulation = Formulation::build(&problem);

        let terms: Vec<_> = formulation
            .index
            .gains
            .iter()
            .filter(|(key, _)| key.video == 3 && key.endpoint == 0)
            .map(|(_, term)| term)
            .collect();

        let coefficients: Vec<_> = terms.iter().map(|t| t.coefficient).collect();
        assert_eq!(coefficients, vec![150_000.0, 150_000.0, 1_050_000.0]);
        assert_eq!(coefficients.iter().sum::<f64>(), (1000.0 - 100.0) * 1500.0);

        assert_eq!(terms[0].covering_caches, vec![0]);
        assert_eq!(terms[1].covering_caches, vec![0, 2]);
        assert_eq!(terms[2].covering_caches, vec![0, 2, 1]);
    }

    #[test]
    fn repeated_requests_are_aggregated_before_weighting() {
        let input = "1 1 2 1 10\n5\n100 1\n0 10\n0 0 3\n0 0 4\n";
        let problem = parse_problem(input).unwrap();
        let formulation = Formulation::build(&problem);

        assert_eq!(formulation.stats.demand_pairs, 1);
        assert_eq!(formulation.stats.gain_variables, 1);
        let term = formulation.index.gains.values().next().unwrap();
        assert_eq!(term.coefficient, 90.0 * 7.0);
    }

    #[test]
    fn large_demand_weights_are_computed_in_floating_point() {
        let input = "1 1 2 1 10\n5\n100000 1\n0 10\n0 0 1000000000000000\n\
                     0 0 10000000000000000000\n";
        let problem = parse_problem(input).unwrap();
        let formulation = Formulation::build(&problem);

        let term = formulation.index.gains.values().next().unwrap();
        assert_eq!(term.coefficient, 99_990.0 * u64::MAX as f64);

        let input = "1 1 1 1 10\n5\n100000 1\n0 10\n0 0 1000000000000000\n";
        let problem = parse_problem(input).unwrap();
        let formulation = Formulation::build(&problem);
        let term = formulation.index.gains.values().next().unwrap();
        assert_eq!(term.coefficient, 99_990.0 * 1e15);
    }

    #[test]
    fn slow_caches_get_variables_but_no_gain() {
        let input = "1 1 1 2 10\n5\n100 2\n0 100\n1 300\n0 0 10\n";
        let problem = parse_problem(input).unwrap();
        let formulation = Formulation::build(&problem);

        assert_eq!(formulation.stats.placement_variables, 2);
        assert_eq!(formulation.stats.gain_variables, 0);
        assert_eq!(formulation.stats.cover_constraints, 0);
        assert_eq!(formulation.stats.capacity_constraints, 2);
    }

    #[test]
    fn unreferenced_caches_still_get_capacity_constraints() {
        let input = "1 1 0 4 10\n5\n100 1\n2 10\n";
        let problem = parse_problem(input).unwrap();
        let formulation = Formulation::build(&problem);

        assert_eq!(formulation.stats.placement_variables, 0);
        assert_eq!(formulation.stats.capacity_constraints, 4);
    }

    #[test]
    fn building_twice_gives_the_same_model() {
        let problem = parse_problem(SMALL).unwrap();
        let first = Formulation::build(&problem);
        let second = Formulation::build(&problem);

        assert_eq!(first.stats, second.stats);
        let keys = |f: &Formulation| f.index.placements.keys().copied().collect::<Vec<_>>();
        assert_eq!(keys(&first), keys(&second));
        let coefficients = |f: &Formulation| {
            f.index
                .gains
                .iter()
                .map(|(key, term)| (*key, term.coefficient))
                .collect::<Vec<_>>()
        };
        assert_eq!(coefficients(&first), coefficients(&second));
    }
}
