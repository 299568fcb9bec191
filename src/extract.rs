use crate::formulation::{PlacementVariableMap, VariableIndex};
use crate::types::{CacheId, Placement, Problem};
use good_lp::{Solution as LpSolution, Variable};
use std::collections::BTreeMap;

/// Binary variables are read as set above this value.
pub const BINARY_THRESHOLD: f64 = 0.5;

/// Largest distance from 0 or 1 that still counts as integral.
pub const INTEGRALITY_TOLERANCE: f64 = 1e-6;

/// Read the placement out of the solver's assignment.
///
/// Without a solution the placement is empty. Capacity is not re-checked: the
/// model's own constraints already hold for any assignment the solver returns.
pub fn create_placement(
    solution: Option<&impl LpSolution>,
    placements: &PlacementVariableMap,
) -> Placement {
    let mut placement = Placement::default();
    let Some(solution) = solution else {
        return placement;
    };

    for (&(cache, video), &x) in placements {
        if solution.value(x) > BINARY_THRESHOLD {
            placement.insert(cache, video);
        }
    }
    placement
}

/// Whether the assignment is an integer solution of the model: every binary
/// at 0 or 1, every cache within capacity, and every set gain term covered by
/// one of its caches.
pub fn is_incumbent(solution: &impl LpSolution, index: &VariableIndex, problem: &Problem) -> bool {
    let integral = |x: Variable| {
        let value = solution.value(x);
        value.abs() <= INTEGRALITY_TOLERANCE || (value - 1.0).abs() <= INTEGRALITY_TOLERANCE
    };
    let all_integral = index
        .placements
        .values()
        .chain(index.gains.values().map(|term| &term.variable))
        .all(|&x| integral(x));
    if !all_integral {
        return false;
    }

    let is_set = |x: Variable| solution.value(x) > BINARY_THRESHOLD;

    let mut used: BTreeMap<CacheId, u64> = BTreeMap::new();
    for (&(cache, video), &x) in &index.placements {
        if is_set(x) {
            let total = used.entry(cache).or_insert(0);
            *total = total.saturating_add(problem.video_sizes[video]);
        }
    }
    if used.values().any(|&total| total > problem.cache_capacity) {
        return false;
    }

    index
        .gains
        .iter()
        .filter(|(_, term)| is_set(term.variable))
        .all(|(key, term)| {
            term.covering_caches
                .iter()
                .any(|&cache| is_set(index.placements[&(cache, key.video)]))
        })
}

/// Objective value of the assignment, as the model sees it.
pub fn objective_value(solution: Option<&impl LpSolution>, index: &VariableIndex) -> f64 {
    solution.map_or(0.0, |solution| {
        index
            .gains
            .values()
            .filter(|term| solution.value(term.variable) > BINARY_THRESHOLD)
            .map(|term| term.coefficient)
            .sum()
    })
}
