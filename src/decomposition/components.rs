use std::collections::BTreeSet;

use itertools::Itertools;

use crate::decomposition::primal_graph::PrimalGraph;
use query_syntax::{HyperGraph, Variable};

/// Two variables are v-adjacent when some hyperedge contains both of them
/// outside `v`.
pub fn v_adjacent(hypergraph: &HyperGraph, v: &BTreeSet<Variable>, a: &str, b: &str) -> bool {
    if v.contains(a) || v.contains(b) {
        return false;
    }

    hypergraph
        .hyperedges
        .iter()
        .any(|edge| edge.contains(a) && edge.contains(b))
}

/// A sequence of variables is a v-path when every consecutive pair is
/// v-adjacent.
pub fn v_path(hypergraph: &HyperGraph, v: &BTreeSet<Variable>, path: &[&str]) -> bool {
    path.windows(2)
        .all(|pair| v_adjacent(hypergraph, v, pair[0], pair[1]))
}

/// `w` is v-connected when every pair of its members is linked by a simple
/// primal-graph path that is also a v-path.
pub fn v_connected(hypergraph: &HyperGraph, v: &BTreeSet<Variable>, w: &BTreeSet<Variable>) -> bool {
    let primal = PrimalGraph::new(hypergraph);

    w.iter().tuple_combinations().all(|(a, b)| {
        primal
            .simple_paths(a, b)
            .into_iter()
            .any(|path| v_path(hypergraph, v, &path))
    })
}

/// `w` is a v-component when it lies inside `variables ∖ v`, is v-connected,
/// and no strict superset within `variables ∖ v` is still v-connected.
pub fn v_component(hypergraph: &HyperGraph, v: &BTreeSet<Variable>, w: &BTreeSet<Variable>) -> bool {
    let outside: BTreeSet<Variable> = hypergraph.variables.difference(v).cloned().collect();

    if !w.is_subset(&outside) {
        return false;
    }
    if !v_connected(hypergraph, v, w) {
        return false;
    }

    outside.difference(w).all(|extra| {
        let mut extended = w.clone();
        extended.insert(extra.clone());
        !v_connected(hypergraph, v, &extended)
    })
}

/// All v-components that fall inside `within`, in sorted-seed order. The
/// classes are computed as closures of v-adjacency over `variables ∖ v`,
/// which are exactly the maximal sets accepted by `v_component`: a v-path
/// never enters `v`, so v-connectivity coincides with reachability through
/// v-adjacent pairs.
pub fn components(
    hypergraph: &HyperGraph,
    v: &BTreeSet<Variable>,
    within: &BTreeSet<Variable>,
) -> Vec<BTreeSet<Variable>> {
    let mut assigned: BTreeSet<&str> = BTreeSet::new();
    let mut classes = vec![];

    for seed in &hypergraph.variables {
        if v.contains(seed.as_str()) || assigned.contains(seed.as_str()) {
            continue;
        }

        let mut class: BTreeSet<Variable> = BTreeSet::new();
        let mut frontier = vec![seed.as_str()];
        while let Some(current) = frontier.pop() {
            if !class.insert(current.to_string()) {
                continue;
            }
            assigned.insert(current);

            for candidate in &hypergraph.variables {
                if !class.contains(candidate.as_str())
                    && v_adjacent(hypergraph, v, current, candidate)
                {
                    frontier.push(candidate.as_str());
                }
            }
        }

        if class.is_subset(within) {
            classes.push(class);
        }
    }

    classes
}
