use std::collections::BTreeSet;

use tracing::debug;

use crate::decomposition::components::components;
use crate::error::EngineError;
use query_syntax::{HyperGraph, Hyperedge, Variable};

/// One node of a join tree: a hyperedge and its subtrees, in the order the
/// search produced them.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TreeNode {
    pub label: Hyperedge,
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    pub fn new(label: Hyperedge, children: Vec<TreeNode>) -> Self {
        Self { label, children }
    }

    /// Nested `[label, [children...]]` rendering for diagnostics.
    pub fn serialize(&self) -> String {
        let children = self
            .children
            .iter()
            .map(TreeNode::serialize)
            .collect::<Vec<_>>()
            .join(", ");

        format!("[{}, [{}]]", self.label, children)
    }
}

/// A rooted join tree over the hyperedges of an acyclic hypergraph. Every
/// variable occurs in a connected subtree of the nodes that carry it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct JoinTree {
    pub root: TreeNode,
}

impl JoinTree {
    pub fn serialize(&self) -> String {
        self.root.serialize()
    }
}

/// Plays the Robbers-and-Marshals game over the hyperedges. A winning
/// strategy for the marshals yields the join tree; if no strategy exists the
/// hypergraph is not acyclic and the decomposition fails.
pub fn join_tree(hypergraph: &HyperGraph) -> Result<JoinTree, EngineError> {
    let root = search(hypergraph, &hypergraph.variables, &[])
        .ok_or(EngineError::DecompositionFailure)?;
    debug!(tree = %root.serialize(), "decomposition found");

    Ok(JoinTree { root })
}

/// Whether the hypergraph admits a join tree at all.
pub fn decomposable(hypergraph: &HyperGraph) -> bool {
    join_tree(hypergraph).is_ok()
}

fn search(
    hypergraph: &HyperGraph,
    c_robbers: &BTreeSet<Variable>,
    marshals: &[&Hyperedge],
) -> Option<TreeNode> {
    // Candidate moves in label order, so equal inputs yield equal trees.
    let mut moves: Vec<&Hyperedge> = hypergraph.hyperedges.iter().collect();
    moves.sort_by(|a, b| a.label.cmp(&b.label));

    'moves: for candidate in moves {
        if !enclosed(hypergraph, c_robbers, marshals, candidate) {
            continue;
        }
        // The move has to shrink the robbers area.
        if c_robbers.is_disjoint(&candidate.variables) {
            continue;
        }

        let mut children = vec![];
        for component in components(hypergraph, &candidate.variables, c_robbers) {
            match search(hypergraph, &component, &[candidate]) {
                Some(subtree) => children.push(subtree),
                None => continue 'moves,
            }
        }

        return Some(TreeNode::new(candidate.clone(), children));
    }

    None
}

/// The marshals still seal the robbers area during the move: every hyperedge
/// touching the area only exposes marshal variables that the move covers.
fn enclosed(
    hypergraph: &HyperGraph,
    c_robbers: &BTreeSet<Variable>,
    marshals: &[&Hyperedge],
    candidate: &Hyperedge,
) -> bool {
    let held: BTreeSet<Variable> = marshals
        .iter()
        .flat_map(|marshal| marshal.variables.iter().cloned())
        .collect();

    hypergraph
        .hyperedges
        .iter()
        .filter(|edge| !edge.variables.is_disjoint(c_robbers))
        .all(|edge| {
            edge.variables
                .iter()
                .filter(|variable| held.contains(variable.as_str()))
                .all(|variable| candidate.variables.contains(variable.as_str()))
        })
}
