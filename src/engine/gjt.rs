use std::collections::BTreeSet;

use crate::decomposition::join_tree::{JoinTree, TreeNode};
use crate::engine::relation::MultisetRelation;
use crate::helpers::helpers::intersect;
use query_syntax::{Hyperedge, Variable};

pub(crate) type NodeId = usize;

/// One arena slot of a generalized join tree. Parent, guard and children are
/// arena indices; the materialized views are populated by `initialize` and
/// the delta views by `update`.
#[derive(Clone, Debug)]
pub struct GjtNode {
    pub idx: NodeId,
    pub label: Hyperedge,
    pub parent: Option<NodeId>,
    pub guard: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub(crate) lambda: Option<MultisetRelation>,
    pub(crate) psi: Option<MultisetRelation>,
    pub(crate) gamma: Option<MultisetRelation>,
    pub(crate) delta_lambda: Option<MultisetRelation>,
    pub(crate) delta_psi: Option<MultisetRelation>,
    pub(crate) delta_gamma: Option<MultisetRelation>,
}

impl GjtNode {
    fn new(idx: NodeId, label: Hyperedge) -> Self {
        Self {
            idx,
            label,
            parent: None,
            guard: None,
            children: vec![],
            lambda: None,
            psi: None,
            gamma: None,
            delta_lambda: None,
            delta_psi: None,
            delta_gamma: None,
        }
    }

    /// The live view of this node; present once the tree is initialized.
    pub fn relation(&self) -> Option<&MultisetRelation> {
        self.lambda.as_ref()
    }
}

/// A generalized join tree: every internal node is a representative whose
/// guard child carries the node's full attribute set. Nodes live in a flat
/// arena and refer to each other by index, which keeps the parent and guard
/// back-references trivial.
#[derive(Clone, Debug, Default)]
pub struct GeneralizedJoinTree {
    pub(crate) arena: Vec<GjtNode>,
    pub(crate) root: Option<NodeId>,
}

impl GeneralizedJoinTree {
    fn allocate(&mut self, label: Hyperedge) -> NodeId {
        let idx = self.arena.len();
        self.arena.push(GjtNode::new(idx, label));
        idx
    }

    pub fn node(&self, idx: NodeId) -> &GjtNode {
        &self.arena[idx]
    }

    pub fn root(&self) -> Option<&GjtNode> {
        self.root.map(|idx| &self.arena[idx])
    }

    pub fn nodes(&self) -> impl Iterator<Item = &GjtNode> {
        self.arena.iter()
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// The attributes shared with the parent; empty at the root.
    pub(crate) fn pvar(&self, idx: NodeId) -> BTreeSet<Variable> {
        match self.arena[idx].parent {
            Some(parent) => intersect(
                &self.arena[idx].label.variables,
                &self.arena[parent].label.variables,
            ),
            None => BTreeSet::new(),
        }
    }

    /// The non-guard children of a node, in child insertion order.
    pub(crate) fn non_guards(&self, idx: NodeId) -> Vec<NodeId> {
        let guard = self.arena[idx].guard;
        self.arena[idx]
            .children
            .iter()
            .copied()
            .filter(|child| Some(*child) != guard)
            .collect()
    }

    /// Pre-order search for an existing representative over `variables`.
    fn find_representative(&self, variables: &BTreeSet<Variable>) -> Option<NodeId> {
        fn walk(
            tree: &GeneralizedJoinTree,
            idx: NodeId,
            variables: &BTreeSet<Variable>,
        ) -> Option<NodeId> {
            let node = &tree.arena[idx];
            if !node.label.is_atom && node.label.variables == *variables {
                return Some(idx);
            }

            node.children
                .iter()
                .find_map(|child| walk(tree, *child, variables))
        }

        self.root.and_then(|root| walk(self, root, variables))
    }

    /// Nested `[label-or-attribute-set, [children...]]` rendering for
    /// diagnostics.
    pub fn serialize(&self) -> String {
        fn walk(tree: &GeneralizedJoinTree, idx: NodeId) -> String {
            let children = tree.arena[idx]
                .children
                .iter()
                .map(|child| walk(tree, *child))
                .collect::<Vec<_>>()
                .join(", ");

            format!("[{}, [{}]]", tree.arena[idx].label, children)
        }

        match self.root {
            Some(root) => walk(self, root),
            None => "[]".to_string(),
        }
    }
}

impl JoinTree {
    /// Rewrites the join tree into its generalized form. Atoms labelling
    /// internal nodes become guard children of representative nodes; atoms
    /// sharing an attribute set end up as siblings under one representative,
    /// guarded by the first atom that induced it.
    pub fn generalize(&self) -> GeneralizedJoinTree {
        let mut tree = GeneralizedJoinTree::default();
        emit(&self.root, &mut tree, None);
        tree
    }
}

fn emit(node: &TreeNode, tree: &mut GeneralizedJoinTree, parent_repr: Option<NodeId>) {
    if node.children.is_empty() {
        let leaf = tree.allocate(node.label.clone());
        match parent_repr {
            Some(parent) => {
                tree.arena[leaf].parent = Some(parent);
                tree.arena[parent].children.push(leaf);
            }
            // A join tree that is a single atom generalizes to a single leaf.
            None => tree.root = Some(leaf),
        }
        return;
    }

    let atom = tree.allocate(node.label.clone());
    let representative = match tree.find_representative(&node.label.variables) {
        Some(existing) => existing,
        None => {
            let fresh = tree.allocate(node.label.edge_repr());
            tree.arena[fresh].guard = Some(atom);
            match parent_repr {
                Some(parent) => {
                    tree.arena[fresh].parent = Some(parent);
                    tree.arena[parent].children.push(fresh);
                }
                None => tree.root = Some(fresh),
            }
            fresh
        }
    };

    tree.arena[atom].parent = Some(representative);
    tree.arena[representative].children.push(atom);

    for child in &node.children {
        emit(child, tree, Some(representative));
    }
}
