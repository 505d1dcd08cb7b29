use std::collections::BTreeSet;

use tracing::debug;

use crate::engine::gjt::{GeneralizedJoinTree, NodeId};
use crate::engine::relation::{MultisetRelation, Tuple};
use crate::engine::storage::RelationCatalog;
use crate::error::EngineError;

impl GeneralizedJoinTree {
    /// Materializes the λ, ψ and γ views at every node, post-order. Leaves
    /// read their base relation from the catalog; representatives derive
    /// their views from the guard child, and γ gets one index per non-guard
    /// child on that child's connection key.
    pub fn initialize(&mut self, catalog: &RelationCatalog) -> Result<(), EngineError> {
        if let Some(root) = self.root {
            self.initialize_node(root, catalog)?;
            debug!(nodes = self.len(), "views initialized");
        }
        Ok(())
    }

    fn initialize_node(&mut self, idx: NodeId, catalog: &RelationCatalog) -> Result<(), EngineError> {
        let children = self.arena[idx].children.clone();

        let lambda = if children.is_empty() {
            catalog.get_relation(&self.arena[idx].label.label)?.clone()
        } else {
            for child in &children {
                self.initialize_node(*child, catalog)?;
            }

            let guard = self.arena[idx]
                .guard
                .expect("representative node without a guard");
            let guard_lambda = self.arena[guard]
                .lambda
                .as_ref()
                .expect("guard initialized before its parent");
            let lambda = guard_lambda.project(&self.arena[idx].label.variables)?;

            let mut gamma = self.arena[guard]
                .psi
                .clone()
                .expect("guard initialized before its parent");
            for non_guard in self.non_guards(idx) {
                let key = self.pvar(non_guard);
                gamma.create_index(&key)?;
            }
            self.arena[idx].gamma = Some(gamma);

            lambda
        };

        let psi = lambda.project(&self.pvar(idx))?;
        self.arena[idx].lambda = Some(lambda);
        self.arena[idx].psi = Some(psi);

        Ok(())
    }

    /// Bottom-up semi-join reduction, the first Yannakakis phase: every
    /// parent is filtered by each of its children, and every node ends up
    /// indexed on its connection key. Afterwards a tuple survives in a λ iff
    /// it takes part in at least one full join result.
    pub fn semi_join_reduction(&mut self) -> Result<(), EngineError> {
        if let Some(root) = self.root {
            self.reduce_node(root)?;
            debug!("semi-join reduction complete");
        }
        Ok(())
    }

    fn reduce_node(&mut self, idx: NodeId) -> Result<(), EngineError> {
        for child in self.arena[idx].children.clone() {
            self.reduce_node(child)?;
        }

        let mut lambda = self.arena[idx]
            .lambda
            .take()
            .expect("reduction before initialization");

        if let Some(parent) = self.arena[idx].parent {
            let parent_lambda = self.arena[parent]
                .lambda
                .take()
                .expect("reduction before initialization");
            self.arena[parent].lambda = Some(parent_lambda.semi_join(&lambda)?);
        }

        lambda.create_index(&self.pvar(idx))?;
        self.arena[idx].lambda = Some(lambda);

        Ok(())
    }

    /// Top-down enumeration of the join result, the second Yannakakis phase.
    /// Valid after `semi_join_reduction`; multiplicities in the result are
    /// the products of the matching base multiplicities, summed over
    /// witnesses.
    pub fn enumerate(&self) -> Result<MultisetRelation, EngineError> {
        match self.root {
            Some(root) => self.enumerate_node(root, &Tuple::empty()),
            None => Ok(MultisetRelation::new("", BTreeSet::new())),
        }
    }

    fn enumerate_node(&self, idx: NodeId, binding: &Tuple) -> Result<MultisetRelation, EngineError> {
        let pvar = self.pvar(idx);
        let lambda = self.arena[idx]
            .lambda
            .as_ref()
            .expect("enumeration before initialization");
        let matches = lambda.retrieve(&pvar, &binding.project(&pvar)?)?;

        let children = &self.arena[idx].children;
        if children.is_empty() {
            return Ok(matches);
        }

        let mut result = MultisetRelation::new("", BTreeSet::new());
        for (tuple, _multiplicity) in matches.iter() {
            let mut joined: Option<MultisetRelation> = None;
            for child in children {
                let branch = self.enumerate_node(*child, tuple)?;
                joined = Some(match joined {
                    None => branch,
                    Some(accumulated) => accumulated.cart_prod(&branch),
                });
            }
            if let Some(joined) = joined {
                result = result.merge(&joined);
            }
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decomposition::join_tree::join_tree;
    use query_syntax::build_hypergraph;

    fn set(variables: &[&str]) -> BTreeSet<String> {
        variables
            .iter()
            .map(|variable| variable.to_string())
            .collect()
    }

    fn path_catalog() -> RelationCatalog {
        let mut r = MultisetRelation::new("r", set(&["x", "y"]));
        r.insert(Tuple::from([("x", "a"), ("y", "1")]), 1);

        let mut s = MultisetRelation::new("s", set(&["y", "z"]));
        s.insert(Tuple::from([("y", "1"), ("z", "alpha")]), 1);

        let mut t = MultisetRelation::new("t", set(&["z", "w"]));
        t.insert(Tuple::from([("z", "alpha"), ("w", "p")]), 2);

        let mut catalog = RelationCatalog::new();
        catalog.add(r);
        catalog.add(s);
        catalog.add(t);
        catalog
    }

    #[test]
    fn initialize_seeds_views_from_the_guard() {
        let hypergraph = build_hypergraph! { r(x, y), s(y, z), t(z, w) };
        let mut generalized = join_tree(&hypergraph).unwrap().generalize();
        generalized.initialize(&path_catalog()).unwrap();

        let root = generalized.root().unwrap();
        let lambda = root.relation().unwrap();
        assert_eq!(&set(&["x", "y"]), lambda.attributes());
        assert_eq!(
            1,
            lambda.get_multiplicity(&Tuple::from([("x", "a"), ("y", "1")]))
        );

        // γ at the root mirrors the guard's ψ and answers keyed lookups for
        // the non-guard child.
        let gamma = root.gamma.as_ref().unwrap();
        let matches = gamma
            .retrieve(&set(&["y"]), &Tuple::from([("y", "1")]))
            .unwrap();
        assert_eq!(1, matches.len());
    }

    #[test]
    fn initialize_fails_on_a_missing_base_relation() {
        let hypergraph = build_hypergraph! { r(x, y), s(y, z) };
        let mut generalized = join_tree(&hypergraph).unwrap().generalize();

        let result = generalized.initialize(&RelationCatalog::new());

        assert!(matches!(result, Err(EngineError::UnknownRelation(_))));
    }

    #[test]
    fn reduction_filters_parents_by_their_children() {
        let hypergraph = build_hypergraph! { r(x, y), s(y, z), t(z, w) };
        let mut generalized = join_tree(&hypergraph).unwrap().generalize();

        let mut catalog = path_catalog();
        let mut r = MultisetRelation::new("r", set(&["x", "y"]));
        r.insert(Tuple::from([("x", "a"), ("y", "1")]), 1);
        r.insert(Tuple::from([("x", "b"), ("y", "2")]), 1);
        catalog.add(r);

        generalized.initialize(&catalog).unwrap();
        generalized.semi_join_reduction().unwrap();

        let lambda = generalized.root().unwrap().relation().unwrap();
        assert_eq!(
            0,
            lambda.get_multiplicity(&Tuple::from([("x", "b"), ("y", "2")]))
        );
        // The surviving tuple is scaled by the child's projected count.
        assert_eq!(
            2,
            lambda.get_multiplicity(&Tuple::from([("x", "a"), ("y", "1")]))
        );
    }

    #[test]
    fn enumerate_produces_the_join_with_multiplied_counts() {
        let hypergraph = build_hypergraph! { r(x, y), s(y, z), t(z, w) };
        let mut generalized = join_tree(&hypergraph).unwrap().generalize();
        generalized.initialize(&path_catalog()).unwrap();
        generalized.semi_join_reduction().unwrap();

        let result = generalized.enumerate().unwrap();

        assert_eq!(1, result.len());
        assert_eq!(
            2,
            result.get_multiplicity(&Tuple::from([
                ("x", "a"),
                ("y", "1"),
                ("z", "alpha"),
                ("w", "p")
            ]))
        );
    }
}
