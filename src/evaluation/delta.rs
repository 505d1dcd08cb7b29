use tracing::debug;

use crate::engine::gjt::{GeneralizedJoinTree, NodeId};
use crate::engine::relation::{MultisetRelation, Multiplicity};
use crate::engine::storage::RelationCatalog;
use crate::error::EngineError;

impl GeneralizedJoinTree {
    /// Propagates a batch of signed base-relation deltas through the tree
    /// and folds them into the materialized views, as one step: after it
    /// returns, `enumerate` reflects the updated base relations without a
    /// fresh initialization or reduction.
    pub fn update(&mut self, deltas: &RelationCatalog) -> Result<(), EngineError> {
        if let Some(root) = self.root {
            self.update_node(root, deltas)?;
            self.apply_node(root)?;
            debug!("delta batch applied");
        }
        Ok(())
    }

    fn update_node(&mut self, idx: NodeId, deltas: &RelationCatalog) -> Result<(), EngineError> {
        for child in self.arena[idx].children.clone() {
            self.update_node(child, deltas)?;
        }

        if self.arena[idx].label.is_atom {
            let label = &self.arena[idx].label;
            // An atom absent from the batch has an empty delta.
            let delta = match deltas.get_relation_safe(&label.label) {
                Some(relation) => relation.clone(),
                None => MultisetRelation::new(&label.label, label.variables.clone()),
            };
            let delta_psi = delta.project(&self.pvar(idx))?;
            self.arena[idx].delta_lambda = Some(delta);
            self.arena[idx].delta_psi = Some(delta_psi);
        } else {
            self.compute_deltas(idx)?;
        }

        Ok(())
    }

    /// Delta views of a representative, derived from the already-updated
    /// children. The affected keys are the guard's changed tuples plus every
    /// γ tuple whose projection matches a changed non-guard key.
    fn compute_deltas(&mut self, idx: NodeId) -> Result<(), EngineError> {
        let pvar = self.pvar(idx);
        let variables = self.arena[idx].label.variables.clone();
        let guard = self.arena[idx]
            .guard
            .expect("representative node without a guard");
        let children = self.arena[idx].children.clone();

        let mut delta_lambda = MultisetRelation::new("", variables.clone());
        let mut delta_psi = MultisetRelation::new("", pvar.clone());
        let mut delta_gamma = MultisetRelation::new("", variables);

        let mut affected = self.arena[guard]
            .delta_psi
            .clone()
            .expect("children updated before their parent");
        for non_guard in self.non_guards(idx) {
            let key = self.pvar(non_guard);
            let changed = self.arena[non_guard]
                .delta_psi
                .as_ref()
                .expect("children updated before their parent");
            let gamma = self.arena[idx]
                .gamma
                .as_ref()
                .expect("update before initialization");

            for (tuple, _multiplicity) in changed.iter() {
                affected = affected.merge(&gamma.retrieve(&key, &tuple.project(&key)?)?);
            }
        }

        let guard_psi = self.arena[guard]
            .psi
            .as_ref()
            .expect("children updated before their parent");
        let guard_delta_psi = self.arena[guard]
            .delta_psi
            .as_ref()
            .expect("children updated before their parent");
        let gamma = self.arena[idx]
            .gamma
            .as_ref()
            .expect("update before initialization");
        let lambda = self.arena[idx]
            .lambda
            .as_ref()
            .expect("update before initialization");

        for (tuple, _multiplicity) in affected.iter() {
            delta_gamma.set_multiplicity(
                tuple.clone(),
                guard_psi.get_multiplicity(tuple) + guard_delta_psi.get_multiplicity(tuple)
                    - gamma.get_multiplicity(tuple),
            );

            // Post-update count of the tuple at this node: the product of
            // every child's updated projection count at the tuple's key.
            let mut updated: Multiplicity = 1;
            for child in &children {
                let key = tuple.project(&self.pvar(*child))?;
                let child_psi = self.arena[*child]
                    .psi
                    .as_ref()
                    .expect("children updated before their parent");
                let child_delta_psi = self.arena[*child]
                    .delta_psi
                    .as_ref()
                    .expect("children updated before their parent");
                updated *= child_psi.get_multiplicity(&key) + child_delta_psi.get_multiplicity(&key);
            }

            let grown = updated - lambda.get_multiplicity(tuple);
            delta_lambda.set_multiplicity(tuple.clone(), grown);

            let parent_key = tuple.project(&pvar)?;
            let accumulated = delta_psi.get_multiplicity(&parent_key) + grown;
            delta_psi.set_multiplicity(parent_key, accumulated);
        }

        self.arena[idx].delta_lambda = Some(delta_lambda);
        self.arena[idx].delta_psi = Some(delta_psi);
        self.arena[idx].delta_gamma = Some(delta_gamma);

        Ok(())
    }

    fn apply_node(&mut self, idx: NodeId) -> Result<(), EngineError> {
        let node = &mut self.arena[idx];

        node.lambda
            .as_mut()
            .expect("apply before initialization")
            .add(node.delta_lambda.as_ref().expect("apply before update"))?;
        node.psi
            .as_mut()
            .expect("apply before initialization")
            .add(node.delta_psi.as_ref().expect("apply before update"))?;
        if !node.label.is_atom {
            node.gamma
                .as_mut()
                .expect("apply before initialization")
                .add(node.delta_gamma.as_ref().expect("apply before update"))?;
        }

        for child in self.arena[idx].children.clone() {
            self.apply_node(child)?;
        }

        Ok(())
    }
}
