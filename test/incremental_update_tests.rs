#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use micro_yannakakis::decomposition::join_tree::join_tree;
    use micro_yannakakis::engine::gjt::GeneralizedJoinTree;
    use micro_yannakakis::engine::relation::{MultisetRelation, Tuple};
    use micro_yannakakis::engine::storage::RelationCatalog;
    use pretty_assertions::assert_eq;
    use query_syntax::{build_hypergraph, HyperGraph};

    fn set(variables: &[&str]) -> BTreeSet<String> {
        variables
            .iter()
            .map(|variable| variable.to_string())
            .collect()
    }

    fn relation(name: &str, attributes: &[&str], rows: &[(&[&str], i64)]) -> MultisetRelation {
        let mut relation = MultisetRelation::new(name, set(attributes));
        for (values, multiplicity) in rows {
            let tuple: Tuple = attributes
                .iter()
                .copied()
                .zip(values.iter().copied())
                .collect();
            relation.insert(tuple, *multiplicity);
        }
        relation
    }

    fn evaluated(hypergraph: &HyperGraph, catalog: &RelationCatalog) -> GeneralizedJoinTree {
        let mut generalized = join_tree(hypergraph).unwrap().generalize();
        generalized.initialize(catalog).unwrap();
        generalized.semi_join_reduction().unwrap();
        generalized
    }

    /// Pointwise sum of two catalogs over the same schema, for checking the
    /// incremental result against a fresh evaluation.
    fn summed(base: &RelationCatalog, deltas: &[&MultisetRelation]) -> RelationCatalog {
        let mut combined = base.clone();
        for delta in deltas {
            let mut updated = combined.get_relation(delta.name()).unwrap().clone();
            updated.add(delta).unwrap();
            combined.add(updated);
        }
        combined
    }

    fn path_hypergraph() -> HyperGraph {
        build_hypergraph! { r(x, y), s(y, z), t(z, w) }
    }

    fn path_catalog() -> RelationCatalog {
        let mut catalog = RelationCatalog::new();
        catalog.add(relation("r", &["x", "y"], &[(&["a", "1"], 1)]));
        catalog.add(relation("s", &["y", "z"], &[(&["1", "alpha"], 1)]));
        catalog.add(relation("t", &["z", "w"], &[(&["alpha", "p"], 2)]));
        catalog
    }

    #[test]
    fn insertion_into_the_guard_relation() {
        let hypergraph = path_hypergraph();
        let mut generalized = evaluated(&hypergraph, &path_catalog());

        let mut deltas = RelationCatalog::new();
        deltas.add(relation("r", &["x", "y"], &[(&["a", "1"], 1)]));

        generalized.update(&deltas).unwrap();
        let result = generalized.enumerate().unwrap();

        // New r multiplicity 2 times t multiplicity 2.
        assert_eq!(1, result.len());
        assert_eq!(
            4,
            result.get_multiplicity(&Tuple::from([
                ("x", "a"),
                ("y", "1"),
                ("z", "alpha"),
                ("w", "p")
            ]))
        );
    }

    #[test]
    fn insertion_propagates_through_a_non_guard_child() {
        let hypergraph = path_hypergraph();
        let mut generalized = evaluated(&hypergraph, &path_catalog());

        let mut deltas = RelationCatalog::new();
        deltas.add(relation("t", &["z", "w"], &[(&["alpha", "q"], 1)]));

        generalized.update(&deltas).unwrap();
        let result = generalized.enumerate().unwrap();

        assert_eq!(2, result.len());
        assert_eq!(
            2,
            result.get_multiplicity(&Tuple::from([
                ("x", "a"),
                ("y", "1"),
                ("z", "alpha"),
                ("w", "p")
            ]))
        );
        assert_eq!(
            1,
            result.get_multiplicity(&Tuple::from([
                ("x", "a"),
                ("y", "1"),
                ("z", "alpha"),
                ("w", "q")
            ]))
        );
    }

    #[test]
    fn deletion_empties_the_result() {
        let hypergraph = path_hypergraph();
        let mut generalized = evaluated(&hypergraph, &path_catalog());

        let mut deltas = RelationCatalog::new();
        deltas.add(relation("t", &["z", "w"], &[(&["alpha", "p"], -2)]));

        generalized.update(&deltas).unwrap();
        let result = generalized.enumerate().unwrap();

        assert!(result.is_empty());
    }

    #[test]
    fn deltas_through_two_non_guard_children_at_once() {
        let hypergraph = build_hypergraph! { r(x, y, z), s(x, y, u), t(y, v, w) };

        let mut catalog = RelationCatalog::new();
        catalog.add(relation("r", &["x", "y", "z"], &[(&["a", "1", "c"], 1)]));
        catalog.add(relation("s", &["x", "y", "u"], &[(&["a", "1", "u1"], 1)]));
        catalog.add(relation("t", &["y", "v", "w"], &[(&["1", "v1", "w1"], 1)]));

        let mut generalized = evaluated(&hypergraph, &catalog);

        let mut deltas = RelationCatalog::new();
        deltas.add(relation("s", &["x", "y", "u"], &[(&["a", "1", "u2"], 1)]));
        deltas.add(relation("t", &["y", "v", "w"], &[(&["1", "v1", "w1"], 1)]));

        generalized.update(&deltas).unwrap();
        let result = generalized.enumerate().unwrap();

        assert_eq!(2, result.len());
        for u in ["u1", "u2"] {
            assert_eq!(
                2,
                result.get_multiplicity(&Tuple::from([
                    ("x", "a"),
                    ("y", "1"),
                    ("z", "c"),
                    ("u", u),
                    ("v", "v1"),
                    ("w", "w1")
                ]))
            );
        }
    }

    #[test]
    fn incremental_result_matches_a_fresh_evaluation() {
        let hypergraph = path_hypergraph();
        let base = path_catalog();

        let delta_r = relation("r", &["x", "y"], &[(&["b", "1"], 1)]);
        let delta_t = relation("t", &["z", "w"], &[(&["alpha", "p"], -1), (&["alpha", "q"], 3)]);

        let mut deltas = RelationCatalog::new();
        deltas.add(delta_r.clone());
        deltas.add(delta_t.clone());

        let mut incremental = evaluated(&hypergraph, &base);
        incremental.update(&deltas).unwrap();

        let fresh = evaluated(&hypergraph, &summed(&base, &[&delta_r, &delta_t]));

        assert_eq!(
            fresh.enumerate().unwrap(),
            incremental.enumerate().unwrap()
        );
    }

    #[test]
    fn an_insert_then_its_deletion_round_trips() {
        let hypergraph = path_hypergraph();
        let mut generalized = evaluated(&hypergraph, &path_catalog());

        let before = generalized.enumerate().unwrap();

        let mut inserts = RelationCatalog::new();
        inserts.add(relation("s", &["y", "z"], &[(&["1", "beta"], 2)]));
        generalized.update(&inserts).unwrap();

        let mut deletes = RelationCatalog::new();
        deletes.add(relation("s", &["y", "z"], &[(&["1", "beta"], -2)]));
        generalized.update(&deletes).unwrap();

        assert_eq!(before, generalized.enumerate().unwrap());
    }

    #[test]
    fn an_empty_batch_changes_nothing() {
        let hypergraph = path_hypergraph();
        let mut generalized = evaluated(&hypergraph, &path_catalog());

        let before = generalized.enumerate().unwrap();
        generalized.update(&RelationCatalog::new()).unwrap();

        assert_eq!(before, generalized.enumerate().unwrap());
    }
}
