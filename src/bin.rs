use std::collections::BTreeSet;
use std::time::Instant;

use micro_yannakakis::decomposition::join_tree::join_tree;
use micro_yannakakis::engine::relation::{MultisetRelation, Tuple};
use micro_yannakakis::engine::storage::RelationCatalog;
use query_syntax::build_hypergraph;

// Path-query benchmark over three chained binary relations.
fn chain_relation(name: &str, left: &str, right: &str, size: usize) -> MultisetRelation {
    let attributes: BTreeSet<String> = [left.to_string(), right.to_string()].into_iter().collect();

    let mut relation = MultisetRelation::new(name, attributes);
    for i in 0..size {
        relation.insert(
            Tuple::from([(left, i.to_string()), (right, (i + 1).to_string())]),
            1,
        );
    }

    relation
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let hypergraph = build_hypergraph! { r(x, y), s(y, z), t(z, w) };

    let mut catalog = RelationCatalog::new();
    catalog.add(chain_relation("r", "x", "y", 10_000));
    catalog.add(chain_relation("s", "y", "z", 10_000));
    catalog.add(chain_relation("t", "z", "w", 10_000));

    let now = Instant::now();
    let tree = join_tree(&hypergraph).unwrap();
    println!("decomposition: {} micros", now.elapsed().as_micros());

    let mut generalized = tree.generalize();

    let now = Instant::now();
    generalized.initialize(&catalog).unwrap();
    generalized.semi_join_reduction().unwrap();
    println!(
        "initialization + reduction: {} ms",
        now.elapsed().as_millis()
    );

    let now = Instant::now();
    let result = generalized.enumerate().unwrap();
    println!(
        "enumeration: {} ms, joined tuples: {}",
        now.elapsed().as_millis(),
        result.len()
    );

    let mut deltas = RelationCatalog::new();
    deltas.add(chain_relation("r", "x", "y", 1_000));

    let now = Instant::now();
    generalized.update(&deltas).unwrap();
    println!("incremental update: {} ms", now.elapsed().as_millis());

    let now = Instant::now();
    let result = generalized.enumerate().unwrap();
    println!(
        "re-enumeration: {} ms, joined tuples: {}",
        now.elapsed().as_millis(),
        result.len()
    );
}
