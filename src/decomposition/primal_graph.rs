use itertools::Itertools;
use petgraph::algo::all_simple_paths;
use petgraph::graphmap::UnGraphMap;

use query_syntax::HyperGraph;

/// The primal graph of a hypergraph: one vertex per variable, an edge
/// between two variables whenever some hyperedge contains both.
pub struct PrimalGraph<'a> {
    graph: UnGraphMap<&'a str, ()>,
}

impl<'a> PrimalGraph<'a> {
    pub fn new(hypergraph: &'a HyperGraph) -> Self {
        let mut graph = UnGraphMap::new();

        for variable in &hypergraph.variables {
            graph.add_node(variable.as_str());
        }
        for (a, b) in hypergraph.variables.iter().tuple_combinations() {
            if hypergraph
                .hyperedges
                .iter()
                .any(|edge| edge.contains(a) && edge.contains(b))
            {
                graph.add_edge(a.as_str(), b.as_str(), ());
            }
        }

        Self { graph }
    }

    pub fn contains_edge(&self, a: &str, b: &str) -> bool {
        let source = self.graph.nodes().find(|node| *node == a);
        let target = self.graph.nodes().find(|node| *node == b);

        match (source, target) {
            (Some(source), Some(target)) => self.graph.contains_edge(source, target),
            _ => false,
        }
    }

    /// All simple paths between two variables, depth-first with no revisits.
    /// Exponential in the worst case, which is acceptable for the small
    /// hypergraphs the decomposition targets.
    pub fn simple_paths(&self, from: &str, to: &str) -> Vec<Vec<&'a str>> {
        let source = self.graph.nodes().find(|node| *node == from);
        let target = self.graph.nodes().find(|node| *node == to);

        let (Some(source), Some(target)) = (source, target) else {
            return vec![];
        };

        all_simple_paths::<Vec<_>, _>(&self.graph, source, target, 0, None).collect()
    }
}
