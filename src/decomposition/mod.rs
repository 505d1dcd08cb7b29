pub mod components;
pub mod join_tree;
pub mod primal_graph;
