use std::collections::BTreeSet;
use std::fmt::{Debug, Display, Formatter};

pub type Variable = String;

/// A named hyperedge: one relation symbol together with its attribute set.
/// Atom hyperedges stand for base relations; representative hyperedges are
/// the synthetic labels introduced when a join tree is generalized.
#[derive(Ord, PartialOrd, Eq, PartialEq, Clone, Hash)]
pub struct Hyperedge {
    pub label: String,
    pub variables: BTreeSet<Variable>,
    pub is_atom: bool,
}

impl Hyperedge {
    pub fn new(label: &str, variables: impl IntoIterator<Item = impl Into<Variable>>) -> Self {
        Self {
            label: label.to_string(),
            variables: variables.into_iter().map(Into::into).collect(),
            is_atom: true,
        }
    }

    /// The representative form of this hyperedge: the same variables with an
    /// empty label.
    pub fn edge_repr(&self) -> Self {
        Self {
            label: String::new(),
            variables: self.variables.clone(),
            is_atom: false,
        }
    }

    pub fn contains(&self, variable: &str) -> bool {
        self.variables.contains(variable)
    }
}

impl Display for Hyperedge {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let variables = self
            .variables
            .iter()
            .cloned()
            .collect::<Vec<_>>()
            .join(", ");

        if self.is_atom {
            write!(f, "{}({})", self.label, variables)
        } else {
            write!(f, "{{{}}}", variables)
        }
    }
}

impl Debug for Hyperedge {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}

/// A hypergraph over a set of variables. Every hyperedge's variables are a
/// subset of the graph's, and hyperedge labels are distinct.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct HyperGraph {
    pub variables: BTreeSet<Variable>,
    pub hyperedges: Vec<Hyperedge>,
}

impl HyperGraph {
    pub fn new(
        variables: impl IntoIterator<Item = impl Into<Variable>>,
        hyperedges: Vec<Hyperedge>,
    ) -> Self {
        Self {
            variables: variables.into_iter().map(Into::into).collect(),
            hyperedges,
        }
    }
}

impl From<Vec<Hyperedge>> for HyperGraph {
    fn from(hyperedges: Vec<Hyperedge>) -> Self {
        let variables = hyperedges
            .iter()
            .flat_map(|edge| edge.variables.iter().cloned())
            .collect();

        Self {
            variables,
            hyperedges,
        }
    }
}

#[derive(Default)]
pub struct HyperGraphBuilder {
    variables: BTreeSet<Variable>,
    hyperedges: Vec<Hyperedge>,
}

impl HyperGraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_edge(&mut self, label: &str, variables: Vec<&str>) {
        let edge = Hyperedge::new(label, variables);
        self.variables.extend(edge.variables.iter().cloned());
        self.hyperedges.push(edge);
    }

    pub fn finish(self) -> HyperGraph {
        HyperGraph {
            variables: self.variables,
            hyperedges: self.hyperedges,
        }
    }
}

#[macro_export]
macro_rules! build_hypergraph {
    ($( $label:ident ( $( $variable:ident ),* $(,)? ) ),* $(,)?) => {{
        let mut builder = $crate::HyperGraphBuilder::new();
        $(
            builder.with_edge(stringify!($label), vec![$( stringify!($variable) ),*]);
        )*
        builder.finish()
    }};
}
