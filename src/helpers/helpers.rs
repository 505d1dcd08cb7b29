use std::collections::BTreeSet;

use query_syntax::Variable;

pub fn intersect(left: &BTreeSet<Variable>, right: &BTreeSet<Variable>) -> BTreeSet<Variable> {
    left.intersection(right).cloned().collect()
}

pub fn union(left: &BTreeSet<Variable>, right: &BTreeSet<Variable>) -> BTreeSet<Variable> {
    left.union(right).cloned().collect()
}
