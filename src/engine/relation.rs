use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{Debug, Formatter};
use std::fs;
use std::path::Path;

use ahash::{HashMap, HashMapExt};
use indexmap::IndexMap;

use crate::error::EngineError;
use crate::helpers::helpers::{intersect, union};
use query_syntax::Variable;

pub type Multiplicity = i64;

/// An immutable attribute-to-value mapping. Equality, hashing and ordering
/// are by value; attribute order is irrelevant because the backing map is
/// sorted.
#[derive(Ord, PartialOrd, Eq, PartialEq, Clone, Hash, Default)]
pub struct Tuple {
    inner: BTreeMap<Variable, String>,
}

impl Tuple {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn get(&self, variable: &str) -> Option<&str> {
        self.inner.get(variable).map(String::as_str)
    }

    pub fn attributes(&self) -> BTreeSet<Variable> {
        self.inner.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Restriction to `variables`; fails if any of them is absent.
    pub fn project(&self, variables: &BTreeSet<Variable>) -> Result<Tuple, EngineError> {
        let mut projection = BTreeMap::new();

        for variable in variables {
            let value = self
                .inner
                .get(variable)
                .ok_or_else(|| EngineError::MissingAttribute(variable.clone()))?;
            projection.insert(variable.clone(), value.clone());
        }

        Ok(Tuple { inner: projection })
    }

    /// Attribute-set union of both tuples. On overlapping attributes the
    /// right side wins; callers guarantee the overlap is empty or agreeing.
    pub fn join(&self, other: &Tuple) -> Tuple {
        let mut joined = self.inner.clone();
        joined.extend(
            other
                .inner
                .iter()
                .map(|(variable, value)| (variable.clone(), value.clone())),
        );

        Tuple { inner: joined }
    }
}

impl Debug for Tuple {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "(")?;
        for (position, (variable, value)) in self.inner.iter().enumerate() {
            if position > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", variable, value)?;
        }
        write!(f, ")")
    }
}

impl<K: Into<Variable>, V: Into<String>> FromIterator<(K, V)> for Tuple {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(entries: I) -> Self {
        Tuple {
            inner: entries
                .into_iter()
                .map(|(variable, value)| (variable.into(), value.into()))
                .collect(),
        }
    }
}

impl<K: Into<Variable>, V: Into<String>, const N: usize> From<[(K, V); N]> for Tuple {
    fn from(entries: [(K, V); N]) -> Self {
        entries.into_iter().collect()
    }
}

type CountMap = IndexMap<Tuple, Multiplicity, ahash::RandomState>;
type IndexEntries = HashMap<Tuple, Vec<(Tuple, Multiplicity)>>;

/// A multiset of tuples over a fixed attribute set. Multiplicities are
/// signed; negative counts only occur transiently while delta batches are
/// being computed. A relation can carry one hash index per key attribute
/// subset; indexes only ever expose entries with nonzero counts.
#[derive(Clone, Debug)]
pub struct MultisetRelation {
    name: String,
    attributes: BTreeSet<Variable>,
    counts: CountMap,
    indexes: HashMap<BTreeSet<Variable>, IndexEntries>,
}

impl PartialEq for MultisetRelation {
    fn eq(&self, other: &Self) -> bool {
        self.attributes == other.attributes && self.counts == other.counts
    }
}

impl MultisetRelation {
    pub fn new(name: &str, attributes: BTreeSet<Variable>) -> Self {
        Self {
            name: name.to_string(),
            attributes,
            counts: CountMap::default(),
            indexes: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attributes(&self) -> &BTreeSet<Variable> {
        &self.attributes
    }

    /// Number of distinct tuples, including any whose count is zero.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Tuple, Multiplicity)> + '_ {
        self.counts.iter().map(|(tuple, count)| (tuple, *count))
    }

    pub fn get_multiplicity(&self, tuple: &Tuple) -> Multiplicity {
        self.counts.get(tuple).copied().unwrap_or(0)
    }

    /// Stores exactly `multiplicity`, which may be zero or negative.
    pub fn set_multiplicity(&mut self, tuple: Tuple, multiplicity: Multiplicity) {
        self.counts.insert(tuple, multiplicity);
    }

    /// Accumulates `multiplicity` onto the existing count of `tuple`.
    pub fn insert(&mut self, tuple: impl Into<Tuple>, multiplicity: Multiplicity) {
        *self.counts.entry(tuple.into()).or_insert(0) += multiplicity;
    }

    /// Projection onto `variables`: multiplicities of pre-images sum up.
    pub fn project(&self, variables: &BTreeSet<Variable>) -> Result<MultisetRelation, EngineError> {
        for variable in variables {
            if !self.attributes.contains(variable) {
                return Err(EngineError::MissingAttribute(variable.clone()));
            }
        }

        let mut projection = MultisetRelation::new("", variables.clone());
        for (tuple, multiplicity) in self.iter() {
            let image = tuple.project(variables)?;
            *projection.counts.entry(image).or_insert(0) += multiplicity;
        }

        Ok(projection)
    }

    /// Overwrite-combine: counts from `other` replace counts of `self` on
    /// shared keys. The result spans both attribute sets. Additive
    /// combination is `add`, not this.
    pub fn merge(&self, other: &MultisetRelation) -> MultisetRelation {
        let mut merged = MultisetRelation::new("", union(&self.attributes, &other.attributes));

        for (tuple, multiplicity) in self.iter() {
            merged.counts.insert(tuple.clone(), multiplicity);
        }
        for (tuple, multiplicity) in other.iter() {
            merged.counts.insert(tuple.clone(), multiplicity);
        }

        merged
    }

    /// Cartesian product; constituent multiplicities multiply. Callers
    /// guarantee that overlapping attributes agree on the joined tuples.
    pub fn cart_prod(&self, other: &MultisetRelation) -> MultisetRelation {
        let mut product = MultisetRelation::new("", union(&self.attributes, &other.attributes));

        for (left, left_count) in self.iter() {
            for (right, right_count) in other.iter() {
                product
                    .counts
                    .insert(left.join(right), left_count * right_count);
            }
        }

        product
    }

    /// Left semi-join: keeps the tuples of `self` with a positive match in
    /// the projection of `other` onto the shared attributes, scaled by the
    /// projected multiplicity.
    pub fn semi_join(&self, other: &MultisetRelation) -> Result<MultisetRelation, EngineError> {
        let join_variables = intersect(&self.attributes, &other.attributes);
        let projected = other.project(&join_variables)?;

        let mut reduced = MultisetRelation::new(&self.name, self.attributes.clone());
        for (tuple, multiplicity) in self.iter() {
            let matched = projected.get_multiplicity(&tuple.project(&join_variables)?);
            if matched > 0 && multiplicity != 0 {
                reduced.counts.insert(tuple.clone(), multiplicity * matched);
            }
        }

        Ok(reduced)
    }

    /// Builds (or rebuilds) the index keyed on `key`. Entries with a zero
    /// count are not indexed.
    pub fn create_index(&mut self, key: &BTreeSet<Variable>) -> Result<(), EngineError> {
        for variable in key {
            if !self.attributes.contains(variable) {
                return Err(EngineError::MissingAttribute(variable.clone()));
            }
        }

        let mut entries = IndexEntries::new();
        for (tuple, multiplicity) in self.counts.iter() {
            if *multiplicity == 0 {
                continue;
            }
            entries
                .entry(tuple.project(key)?)
                .or_default()
                .push((tuple.clone(), *multiplicity));
        }

        self.indexes.insert(key.clone(), entries);
        Ok(())
    }

    /// The entries whose projection on `key` equals `key_tuple`, with their
    /// multiplicities. An empty key returns a copy of the nonzero entries;
    /// any other key requires a previously built index.
    pub fn retrieve(
        &self,
        key: &BTreeSet<Variable>,
        key_tuple: &Tuple,
    ) -> Result<MultisetRelation, EngineError> {
        if key.is_empty() {
            let mut copy = MultisetRelation::new(&self.name, self.attributes.clone());
            for (tuple, multiplicity) in self.iter() {
                if multiplicity != 0 {
                    copy.counts.insert(tuple.clone(), multiplicity);
                }
            }
            return Ok(copy);
        }

        let entries = self
            .indexes
            .get(key)
            .ok_or_else(|| EngineError::MissingIndex {
                relation: self.name.clone(),
                key: key.iter().cloned().collect::<Vec<_>>().join(", "),
            })?;

        let mut matches = MultisetRelation::new(&self.name, self.attributes.clone());
        if let Some(bucket) = entries.get(key_tuple) {
            for (tuple, multiplicity) in bucket {
                matches.counts.insert(tuple.clone(), *multiplicity);
            }
        }

        Ok(matches)
    }

    /// In-place pointwise sum; the combinator used when a delta batch is
    /// folded into the materialized views. Every index the relation carries
    /// is rebuilt afterwards, since the counts underneath it changed.
    pub fn add(&mut self, other: &MultisetRelation) -> Result<(), EngineError> {
        for (tuple, multiplicity) in other.iter() {
            *self.counts.entry(tuple.clone()).or_insert(0) += multiplicity;
        }

        let keys: Vec<BTreeSet<Variable>> = self.indexes.keys().cloned().collect();
        for key in keys {
            self.create_index(&key)?;
        }

        Ok(())
    }

    /// Reads a whitespace-delimited relation file. The first line names the
    /// attributes; every following line is one tuple of the same arity.
    /// Duplicate rows accumulate multiplicity.
    pub fn from_file(name: &str, path: impl AsRef<Path>) -> Result<MultisetRelation, EngineError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let mut lines = contents.lines();

        let header: Vec<&str> = lines
            .next()
            .map(|line| line.split_whitespace().collect())
            .unwrap_or_default();
        let attributes = header
            .iter()
            .map(|attribute| attribute.to_string())
            .collect();

        let mut relation = MultisetRelation::new(name, attributes);
        for (offset, line) in lines.enumerate() {
            let values: Vec<&str> = line.split_whitespace().collect();
            if values.len() != header.len() {
                return Err(EngineError::ArityMismatch {
                    path: path.display().to_string(),
                    line: offset + 2,
                    expected: header.len(),
                    found: values.len(),
                });
            }

            let tuple: Tuple = header.iter().copied().zip(values).collect();
            relation.insert(tuple, 1);
        }

        Ok(relation)
    }
}
