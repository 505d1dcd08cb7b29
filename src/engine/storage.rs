use std::path::Path;

use ahash::{HashMap, HashMapExt};

use crate::engine::relation::MultisetRelation;
use crate::error::EngineError;

/// A name-to-relation map. One catalog carries the base relations consumed
/// by `initialize`; another carries the signed delta relations consumed by
/// `update`.
#[derive(Clone, Debug, Default)]
pub struct RelationCatalog {
    pub(crate) inner: HashMap<String, MultisetRelation>,
}

impl RelationCatalog {
    pub fn new() -> Self {
        Self {
            inner: HashMap::new(),
        }
    }

    /// Registers `relation` under its own name, replacing any previous entry.
    pub fn add(&mut self, relation: MultisetRelation) {
        self.inner.insert(relation.name().to_string(), relation);
    }

    pub fn get_relation(&self, name: &str) -> Result<&MultisetRelation, EngineError> {
        self.inner
            .get(name)
            .ok_or_else(|| EngineError::UnknownRelation(name.to_string()))
    }

    pub fn get_relation_safe(&self, name: &str) -> Option<&MultisetRelation> {
        self.inner.get(name)
    }

    /// Ingests a whitespace-delimited relation file under `name`.
    pub fn add_from_file(&mut self, name: &str, path: impl AsRef<Path>) -> Result<(), EngineError> {
        self.add(MultisetRelation::from_file(name, path)?);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
