//! Shared per-entity cache of compiled query validators.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use log::debug;
use serde_json::Value;

use crate::catalog::Dialect;
use crate::compile::{CompiledValidator, compile};
use crate::derive::derive_query_schema;
use crate::errors::QueryError;
use crate::evaluate::{Evaluation, evaluate};
use crate::registry::Registry;

/// Per-entity validator cache over an immutable registry.
///
/// The first request for an entity derives and compiles its schema under the write
/// lock; later requests share the stored validator through the read lock. Entries are
/// never replaced once written, so each entity is compiled at most once.
#[derive(Debug)]
pub struct QueryValidators {
    registry: Arc<Registry>,
    dialect: Dialect,
    compiled: RwLock<HashMap<String, Arc<CompiledValidator>>>,
    compilations: AtomicUsize,
}

impl QueryValidators {
    pub fn new(registry: Arc<Registry>, dialect: Dialect) -> Self {
        Self {
            registry,
            dialect,
            compiled: RwLock::new(HashMap::new()),
            compilations: AtomicUsize::new(0),
        }
    }

    #[inline]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    #[inline]
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Validator for the named entity, compiling it on first use.
    pub fn validator(&self, entity: &str) -> Result<Arc<CompiledValidator>, QueryError> {
        if let Some(found) = self.read_cached(entity) {
            return Ok(found);
        }

        let schema = self.registry.lookup(entity)?;
        let mut compiled = self.compiled.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        // Another thread may have compiled it while we waited for the lock.
        if let Some(found) = compiled.get(entity) {
            return Ok(Arc::clone(found));
        }

        debug!("validator cache miss for '{entity}'");
        let validator = Arc::new(compile(&derive_query_schema(schema, self.dialect)?)?);
        self.compilations.fetch_add(1, Ordering::Relaxed);
        compiled.insert(entity.to_string(), Arc::clone(&validator));
        Ok(validator)
    }

    /// Evaluate a query object against the named entity's validator.
    pub fn evaluate(&self, entity: &str, query: &Value) -> Result<Evaluation, QueryError> {
        let validator = self.validator(entity)?;
        Ok(evaluate(&validator, query))
    }

    /// Compile every registered entity, surfacing configuration defects at startup.
    pub fn warm(&self) -> Result<usize, QueryError> {
        for name in self.registry.entity_names() {
            self.validator(name)?;
        }
        Ok(self.cached_len())
    }

    /// Number of schemas compiled by this cache so far.
    pub fn compilations(&self) -> usize {
        self.compilations.load(Ordering::Relaxed)
    }

    pub fn cached_len(&self) -> usize {
        self.compiled.read().map(|map| map.len()).unwrap_or_else(|poisoned| poisoned.into_inner().len())
    }

    fn read_cached(&self, entity: &str) -> Option<Arc<CompiledValidator>> {
        let compiled = self.compiled.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        compiled.get(entity).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Barrier;
    use std::thread;

    fn validators() -> QueryValidators {
        QueryValidators::new(Arc::new(Registry::builtin()), Dialect::Extended)
    }

    #[test]
    fn validator_is_compiled_once_per_entity() {
        let cache = validators();
        let first = cache.validator("foo").expect("foo compiles");
        let second = cache.validator("foo").expect("foo cached");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.cached_len(), 1);
        assert_eq!(cache.compilations(), 1);
        assert_eq!(first.entity(), Some("foo"));
    }

    #[test]
    fn unknown_entity_is_not_cached() {
        let cache = validators();
        let err = cache.validator("baz").expect_err("baz is not registered");
        assert!(matches!(err, QueryError::UnknownEntity { .. }));
        assert_eq!(cache.cached_len(), 0);
        assert_eq!(cache.compilations(), 0);
    }

    #[test]
    fn warm_compiles_every_entity() {
        let cache = validators();
        assert_eq!(cache.warm().expect("all entities compile"), 2);
    }

    #[test]
    fn concurrent_first_requests_share_one_entry() {
        let cache = Arc::new(validators());
        let start = Arc::new(Barrier::new(8));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let start = Arc::clone(&start);
                thread::spawn(move || {
                    start.wait();
                    let evaluation = cache
                        .evaluate("bar", &json!({ "sort_by": "date2", "sort_direction": "desc" }))
                        .expect("bar registered");
                    assert!(evaluation.valid);
                    cache.validator("bar").expect("bar registered")
                })
            })
            .collect();

        let validators: Vec<Arc<CompiledValidator>> =
            handles.into_iter().map(|h| h.join().expect("thread completes")).collect();
        assert!(validators.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
        assert_eq!(cache.cached_len(), 1);
        assert_eq!(cache.compilations(), 1);
    }
}
