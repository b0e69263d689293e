/// Tag pool providers — resolve built-in and dynamic groups to tags.

use rustc_hash::FxHashMap;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use crate::schema::group::SourceType;
use crate::schema::tag::WeightedTag;

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("pool not found: {0}")]
    NotFound(String),
    #[error("pool unavailable: {0}")]
    Unavailable(String),
    #[error("invalid pool key '{0}': expected builtin:<id> or dynamic:<id>")]
    InvalidKey(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

/// Supplies the candidate tags for groups that do not list their own.
///
/// Unknown ids should resolve to an empty pool. Errors are reserved for
/// backends that could not answer; the generator treats them as empty too.
pub trait TagPoolProvider: Send + Sync {
    fn get_pool(&self, source_type: SourceType, source_id: &str)
        -> Result<Vec<WeightedTag>, PoolError>;
}

impl<T: TagPoolProvider + ?Sized> TagPoolProvider for Box<T> {
    fn get_pool(
        &self,
        source_type: SourceType,
        source_id: &str,
    ) -> Result<Vec<WeightedTag>, PoolError> {
        (**self).get_pool(source_type, source_id)
    }
}

impl<T: TagPoolProvider + ?Sized> TagPoolProvider for Arc<T> {
    fn get_pool(
        &self,
        source_type: SourceType,
        source_id: &str,
    ) -> Result<Vec<WeightedTag>, PoolError> {
        (**self).get_pool(source_type, source_id)
    }
}

/// Provider with no pools at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPools;

impl TagPoolProvider for NoPools {
    fn get_pool(&self, _: SourceType, _: &str) -> Result<Vec<WeightedTag>, PoolError> {
        Ok(Vec::new())
    }
}

type PoolKey = (SourceType, String);

/// In-memory pool table, typically the built-in tag libraries.
#[derive(Debug, Clone, Default)]
pub struct StaticPoolProvider {
    pools: FxHashMap<PoolKey, Vec<WeightedTag>>,
}

impl StaticPoolProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, source_type: SourceType, source_id: &str, tags: Vec<WeightedTag>) {
        self.pools.insert((source_type, source_id.to_string()), tags);
    }

    pub fn with_pool(mut self, source_type: SourceType, source_id: &str, tags: Vec<WeightedTag>) -> Self {
        self.insert(source_type, source_id, tags);
        self
    }

    pub fn len(&self) -> usize {
        self.pools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }

    pub fn contains(&self, source_type: SourceType, source_id: &str) -> bool {
        self.pools
            .contains_key(&(source_type, source_id.to_string()))
    }

    /// Load pools from a RON file.
    pub fn load_from_ron(path: &Path) -> Result<Self, PoolError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    /// Parse a RON map of `"builtin:<id>"` / `"dynamic:<id>"` keys to tag
    /// lists.
    pub fn parse_ron(input: &str) -> Result<Self, PoolError> {
        let raw: HashMap<String, Vec<WeightedTag>> = ron::from_str(input)?;
        let mut provider = Self::new();
        for (key, tags) in raw {
            let (source_type, id) = parse_pool_key(&key)?;
            provider.insert(source_type, id, tags);
        }
        Ok(provider)
    }

    /// Fold `other` into this table; pools in `other` win.
    pub fn merge(&mut self, other: StaticPoolProvider) {
        self.pools.extend(other.pools);
    }
}

fn parse_pool_key(key: &str) -> Result<(SourceType, &str), PoolError> {
    match key.split_once(':') {
        Some(("builtin", id)) if !id.is_empty() => Ok((SourceType::Builtin, id)),
        Some(("dynamic", id)) if !id.is_empty() => Ok((SourceType::DynamicPool, id)),
        _ => Err(PoolError::InvalidKey(key.to_string())),
    }
}

impl TagPoolProvider for StaticPoolProvider {
    fn get_pool(
        &self,
        source_type: SourceType,
        source_id: &str,
    ) -> Result<Vec<WeightedTag>, PoolError> {
        Ok(self
            .pools
            .get(&(source_type, source_id.to_string()))
            .cloned()
            .unwrap_or_default())
    }
}

/// Memoizes a slower provider, materializing each pool on first use.
///
/// Failed lookups are not cached, so a backend that recovers is asked again.
pub struct CachedPoolProvider<P> {
    inner: P,
    cache: Mutex<FxHashMap<PoolKey, Vec<WeightedTag>>>,
}

impl<P: TagPoolProvider> CachedPoolProvider<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            cache: Mutex::new(FxHashMap::default()),
        }
    }

    pub fn cached_len(&self) -> usize {
        self.cache.lock().map(|c| c.len()).unwrap_or(0)
    }

    /// Drop one pool so the next lookup refetches it.
    pub fn invalidate(&self, source_type: SourceType, source_id: &str) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.remove(&(source_type, source_id.to_string()));
        }
    }

    pub fn clear(&self) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.clear();
        }
    }
}

impl<P: TagPoolProvider> TagPoolProvider for CachedPoolProvider<P> {
    fn get_pool(
        &self,
        source_type: SourceType,
        source_id: &str,
    ) -> Result<Vec<WeightedTag>, PoolError> {
        let key = (source_type, source_id.to_string());
        if let Ok(cache) = self.cache.lock() {
            if let Some(tags) = cache.get(&key) {
                return Ok(tags.clone());
            }
        }

        let tags = self.inner.get_pool(source_type, source_id)?;
        tracing::debug!(
            source = source_type.as_str(),
            id = source_id,
            tags = tags.len(),
            "materialized pool"
        );
        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(key, tags.clone());
        }
        Ok(tags)
    }
}
