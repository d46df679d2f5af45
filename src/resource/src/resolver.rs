//! Resource resolver: batch prefetch and identity resolution
//!
//! ```text
//! PermissionMap keys ─→ decode ─→ unique ids ─→ one BatchQuery ─→ CacheIndex
//!                                                                    │
//! resolve(key) ─→ decode ─→ index hit? ──yes──→ materialize ─────────┤
//!                              │no                                   ↓
//!                              └──→ direct lookup ─────────→ scope ─→ Option<Entity>
//! ```

use crate::adapter::{PostAdapter, ResourceAdapter, TermAdapter};
use crate::cache::{CacheIndex, CacheStats};
use crate::config::ResolverConfig;
use crate::error::Result;
use crate::key::CompositeKey;
use crate::store::ResourceStore;
use crate::types::{merge_permission_maps, PermissionMap, ResourceKind};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

/// Resolver for post keys
pub type PostResolver = ResourceResolver<PostAdapter>;

/// Resolver for term keys
pub type TermResolver = ResourceResolver<TermAdapter>;

/// Resolves composite keys of one resource kind to entities
///
/// Request-scoped: the cache index lives as long as the resolver, is built on
/// first need, and is rebuilt after the permission map changes.
pub struct ResourceResolver<A: ResourceAdapter> {
    adapter: A,
    store: Arc<dyn ResourceStore>,
    permissions: PermissionMap,
    index: OnceCell<CacheIndex>,
    stats: Arc<DashMap<String, usize>>,
    config: ResolverConfig,
}

impl<A: ResourceAdapter + Default> ResourceResolver<A> {
    /// Create a resolver over a permission map with default configuration
    pub fn new(store: Arc<dyn ResourceStore>, permissions: PermissionMap) -> Self {
        Self::with_config(store, permissions, ResolverConfig::default())
    }

    pub fn with_config(
        store: Arc<dyn ResourceStore>,
        permissions: PermissionMap,
        config: ResolverConfig,
    ) -> Self {
        Self::with_adapter(A::default(), store, permissions, config)
    }
}

impl<A: ResourceAdapter> ResourceResolver<A> {
    pub fn with_adapter(
        adapter: A,
        store: Arc<dyn ResourceStore>,
        permissions: PermissionMap,
        config: ResolverConfig,
    ) -> Self {
        Self {
            adapter,
            store,
            permissions,
            index: OnceCell::new(),
            stats: Arc::new(DashMap::new()),
            config,
        }
    }

    pub fn kind(&self) -> ResourceKind {
        self.adapter.kind()
    }

    pub fn permissions(&self) -> &PermissionMap {
        &self.permissions
    }

    /// Replace the permission map; the cache index is rebuilt on next need
    pub fn set_permissions(&mut self, permissions: PermissionMap) {
        self.permissions = permissions;
        self.index = OnceCell::new();
    }

    /// Merge policy-derived fragments into the permission map, field by field
    pub fn apply_policies(&mut self, merged: PermissionMap) {
        merge_permission_maps(&mut self.permissions, merged);
        self.index = OnceCell::new();
    }

    /// Composite key of an entity
    pub fn encode(&self, entity: &A::Entity) -> CompositeKey {
        self.adapter.encode(entity)
    }

    /// Build the cache index if it has not been built yet
    ///
    /// Keys without a numeric id segment are skipped. Storage failures leave
    /// the index empty.
    pub async fn prefetch(&self) -> Result<&CacheIndex> {
        self.index.get_or_try_init(|| self.build_index()).await
    }

    async fn build_index(&self) -> Result<CacheIndex> {
        if !self.config.enable_prefetch {
            return Ok(CacheIndex::new());
        }

        // Only the id segment matters here; the full shape is checked when a
        // key is resolved
        let mut ids = Vec::with_capacity(self.permissions.len());
        for key in self.permissions.keys() {
            match key.numeric_id() {
                Ok(id) => ids.push(id),
                Err(e) => warn!("{} prefetch skipping key: {}", self.kind(), e),
            }
        }
        ids.sort_unstable();
        ids.dedup();

        // An empty IN () list is not a valid query
        if ids.is_empty() {
            return Ok(CacheIndex::new());
        }

        let id_count = ids.len();
        let query = self.adapter.batch_query(ids);

        let rows = match self.store.execute(&query).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!(
                    "{} prefetch failed, falling back to direct lookups: {}",
                    self.kind(),
                    e
                );
                return Ok(CacheIndex::new());
            }
        };

        let (index, skipped) = CacheIndex::from_rows(rows, |row| self.adapter.row_index_key(row));
        if skipped > 0 {
            warn!("{} prefetch skipped {} rows without index columns", self.kind(), skipped);
        }

        info!(
            "{} cache index built: {} ids requested, {} rows cached",
            self.kind(),
            id_count,
            index.len()
        );

        Ok(index)
    }

    /// Resolve a composite key to its entity
    ///
    /// `Ok(None)` means the entity does not exist (or could not be read);
    /// the only error is a malformed key.
    pub async fn resolve(&self, key: &CompositeKey) -> Result<Option<A::Entity>> {
        let decoded = self.adapter.decode(key)?;
        let index = self.prefetch().await?;

        let cached = match index.get(&self.adapter.index_key(&decoded)) {
            Some(row) => match self.adapter.materialize(row) {
                Ok(entity) => Some(entity),
                Err(e) => {
                    warn!("Cached {} row for '{}' is unreadable: {}", self.kind(), key, e);
                    None
                }
            },
            None => None,
        };

        let entity = match cached {
            Some(entity) => {
                self.increment_stat("hits");
                debug!("Cache hit for {} '{}'", self.kind(), key);
                Some(entity)
            }
            None => {
                self.increment_stat("misses");
                match self.adapter.fetch(self.store.as_ref(), &decoded).await {
                    Ok(entity) => entity,
                    Err(e) => {
                        warn!("Direct {} lookup for '{}' failed: {}", self.kind(), key, e);
                        None
                    }
                }
            }
        };

        Ok(entity.map(|entity| self.adapter.scope(entity, &decoded)))
    }

    /// Resolve every key of the permission map, skipping keys whose entity
    /// does not exist
    pub async fn resolve_all(&self) -> Result<Vec<(CompositeKey, A::Entity)>> {
        let mut resolved = Vec::with_capacity(self.permissions.len());

        for key in self.permissions.keys() {
            match self.resolve(key).await? {
                Some(entity) => resolved.push((key.clone(), entity)),
                None => debug!("{} '{}' not found, skipping", self.kind(), key),
            }
        }

        Ok(resolved)
    }

    /// Returns cache statistics
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.get_stat("hits"),
            misses: self.get_stat("misses"),
            entries: self.index.get().map(CacheIndex::len).unwrap_or(0),
        }
    }

    fn increment_stat(&self, key: &str) {
        self.stats
            .entry(key.to_string())
            .and_modify(|count| *count += 1)
            .or_insert(1);
    }

    fn get_stat(&self, key: &str) -> usize {
        self.stats.get(key).map(|v| *v).unwrap_or(0)
    }
}
