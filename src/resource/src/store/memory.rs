//! In-memory resource store

use super::{BatchQuery, ResourceStore};
use crate::error::{StorageError, StorageResult};
use crate::types::{Post, RawRow, Term};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Query counters of an in-memory store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Batched queries executed
    pub batch_queries: usize,
    /// Single-entity lookups
    pub direct_lookups: usize,
}

/// In-memory store holding posts and taxonomy-joined terms
///
/// Counts the queries it serves and can be switched into a mode where every
/// batched query fails.
#[derive(Default)]
pub struct InMemoryResourceStore {
    posts: Arc<RwLock<BTreeMap<u64, Post>>>,
    terms: Arc<RwLock<BTreeMap<(u64, String), Term>>>,
    batch_queries: AtomicUsize,
    direct_lookups: AtomicUsize,
    fail_batches: AtomicBool,
}

impl InMemoryResourceStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_post(&self, post: Post) {
        self.posts.write().await.insert(post.id, post);
    }

    /// Insert a term; one term id may exist in several taxonomies
    pub async fn insert_term(&self, mut term: Term) {
        term.post_type = None;
        self.terms
            .write()
            .await
            .insert((term.term_id, term.taxonomy.clone()), term);
    }

    pub async fn remove_post(&self, id: u64) {
        self.posts.write().await.remove(&id);
    }

    /// Make subsequent batched queries fail
    pub fn fail_batch_queries(&self, fail: bool) {
        self.fail_batches.store(fail, Ordering::SeqCst);
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            batch_queries: self.batch_queries.load(Ordering::SeqCst),
            direct_lookups: self.direct_lookups.load(Ordering::SeqCst),
        }
    }
}

#[async_trait]
impl ResourceStore for InMemoryResourceStore {
    async fn execute(&self, query: &BatchQuery) -> StorageResult<Vec<RawRow>> {
        self.batch_queries.fetch_add(1, Ordering::SeqCst);

        if self.fail_batches.load(Ordering::SeqCst) {
            return Err(StorageError::QueryError {
                message: "batched query rejected".to_string(),
            });
        }

        let ids: HashSet<u64> = query.ids().iter().copied().collect();

        let rows = match query {
            BatchQuery::Posts { .. } => self
                .posts
                .read()
                .await
                .values()
                .filter(|post| ids.contains(&post.id))
                .map(Post::to_row)
                .collect(),
            BatchQuery::TermsWithTaxonomy { .. } => self
                .terms
                .read()
                .await
                .values()
                .filter(|term| ids.contains(&term.term_id))
                .map(Term::to_row)
                .collect(),
        };

        Ok(rows)
    }

    async fn get_post(&self, id: u64) -> StorageResult<Option<Post>> {
        self.direct_lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.posts.read().await.get(&id).cloned())
    }

    async fn get_term(&self, id: u64, taxonomy: &str) -> StorageResult<Option<Term>> {
        self.direct_lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .terms
            .read()
            .await
            .get(&(id, taxonomy.to_string()))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_execute_filters_by_ids() {
        let store = InMemoryResourceStore::new();
        store.insert_post(Post::new(1, "post")).await;
        store.insert_post(Post::new(2, "page")).await;
        store.insert_post(Post::new(3, "post")).await;

        let rows = store
            .execute(&BatchQuery::Posts { ids: vec![1, 3, 99] })
            .await
            .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(store.stats().batch_queries, 1);
    }

    #[tokio::test]
    async fn test_term_rows_per_taxonomy() {
        let store = InMemoryResourceStore::new();
        store.insert_term(Term::new(4, "category")).await;
        store.insert_term(Term::new(4, "post_tag")).await;

        let rows = store
            .execute(&BatchQuery::TermsWithTaxonomy { ids: vec![4] })
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);

        let term = store.get_term(4, "post_tag").await.unwrap().unwrap();
        assert_eq!(term.taxonomy, "post_tag");
        assert!(store.get_term(4, "genre").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failing_batches() {
        let store = InMemoryResourceStore::new();
        store.fail_batch_queries(true);

        let result = store.execute(&BatchQuery::Posts { ids: vec![1] }).await;
        assert!(matches!(result, Err(StorageError::QueryError { .. })));
    }
}
