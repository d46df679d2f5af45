//! Per-kind resource adapters
//!
//! An adapter supplies everything kind-specific that the generic resolver and
//! policy merger need: the identifier codec, the batched query shape, how the
//! cache index is keyed, how raw rows become entities, and the direct and slug
//! lookups.

use crate::error::{Result, StorageResult};
use crate::key::{CompositeKey, PostKey, TermKey};
use crate::policy::SlugResolver;
use crate::store::{BatchQuery, ResourceStore};
use crate::types::{Post, RawRow, ResourceKind, Term};
use async_trait::async_trait;
use serde_json::Value;
use std::fmt::Debug;

/// Kind-specific behaviour of a resource cache adapter
#[async_trait]
pub trait ResourceAdapter: Send + Sync + 'static {
    /// Materialized entity
    type Entity: Clone + Debug + PartialEq + Send + Sync + 'static;

    /// Decoded composite key
    type Key: Debug + Send + Sync;

    fn kind(&self) -> ResourceKind;

    fn encode(&self, entity: &Self::Entity) -> CompositeKey;

    fn decode(&self, key: &CompositeKey) -> Result<Self::Key>;

    /// Numeric id driving the batched query
    fn numeric_id(&self, key: &Self::Key) -> u64;

    fn batch_query(&self, ids: Vec<u64>) -> BatchQuery;

    /// Index key under which a decoded key's row is cached
    fn index_key(&self, key: &Self::Key) -> String;

    /// Index key of a fetched row, `None` if the row lacks the columns
    fn row_index_key(&self, row: &RawRow) -> Option<String>;

    fn materialize(&self, row: &RawRow) -> serde_json::Result<Self::Entity>;

    /// Attach key-carried attributes to a found entity
    fn scope(&self, entity: Self::Entity, _key: &Self::Key) -> Self::Entity {
        entity
    }

    /// Single-entity lookup bypassing the cache index
    async fn fetch(
        &self,
        store: &dyn ResourceStore,
        key: &Self::Key,
    ) -> StorageResult<Option<Self::Entity>>;

    /// Resolve a slug within a type or taxonomy
    async fn resolve_slug(
        &self,
        slugs: &dyn SlugResolver,
        slug: &str,
        scope: &str,
    ) -> StorageResult<Option<Self::Entity>>;
}

/// Posts: indexed by numeric id alone
#[derive(Debug, Clone, Copy, Default)]
pub struct PostAdapter;

#[async_trait]
impl ResourceAdapter for PostAdapter {
    type Entity = Post;
    type Key = PostKey;

    fn kind(&self) -> ResourceKind {
        ResourceKind::Post
    }

    fn encode(&self, post: &Post) -> CompositeKey {
        PostKey::from(post).encode()
    }

    fn decode(&self, key: &CompositeKey) -> Result<PostKey> {
        PostKey::decode(key)
    }

    fn numeric_id(&self, key: &PostKey) -> u64 {
        key.id
    }

    fn batch_query(&self, ids: Vec<u64>) -> BatchQuery {
        BatchQuery::Posts { ids }
    }

    fn index_key(&self, key: &PostKey) -> String {
        key.id.to_string()
    }

    fn row_index_key(&self, row: &RawRow) -> Option<String> {
        column_text(row, "ID")
    }

    fn materialize(&self, row: &RawRow) -> serde_json::Result<Post> {
        Post::from_row(row)
    }

    async fn fetch(&self, store: &dyn ResourceStore, key: &PostKey) -> StorageResult<Option<Post>> {
        store.get_post(key.id).await
    }

    async fn resolve_slug(
        &self,
        slugs: &dyn SlugResolver,
        slug: &str,
        post_type: &str,
    ) -> StorageResult<Option<Post>> {
        slugs.post_by_slug(slug, post_type).await
    }
}

/// Terms: indexed by `term_id|taxonomy`, since one term id can exist in
/// several taxonomies
#[derive(Debug, Clone, Copy, Default)]
pub struct TermAdapter;

#[async_trait]
impl ResourceAdapter for TermAdapter {
    type Entity = Term;
    type Key = TermKey;

    fn kind(&self) -> ResourceKind {
        ResourceKind::Term
    }

    fn encode(&self, term: &Term) -> CompositeKey {
        TermKey::from(term).encode()
    }

    fn decode(&self, key: &CompositeKey) -> Result<TermKey> {
        TermKey::decode(key)
    }

    fn numeric_id(&self, key: &TermKey) -> u64 {
        key.id
    }

    fn batch_query(&self, ids: Vec<u64>) -> BatchQuery {
        BatchQuery::TermsWithTaxonomy { ids }
    }

    fn index_key(&self, key: &TermKey) -> String {
        key.base().to_string()
    }

    fn row_index_key(&self, row: &RawRow) -> Option<String> {
        let term_id = column_text(row, "term_id")?;
        let taxonomy = column_text(row, "taxonomy")?;
        Some(CompositeKey::from_parts(&[term_id.as_str(), taxonomy.as_str()]).to_string())
    }

    fn materialize(&self, row: &RawRow) -> serde_json::Result<Term> {
        Term::from_row(row)
    }

    fn scope(&self, mut term: Term, key: &TermKey) -> Term {
        if let Some(post_type) = &key.post_type {
            term.post_type = Some(post_type.clone());
        }
        term
    }

    async fn fetch(&self, store: &dyn ResourceStore, key: &TermKey) -> StorageResult<Option<Term>> {
        store.get_term(key.id, &key.taxonomy).await
    }

    async fn resolve_slug(
        &self,
        slugs: &dyn SlugResolver,
        slug: &str,
        taxonomy: &str,
    ) -> StorageResult<Option<Term>> {
        slugs.term_by_slug(slug, taxonomy).await
    }
}

/// Column value as text; rows may carry ids as numbers or strings
fn column_text(row: &RawRow, column: &str) -> Option<String> {
    match row.get(column)? {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
