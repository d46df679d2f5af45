//! Slug resolution collaborator

use crate::error::StorageResult;
use crate::types::{Post, Term};
use async_trait::async_trait;
use std::collections::HashMap;

/// Resolves human-readable slugs to stored entities
#[async_trait]
pub trait SlugResolver: Send + Sync {
    /// Find a post by slug within a post type
    async fn post_by_slug(&self, slug: &str, post_type: &str) -> StorageResult<Option<Post>>;

    /// Find a term by slug within a taxonomy
    async fn term_by_slug(&self, slug: &str, taxonomy: &str) -> StorageResult<Option<Term>>;
}

/// Slug tables held in memory, keyed by `(scope, slug)`
#[derive(Debug, Clone, Default)]
pub struct InMemorySlugResolver {
    posts: HashMap<(String, String), Post>,
    terms: HashMap<(String, String), Term>,
}

impl InMemorySlugResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a post under a slug within `post_type`
    pub fn with_post(mut self, slug: &str, post_type: &str, post: Post) -> Self {
        self.posts
            .insert((post_type.to_string(), slug.to_string()), post);
        self
    }

    /// Register a term under a slug within `taxonomy`
    pub fn with_term(mut self, slug: &str, taxonomy: &str, term: Term) -> Self {
        self.terms
            .insert((taxonomy.to_string(), slug.to_string()), term);
        self
    }
}

#[async_trait]
impl SlugResolver for InMemorySlugResolver {
    async fn post_by_slug(&self, slug: &str, post_type: &str) -> StorageResult<Option<Post>> {
        Ok(self
            .posts
            .get(&(post_type.to_string(), slug.to_string()))
            .cloned())
    }

    async fn term_by_slug(&self, slug: &str, taxonomy: &str) -> StorageResult<Option<Term>> {
        Ok(self
            .terms
            .get(&(taxonomy.to_string(), slug.to_string()))
            .cloned())
    }
}
