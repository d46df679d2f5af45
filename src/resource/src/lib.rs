//! # AAM Resource Resolution
//!
//! Identity resolution and policy merging for post and term resources.
//!
//! ## Features
//!
//! - **Composite keys** (`{id}|{post_type}`, `{term_id}|{taxonomy}[|{post_type}]`)
//! - **Batched prefetch**: one `IN (...)` query per permission map instead of
//!   one lookup per entity
//! - **Cache-first resolution** with direct-lookup fallback
//! - **Policy merging** with slug resolution, field-level last-write-wins and a
//!   post-processing filter
//!
//! ## Example
//!
//! ```rust
//! use aam_resource::{CompositeKey, PermissionFragment, PermissionMap, Post, PostResolver};
//! use aam_resource::store::InMemoryResourceStore;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(InMemoryResourceStore::new());
//!     store.insert_post(Post::new(42, "page")).await;
//!
//!     let mut permissions = PermissionMap::new();
//!     permissions.insert(CompositeKey::from("42|page"), PermissionFragment::new());
//!
//!     let resolver = PostResolver::new(store, permissions);
//!     let post = resolver.resolve(&CompositeKey::from("42|page")).await?;
//!
//!     assert_eq!(post.map(|p| p.id), Some(42));
//!     Ok(())
//! }
//! ```

pub mod adapter;
pub mod cache;
pub mod config;
pub mod error;
pub mod key;
pub mod policy;
pub mod resolver;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use adapter::{PostAdapter, ResourceAdapter, TermAdapter};
pub use cache::{CacheIndex, CacheStats};
pub use config::{MySqlStoreConfig, ResolverConfig, TableNames};
pub use error::{ResourceError, Result, StorageError, StorageResult};
pub use key::{CompositeKey, PostKey, TermKey, KEY_DELIMITER};
pub use policy::merger::{PostPolicyMerger, TermPolicyMerger};
pub use policy::{
    EffectActionConverter, FilterContext, PolicyEffect, PolicyFilter, PolicyMerger,
    PolicySource, SlugResolver, Statement, StatementConverter,
};
pub use resolver::{PostResolver, ResourceResolver, TermResolver};
pub use store::{BatchQuery, ResourceStore};
pub use types::{PermissionFragment, PermissionMap, Post, RawRow, ResourceKind, Term};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
