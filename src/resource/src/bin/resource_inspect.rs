//! # Resource inspector
//!
//! Loads a JSON fixture into the in-memory collaborators, merges the policy
//! statements, resolves every permission key and prints the result as JSON.
//!
//! ```text
//! resource-inspect fixture.json
//! ```
//!
//! Fixture shape:
//!
//! ```json
//! {
//!   "posts": [{"ID": 42, "post_type": "page", "post_author": 1}],
//!   "terms": [{"term_id": 7, "taxonomy": "category", "slug": "featured"}],
//!   "post_permissions": {"42|page": {"read": {"effect": "deny"}}},
//!   "term_permissions": {"7|category|post": {}},
//!   "statements": [{"Effect": "deny", "Resource": "Post:page:42", "Action": "Edit"}],
//!   "post_slugs": [{"slug": "about", "scope": "page", "entity": {"ID": 42, "post_type": "page"}}],
//!   "term_slugs": []
//! }
//! ```
//!
//! ## Configuration
//!
//! Environment variables:
//! - `RUST_LOG` - Log level (default: info), logs go to stderr
//! - `AAM_ENABLE_PREFETCH` - Build the batched cache index (default: true)

use aam_resource::policy::{InMemoryPolicySource, InMemorySlugResolver};
use aam_resource::store::InMemoryResourceStore;
use aam_resource::{
    CacheStats, CompositeKey, EffectActionConverter, PermissionMap, Post, PostPolicyMerger,
    PostResolver, ResolverConfig, ResourceAdapter, ResourceResolver, Statement, Term,
    TermPolicyMerger, TermResolver,
};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Fixture {
    posts: Vec<Post>,
    terms: Vec<Term>,
    post_permissions: PermissionMap,
    term_permissions: PermissionMap,
    statements: Vec<Statement>,
    post_slugs: Vec<SlugEntry<Post>>,
    term_slugs: Vec<SlugEntry<Term>>,
}

#[derive(Debug, Deserialize)]
struct SlugEntry<T> {
    slug: String,
    scope: String,
    entity: T,
}

#[derive(Debug, Serialize)]
struct Report {
    posts: BTreeMap<CompositeKey, Option<Post>>,
    terms: BTreeMap<CompositeKey, Option<Term>>,
    post_policies: PermissionMap,
    term_policies: PermissionMap,
    cache: BTreeMap<&'static str, CacheStats>,
}

async fn resolve_each<A: ResourceAdapter>(
    resolver: &ResourceResolver<A>,
) -> aam_resource::Result<BTreeMap<CompositeKey, Option<A::Entity>>> {
    let mut resolved = BTreeMap::new();
    for key in resolver.permissions().keys() {
        resolved.insert(key.clone(), resolver.resolve(key).await?);
    }
    Ok(resolved)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let path = std::env::args()
        .nth(1)
        .context("usage: resource-inspect <fixture.json>")?;
    let raw = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("failed to read fixture {}", path))?;
    let fixture: Fixture =
        serde_json::from_str(&raw).with_context(|| format!("invalid fixture {}", path))?;
    let config = ResolverConfig::from_env()?;

    info!(
        "Loaded fixture: {} posts, {} terms, {} statements",
        fixture.posts.len(),
        fixture.terms.len(),
        fixture.statements.len()
    );

    let store = Arc::new(InMemoryResourceStore::new());
    for post in fixture.posts {
        store.insert_post(post).await;
    }
    for term in fixture.terms {
        store.insert_term(term).await;
    }

    let mut slugs = InMemorySlugResolver::new();
    for entry in fixture.post_slugs {
        slugs = slugs.with_post(&entry.slug, &entry.scope, entry.entity);
    }
    for entry in fixture.term_slugs {
        slugs = slugs.with_term(&entry.slug, &entry.scope, entry.entity);
    }

    let slugs = Arc::new(slugs);
    let source = Arc::new(InMemoryPolicySource::with_statements(fixture.statements));
    let converter = Arc::new(EffectActionConverter);

    let post_policies = PostPolicyMerger::new(source.clone(), converter.clone(), slugs.clone())
        .merge_policies()
        .await?;
    let term_policies = TermPolicyMerger::new(source, converter, slugs)
        .merge_policies()
        .await?;

    let mut posts =
        PostResolver::with_config(store.clone(), fixture.post_permissions, config.clone());
    posts.apply_policies(post_policies.clone());

    let mut terms = TermResolver::with_config(store, fixture.term_permissions, config);
    terms.apply_policies(term_policies.clone());

    let report = Report {
        posts: resolve_each(&posts).await?,
        terms: resolve_each(&terms).await?,
        post_policies,
        term_policies,
        cache: BTreeMap::from([("posts", posts.stats()), ("terms", terms.stats())]),
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
