//! Resolver Integration Tests
//!
//! Prefetch batching, cache-first resolution and the equivalence of cached
//! and uncached resolution over a shared store.

use aam_resource::store::InMemoryResourceStore;
use aam_resource::{
    CompositeKey, PermissionFragment, PermissionMap, Post, PostResolver, ResolverConfig, Term,
    TermResolver,
};
use proptest::prelude::*;
use serde_json::json;
use std::sync::Arc;

fn permissions<I, S>(keys: I) -> PermissionMap
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    keys.into_iter()
        .map(|k| {
            (
                CompositeKey::from(k.into()),
                PermissionFragment::new().with("read", json!({"effect": "deny"})),
            )
        })
        .collect()
}

fn uncached() -> ResolverConfig {
    ResolverConfig {
        enable_prefetch: false,
    }
}

async fn site() -> Arc<InMemoryResourceStore> {
    let store = Arc::new(InMemoryResourceStore::new());
    store.insert_post(Post::new(1, "post").with_author(2)).await;
    store.insert_post(Post::new(2, "page").with_author(2)).await;
    store.insert_post(Post::new(3, "product")).await;
    store
        .insert_term(Term::new(10, "category").with_name("News", "news"))
        .await;
    store
        .insert_term(Term::new(10, "post_tag").with_name("News", "news-tag"))
        .await;
    store
        .insert_term(Term::new(11, "category").with_name("Sports", "sports"))
        .await;
    store
}

// ============================================================================
// PREFETCH BATCHING
// ============================================================================

#[tokio::test]
async fn test_empty_map_issues_no_queries() {
    let store = site().await;
    let posts = PostResolver::new(store.clone(), PermissionMap::new());
    let terms = TermResolver::new(store.clone(), PermissionMap::new());

    assert!(posts.resolve_all().await.unwrap().is_empty());
    assert!(terms.resolve_all().await.unwrap().is_empty());

    let stats = store.stats();
    assert_eq!(stats.batch_queries, 0);
    assert_eq!(stats.direct_lookups, 0);
}

#[tokio::test]
async fn test_whole_map_resolved_with_one_query() {
    let store = site().await;
    let resolver = PostResolver::new(store.clone(), permissions(["1|post", "2|page", "3|product"]));

    let resolved = resolver.resolve_all().await.unwrap();
    assert_eq!(resolved.len(), 3);

    let stats = store.stats();
    assert_eq!(stats.batch_queries, 1);
    assert_eq!(stats.direct_lookups, 0);
    assert_eq!(resolver.stats().hits, 3);
    assert_eq!(resolver.stats().hit_rate(), 1.0);
}

#[tokio::test]
async fn test_deleted_entity_resolves_to_none() {
    let store = site().await;
    let resolver = PostResolver::new(store.clone(), permissions(["1|post", "3|product"]));
    store.remove_post(3).await;

    let resolved = resolver.resolve_all().await.unwrap();
    assert_eq!(resolved.len(), 1);
    assert_eq!(resolved[0].0.as_str(), "1|post");

    // Missing from the index, so one direct lookup confirms absence
    assert_eq!(store.stats().direct_lookups, 1);
}

// ============================================================================
// TERMS ACROSS TAXONOMIES
// ============================================================================

#[tokio::test]
async fn test_same_term_id_in_two_taxonomies() {
    let store = site().await;
    let resolver = TermResolver::new(store.clone(), permissions(["10|category", "10|post_tag"]));

    let index = resolver.prefetch().await.unwrap();
    assert_eq!(index.len(), 2);
    assert!(index.contains("10|category"));
    assert!(index.contains("10|post_tag"));

    let category = resolver
        .resolve(&CompositeKey::from("10|category"))
        .await
        .unwrap()
        .unwrap();
    let tag = resolver
        .resolve(&CompositeKey::from("10|post_tag"))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(category.slug, "news");
    assert_eq!(tag.slug, "news-tag");
    assert_eq!(store.stats().batch_queries, 1);
    assert_eq!(store.stats().direct_lookups, 0);
}

#[tokio::test]
async fn test_scoped_term_keys_share_cache_entry() {
    let store = site().await;
    let resolver = TermResolver::new(
        store.clone(),
        permissions(["11|category|post", "11|category|product"]),
    );

    let resolved = resolver.resolve_all().await.unwrap();
    let scopes: Vec<_> = resolved
        .iter()
        .map(|(_, term)| term.post_type.clone())
        .collect();

    assert_eq!(
        scopes,
        vec![Some("post".to_string()), Some("product".to_string())]
    );
    assert_eq!(resolver.stats().entries, 1);
    assert_eq!(store.stats().direct_lookups, 0);
}

#[tokio::test]
async fn test_unscoped_term_has_no_post_type() {
    let store = site().await;
    let resolver = TermResolver::new(store, permissions(["11|category"]));

    let term = resolver
        .resolve(&CompositeKey::from("11|category"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(term.post_type, None);
    assert_eq!(resolver.encode(&term).as_str(), "11|category");
}

// ============================================================================
// CACHED / UNCACHED EQUIVALENCE
// ============================================================================

#[tokio::test]
async fn test_cached_and_uncached_agree() {
    let store = site().await;
    let keys = ["1|post", "2|page", "3|product", "99|post", "2|post"];

    let cached = PostResolver::new(store.clone(), permissions(keys));
    let direct = PostResolver::with_config(store.clone(), permissions(keys), uncached());

    for key in keys {
        let key = CompositeKey::from(key);
        assert_eq!(
            cached.resolve(&key).await.unwrap(),
            direct.resolve(&key).await.unwrap(),
            "{}",
            key
        );
    }
}

proptest! {
    #[test]
    fn prop_term_resolution_independent_of_cache(
        ids in proptest::collection::vec(8u64..14, 0..6),
        taxonomies in proptest::collection::vec(
            prop_oneof![Just("category"), Just("post_tag"), Just("genre")],
            6,
        ),
        scoped in proptest::collection::vec(any::<bool>(), 6),
    ) {
        let keys: Vec<String> = ids
            .iter()
            .enumerate()
            .map(|(i, id)| {
                if scoped[i] {
                    format!("{}|{}|page", id, taxonomies[i])
                } else {
                    format!("{}|{}", id, taxonomies[i])
                }
            })
            .collect();

        let (with_cache, without_cache) = tokio_test::block_on(async {
            let store = site().await;
            let cached = TermResolver::new(store.clone(), permissions(keys.clone()));
            let direct =
                TermResolver::with_config(store.clone(), permissions(keys.clone()), uncached());

            (
                cached.resolve_all().await.unwrap(),
                direct.resolve_all().await.unwrap(),
            )
        });

        prop_assert_eq!(with_cache, without_cache);
    }
}
