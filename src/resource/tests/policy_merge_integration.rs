//! Policy Merge Integration Tests
//!
//! Statement selection, slug resolution, field-level merging and seeding a
//! resolver with the merged map.

use aam_resource::policy::{InMemoryPolicySource, InMemorySlugResolver};
use aam_resource::store::InMemoryResourceStore;
use aam_resource::{
    CompositeKey, EffectActionConverter, PermissionFragment, PermissionMap, PolicySource, Post,
    PostPolicyMerger, PostResolver, ResourceError, ResourceKind, Statement, StatementConverter,
    Term, TermPolicyMerger,
};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

/// Copies statement attributes into the fragment verbatim
struct PassthroughConverter;

impl StatementConverter for PassthroughConverter {
    fn to_permission_fragment(&self, statement: &Statement, _kind: ResourceKind) -> PermissionFragment {
        PermissionFragment::from(statement.attributes.clone())
    }
}

struct FailingSource;

#[async_trait]
impl PolicySource for FailingSource {
    async fn statements_matching(&self, _pattern: &str) -> aam_resource::Result<Vec<Statement>> {
        Err(ResourceError::PolicySource("policy store offline".to_string()))
    }
}

fn post_merger(statements: Vec<Statement>, slugs: InMemorySlugResolver) -> PostPolicyMerger {
    PostPolicyMerger::new(
        Arc::new(InMemoryPolicySource::with_statements(statements)),
        Arc::new(PassthroughConverter),
        Arc::new(slugs),
    )
}

// ============================================================================
// FIELD-LEVEL MERGING
// ============================================================================

#[tokio::test]
async fn test_later_statement_overwrites_fields() {
    let statements = vec![
        Statement::new("Post:post:5").with_attribute("A", json!(1)),
        Statement::new("Post:post:5")
            .with_attribute("A", json!(2))
            .with_attribute("B", json!(3)),
    ];

    let merged = post_merger(statements, InMemorySlugResolver::new())
        .merge_policies()
        .await
        .unwrap();

    assert_eq!(merged.len(), 1);
    let fragment = &merged[&CompositeKey::from("5|post")];
    assert_eq!(fragment.get("A"), Some(&json!(2)));
    assert_eq!(fragment.get("B"), Some(&json!(3)));
    assert_eq!(fragment.len(), 2);
}

#[tokio::test]
async fn test_earlier_fields_survive() {
    let statements = vec![
        Statement::new("Post:post:5").with_attribute("A", json!(1)),
        Statement::new("Post:post:5").with_attribute("B", json!(3)),
    ];

    let merged = post_merger(statements, InMemorySlugResolver::new())
        .merge_policies()
        .await
        .unwrap();

    let fragment = &merged[&CompositeKey::from("5|post")];
    assert_eq!(fragment.get("A"), Some(&json!(1)));
    assert_eq!(fragment.get("B"), Some(&json!(3)));
}

// ============================================================================
// STATEMENT SELECTION
// ============================================================================

#[tokio::test]
async fn test_only_three_segment_paths_contribute() {
    let statements = vec![
        Statement::new("Post:post").with_attribute("A", json!(1)),
        Statement::new("Post:post:5:extra").with_attribute("A", json!(1)),
        Statement::new("Post:page:6").with_attribute("A", json!(1)),
        Statement::new("Term:category:6").with_attribute("A", json!(1)),
    ];

    let merged = post_merger(statements, InMemorySlugResolver::new())
        .merge_policies()
        .await
        .unwrap();

    assert_eq!(
        merged.keys().map(CompositeKey::as_str).collect::<Vec<_>>(),
        vec!["6|page"]
    );
}

#[tokio::test]
async fn test_unresolved_slug_contributes_nothing() {
    let statements = vec![Statement::new("Post:page:no-such-page").with_attribute("A", json!(1))];

    let merged = post_merger(statements, InMemorySlugResolver::new())
        .merge_policies()
        .await
        .unwrap();

    assert!(merged.is_empty());
}

#[tokio::test]
async fn test_numeric_and_slug_targets() {
    let slugs = InMemorySlugResolver::new().with_post(
        "featured-articles",
        "category",
        Post::new(7, "category"),
    );
    let statements = vec![
        Statement::new("Post:page:42").with_attribute("A", json!(1)),
        Statement::new("Post:category:featured-articles").with_attribute("B", json!(2)),
    ];

    let merged = post_merger(statements, slugs).merge_policies().await.unwrap();

    assert_eq!(
        merged.keys().map(CompositeKey::as_str).collect::<Vec<_>>(),
        vec!["42|page", "7|category"]
    );
}

#[tokio::test]
async fn test_leading_zero_id_is_normalized() {
    let statements = vec![
        Statement::new("Post:page:042").with_attribute("A", json!(1)),
        Statement::new("Post:page:42").with_attribute("B", json!(2)),
    ];

    let merged = post_merger(statements, InMemorySlugResolver::new())
        .merge_policies()
        .await
        .unwrap();

    assert_eq!(merged.len(), 1);
    assert_eq!(merged[&CompositeKey::from("42|page")].len(), 2);
}

#[tokio::test]
async fn test_term_slug_statement() {
    let slugs = InMemorySlugResolver::new()
        .with_term("news", "category", Term::new(10, "category").with_name("News", "news"));
    let statements = vec![
        Statement::new("Term:category:news")
            .with_attribute("Effect", json!("deny"))
            .with_attribute("Action", json!(["Browse", "List"])),
    ];

    let merged = TermPolicyMerger::new(
        Arc::new(InMemoryPolicySource::with_statements(statements)),
        Arc::new(EffectActionConverter),
        Arc::new(slugs),
    )
    .merge_policies()
    .await
    .unwrap();

    let fragment = &merged[&CompositeKey::from("10|category")];
    assert_eq!(fragment.get("browse"), Some(&json!({"effect": "deny"})));
    assert_eq!(fragment.get("list"), Some(&json!({"effect": "deny"})));
}

#[tokio::test]
async fn test_policy_source_error_propagates() {
    let merger = PostPolicyMerger::new(
        Arc::new(FailingSource),
        Arc::new(PassthroughConverter),
        Arc::new(InMemorySlugResolver::new()),
    );

    let err = merger.merge_policies().await.unwrap_err();
    assert!(matches!(err, ResourceError::PolicySource(_)));
}

// ============================================================================
// SEEDING A RESOLVER
// ============================================================================

#[tokio::test]
async fn test_merged_policies_seed_resolver() {
    let store = Arc::new(InMemoryResourceStore::new());
    store.insert_post(Post::new(42, "page")).await;
    store.insert_post(Post::new(43, "post")).await;

    let mut existing = PermissionMap::new();
    existing.insert(
        CompositeKey::from("42|page"),
        PermissionFragment::new().with("read", json!({"effect": "allow"})),
    );

    let statements = vec![
        Statement::new("Post:page:42")
            .with_attribute("Effect", json!("deny"))
            .with_attribute("Action", json!("Edit")),
        Statement::new("Post:post:43")
            .with_attribute("Effect", json!("deny"))
            .with_attribute("Action", json!("Read")),
    ];
    let merged = PostPolicyMerger::new(
        Arc::new(InMemoryPolicySource::with_statements(statements)),
        Arc::new(EffectActionConverter),
        Arc::new(InMemorySlugResolver::new()),
    )
    .merge_policies()
    .await
    .unwrap();

    let mut resolver = PostResolver::new(store.clone(), existing);
    resolver.apply_policies(merged);

    let page = &resolver.permissions()[&CompositeKey::from("42|page")];
    assert_eq!(page.get("read"), Some(&json!({"effect": "allow"})));
    assert_eq!(page.get("edit"), Some(&json!({"effect": "deny"})));

    let resolved = resolver.resolve_all().await.unwrap();
    assert_eq!(resolved.len(), 2);
    assert_eq!(store.stats().batch_queries, 1);
}
