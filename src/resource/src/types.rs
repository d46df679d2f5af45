//! Core resource types

use crate::key::CompositeKey;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Raw storage row, keyed by column name
pub type RawRow = Map<String, Value>;

/// Permission map keyed by composite identifier
pub type PermissionMap = BTreeMap<CompositeKey, PermissionFragment>;

/// Resource kinds handled by this crate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    /// Content item (post, page, custom post type)
    Post,
    /// Taxonomy term
    Term,
}

impl ResourceKind {
    /// Name used as the first segment of policy resource paths
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Post => "Post",
            Self::Term => "Term",
        }
    }

    /// Wildcard pattern selecting every statement of this kind
    pub fn statement_pattern(&self) -> String {
        format!("{}:*", self.as_str())
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Content item as stored in the posts table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    /// Numeric post ID
    #[serde(rename = "ID", deserialize_with = "lenient_int")]
    pub id: u64,

    /// Post type (post, page, product, ...)
    pub post_type: String,

    /// Author user ID
    #[serde(default, deserialize_with = "lenient_int")]
    pub post_author: u64,
}

impl Post {
    /// Create a new post
    pub fn new(id: u64, post_type: impl Into<String>) -> Self {
        Self {
            id,
            post_type: post_type.into(),
            post_author: 0,
        }
    }

    /// Set the post author
    pub fn with_author(mut self, author: u64) -> Self {
        self.post_author = author;
        self
    }

    /// Materialize a post from a raw row
    pub fn from_row(row: &RawRow) -> serde_json::Result<Self> {
        serde_json::from_value(Value::Object(row.clone()))
    }

    /// Convert the post into the row shape returned by the batched query
    pub fn to_row(&self) -> RawRow {
        match serde_json::to_value(self) {
            Ok(Value::Object(row)) => row,
            _ => RawRow::new(),
        }
    }
}

/// Taxonomy term joined with its term-taxonomy record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Term {
    /// Numeric term ID
    #[serde(deserialize_with = "lenient_int")]
    pub term_id: u64,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub slug: String,

    #[serde(default, deserialize_with = "lenient_int")]
    pub term_group: i64,

    #[serde(default, deserialize_with = "lenient_int")]
    pub term_taxonomy_id: u64,

    /// Taxonomy the term belongs to (category, post_tag, ...)
    pub taxonomy: String,

    #[serde(default)]
    pub description: String,

    #[serde(default, deserialize_with = "lenient_int")]
    pub parent: u64,

    #[serde(default, deserialize_with = "lenient_int")]
    pub count: i64,

    /// Content type the term is scoped to, when the permission targets a
    /// term within a specific post type. Never stored, only set on resolution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_type: Option<String>,
}

impl Term {
    /// Create a new term
    pub fn new(term_id: u64, taxonomy: impl Into<String>) -> Self {
        Self {
            term_id,
            name: String::new(),
            slug: String::new(),
            term_group: 0,
            term_taxonomy_id: 0,
            taxonomy: taxonomy.into(),
            description: String::new(),
            parent: 0,
            count: 0,
            post_type: None,
        }
    }

    /// Set the term name and slug
    pub fn with_name(mut self, name: impl Into<String>, slug: impl Into<String>) -> Self {
        self.name = name.into();
        self.slug = slug.into();
        self
    }

    /// Scope the term to a post type
    pub fn with_post_type(mut self, post_type: impl Into<String>) -> Self {
        self.post_type = Some(post_type.into());
        self
    }

    /// Materialize a term from a raw joined row
    pub fn from_row(row: &RawRow) -> serde_json::Result<Self> {
        serde_json::from_value(Value::Object(row.clone()))
    }

    /// Convert the term into the row shape returned by the joined query
    pub fn to_row(&self) -> RawRow {
        let mut row = match serde_json::to_value(self) {
            Ok(Value::Object(row)) => row,
            _ => RawRow::new(),
        };
        row.remove("post_type");
        row
    }
}

/// Kind-specific access attributes attached to one resource identity
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionFragment(Map<String, Value>);

impl PermissionFragment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field, returning the fragment
    pub fn with(mut self, field: impl Into<String>, value: Value) -> Self {
        self.0.insert(field.into(), value);
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(field.into(), value)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Field-level overwrite: fields of `other` replace fields with the same
    /// name, everything else is kept.
    pub fn merge(&mut self, other: PermissionFragment) {
        for (field, value) in other.0 {
            self.0.insert(field, value);
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for PermissionFragment {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

/// Merge every fragment of `source` into `target`, field by field
pub fn merge_permission_maps(target: &mut PermissionMap, source: PermissionMap) {
    for (key, fragment) in source {
        target.entry(key).or_default().merge(fragment);
    }
}

/// Accepts integers stored either as JSON numbers or as numeric strings,
/// since raw database rows often carry ids as text.
fn lenient_int<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: fmt::Display,
{
    let text = match Value::deserialize(deserializer)? {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        other => {
            return Err(de::Error::custom(format!(
                "expected an integer, got {}",
                other
            )))
        }
    };
    text.parse().map_err(de::Error::custom)
}
