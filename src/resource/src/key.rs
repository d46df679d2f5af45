//! Composite resource identifiers
//!
//! A composite key joins discriminators with [`KEY_DELIMITER`]:
//!
//! - posts: `{id}|{post_type}`
//! - terms: `{term_id}|{taxonomy}` or `{term_id}|{taxonomy}|{post_type}`
//!
//! The numeric id is always the first segment.

use crate::error::{ResourceError, Result};
use crate::types::{Post, Term};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Segment delimiter inside composite keys
pub const KEY_DELIMITER: char = '|';

/// Opaque string identifier of one resource instance within its kind
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompositeKey(String);

impl CompositeKey {
    /// Join segments with the key delimiter
    pub fn from_parts(parts: &[&str]) -> Self {
        debug_assert!(
            parts.iter().all(|p| !p.contains(KEY_DELIMITER)),
            "key segment contains delimiter: {:?}",
            parts
        );
        Self(parts.join(KEY_DELIMITER.to_string().as_str()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn segments(&self) -> std::str::Split<'_, char> {
        self.0.split(KEY_DELIMITER)
    }

    /// Parse the leading numeric id segment
    pub fn numeric_id(&self) -> Result<u64> {
        let first = self.segments().next().unwrap_or_default();
        parse_id(self, first)
    }
}

impl fmt::Display for CompositeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for CompositeKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl From<&str> for CompositeKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl Borrow<str> for CompositeKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Decoded post identity
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PostKey {
    pub id: u64,
    pub post_type: String,
}

impl PostKey {
    pub fn encode(&self) -> CompositeKey {
        CompositeKey::from_parts(&[self.id.to_string().as_str(), self.post_type.as_str()])
    }

    /// Split `{id}|{post_type}`; any other segment count is malformed
    pub fn decode(key: &CompositeKey) -> Result<Self> {
        let parts: Vec<&str> = key.segments().collect();
        match parts.as_slice() {
            [id, post_type] => Ok(Self {
                id: parse_id(key, id)?,
                post_type: (*post_type).to_string(),
            }),
            _ => Err(ResourceError::malformed(
                key.as_str(),
                format!("expected 2 segments, found {}", parts.len()),
            )),
        }
    }
}

impl From<&Post> for PostKey {
    fn from(post: &Post) -> Self {
        Self {
            id: post.id,
            post_type: post.post_type.clone(),
        }
    }
}

/// Decoded term identity
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TermKey {
    pub id: u64,
    pub taxonomy: String,
    pub post_type: Option<String>,
}

impl TermKey {
    pub fn encode(&self) -> CompositeKey {
        let id = self.id.to_string();
        match self.post_type.as_deref().filter(|p| !p.is_empty()) {
            Some(post_type) => {
                CompositeKey::from_parts(&[id.as_str(), self.taxonomy.as_str(), post_type])
            }
            None => CompositeKey::from_parts(&[id.as_str(), self.taxonomy.as_str()]),
        }
    }

    /// Split `{id}|{taxonomy}[|{post_type}]`
    ///
    /// An empty trailing post type segment is treated as absent.
    pub fn decode(key: &CompositeKey) -> Result<Self> {
        let parts: Vec<&str> = key.segments().collect();
        let (id, taxonomy, post_type) = match parts.as_slice() {
            [id, taxonomy] => (id, taxonomy, None),
            [id, taxonomy, post_type] => (
                id,
                taxonomy,
                Some(*post_type).filter(|p| !p.is_empty()),
            ),
            _ => {
                return Err(ResourceError::malformed(
                    key.as_str(),
                    format!("expected 2 or 3 segments, found {}", parts.len()),
                ))
            }
        };

        Ok(Self {
            id: parse_id(key, id)?,
            taxonomy: (*taxonomy).to_string(),
            post_type: post_type.map(str::to_string),
        })
    }

    /// `{id}|{taxonomy}`, the identity of the stored term without scoping
    pub fn base(&self) -> CompositeKey {
        CompositeKey::from_parts(&[self.id.to_string().as_str(), self.taxonomy.as_str()])
    }
}

impl From<&Term> for TermKey {
    fn from(term: &Term) -> Self {
        Self {
            id: term.term_id,
            taxonomy: term.taxonomy.clone(),
            post_type: term.post_type.clone(),
        }
    }
}

fn parse_id(key: &CompositeKey, segment: &str) -> Result<u64> {
    segment.parse().map_err(|_| {
        ResourceError::malformed(
            key.as_str(),
            format!("id segment '{}' is not numeric", segment),
        )
    })
}
