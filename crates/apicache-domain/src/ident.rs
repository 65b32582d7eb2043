//! Identifiers that cache keys are assembled from.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{DomainError, Result};

/// Logical grouping of cache entries and the unit of invalidation.
///
/// A namespace never contains `:` so that one namespace's key prefix can
/// not be a prefix of another's.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Namespace(String);

impl Namespace {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let reason = if name.is_empty() {
            Some("must not be empty")
        } else if name.contains(':') {
            Some("must not contain ':'")
        } else if name.chars().any(|c| c.is_whitespace() || c.is_control()) {
            Some("must not contain whitespace or control characters")
        } else {
            None
        };

        match reason {
            Some(reason) => Err(DomainError::InvalidNamespace { name, reason }),
            None => Ok(Self(name)),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Prefix shared by every key cached under this namespace.
    pub fn key_prefix(&self, global_prefix: &str) -> String {
        format!("{global_prefix}:{}:", self.0)
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Namespace {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for Namespace {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<&str> for Namespace {
    type Error = DomainError;

    fn try_from(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl From<Namespace> for String {
    fn from(ns: Namespace) -> Self {
        ns.0
    }
}

/// Fully qualified identity of a cached operation.
///
/// Usually built with [`function_id!`](crate::function_id).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionId(Cow<'static, str>);

impl FunctionId {
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque key under which one cache entry is stored.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey(String);

impl CacheKey {
    pub const fn new(key: String) -> Self {
        Self(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn belongs_to(&self, namespace: &Namespace, global_prefix: &str) -> bool {
        self.0.starts_with(&namespace.key_prefix(global_prefix))
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fake::Fake;
    use fake::faker::lorem::en::Word;

    #[test]
    fn test_namespace_validation() {
        assert!(Namespace::new("users").is_ok());
        assert!(Namespace::new("").is_err());
        assert!(Namespace::new("users:admin").is_err());
        assert!(Namespace::new("two words").is_err());
    }

    #[test]
    fn test_generated_words_are_valid_namespaces() {
        for _ in 0..20 {
            let word: String = Word().fake();
            let ns = Namespace::new(word.clone()).unwrap();
            assert_eq!(ns.key_prefix("api-cache"), format!("api-cache:{word}:"));
        }
    }

    #[test]
    fn test_prefix_does_not_match_longer_namespace() {
        let user = Namespace::new("user").unwrap();
        let users = Namespace::new("users").unwrap();
        let key = CacheKey::new("api-cache:users:app::read_users".to_string());

        assert!(key.belongs_to(&users, "api-cache"));
        assert!(!key.belongs_to(&user, "api-cache"));
    }

    #[test]
    fn test_namespace_deserialize_validates() {
        let err = "users:x".parse::<Namespace>().unwrap_err();
        assert!(matches!(err, DomainError::InvalidNamespace { .. }));
    }
}
