//! Cache key derivation from query-parameter tuples.

use sha2::{Digest, Sha256};

/// Namespace shared by every key this gateway writes.
pub const KEY_PREFIX: &str = "evslot";

/// Builds a cache key from a scope and an ordered list of parameters.
///
/// Every parameter participates, including absent ones, so two requests
/// share an entry only when their full query tuple is identical.
#[derive(Debug, Clone)]
pub struct CacheKey {
    scope: &'static str,
    hasher: Sha256,
}

impl CacheKey {
    /// Starts a key for `scope` (e.g. `"clients:list"`).
    #[must_use]
    pub fn new(scope: &'static str) -> Self {
        Self {
            scope,
            hasher: Sha256::new(),
        }
    }

    /// Adds a named parameter.
    #[must_use]
    pub fn param(mut self, name: &str, value: impl std::fmt::Display) -> Self {
        self.hasher.update(name.as_bytes());
        self.hasher.update(b"=");
        self.hasher.update(value.to_string().as_bytes());
        self.hasher.update(b"\x1f");
        self
    }

    /// Adds an optional parameter; `None` hashes differently from any value.
    #[must_use]
    pub fn opt_param(mut self, name: &str, value: Option<impl std::fmt::Display>) -> Self {
        match value {
            Some(v) => self.param(name, v),
            None => {
                self.hasher.update(name.as_bytes());
                self.hasher.update(b"\x00\x1f");
                self
            }
        }
    }

    /// Finalises into `evslot:<scope>:<16 hex chars>`.
    #[must_use]
    pub fn build(self) -> String {
        let digest = hex::encode(self.hasher.finalize());
        format!(
            "{KEY_PREFIX}:{}:{}",
            self.scope,
            digest.get(..16).unwrap_or(&digest)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list_key(page: u32, search: Option<&str>) -> String {
        CacheKey::new("clients:list")
            .param("page", page)
            .param("per_page", 20)
            .opt_param("search", search)
            .build()
    }

    #[test]
    fn same_tuple_same_key() {
        assert_eq!(list_key(1, Some("asha")), list_key(1, Some("asha")));
    }

    #[test]
    fn any_parameter_change_changes_key() {
        let base = list_key(1, Some("asha"));
        assert_ne!(base, list_key(2, Some("asha")));
        assert_ne!(base, list_key(1, Some("ash")));
        assert_ne!(base, list_key(1, None));
        assert_ne!(list_key(1, None), list_key(1, Some("")));
    }

    #[test]
    fn key_layout() {
        let key = list_key(1, None);
        assert!(key.starts_with("evslot:clients:list:"));
        assert_eq!(key.len(), "evslot:clients:list:".len() + 16);
    }
}
