use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Stable identity for one combination of artifact inputs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey(String);

impl CacheKey {
    /// Hash a set of named fields. Fields are sorted by name before
    /// serialization, so insertion order never affects the key. A repeated
    /// name keeps its last value.
    pub fn derive<I, K, V>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let canonical: BTreeMap<String, String> = fields
            .into_iter()
            .map(|(k, v)| (k.as_ref().to_string(), v.as_ref().to_string()))
            .collect();
        // JSON of a string map cannot fail and escapes separators unambiguously.
        let serialized = serde_json::to_vec(&canonical).unwrap_or_default();
        CacheKey(hex::encode(Sha256::digest(&serialized)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Session-scoped memoization of generated artifacts.
#[derive(Debug)]
pub struct ArtifactCache<V> {
    entries: HashMap<CacheKey, V>,
    hits: u64,
    misses: u64,
}

impl<V> Default for ArtifactCache<V> {
    fn default() -> Self {
        Self { entries: HashMap::new(), hits: 0, misses: 0 }
    }
}

impl<V: Clone> ArtifactCache<V> {
    pub fn get(&mut self, key: &CacheKey) -> Option<V> {
        match self.entries.get(key) {
            Some(v) => {
                self.hits += 1;
                tracing::debug!(key = %key, "cache hit");
                Some(v.clone())
            }
            None => {
                self.misses += 1;
                tracing::debug!(key = %key, "cache miss");
                None
            }
        }
    }

    pub fn insert(&mut self, key: CacheKey, value: V) {
        self.entries.insert(key, value);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.hits = 0;
        self.misses = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_order_independent() {
        let a = CacheKey::derive([("a", "1"), ("b", "2")]);
        let b = CacheKey::derive([("b", "2"), ("a", "1")]);
        assert_eq!(a, b);
    }

    #[test]
    fn key_changes_with_any_value() {
        let base = CacheKey::derive([("user", "nurse"), ("problem", "shift handover")]);
        assert_ne!(base, CacheKey::derive([("user", "nurses"), ("problem", "shift handover")]));
        assert_ne!(base, CacheKey::derive([("user", "nurse"), ("problem", "shift handover ")]));
    }

    #[test]
    fn key_does_not_confuse_field_boundaries() {
        let a = CacheKey::derive([("a", "1b"), ("c", "2")]);
        let b = CacheKey::derive([("a", "1"), ("b", "c2")]);
        assert_ne!(a, b);
    }

    #[test]
    fn key_is_fixed_length_hex() {
        let k = CacheKey::derive(Vec::<(String, String)>::new());
        assert_eq!(k.as_str().len(), 64);
        assert!(k.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn cache_counts_hits_and_misses() {
        let mut cache: ArtifactCache<String> = ArtifactCache::default();
        let key = CacheKey::derive([("artifact", "persona")]);
        assert!(cache.get(&key).is_none());
        cache.insert(key.clone(), "Anna, 34".into());
        assert_eq!(cache.get(&key).as_deref(), Some("Anna, 34"));
        assert_eq!(cache.stats(), (1, 1));
        cache.clear();
        assert!(cache.is_empty());
    }
}
