use std::collections::HashMap;
use std::collections::hash_map;

/// A string map whose keys are compared case-insensitively.
///
/// Keys are lower-cased on insertion and on every lookup, so `Content-Type`
/// and `content-type` name the same entry. Each key holds a single value;
/// inserting an existing key replaces it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaseInsensitiveMap {
    entries: HashMap<String, String>,
}

/// HTTP header fields.
pub type HeaderMap = CaseInsensitiveMap;

/// Route parameters filled in by a routing layer.
pub type ParamMap = CaseInsensitiveMap;

impl CaseInsensitiveMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a value, returning the previous one for that key.
    pub fn insert(&mut self, key: impl AsRef<str>, value: impl Into<String>) -> Option<String> {
        self.entries
            .insert(key.as_ref().to_ascii_lowercase(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .get(&key.to_ascii_lowercase())
            .map(|v| v.as_str())
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.entries.remove(&key.to_ascii_lowercase())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(&key.to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over `(lower-cased key, value)` pairs in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Returns true if the comma-separated value under `key` contains `token`.
    pub fn has_token(&self, key: &str, token: &str) -> bool {
        self.get(key)
            .map(|v| v.split(',').any(|t| t.trim().eq_ignore_ascii_case(token)))
            .unwrap_or(false)
    }
}

impl IntoIterator for CaseInsensitiveMap {
    type Item = (String, String);
    type IntoIter = hash_map::IntoIter<String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for CaseInsensitiveMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}
