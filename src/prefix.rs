//! Longest-prefix resolution over mount prefixes.
//!
//! Mounted apps leave per-prefix configuration behind: a static folder, a
//! middleware list, a template set. For each request the most specific entry
//! wins. Prefixes are plain strings, not path segments, so `/api` also
//! covers `/apix`.

use std::collections::BTreeMap;

use serde::Deserialize;

/// How a request path selects a key.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Matching {
    /// The path must start with the key; the longest such key wins.
    #[default]
    Prefix,
    /// The key whose first occurrence, removed from the path, leaves the
    /// shortest remainder is chosen, then accepted only if the path starts
    /// with it. A non-prefix key can therefore shadow a valid prefix and
    /// leave the request with no selection.
    Substring,
}

/// A map from mount prefix to per-mount configuration.
#[derive(Clone, Debug)]
pub struct PrefixMap<V> {
    entries: BTreeMap<String, V>,
}

impl<V> PrefixMap<V> {
    pub fn new() -> Self {
        Self { entries: BTreeMap::new() }
    }

    /// Inserts `value` under `prefix`, returning the value it replaced.
    pub fn insert(&mut self, prefix: impl Into<String>, value: V) -> Option<V> {
        self.entries.insert(prefix.into(), value)
    }

    pub fn get(&self, prefix: &str) -> Option<&V> {
        self.entries.get(prefix)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Selects the entry serving `path` under `matching`.
    pub fn resolve(&self, path: &str, matching: Matching) -> Option<(&str, &V)> {
        let key = match matching {
            Matching::Prefix => self.longest_prefix(path)?,
            Matching::Substring => self.shortest_remainder(path).filter(|k| path.starts_with(k))?,
        };
        self.entries.get_key_value(key).map(|(k, v)| (k.as_str(), v))
    }

    /// The longest key `path` starts with.
    pub fn longest_prefix(&self, path: &str) -> Option<&str> {
        self.entries
            .keys()
            .filter(|k| path.starts_with(k.as_str()))
            .min_by_key(|k| path.len() - k.len())
            .map(String::as_str)
    }

    /// The key leaving the shortest remainder once its first occurrence is
    /// removed from `path`. Keys need not be prefixes; on ties the
    /// lexicographically smallest key wins.
    pub fn shortest_remainder(&self, path: &str) -> Option<&str> {
        self.entries
            .keys()
            .min_by_key(|k| remainder_len(path, k))
            .map(String::as_str)
    }
}

impl<V> Default for PrefixMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> IntoIterator for PrefixMap<V> {
    type Item = (String, V);
    type IntoIter = std::collections::btree_map::IntoIter<String, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

fn remainder_len(path: &str, key: &str) -> usize {
    match path.find(key) {
        Some(_) => path.len() - key.len(),
        None => path.len(),
    }
}
