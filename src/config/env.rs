use serde::Serialize;
use std::collections::HashMap;

/// Owned key/value view of the process environment.
///
/// Seeded once from the real environment (after `.env` has been loaded) and
/// then enriched by the bootstrap pass. Once the bootstrap gate resolves the
/// store is frozen inside a [`ConfigSnapshot`](crate::bootstrap::ConfigSnapshot)
/// and only read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EnvironmentStore {
    vars: HashMap<String, String>,
}

impl EnvironmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot the current process environment.
    pub fn from_process() -> Self {
        Self {
            vars: std::env::vars().collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Like [`get`](Self::get), but treats empty values as unset.
    pub fn get_non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|v| !v.is_empty())
    }

    /// First non-empty value among `keys`.
    pub fn first_of(&self, keys: &[&str]) -> Option<&str> {
        keys.iter().find_map(|k| self.get_non_empty(k))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get_non_empty(key).is_some()
    }

    /// Overwrite `key` unconditionally.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(key.into(), value.into());
    }

    /// Write `key` only when it is unset or empty. Returns whether it wrote.
    pub fn set_if_absent(&mut self, key: &str, value: impl Into<String>) -> bool {
        if self.contains(key) {
            return false;
        }
        self.vars.insert(key.to_string(), value.into());
        true
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K, V> FromIterator<(K, V)> for EnvironmentStore
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
