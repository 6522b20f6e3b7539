use std::collections::HashMap;

use thiserror::Error;

/// Errors raised when a dependency cannot be produced for a key.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RegistryError {
    /// No value has been registered under the key.
    #[error("No dependency registered under key '{key}'.")]
    MissingKey { key: String },
    /// An alternative was selected by name but never provided.
    #[error("Key '{key}' has no alternative named '{name}'.")]
    UnknownAlternative { key: String, name: String },
}

/// One key's worth of registered alternatives.
struct Entry<T> {
    values: Vec<(Option<String>, T)>,
    selected: Option<String>,
}

impl<T> Default for Entry<T> {
    fn default() -> Self {
        Self {
            values: Vec::new(),
            selected: None,
        }
    }
}

/// An explicit dependency registry: values registered under string keys,
/// optionally as named alternatives with one of them selected.
///
/// The composition root owns the registry, populates it, and passes it to
/// whoever consumes it (for command trees, the
/// [`Dispatcher`](crate::core::dispatcher::Dispatcher)); there is no
/// process-global instance.
pub struct Registry<T> {
    entries: HashMap<String, Entry<T>>,
}

impl<T> Registry<T> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Registers an anonymous alternative under `key`.
    pub fn add(&mut self, key: &str, value: T) {
        self.entry_mut(key).values.push((None, value));
    }

    /// Registers a named alternative under `key`.
    pub fn add_named(&mut self, key: &str, name: &str, value: T) {
        self.entry_mut(key)
            .values
            .push((Some(name.to_string()), value));
    }

    /// Selects which named alternative [`get`](Self::get) returns. An
    /// alternative may be selected before it is provided.
    pub fn select(&mut self, key: &str, name: &str) {
        self.entry_mut(key).selected = Some(name.to_string());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries
            .get(key)
            .is_some_and(|entry| !entry.values.is_empty())
    }

    /// Returns the selected alternative for `key`, or the most recently
    /// added value when nothing is selected.
    pub fn get(&self, key: &str) -> Result<&T, RegistryError> {
        let entry = self
            .entries
            .get(key)
            .ok_or_else(|| RegistryError::MissingKey {
                key: key.to_string(),
            })?;
        match &entry.selected {
            Some(selected) => entry
                .values
                .iter()
                .rev()
                .find(|(name, _)| name.as_deref() == Some(selected))
                .map(|(_, value)| value)
                .ok_or_else(|| RegistryError::UnknownAlternative {
                    key: key.to_string(),
                    name: selected.clone(),
                }),
            None => entry
                .values
                .last()
                .map(|(_, value)| value)
                .ok_or_else(|| RegistryError::MissingKey {
                    key: key.to_string(),
                }),
        }
    }

    /// All alternatives under `key`, in registration order. An unknown key
    /// yields an empty iterator.
    pub fn get_all(&self, key: &str) -> impl Iterator<Item = &T> {
        self.entries
            .get(key)
            .into_iter()
            .flat_map(|entry| entry.values.iter().map(|(_, value)| value))
    }

    /// Drops every registered value and selection.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn entry_mut(&mut self, key: &str) -> &mut Entry<T> {
        self.entries.entry(key.to_string()).or_default()
    }
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for Registry<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("keys", &self.entries.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
