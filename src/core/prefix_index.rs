use std::collections::HashMap;

/// A multi-map from string keys to values, indexed by every non-empty prefix
/// of each key.
///
/// Inserting `(full_key, value)` registers the entry under every prefix of
/// `full_key`, so users can address entries by any abbreviation that stays
/// unique among siblings. Whether an abbreviation is unique is evaluated
/// fresh at lookup time; registering a new entry can turn a previously valid
/// abbreviation into an ambiguous one.
///
/// The index is built incrementally while a controller is constructed and is
/// read-only during dispatch. It structurally allows duplicate full keys;
/// rejecting them is the controller's job (see
/// [`contains`](Self::contains)).
#[derive(Debug)]
pub struct PrefixIndex<V> {
    entries: Vec<(String, V)>,
    prefixes: HashMap<String, Vec<usize>>,
}

/// The outcome of a prefix lookup.
#[derive(Debug)]
pub enum Lookup<'a, V> {
    /// No entry's full key starts with the queried prefix.
    None,
    /// Exactly one entry matched, or exactly one of several matches was an
    /// exact hit. `full_key` is the entry's complete key, which may be
    /// longer than the queried prefix.
    Unique { full_key: &'a str, value: &'a V },
    /// Two or more entries matched and none of them exactly. Carries the
    /// candidate full keys for diagnostics.
    Ambiguous { candidates: Vec<&'a str> },
}

impl<V> PrefixIndex<V> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            prefixes: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True if an entry with exactly this full key exists.
    pub fn contains(&self, full_key: &str) -> bool {
        self.entries.iter().any(|(key, _)| key == full_key)
    }

    /// Registers `value` under every non-empty prefix of `full_key`.
    pub fn insert(&mut self, full_key: impl Into<String>, value: V) {
        let full_key = full_key.into();
        let index = self.entries.len();
        for end in full_key.char_indices().map(|(i, c)| i + c.len_utf8()) {
            self.prefixes
                .entry(full_key[..end].to_string())
                .or_default()
                .push(index);
        }
        self.entries.push((full_key, value));
    }

    /// Resolves `prefix` against the index. Callers never query the empty
    /// prefix. An exact hit among several prefix matches wins outright; the
    /// same rule therefore applies wherever the index is used.
    pub fn lookup(&self, prefix: &str) -> Lookup<'_, V> {
        let Some(indices) = self.prefixes.get(prefix) else {
            return Lookup::None;
        };
        if let [index] = indices.as_slice() {
            let (full_key, value) = &self.entries[*index];
            return Lookup::Unique {
                full_key,
                value,
            };
        }
        let exact: Vec<usize> = indices
            .iter()
            .copied()
            .filter(|&index| self.entries[index].0 == prefix)
            .collect();
        if let [index] = exact.as_slice() {
            let (full_key, value) = &self.entries[*index];
            return Lookup::Unique {
                full_key,
                value,
            };
        }
        Lookup::Ambiguous {
            candidates: indices
                .iter()
                .map(|&index| self.entries[index].0.as_str())
                .collect(),
        }
    }

    /// All entries in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }
}

impl<V> Default for PrefixIndex<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sibling_index() -> PrefixIndex<u32> {
        let mut index = PrefixIndex::new();
        index.insert("alpha", 1);
        index.insert("alphabet", 2);
        index
    }

    #[test]
    fn test_lookup_unknown_prefix() {
        let index = sibling_index();
        assert!(matches!(index.lookup("x"), Lookup::None));
        assert!(matches!(index.lookup("alphabets"), Lookup::None));
    }

    #[test]
    fn test_lookup_unique_strict_prefix() {
        let index = sibling_index();
        match index.lookup("alphab") {
            Lookup::Unique { full_key, value } => {
                assert_eq!(full_key, "alphabet");
                assert_eq!(*value, 2);
            }
            other => panic!("expected unique match, got {:?}", other),
        }
    }

    #[test]
    fn test_exact_match_wins_over_longer_sibling() {
        let index = sibling_index();
        match index.lookup("alpha") {
            Lookup::Unique { full_key, value } => {
                assert_eq!(full_key, "alpha");
                assert_eq!(*value, 1);
            }
            other => panic!("expected unique match, got {:?}", other),
        }
    }

    #[test]
    fn test_shared_prefix_is_ambiguous() {
        let index = sibling_index();
        match index.lookup("al") {
            Lookup::Ambiguous { mut candidates } => {
                candidates.sort_unstable();
                assert_eq!(candidates, vec!["alpha", "alphabet"]);
            }
            other => panic!("expected ambiguous match, got {:?}", other),
        }
    }

    #[test]
    fn test_single_entry_resolves_by_one_char() {
        let mut index = PrefixIndex::new();
        index.insert("help", ());
        assert!(matches!(
            index.lookup("h"),
            Lookup::Unique { full_key: "help", .. }
        ));
    }

    #[test]
    fn test_contains_checks_full_keys_only() {
        let index = sibling_index();
        assert!(index.contains("alpha"));
        assert!(!index.contains("al"));
    }
}
