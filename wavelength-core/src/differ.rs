//! Key-level diff between two maps.

use std::collections::{BTreeMap, BTreeSet};

/// Compares a `current` map against a `past` one.
#[derive(Debug, Clone)]
pub struct DictDiffer<'a, V> {
    current: &'a BTreeMap<String, V>,
    past: &'a BTreeMap<String, V>,
}

impl<'a, V: PartialEq> DictDiffer<'a, V> {
    pub fn new(current: &'a BTreeMap<String, V>, past: &'a BTreeMap<String, V>) -> Self {
        Self { current, past }
    }

    /// Keys only in `current`.
    pub fn added(&self) -> BTreeSet<String> {
        self.current
            .keys()
            .filter(|k| !self.past.contains_key(*k))
            .cloned()
            .collect()
    }

    /// Keys only in `past`.
    pub fn removed(&self) -> BTreeSet<String> {
        self.past
            .keys()
            .filter(|k| !self.current.contains_key(*k))
            .cloned()
            .collect()
    }

    /// Keys in both whose values differ.
    pub fn changed(&self) -> BTreeSet<String> {
        self.intersection(|a, b| a != b)
    }

    /// Keys in both with equal values.
    pub fn unchanged(&self) -> BTreeSet<String> {
        self.intersection(|a, b| a == b)
    }

    fn intersection(&self, keep: impl Fn(&V, &V) -> bool) -> BTreeSet<String> {
        self.current
            .iter()
            .filter_map(|(k, v)| {
                self.past
                    .get(k)
                    .filter(|past| keep(v, past))
                    .map(|_| k.clone())
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn set(keys: &[&str]) -> BTreeSet<String> {
        keys.iter().map(|k| k.to_string()).collect()
    }

    #[test]
    fn test_diff() {
        let current = map(&[
            ("new_key1", "new_value1"),
            ("changed_key1", "change_value"),
            ("same_key1", "same_value1"),
        ]);
        let past = map(&[
            ("removed_key1", "removed_value1"),
            ("changed_key1", "change_value1"),
            ("same_key1", "same_value1"),
        ]);
        let differ = DictDiffer::new(&current, &past);

        assert_eq!(differ.added(), set(&["new_key1"]));
        assert_eq!(differ.changed(), set(&["changed_key1"]));
        assert_eq!(differ.removed(), set(&["removed_key1"]));
        assert_eq!(differ.unchanged(), set(&["same_key1"]));
    }

    #[test]
    fn test_identical_maps() {
        let current = map(&[("a", "1")]);
        let differ = DictDiffer::new(&current, &current);
        assert!(differ.added().is_empty());
        assert!(differ.removed().is_empty());
        assert!(differ.changed().is_empty());
        assert_eq!(differ.unchanged(), set(&["a"]));
    }
}
