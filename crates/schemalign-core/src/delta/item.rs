//! Generic name-keyed difference between two collections.

use std::collections::{BTreeMap, BTreeSet};

use crate::difference::Difference;

/// One classified change inside an [`ItemDelta`].
#[derive(Debug, PartialEq, Eq)]
pub enum ItemChange<'a, T> {
    /// Present only on the expected side; must be added.
    Missing(&'a T),
    /// Present only on the actual side; must be dropped.
    Extra(&'a T),
    /// Present on both sides under the same name but not equal.
    Different {
        /// Expected definition.
        expected: &'a T,
        /// Actual definition.
        actual: &'a T,
    },
}

impl<T> Clone for ItemChange<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ItemChange<'_, T> {}

/// Difference between an expected and an actual collection of named
/// items (columns, indexes, foreign keys).
///
/// Items pair up by name only; pairing is never similarity based. The
/// naming and equality rules are passed in as closures so they can carry
/// whatever context they need, typically the owning tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemDelta<'a, T> {
    missing: Vec<&'a T>,
    extras: Vec<&'a T>,
    different: Vec<(&'a T, &'a T)>,
}

impl<T> Default for ItemDelta<'_, T> {
    fn default() -> Self {
        Self {
            missing: Vec::new(),
            extras: Vec::new(),
            different: Vec::new(),
        }
    }
}

impl<'a, T> ItemDelta<'a, T> {
    /// Partitions `expected` and `actual` into missing, extra and
    /// different items.
    ///
    /// Keys are compared ignoring ASCII case. Missing and different items
    /// keep the expected order, extras keep the actual order. When one
    /// side repeats a key, the first occurrence wins.
    pub fn compare<E, A, M>(
        expected: impl IntoIterator<Item = &'a T>,
        expected_key: E,
        actual: impl IntoIterator<Item = &'a T>,
        actual_key: A,
        matches: M,
    ) -> Self
    where
        E: Fn(&T) -> String,
        A: Fn(&T) -> String,
        M: Fn(&T, &T) -> bool,
    {
        let actual: Vec<(String, &'a T)> = actual
            .into_iter()
            .map(|item| (actual_key(item).to_ascii_lowercase(), item))
            .collect();
        let mut by_key: BTreeMap<&str, &'a T> = BTreeMap::new();
        for (key, item) in &actual {
            by_key.entry(key.as_str()).or_insert(*item);
        }

        let mut seen = BTreeSet::new();
        let mut missing = Vec::new();
        let mut different = Vec::new();
        for item in expected {
            let key = expected_key(item).to_ascii_lowercase();
            if !seen.insert(key.clone()) {
                continue;
            }
            match by_key.get(key.as_str()) {
                Some(&actual_item) if !matches(item, actual_item) => {
                    different.push((item, actual_item));
                }
                Some(_) => {}
                None => missing.push(item),
            }
        }

        let mut extra_seen = BTreeSet::new();
        let extras = actual
            .iter()
            .filter(|(key, _)| !seen.contains(key) && extra_seen.insert(key.clone()))
            .map(|(_, item)| *item)
            .collect();

        Self {
            missing,
            extras,
            different,
        }
    }

    /// Items only the expected side has.
    #[must_use]
    pub fn missing(&self) -> &[&'a T] {
        &self.missing
    }

    /// Items only the actual side has.
    #[must_use]
    pub fn extras(&self) -> &[&'a T] {
        &self.extras
    }

    /// Same-named pairs `(expected, actual)` that differ.
    #[must_use]
    pub fn different(&self) -> &[(&'a T, &'a T)] {
        &self.different
    }

    /// Whether any item is missing, extra or different.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        !(self.missing.is_empty() && self.extras.is_empty() && self.different.is_empty())
    }

    /// Iterates over every change.
    pub fn changes(&self) -> impl Iterator<Item = ItemChange<'a, T>> + '_ {
        self.missing
            .iter()
            .map(|item| ItemChange::Missing(*item))
            .chain(self.extras.iter().map(|item| ItemChange::Extra(*item)))
            .chain(
                self.different
                    .iter()
                    .map(|&(expected, actual)| ItemChange::Different { expected, actual }),
            )
    }

    /// `None` without changes, `Alter` otherwise.
    #[must_use]
    pub fn difference(&self) -> Difference {
        if self.has_changes() {
            Difference::Alter
        } else {
            Difference::None
        }
    }

    /// Like [`difference`](Self::difference), but each change may escalate
    /// the result through `escalate`.
    pub fn difference_with(&self, escalate: impl Fn(ItemChange<'a, T>) -> Difference) -> Difference {
        self.changes()
            .map(escalate)
            .fold(self.difference(), Difference::combine)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Eq)]
    struct Item {
        name: &'static str,
        value: u32,
    }

    fn item(name: &'static str, value: u32) -> Item {
        Item { name, value }
    }

    fn compare<'a>(expected: &'a [Item], actual: &'a [Item]) -> ItemDelta<'a, Item> {
        ItemDelta::compare(
            expected,
            |i| i.name.to_string(),
            actual,
            |i| i.name.to_string(),
            |a, b| a.value == b.value,
        )
    }

    #[test]
    fn partitions_items() {
        let expected = [item("a", 1), item("b", 2), item("c", 3)];
        let actual = [item("B", 2), item("C", 4), item("d", 5)];
        let delta = compare(&expected, &actual);

        assert_eq!(delta.missing(), &[&expected[0]]);
        assert_eq!(delta.extras(), &[&actual[2]]);
        assert_eq!(delta.different(), &[(&expected[2], &actual[1])]);
        assert!(delta.has_changes());
        assert_eq!(delta.difference(), Difference::Alter);
    }

    #[test]
    fn identical_sides_have_no_changes() {
        let expected = [item("a", 1), item("b", 2)];
        let actual = [item("b", 2), item("a", 1)];
        let delta = compare(&expected, &actual);
        assert!(!delta.has_changes());
        assert_eq!(delta.difference(), Difference::None);
        assert_eq!(delta.changes().count(), 0);
    }

    #[test]
    fn escalation_is_caller_defined() {
        let expected = [item("a", 1), item("b", 2)];
        let actual = [item("b", 3)];
        let delta = compare(&expected, &actual);

        let severity = delta.difference_with(|change| match change {
            ItemChange::Different { .. } => Difference::Unsafe,
            _ => Difference::None,
        });
        assert_eq!(severity, Difference::Unsafe);

        let severity = delta.difference_with(|_| Difference::None);
        assert_eq!(severity, Difference::Alter);
    }

    #[test]
    fn keys_use_context() {
        let expected = [item("a", 1)];
        let actual = [item("x_a", 1)];
        let delta = ItemDelta::compare(
            &expected,
            |i| format!("x_{}", i.name),
            &actual,
            |i| i.name.to_string(),
            |a, b| a.value == b.value,
        );
        assert!(!delta.has_changes());
    }
}
