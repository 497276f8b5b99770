//! How disruptive reconciling a difference is.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Severity of a schema difference.
///
/// The declaration order is the aggregation order:
/// `None < Alter < Create < Unsafe`. Combining severities always keeps
/// the most disruptive one, so `Unsafe` dominates everything.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Difference {
    /// Nothing to do.
    #[default]
    None,
    /// Reconcilable in place with `ALTER` statements.
    Alter,
    /// The object (or a sub-object such as the primary key) must be
    /// created.
    Create,
    /// Cannot be reconciled automatically without risking data.
    Unsafe,
}

impl Difference {
    /// Returns the more disruptive of the two.
    #[must_use]
    pub fn combine(self, other: Self) -> Self {
        self.max(other)
    }

    /// Returns the most disruptive severity in `items`, or `None` when
    /// empty.
    #[must_use]
    pub fn dominant(items: impl IntoIterator<Item = Self>) -> Self {
        items.into_iter().fold(Self::None, Self::combine)
    }

    /// Whether anything needs to change.
    #[must_use]
    pub fn has_changes(self) -> bool {
        self != Self::None
    }

    /// Whether statements may be generated for this severity.
    #[must_use]
    pub fn is_applicable(self) -> bool {
        self != Self::Unsafe
    }
}

impl fmt::Display for Difference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::None => "none",
            Self::Alter => "alter",
            Self::Create => "create",
            Self::Unsafe => "unsafe",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Difference; 4] = [
        Difference::None,
        Difference::Alter,
        Difference::Create,
        Difference::Unsafe,
    ];

    #[test]
    fn order_is_explicit() {
        assert!(Difference::None < Difference::Alter);
        assert!(Difference::Alter < Difference::Create);
        assert!(Difference::Create < Difference::Unsafe);
    }

    #[test]
    fn unsafe_dominates_every_combination() {
        // Every assignment of severities to the four table aspects.
        for a in ALL {
            for b in ALL {
                for c in ALL {
                    for d in ALL {
                        let combined = Difference::dominant([a, b, c, d]);
                        let expected = *[a, b, c, d].iter().max().unwrap();
                        assert_eq!(combined, expected);
                        if [a, b, c, d].contains(&Difference::Unsafe) {
                            assert_eq!(combined, Difference::Unsafe);
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn dominant_of_nothing_is_none() {
        assert_eq!(Difference::dominant([]), Difference::None);
    }
}
