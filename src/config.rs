//! Tunables for a [`Tree`][crate::Tree].

/// How a tree answers "is an equal payload already stored?". This is used both by
/// [`Tree::contains`][crate::Tree::contains] and by the duplicate check in
/// [`Tree::insert`][crate::Tree::insert].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Membership {
    /// Walk down from the root, letting the comparator pick one child at each step. `O(height)`.
    #[default]
    Ordered,
    /// Compare against every node in the tree. `O(n)`, but the answer does not depend on the
    /// comparator agreeing with the shape of the tree.
    Exhaustive,
}

/// Construction-time configuration for a [`Tree`][crate::Tree].
///
/// ```
/// use rbtree::{Config, DropPayload, Membership, NaturalOrder, Tree};
///
/// let config = Config::default().membership(Membership::Exhaustive);
/// let mut tree = Tree::with_config(NaturalOrder, DropPayload, config);
/// tree.insert(3).unwrap();
/// assert!(tree.contains(&3));
/// ```
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Strategy for membership checks.
    pub membership: Membership,
}

impl Config {
    /// Returns this config with the given membership strategy.
    pub fn membership(self, membership: Membership) -> Self {
        Self { membership }
    }
}
