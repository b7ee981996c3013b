//! Errors reported by [`Tree`][crate::Tree] operations.

use std::collections::TryReserveError;

use thiserror::Error;

/// Why [`Tree::insert`][crate::Tree::insert] refused a payload. The payload is always handed back
/// and the tree is left exactly as it was, so the insert can be retried.
#[derive(Error, Debug)]
pub enum InsertError<T> {
    /// A payload comparing equal is already stored.
    #[error("an equal payload is already in the tree")]
    Duplicate(T),

    /// The node arena could not grow.
    #[error("failed to allocate a tree node")]
    Alloc {
        /// The payload that was being inserted.
        payload: T,
        /// The underlying allocation failure.
        #[source]
        source: TryReserveError,
    },
}

impl<T> InsertError<T> {
    /// Gives back the payload that could not be inserted.
    pub fn into_payload(self) -> T {
        match self {
            Self::Duplicate(payload) | Self::Alloc { payload, .. } => payload,
        }
    }

    /// Whether the insert failed because the payload was already present.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate(_))
    }
}

/// A [`Visitor`][crate::Visitor] asked [`Tree::for_each`][crate::Tree::for_each] to stop before
/// every payload was seen.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("traversal stopped by the visitor after {visited} payload(s)")]
pub struct StoppedEarly {
    /// How many payloads were visited, counting the one whose visit returned `false`.
    pub visited: usize,
}

/// A structural property of a red-black tree that does not hold. Returned by
/// [`Tree::validate`][crate::Tree::validate].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    /// The root is red.
    #[error("the root is red")]
    RedRoot,

    /// A red node has a red child.
    #[error("red node at depth {depth} has a red child")]
    RedRed {
        /// Depth of the parent node (the root is at depth 0).
        depth: usize,
    },

    /// Two paths below the same node cross different numbers of black nodes.
    #[error("black height differs below node at depth {depth}: {left} on the left, {right} on the right")]
    BlackHeight {
        /// Depth of the node whose subtrees disagree.
        depth: usize,
        /// Black height of the left subtree.
        left: usize,
        /// Black height of the right subtree.
        right: usize,
    },

    /// An in-order neighbour is not strictly greater than its predecessor.
    #[error("payloads out of order at in-order position {position}")]
    Order {
        /// Position (0-based) of the payload that is not greater than the one before it.
        position: usize,
    },

    /// A child does not point back at its parent, or the root has a parent.
    #[error("parent link broken at depth {depth}")]
    ParentLink {
        /// Depth of the node with the bad parent link.
        depth: usize,
    },

    /// The element counter disagrees with the number of reachable nodes.
    #[error("tree reports {expected} payloads but {reachable} nodes are reachable")]
    Size {
        /// What [`Tree::len`][crate::Tree::len] reports.
        expected: usize,
        /// How many nodes are reachable from the root.
        reachable: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_returns_payload() {
        let err = InsertError::Duplicate(String::from("five"));
        assert!(err.is_duplicate());
        assert_eq!(err.to_string(), "an equal payload is already in the tree");
        assert_eq!(err.into_payload(), "five");
    }

    #[test]
    fn alloc_returns_payload() {
        let source = Vec::<u64>::new().try_reserve(usize::MAX).unwrap_err();
        let err = InsertError::Alloc { payload: 9, source };
        assert!(!err.is_duplicate());
        assert!(std::error::Error::source(&err).is_some());
        assert_eq!(err.into_payload(), 9);
    }

    #[test]
    fn stopped_early_message() {
        let err = StoppedEarly { visited: 3 };
        assert_eq!(
            err.to_string(),
            "traversal stopped by the visitor after 3 payload(s)"
        );
    }
}
