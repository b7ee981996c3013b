//! The capabilities a [`Tree`][crate::Tree] needs from its caller.
//!
//! A tree never looks inside its payloads. It orders them with a [`Comparator`], hands each one
//! to a [`Destructor`] exactly once when the tree is torn down, and shows them to a [`Visitor`]
//! during an in-order walk. Closures implement all three traits, so most callers never name
//! them:
//!
//! ```
//! use rbtree::Tree;
//!
//! let mut released = Vec::new();
//! {
//!     let mut tree = Tree::with_contract(
//!         |a: &i32, b: &i32| b.cmp(a),
//!         |x: i32| released.push(x),
//!     );
//!     tree.insert(1).unwrap();
//!     tree.insert(2).unwrap();
//!     tree.free();
//! }
//! released.sort();
//! assert_eq!(released, [1, 2]);
//! ```

use std::cmp::Ordering;

/// A total order over payloads. `Equal` must only be returned for payloads that are the same key,
/// and the order must not change while a tree uses it.
pub trait Comparator<T: ?Sized> {
    /// Compares `a` against `b`.
    fn compare(&self, a: &T, b: &T) -> Ordering;
}

impl<T: ?Sized, F> Comparator<T> for F
where
    F: Fn(&T, &T) -> Ordering,
{
    fn compare(&self, a: &T, b: &T) -> Ordering {
        self(a, b)
    }
}

/// Orders payloads by their [`Ord`] implementation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct NaturalOrder;

impl<T: Ord + ?Sized> Comparator<T> for NaturalOrder {
    fn compare(&self, a: &T, b: &T) -> Ordering {
        a.cmp(b)
    }
}

/// Releases a payload once the tree holding it is torn down.
pub trait Destructor<T> {
    /// Consumes `payload`. Called once per payload, never before teardown.
    fn destroy(&mut self, payload: T);
}

impl<T, F> Destructor<T> for F
where
    F: FnMut(T),
{
    fn destroy(&mut self, payload: T) {
        self(payload)
    }
}

/// Releases payloads by dropping them.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DropPayload;

impl<T> Destructor<T> for DropPayload {
    fn destroy(&mut self, payload: T) {
        drop(payload);
    }
}

/// Sees each payload of a tree in ascending order. Returning `false` stops the walk.
///
/// Any state the visitor accumulates lives in the visitor itself (or in whatever a closure
/// captures).
pub trait Visitor<T: ?Sized> {
    /// Visits one payload. Returns whether the walk should continue.
    fn visit(&mut self, payload: &T) -> bool;
}

impl<T: ?Sized, F> Visitor<T> for F
where
    F: FnMut(&T) -> bool,
{
    fn visit(&mut self, payload: &T) -> bool {
        self(payload)
    }
}
