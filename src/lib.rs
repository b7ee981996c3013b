//! This crate exposes a generic, insert-only Red-Black Tree.
//!
//! ## Red-Black Tree
//!
//! A Red-Black Tree is a Binary Search Tree (BST) where every `Node` is colored red or black.
//! Like any BST, for every `Node` all the `Node`s in its left subtree compare less than it and
//! all the `Node`s in its right subtree compare greater. On top of that:
//!
//! 1. The root is black.
//! 2. A red `Node` never has a red child.
//! 3. Every path from a `Node` down to an absent child passes through the same number of black
//!    `Node`s (its "black height").
//!
//! > Absent children count as black.
//!
//! Together these keep the height of the tree within `2 * lg(N + 1)` where `N` is the number of
//! nodes, so a lookup never has to look at more than `O(lg N)` payloads. After each insert the
//! tree recolors and rotates a few nodes on the path back up to the root to put the rules back in
//! place.
//!
//! ## Payloads
//!
//! The tree doesn't know anything about what it stores. The caller decides how payloads are
//! ordered (a [`Comparator`]), what happens to them when the tree goes away (a [`Destructor`]) and
//! what to do with each one during a walk (a [`Visitor`]).
//!
//! ```
//! use rbtree::Tree;
//!
//! let mut tree = Tree::new();
//! for word in ["pear", "apple", "fig"] {
//!     tree.insert(word).unwrap();
//! }
//!
//! let mut joined = String::new();
//! tree.for_each(&mut |word: &&str| {
//!     joined.push_str(word);
//!     joined.push('\n');
//!     true
//! })
//! .unwrap();
//! assert_eq!(joined, "apple\nfig\npear\n");
//! ```

#![deny(missing_docs, clippy::clone_on_ref_ptr)]

mod config;
mod contract;
mod error;
mod tree;

pub use config::{Config, Membership};
pub use contract::{Comparator, Destructor, DropPayload, NaturalOrder, Visitor};
pub use error::{InsertError, InvariantViolation, StoppedEarly};
pub use tree::{Color, Iter, NodeRef, Tree};
