//! An insert-only red-black tree over caller-supplied payloads.
//!
//! Nodes live in an arena and point at each other with `NodeId` handles, so the parent links
//! needed by the rebalancing code never own anything and moving the `Tree` around can't break
//! them.
//!
//! # Examples
//!
//! ```
//! use rbtree::Tree;
//!
//! let mut tree = Tree::new();
//!
//! // Nothing in here yet.
//! assert!(!tree.contains(&1));
//!
//! tree.insert(1).unwrap();
//! assert!(tree.contains(&1));
//!
//! // Equal payloads are rejected and handed back.
//! let err = tree.insert(1).unwrap_err();
//! assert_eq!(err.into_payload(), 1);
//! assert_eq!(tree.len(), 1);
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::iter::FusedIterator;

use log::{debug, trace};

use crate::config::{Config, Membership};
use crate::contract::{Comparator, Destructor, DropPayload, NaturalOrder, Visitor};
use crate::error::{InsertError, InvariantViolation, StoppedEarly};

/// The color of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Color {
    /// A red node. Its children are black.
    Red,
    /// A black node. Absent children count as black too.
    Black,
}

/// Index of a node in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct NodeId(usize);

/// An optional reference to another node. Children are owned by their parent in the sense that
/// only the parent's `left`/`right` reach them; `parent` is just a way back up.
type Link = Option<NodeId>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

struct Node<T> {
    payload: T,
    color: Color,
    left: Link,
    right: Link,
    parent: Link,
}

impl<T> Node<T> {
    /// New nodes are always red. Fixup decides if they stay that way.
    fn new(payload: T, parent: Link) -> Self {
        Self {
            payload,
            color: Color::Red,
            left: None,
            right: None,
            parent,
        }
    }
}

/// A red-black tree. Payloads are ordered by the comparator `C` and released by the destructor
/// `D` when the tree is torn down, either through [`Tree::free`] or by dropping it.
pub struct Tree<T, C = NaturalOrder, D = DropPayload>
where
    D: Destructor<T>,
{
    nodes: Vec<Node<T>>,
    root: Link,
    len: usize,
    comparator: C,
    destructor: D,
    config: Config,
}

impl<T, C, D> Drop for Tree<T, C, D>
where
    D: Destructor<T>,
{
    fn drop(&mut self) {
        self.teardown();
    }
}

impl<T: Ord> Default for Tree<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, C, D> fmt::Debug for Tree<T, C, D>
where
    T: fmt::Debug,
    D: Destructor<T>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tree")
            .field("len", &self.len)
            .field("root", &self.root())
            .finish()
    }
}

impl<T: Ord> Tree<T> {
    /// Generates a new, empty `Tree` ordered by `T`'s [`Ord`] implementation whose payloads are
    /// simply dropped on teardown.
    pub fn new() -> Self {
        Self::with_contract(NaturalOrder, DropPayload)
    }
}

impl<T, C, D> Tree<T, C, D>
where
    D: Destructor<T>,
{
    /// Number of payloads stored.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the tree has no payloads.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The configuration this tree was built with.
    pub fn config(&self) -> Config {
        self.config
    }

    /// The root node, if the tree has one.
    pub fn root(&self) -> Option<NodeRef<'_, T>> {
        self.root.map(|id| NodeRef {
            nodes: &self.nodes,
            id,
        })
    }

    /// Number of nodes on the longest path from the root down to a leaf. An empty tree has a
    /// height of 0.
    pub fn height(&self) -> usize {
        let mut height = 0;
        let mut stack: Vec<(NodeId, usize)> = self.root.map(|id| (id, 1)).into_iter().collect();
        while let Some((id, depth)) = stack.pop() {
            height = height.max(depth);
            let node = self.node(id);
            stack.extend(node.left.map(|child| (child, depth + 1)));
            stack.extend(node.right.map(|child| (child, depth + 1)));
        }
        height
    }

    /// Iterates over the payloads in ascending order.
    ///
    /// # Examples
    ///
    /// ```
    /// use rbtree::Tree;
    ///
    /// let mut tree = Tree::new();
    /// for x in [3, 1, 2] {
    ///     tree.insert(x).unwrap();
    /// }
    ///
    /// assert_eq!(tree.iter().copied().collect::<Vec<_>>(), [1, 2, 3]);
    /// ```
    pub fn iter(&self) -> Iter<'_, T> {
        let mut iter = Iter {
            nodes: &self.nodes,
            stack: Vec::new(),
            remaining: self.len,
        };
        iter.push_left_spine(self.root);
        iter
    }

    /// Shows every payload, in ascending order, to `visitor`. If the visitor returns `false` the
    /// walk stops right there and [`StoppedEarly`] reports how many payloads were seen.
    ///
    /// # Examples
    ///
    /// ```
    /// use rbtree::Tree;
    ///
    /// let mut tree = Tree::new();
    /// for x in 1..=10 {
    ///     tree.insert(x).unwrap();
    /// }
    ///
    /// let mut sum = 0;
    /// tree.for_each(&mut |x: &i32| {
    ///     sum += x;
    ///     true
    /// })
    /// .unwrap();
    /// assert_eq!(sum, 55);
    ///
    /// let stopped = tree.for_each(&mut |x: &i32| *x < 3).unwrap_err();
    /// assert_eq!(stopped.visited, 3);
    /// ```
    pub fn for_each<V>(&self, visitor: &mut V) -> Result<(), StoppedEarly>
    where
        V: Visitor<T> + ?Sized,
    {
        for (index, payload) in self.iter().enumerate() {
            if !visitor.visit(payload) {
                debug!("visitor stopped traversal at payload {}", index + 1);
                return Err(StoppedEarly { visited: index + 1 });
            }
        }
        Ok(())
    }

    /// Tears the tree down, handing every payload to the destructor exactly once. Dropping the
    /// tree does the same thing; this just makes the point where it happens explicit.
    pub fn free(mut self) {
        self.teardown();
    }

    /// Post-order release: both subtrees of a node are released before the node itself.
    fn teardown(&mut self) {
        let Some(root) = self.root.take() else {
            return;
        };

        // Popping right before left visits node, right, left. Counting ranks down from the end
        // turns that into left, right, node.
        let count = self.nodes.len();
        let mut rank = vec![0; count];
        let mut next_rank = count;
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            next_rank -= 1;
            rank[id.0] = next_rank;
            let node = self.node(id);
            stack.extend(node.left);
            stack.extend(node.right);
        }
        // Every node is reachable from the root: the arena never holds detached nodes.
        debug_assert_eq!(next_rank, 0);

        // Put each node at its rank in place, then release front to back.
        for slot in 0..count {
            while rank[slot] != slot {
                let target = rank[slot];
                self.nodes.swap(slot, target);
                rank.swap(slot, target);
            }
        }
        let mut released = 0;
        for node in std::mem::take(&mut self.nodes) {
            self.destructor.destroy(node.payload);
            released += 1;
        }
        self.len = 0;
        debug!("released {} payloads on teardown", released);
    }

    fn node(&self, id: NodeId) -> &Node<T> {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node<T> {
        &mut self.nodes[id.0]
    }

    fn swap_colors(&mut self, a: NodeId, b: NodeId) {
        let a_color = self.node(a).color;
        let b_color = self.node(b).color;
        self.node_mut(a).color = b_color;
        self.node_mut(b).color = a_color;
    }

    /// Rotate `pivot` to the left. This moves the right child up vertically and `pivot` down
    /// vertically. Does nothing when `pivot` has no right child.
    ///
    /// # Diagram
    ///
    /// ```text
    ///    Option<parent>                Option<parent>
    ///      /                             /
    ///    pivot                        new_root
    ///    /   \                         /    \
    ///   x   new_root   rotate ->    pivot    z
    ///        /  \                   /  \
    ///       y    z                 x    y
    /// ```
    fn rotate_left(&mut self, pivot: NodeId) {
        let Some(new_root) = self.node(pivot).right else {
            return;
        };
        trace!("rotating left around {:?}", pivot);
        let parent = self.node(pivot).parent;
        let moved = self.node(new_root).left;

        self.node_mut(pivot).right = moved;
        if let Some(moved) = moved {
            self.node_mut(moved).parent = Some(pivot);
        }
        self.node_mut(new_root).left = Some(pivot);
        self.node_mut(pivot).parent = Some(new_root);
        self.replace_child(parent, pivot, new_root);
    }

    /// Rotate `pivot` to the right, the mirror image of [`Tree::rotate_left`]. Does nothing when
    /// `pivot` has no left child.
    ///
    /// # Diagram
    ///
    /// ```text
    ///      Option<parent>            Option<parent>
    ///        /                         /
    ///      pivot                    new_root
    ///      /   \                     /    \
    ///  new_root  z     rotate ->    x    pivot
    ///   /  \                             /  \
    ///  x    y                           y    z
    /// ```
    fn rotate_right(&mut self, pivot: NodeId) {
        let Some(new_root) = self.node(pivot).left else {
            return;
        };
        trace!("rotating right around {:?}", pivot);
        let parent = self.node(pivot).parent;
        let moved = self.node(new_root).right;

        self.node_mut(pivot).left = moved;
        if let Some(moved) = moved {
            self.node_mut(moved).parent = Some(pivot);
        }
        self.node_mut(new_root).right = Some(pivot);
        self.node_mut(pivot).parent = Some(new_root);
        self.replace_child(parent, pivot, new_root);
    }

    /// Hangs `new` where `old` used to hang below `parent` (or at the root). The side is found
    /// by handle, never by comparing payloads.
    fn replace_child(&mut self, parent: Link, old: NodeId, new: NodeId) {
        self.node_mut(new).parent = parent;
        match parent {
            None => self.root = Some(new),
            Some(parent) => {
                let parent = self.node_mut(parent);
                if parent.left == Some(old) {
                    parent.left = Some(new);
                } else {
                    parent.right = Some(new);
                }
            }
        }
    }

    /// Restores the red-black invariants after `node` was linked in as a red leaf.
    fn fix_after_insert(&mut self, mut node: NodeId) {
        while let Some(parent) = self
            .node(node)
            .parent
            .filter(|&parent| self.node(parent).color == Color::Red)
        {
            // A red parent is never the root so there is always a grandparent.
            let Some(grandparent) = self.node(parent).parent else {
                break;
            };
            let parent_side = if self.node(grandparent).left == Some(parent) {
                Side::Left
            } else {
                Side::Right
            };
            let uncle = match parent_side {
                Side::Left => self.node(grandparent).right,
                Side::Right => self.node(grandparent).left,
            };

            if let Some(uncle) = uncle.filter(|&uncle| self.node(uncle).color == Color::Red) {
                debug!("fixup at {:?}: red uncle, recoloring", node);
                self.node_mut(parent).color = Color::Black;
                self.node_mut(uncle).color = Color::Black;
                self.node_mut(grandparent).color = Color::Red;
                node = grandparent;
                continue;
            }

            let node_side = if self.node(parent).left == Some(node) {
                Side::Left
            } else {
                Side::Right
            };
            debug!(
                "fixup at {:?}: black uncle, {:?}-{:?} case",
                node, parent_side, node_side
            );
            match (parent_side, node_side) {
                (Side::Left, Side::Left) => {
                    self.rotate_right(grandparent);
                    self.swap_colors(parent, grandparent);
                }
                (Side::Left, Side::Right) => {
                    self.rotate_left(parent);
                    self.rotate_right(grandparent);
                    self.swap_colors(node, grandparent);
                }
                (Side::Right, Side::Right) => {
                    self.rotate_left(grandparent);
                    self.swap_colors(parent, grandparent);
                }
                (Side::Right, Side::Left) => {
                    self.rotate_right(parent);
                    self.rotate_left(grandparent);
                    self.swap_colors(node, grandparent);
                }
            }
            break;
        }

        if let Some(root) = self.root {
            self.node_mut(root).color = Color::Black;
        }
    }
}

impl<T, C, D> Tree<T, C, D>
where
    C: Comparator<T>,
    D: Destructor<T>,
{
    /// Generates a new, empty `Tree` ordered by `comparator` whose payloads are handed to
    /// `destructor` on teardown.
    ///
    /// # Examples
    ///
    /// ```
    /// use rbtree::{DropPayload, Tree};
    ///
    /// let mut tree = Tree::with_contract(|a: &i32, b: &i32| b.cmp(a), DropPayload);
    /// for x in [1, 2, 3] {
    ///     tree.insert(x).unwrap();
    /// }
    ///
    /// assert_eq!(tree.iter().copied().collect::<Vec<_>>(), [3, 2, 1]);
    /// ```
    pub fn with_contract(comparator: C, destructor: D) -> Self {
        Self::with_config(comparator, destructor, Config::default())
    }

    /// Like [`Tree::with_contract`] with an explicit [`Config`].
    pub fn with_config(comparator: C, destructor: D, config: Config) -> Self {
        Self {
            nodes: Vec::new(),
            root: None,
            len: 0,
            comparator,
            destructor,
            config,
        }
    }

    /// Whether a payload comparing equal to `payload` is stored. How the tree looks is decided by
    /// the [`Membership`] strategy in its [`Config`].
    pub fn contains(&self, payload: &T) -> bool {
        self.find(payload).is_some()
    }

    /// Returns the stored payload comparing equal to `payload`, if there is one.
    ///
    /// # Examples
    ///
    /// ```
    /// use rbtree::{DropPayload, Tree};
    ///
    /// // Only the first field is the key.
    /// let mut tree = Tree::with_contract(|a: &(u8, char), b: &(u8, char)| a.0.cmp(&b.0), DropPayload);
    /// tree.insert((1, 'a')).unwrap();
    ///
    /// assert_eq!(tree.find(&(1, 'z')), Some(&(1, 'a')));
    /// assert_eq!(tree.find(&(2, 'a')), None);
    /// ```
    pub fn find(&self, payload: &T) -> Option<&T> {
        let found = match self.config.membership {
            Membership::Ordered => self.find_ordered(payload),
            Membership::Exhaustive => self.find_exhaustive(payload),
        };
        found.map(|id| &self.node(id).payload)
    }

    fn find_ordered(&self, payload: &T) -> Option<NodeId> {
        let mut current = self.root;
        while let Some(id) = current {
            let node = self.node(id);
            current = match self.comparator.compare(payload, &node.payload) {
                Ordering::Less => node.left,
                Ordering::Equal => return Some(id),
                Ordering::Greater => node.right,
            };
        }
        None
    }

    fn find_exhaustive(&self, payload: &T) -> Option<NodeId> {
        let mut stack: Vec<NodeId> = self.root.into_iter().collect();
        while let Some(id) = stack.pop() {
            let node = self.node(id);
            if self.comparator.compare(&node.payload, payload) == Ordering::Equal {
                return Some(id);
            }
            stack.extend(node.left);
            stack.extend(node.right);
        }
        None
    }

    /// Inserts `payload` unless an equal payload is already stored. On failure the payload comes
    /// back inside the error and the tree is untouched.
    ///
    /// # Examples
    ///
    /// ```
    /// use rbtree::{Color, Tree};
    ///
    /// let mut tree = Tree::new();
    /// for x in [10, 20, 30] {
    ///     tree.insert(x).unwrap();
    /// }
    ///
    /// let root = tree.root().unwrap();
    /// assert_eq!((*root.payload(), root.color()), (20, Color::Black));
    /// assert!(tree.insert(20).unwrap_err().is_duplicate());
    /// ```
    pub fn insert(&mut self, payload: T) -> Result<(), InsertError<T>> {
        if self.contains(&payload) {
            debug!("rejected duplicate payload");
            return Err(InsertError::Duplicate(payload));
        }
        // Nothing has been touched yet: `nodes`, `root` and `len` are exactly as they were.
        if let Err(source) = self.nodes.try_reserve(1) {
            debug!("could not grow node arena past {} nodes", self.nodes.len());
            return Err(InsertError::Alloc { payload, source });
        }

        let slot = self.find_slot(&payload);
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::new(payload, slot.map(|(parent, _)| parent)));
        self.len += 1;

        match slot {
            None => {
                self.root = Some(id);
                self.node_mut(id).color = Color::Black;
            }
            Some((parent, side)) => {
                match side {
                    Side::Left => self.node_mut(parent).left = Some(id),
                    Side::Right => self.node_mut(parent).right = Some(id),
                }
                self.fix_after_insert(id);
            }
        }
        trace!("inserted {:?}, tree now holds {} payloads", id, self.len);

        if cfg!(debug_assertions) {
            if let Err(violation) = self.validate() {
                panic!("insert left the tree invalid: {}", violation);
            }
        }

        Ok(())
    }

    /// Finds the node the new payload will hang from and on which side. `None` means the tree is
    /// empty.
    fn find_slot(&self, payload: &T) -> Option<(NodeId, Side)> {
        let mut current = self.root?;
        loop {
            let node = self.node(current);
            // Ties go left. Equal payloads were rejected before we got here anyway.
            let (side, next) = match self.comparator.compare(&node.payload, payload) {
                Ordering::Less => (Side::Right, node.right),
                Ordering::Equal | Ordering::Greater => (Side::Left, node.left),
            };
            match next {
                Some(child) => current = child,
                None => {
                    trace!("new payload goes {:?} of {:?}", side, current);
                    return Some((current, side));
                }
            }
        }
    }

    /// Checks every red-black invariant, the parent links, the ordering of the payloads and the
    /// element count. Walks the whole tree.
    pub fn validate(&self) -> Result<(), InvariantViolation> {
        let Some(root) = self.root else {
            return match self.len {
                0 => Ok(()),
                expected => Err(InvariantViolation::Size {
                    expected,
                    reachable: 0,
                }),
            };
        };
        if self.node(root).parent.is_some() {
            return Err(InvariantViolation::ParentLink { depth: 0 });
        }
        if self.node(root).color == Color::Red {
            return Err(InvariantViolation::RedRoot);
        }

        let mut reachable = 0;
        self.black_height(root, 0, &mut reachable)?;
        if reachable != self.len {
            return Err(InvariantViolation::Size {
                expected: self.len,
                reachable,
            });
        }

        let mut previous: Option<&T> = None;
        for (position, payload) in self.iter().enumerate() {
            if let Some(previous) = previous {
                if self.comparator.compare(previous, payload) != Ordering::Less {
                    return Err(InvariantViolation::Order { position });
                }
            }
            previous = Some(payload);
        }

        Ok(())
    }

    /// Black height of the subtree at `id`, counting `id` itself and not counting the absent
    /// children at the bottom.
    fn black_height(
        &self,
        id: NodeId,
        depth: usize,
        reachable: &mut usize,
    ) -> Result<usize, InvariantViolation> {
        *reachable += 1;
        if *reachable > self.nodes.len() {
            return Err(InvariantViolation::Size {
                expected: self.len,
                reachable: *reachable,
            });
        }

        let node = self.node(id);
        let mut heights = [0; 2];
        for (height, child) in heights.iter_mut().zip([node.left, node.right]) {
            let Some(child) = child else {
                continue;
            };
            if self.node(child).parent != Some(id) {
                return Err(InvariantViolation::ParentLink { depth: depth + 1 });
            }
            if node.color == Color::Red && self.node(child).color == Color::Red {
                return Err(InvariantViolation::RedRed { depth });
            }
            *height = self.black_height(child, depth + 1, reachable)?;
        }

        let [left, right] = heights;
        if left != right {
            return Err(InvariantViolation::BlackHeight { depth, left, right });
        }
        Ok(left + usize::from(node.color == Color::Black))
    }
}

/// A borrowed view of one node, for looking at the shape of a tree.
pub struct NodeRef<'a, T> {
    nodes: &'a [Node<T>],
    id: NodeId,
}

impl<'a, T> Clone for NodeRef<'a, T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<'a, T> Copy for NodeRef<'a, T> {}

impl<'a, T> NodeRef<'a, T> {
    fn node(&self) -> &'a Node<T> {
        &self.nodes[self.id.0]
    }

    fn at(&self, link: Link) -> Option<Self> {
        link.map(|id| Self {
            nodes: self.nodes,
            id,
        })
    }

    /// The payload stored in this node.
    pub fn payload(&self) -> &'a T {
        &self.node().payload
    }

    /// This node's color.
    pub fn color(&self) -> Color {
        self.node().color
    }

    /// The left child.
    pub fn left(&self) -> Option<Self> {
        self.at(self.node().left)
    }

    /// The right child.
    pub fn right(&self) -> Option<Self> {
        self.at(self.node().right)
    }

    /// The parent, `None` for the root.
    pub fn parent(&self) -> Option<Self> {
        self.at(self.node().parent)
    }
}

impl<'a, T: fmt::Debug> fmt::Debug for NodeRef<'a, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("payload", self.payload())
            .field("color", &self.color())
            .field("left", &self.left())
            .field("right", &self.right())
            .finish()
    }
}

/// In-order iterator over the payloads of a [`Tree`]. Created by [`Tree::iter`].
pub struct Iter<'a, T> {
    nodes: &'a [Node<T>],
    stack: Vec<NodeId>,
    remaining: usize,
}

impl<'a, T> Iter<'a, T> {
    fn push_left_spine(&mut self, mut link: Link) {
        while let Some(id) = link {
            self.stack.push(id);
            link = self.nodes[id.0].left;
        }
    }
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        let node = &self.nodes[id.0];
        self.push_left_spine(node.right);
        self.remaining = self.remaining.saturating_sub(1);
        Some(&node.payload)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, T> ExactSizeIterator for Iter<'a, T> {}
impl<'a, T> FusedIterator for Iter<'a, T> {}

impl<'a, T, C, D> IntoIterator for &'a Tree<T, C, D>
where
    D: Destructor<T>,
{
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use super::*;

    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn tree_of(keys: &[i32]) -> Tree<i32> {
        let mut tree = Tree::new();
        for &key in keys {
            tree.insert(key).unwrap();
            tree.validate().unwrap();
        }
        tree
    }

    /// Assert the payload and color of the root and both of its children.
    macro_rules! assert_shape {
        ($tree:ident, $root:expr, $left:expr, $right:expr) => {{
            let root = $tree.root().expect("non-empty tree");
            assert_eq!((*root.payload(), root.color()), $root);

            let left = root.left().map(|n| (*n.payload(), n.color()));
            let right = root.right().map(|n| (*n.payload(), n.color()));
            assert_eq!(left, $left);
            assert_eq!(right, $right);
        }};
    }

    #[test]
    fn first_insert_is_black_root() {
        let tree = tree_of(&[5]);

        assert_shape!(tree, (5, Color::Black), None, None);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.height(), 1);
    }

    #[test]
    fn ascending_inserts_rotate_left() {
        init_logging();
        let tree = tree_of(&[10, 20, 30]);

        assert_shape!(
            tree,
            (20, Color::Black),
            Some((10, Color::Red)),
            Some((30, Color::Red))
        );
    }

    #[test]
    fn descending_inserts_rotate_right() {
        let tree = tree_of(&[30, 20, 10]);

        assert_shape!(
            tree,
            (20, Color::Black),
            Some((10, Color::Red)),
            Some((30, Color::Red))
        );
    }

    #[test]
    fn left_right_case_double_rotates() {
        let tree = tree_of(&[30, 10, 20]);

        assert_shape!(
            tree,
            (20, Color::Black),
            Some((10, Color::Red)),
            Some((30, Color::Red))
        );
    }

    #[test]
    fn right_left_case_double_rotates() {
        let tree = tree_of(&[10, 30, 20]);

        assert_shape!(
            tree,
            (20, Color::Black),
            Some((10, Color::Red)),
            Some((30, Color::Red))
        );
    }

    #[test]
    fn red_uncle_recolors_without_rotating() {
        let tree = tree_of(&[20, 10, 30, 5]);

        // The root went red during recoloring and was forced back to black.
        assert_shape!(
            tree,
            (20, Color::Black),
            Some((10, Color::Black)),
            Some((30, Color::Black))
        );
        let five = tree.root().unwrap().left().unwrap().left().unwrap();
        assert_eq!((*five.payload(), five.color()), (5, Color::Red));
    }

    #[test]
    fn always_adding_left() {
        let keys = [10, 9, 8, 7, 6, 5, 4, 3, 2, 1];
        let mut inserted = Vec::new();

        let mut tree = Tree::new();
        assert!(!tree.contains(&10));

        for key in keys {
            tree.insert(key).unwrap();
            tree.validate().unwrap();
            inserted.push(key);
            for inserted in &inserted {
                assert!(tree.contains(inserted));
            }
        }
        assert!(tree.height() <= 2 * 4);
    }

    #[test]
    fn always_adding_right() {
        let keys = [1, 2, 3, 4, 5, 6, 7, 8, 9, 10];
        let mut inserted = Vec::new();

        let mut tree = Tree::new();
        assert!(!tree.contains(&1));

        for key in keys {
            tree.insert(key).unwrap();
            tree.validate().unwrap();
            inserted.push(key);
            for inserted in &inserted {
                assert!(tree.contains(inserted));
            }
        }
        assert!(tree.height() <= 2 * 4);
    }

    #[test]
    fn duplicate_is_rejected() {
        let mut tree = Tree::new();

        assert!(tree.insert(5).is_ok());
        assert_eq!(tree.len(), 1);

        let err = tree.insert(5).unwrap_err();
        assert!(err.is_duplicate());
        assert_eq!(err.into_payload(), 5);
        assert_eq!(tree.len(), 1);
        tree.validate().unwrap();
    }

    #[test]
    fn rotate_right_fixes_parent_pointers() {
        let mut tree = tree_of(&[5, 3, 9, 4, 2, 1]);
        //        5
        //      /   \
        //     3     9
        //    / \
        //   2   4
        //  /
        // 1
        let five = tree.root.unwrap();
        let three = tree.node(five).left.unwrap();
        let nine = tree.node(five).right.unwrap();

        tree.rotate_right(five);

        assert_eq!(tree.root, Some(three));
        assert_eq!(tree.node(three).parent, None);
        assert_eq!(tree.node(five).parent, Some(three));
        assert_eq!(tree.node(nine).parent, Some(five));
        let four = tree.node(five).left.unwrap();
        assert_eq!(tree.node(four).payload, 4);
        assert_eq!(tree.node(four).parent, Some(five));
    }

    #[test]
    fn rotate_left_fixes_parent_pointers() {
        let mut tree = tree_of(&[-5, -3, -9, -4, -2, -1]);
        let root = tree.root.unwrap();
        let right = tree.node(root).right.unwrap();
        let moved = tree.node(right).left.unwrap();

        tree.rotate_left(root);

        assert_eq!(tree.root, Some(right));
        assert_eq!(tree.node(right).parent, None);
        assert_eq!(tree.node(right).left, Some(root));
        assert_eq!(tree.node(root).parent, Some(right));
        assert_eq!(tree.node(root).right, Some(moved));
        assert_eq!(tree.node(moved).parent, Some(root));
    }

    #[test]
    fn rotation_below_root_keeps_side() {
        let mut tree = tree_of(&[20, 10, 30, 25, 35]);
        let root = tree.root.unwrap();
        let thirty = tree.node(root).right.unwrap();

        tree.rotate_left(thirty);

        let thirty_five = tree.node(root).right.unwrap();
        assert_eq!(tree.node(thirty_five).payload, 35);
        assert_eq!(tree.node(thirty_five).parent, Some(root));
        assert_eq!(tree.node(thirty).parent, Some(thirty_five));
        assert_eq!(
            tree.iter().copied().collect::<Vec<_>>(),
            [10, 20, 25, 30, 35]
        );
    }

    #[test]
    fn rotation_without_child_is_noop() {
        let mut tree = tree_of(&[1]);
        let root = tree.root.unwrap();

        tree.rotate_left(root);
        tree.rotate_right(root);

        assert_eq!(tree.root, Some(root));
        tree.validate().unwrap();
    }

    #[test]
    fn for_each_visits_in_order() {
        let tree = tree_of(&[10, 20, 30, 40, 50]);
        let mut seen = Vec::new();

        let result = tree.for_each(&mut |x: &i32| {
            seen.push(*x);
            true
        });

        assert_eq!(result, Ok(()));
        assert_eq!(seen, [10, 20, 30, 40, 50]);
    }

    #[test]
    fn for_each_stops_early() {
        let tree = tree_of(&[7, 3, 9, 1, 5, 8, 10, 2, 4, 6]);
        let mut calls = 0;

        let result = tree.for_each(&mut |_: &i32| {
            calls += 1;
            calls < 3
        });

        assert_eq!(result, Err(StoppedEarly { visited: 3 }));
        assert_eq!(calls, 3);
    }

    #[test]
    fn for_each_on_empty_tree_succeeds() {
        let tree: Tree<i32> = Tree::new();
        assert_eq!(tree.for_each(&mut |_: &i32| false), Ok(()));
    }

    #[test]
    fn teardown_releases_each_payload_once() {
        let released = Rc::new(RefCell::new(Vec::new()));
        let mut tree = Tree::with_contract(NaturalOrder, {
            let released = Rc::clone(&released);
            move |x: i32| released.borrow_mut().push(x)
        });
        for x in 1..=7 {
            tree.insert(x).unwrap();
        }
        assert!(released.borrow().is_empty());

        tree.free();

        let mut released = released.borrow().clone();
        assert_eq!(released.len(), 7);
        released.sort_unstable();
        assert_eq!(released, [1, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn teardown_is_post_order() {
        let released = Rc::new(RefCell::new(Vec::new()));
        let mut tree = Tree::with_contract(NaturalOrder, {
            let released = Rc::clone(&released);
            move |x: i32| released.borrow_mut().push(x)
        });
        for x in [20, 10, 30, 5] {
            tree.insert(x).unwrap();
        }

        drop(tree);

        assert_eq!(*released.borrow(), [5, 10, 30, 20]);
    }

    #[test]
    fn rejected_payload_is_not_released() {
        let released = Rc::new(RefCell::new(0));
        let mut tree = Tree::with_contract(NaturalOrder, {
            let released = Rc::clone(&released);
            move |_: i32| *released.borrow_mut() += 1
        });
        tree.insert(1).unwrap();
        let _ = tree.insert(1);

        tree.free();

        assert_eq!(*released.borrow(), 1);
    }

    #[test]
    fn exhaustive_membership_agrees_with_ordered() {
        let config = Config::default().membership(Membership::Exhaustive);
        let mut exhaustive = Tree::with_config(NaturalOrder, DropPayload, config);
        let mut ordered = Tree::new();
        for x in [8, 3, 12, 1, 6, 10, 14, 4, 7] {
            exhaustive.insert(x).unwrap();
            ordered.insert(x).unwrap();
        }

        for x in 0..16 {
            assert_eq!(exhaustive.contains(&x), ordered.contains(&x), "{}", x);
        }
        assert!(exhaustive.insert(6).unwrap_err().is_duplicate());
        exhaustive.validate().unwrap();
    }

    /// A comparator that can be flipped to descending order after the tree is built, so it
    /// stops agreeing with the tree's shape.
    fn flippable(reversed: &Rc<Cell<bool>>) -> impl Fn(&i32, &i32) -> Ordering {
        let reversed = Rc::clone(reversed);
        move |a: &i32, b: &i32| {
            if reversed.get() {
                b.cmp(a)
            } else {
                a.cmp(b)
            }
        }
    }

    #[test]
    fn exhaustive_membership_ignores_shape() {
        let reversed = Rc::new(Cell::new(false));
        let config = Config::default().membership(Membership::Exhaustive);
        let mut exhaustive = Tree::with_config(flippable(&reversed), DropPayload, config);
        let mut ordered = Tree::with_contract(flippable(&reversed), DropPayload);
        for x in 1..=7 {
            exhaustive.insert(x).unwrap();
            ordered.insert(x).unwrap();
        }

        reversed.set(true);

        assert!((1..=7).all(|x| exhaustive.contains(&x)));
        // Descending the wrong way from the root never reaches the smallest payload.
        assert!(!ordered.contains(&1));
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "insert left the tree invalid")]
    fn insert_validates_in_debug_builds() {
        let reversed = Rc::new(Cell::new(false));
        let mut tree = Tree::with_contract(flippable(&reversed), DropPayload);
        for x in [1, 2, 3] {
            tree.insert(x).unwrap();
        }

        reversed.set(true);
        // Lands left of 1. Under the reversed order 1, 2, 3 are no longer ascending.
        let _ = tree.insert(4);
    }

    #[test]
    fn teardown_releases_children_before_parent() {
        let released = Rc::new(RefCell::new(Vec::new()));
        let mut tree = Tree::with_contract(NaturalOrder, {
            let released = Rc::clone(&released);
            move |x: i32| released.borrow_mut().push(x)
        });
        for x in [8, 4, 12, 2, 6, 10, 14, 1, 3, 5, 7, 9, 11, 13, 15, 16, 17] {
            tree.insert(x).unwrap();
        }

        fn post_order(node: Option<NodeRef<'_, i32>>, out: &mut Vec<i32>) {
            if let Some(node) = node {
                post_order(node.left(), out);
                post_order(node.right(), out);
                out.push(*node.payload());
            }
        }
        let mut expected = Vec::new();
        post_order(tree.root(), &mut expected);

        tree.free();

        assert_eq!(expected.len(), 17);
        assert_eq!(*released.borrow(), expected);
    }

    #[test]
    fn validate_catches_red_root() {
        let mut tree = tree_of(&[1, 2]);
        let root = tree.root.unwrap();
        tree.node_mut(root).color = Color::Red;

        assert_eq!(tree.validate(), Err(InvariantViolation::RedRoot));
    }

    #[test]
    fn validate_catches_black_height_mismatch() {
        let mut tree = tree_of(&[2, 1, 3]);
        let root = tree.root.unwrap();
        let left = tree.node(root).left.unwrap();
        tree.node_mut(left).color = Color::Black;

        assert_eq!(
            tree.validate(),
            Err(InvariantViolation::BlackHeight {
                depth: 0,
                left: 1,
                right: 0
            })
        );
    }

    #[test]
    fn validate_catches_red_red() {
        let mut tree = tree_of(&[20, 10, 30, 5]);
        let root = tree.root.unwrap();
        let left = tree.node(root).left.unwrap();
        let right = tree.node(root).right.unwrap();
        tree.node_mut(left).color = Color::Red;
        tree.node_mut(right).color = Color::Red;

        assert_eq!(
            tree.validate(),
            Err(InvariantViolation::RedRed { depth: 1 })
        );
    }

    #[test]
    fn debug_shows_structure() {
        let tree = tree_of(&[2, 1]);

        assert_eq!(
            format!("{:?}", tree),
            "Tree { len: 2, root: Some(Node { payload: 2, color: Black, \
             left: Some(Node { payload: 1, color: Red, left: None, right: None }), \
             right: None }) }"
        );
    }

    #[test]
    fn iter_reports_exact_len() {
        let tree = tree_of(&[4, 2, 6, 1, 3]);
        let mut iter = tree.iter();

        assert_eq!(iter.len(), 5);
        iter.next();
        assert_eq!(iter.len(), 4);
        assert_eq!((&tree).into_iter().count(), 5);
    }
}
