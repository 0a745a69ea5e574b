//! Order-statistics tree.
//!
//! An AVL tree where every node also records the size of its subtree, which
//! gives O(log n) insertion and O(log n) lookup of the k-th smallest value.
//! Values are never removed.
//!
//! Equal values are routed left on insertion, so the in-order sequence stays
//! sorted with duplicates kept, and among equal values the one inserted last
//! comes first.

use crate::error::{EngineError, Result};
use std::cmp;

type Link<T> = Option<Box<Node<T>>>;

#[derive(Debug, Clone)]
struct Node<T> {
    value: T,
    left: Link<T>,
    right: Link<T>,
    /// Number of nodes in this subtree, this node included.
    size: usize,
    /// Longest path to a leaf, counted in nodes. An empty subtree has height 0.
    height: usize,
}

impl<T> Node<T> {
    fn leaf(value: T) -> Self {
        Node {
            value,
            left: None,
            right: None,
            size: 1,
            height: 1,
        }
    }

    /// Must be called whenever a child link changes; assumes both children
    /// are already up to date.
    fn recalculate(&mut self) {
        self.size = size(&self.left) + size(&self.right) + 1;
        self.height = cmp::max(height(&self.left), height(&self.right)) + 1;
    }

    fn balance(&self) -> isize {
        height(&self.right) as isize - height(&self.left) as isize
    }
}

fn size<T>(link: &Link<T>) -> usize {
    link.as_ref().map_or(0, |node| node.size)
}

fn height<T>(link: &Link<T>) -> usize {
    link.as_ref().map_or(0, |node| node.height)
}

fn insert_into<T: Ord>(link: Link<T>, value: T) -> Box<Node<T>> {
    let mut node = match link {
        None => return Box::new(Node::leaf(value)),
        Some(node) => node,
    };

    if value <= node.value {
        node.left = Some(insert_into(node.left.take(), value));
    } else {
        node.right = Some(insert_into(node.right.take(), value));
    }
    node.recalculate();
    rebalance(node)
}

/// Restores the AVL property at `node` and returns the new subtree root.
fn rebalance<T>(mut node: Box<Node<T>>) -> Box<Node<T>> {
    let balance = node.balance();
    debug_assert!(balance.abs() <= 2, "balance {} before rotation", balance);

    let root = match balance {
        -2 => {
            if node.left.as_ref().map_or(0, |left| left.balance()) == 1 {
                node.left = node.left.take().map(rotate_left);
            }
            rotate_right(node)
        }
        2 => {
            if node.right.as_ref().map_or(0, |right| right.balance()) == -1 {
                node.right = node.right.take().map(rotate_right);
            }
            rotate_left(node)
        }
        _ => node,
    };

    assert!(
        root.balance().abs() <= 1,
        "AVL invariant violated: balance {} after rebalancing",
        root.balance()
    );
    root
}

fn rotate_left<T>(mut node: Box<Node<T>>) -> Box<Node<T>> {
    // Safety: only called when the right subtree is two levels taller
    let mut root = node.right.take().expect("left rotation needs a right child");
    node.right = root.left.take();
    node.recalculate();
    root.left = Some(node);
    root.recalculate();
    root
}

fn rotate_right<T>(mut node: Box<Node<T>>) -> Box<Node<T>> {
    // Safety: only called when the left subtree is two levels taller
    let mut root = node.left.take().expect("right rotation needs a left child");
    node.left = root.right.take();
    node.recalculate();
    root.right = Some(node);
    root.recalculate();
    root
}

/// A height-balanced multiset supporting rank-indexed lookup.
///
/// # Examples
///
/// ```
/// use donation_analytics::OrderStatisticTree;
///
/// let mut tree = OrderStatisticTree::new();
/// for value in [100, 50, 75] {
///     tree.insert(value);
/// }
/// assert_eq!(tree.len(), 3);
/// assert_eq!(*tree.get_at(0).unwrap(), 50);
/// assert_eq!(tree.iter().copied().collect::<Vec<_>>(), vec![50, 75, 100]);
/// ```
#[derive(Debug, Clone)]
pub struct OrderStatisticTree<T> {
    root: Link<T>,
}

impl<T> OrderStatisticTree<T> {
    /// Creates an empty tree.
    pub fn new() -> Self {
        OrderStatisticTree { root: None }
    }

    /// Number of stored values, duplicates included. O(1).
    pub fn len(&self) -> usize {
        size(&self.root)
    }

    /// Returns `true` if nothing has been inserted yet.
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Height of the tree; 0 when empty.
    pub fn height(&self) -> usize {
        height(&self.root)
    }

    /// Returns the value at in-order position `rank`, where 0 is the smallest.
    ///
    /// Fails with [`EngineError::RankOutOfRange`] if `rank >= len()`.
    pub fn get_at(&self, rank: usize) -> Result<&T> {
        let total = self.len();
        if rank >= total {
            return Err(EngineError::RankOutOfRange { rank, size: total });
        }

        let mut link = &self.root;
        let mut remaining = rank;
        while let Some(node) = link {
            let left_size = size(&node.left);
            match remaining.cmp(&left_size) {
                cmp::Ordering::Less => link = &node.left,
                cmp::Ordering::Equal => return Ok(&node.value),
                cmp::Ordering::Greater => {
                    remaining -= left_size + 1;
                    link = &node.right;
                }
            }
        }

        // Sizes are consistent, so the walk always ends on a node.
        Err(EngineError::RankOutOfRange { rank, size: total })
    }

    /// Ascending traversal over all stored values.
    pub fn iter(&self) -> Iter<'_, T> {
        let mut iter = Iter {
            stack: Vec::with_capacity(self.height()),
            remaining: self.len(),
        };
        iter.push_left_spine(&self.root);
        iter
    }
}

impl<T: Ord> OrderStatisticTree<T> {
    /// Inserts `value`, rebalancing the path back to the root.
    pub fn insert(&mut self, value: T) {
        self.root = Some(insert_into(self.root.take(), value));
    }
}

impl<T> Default for OrderStatisticTree<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Ord> Extend<T> for OrderStatisticTree<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.insert(value);
        }
    }
}

impl<T: Ord> FromIterator<T> for OrderStatisticTree<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut tree = OrderStatisticTree::new();
        tree.extend(iter);
        tree
    }
}

impl<'a, T> IntoIterator for &'a OrderStatisticTree<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// In-order iterator returned by [`OrderStatisticTree::iter`].
pub struct Iter<'a, T> {
    stack: Vec<&'a Node<T>>,
    remaining: usize,
}

impl<'a, T> Iter<'a, T> {
    fn push_left_spine(&mut self, mut link: &'a Link<T>) {
        while let Some(node) = link {
            self.stack.push(node);
            link = &node.left;
        }
    }
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.push_left_spine(&node.right);
        self.remaining -= 1;
        Some(&node.value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}
