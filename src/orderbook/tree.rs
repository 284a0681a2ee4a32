//! Red-black price index.
//!
//! ## Architecture
//!
//! `PriceTree` is a red-black tree keyed by price. Each tree node owns a
//! [`PriceLevel`] holding every live order at that exact price, so adding a
//! second order at a known price never touches the tree shape.
//!
//! Two slabs back the tree:
//!
//! - **nodes**: `Slab<PriceNode>`; `parent`/`left`/`right` are slab keys, so
//!   rotations are key reassignment rather than pointer surgery
//! - **orders**: `Slab<OrderNode>`; orders are stored by value and linked
//!   into their level's FIFO
//!
//! An absent child (`None`) plays the role of the black leaf sentinel.
//!
//! ## Complexity
//!
//! | Operation | Complexity |
//! |-----------|------------|
//! | Insert at new price | O(log n) |
//! | Insert at existing price | O(log n) lookup, O(1) append |
//! | Remove order | O(log n) |
//! | Update size | O(log n) |
//! | Minimum / maximum price | O(log n) |
//!
//! ## Example
//!
//! ```
//! use price_tree_book::orderbook::PriceTree;
//! use price_tree_book::types::{Order, Side};
//!
//! let mut tree = PriceTree::new();
//! let a = tree.insert(Order::new("A", 1, "X", 10.0, 5, Side::Bid));
//! tree.insert(Order::new("B", 2, "X", 12.0, 3, Side::Bid));
//!
//! assert_eq!(tree.maximum_price(), 12.0);
//! assert_eq!(tree.minimum_price(), 10.0);
//!
//! tree.remove(10.0, a).unwrap();
//! assert_eq!(tree.minimum_price(), 12.0);
//! ```

use std::cmp::Ordering;

use slab::Slab;
use tracing::debug;

use crate::orderbook::error::{InvariantViolation, PriceTreeError};
use crate::orderbook::{OrderKey, OrderNode, PriceLevel};
use crate::types::price::{cmp_prices, same_price, EMPTY_SIDE_PRICE};
use crate::types::Order;

/// Slab key of a tree node
pub type NodeKey = usize;

/// Node colour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    Red,
    Black,
}

/// A tree node: one price and the orders resting at it.
#[derive(Debug, Clone)]
pub struct PriceNode {
    pub color: Color,

    /// Unique within the tree
    pub price: f64,

    /// Orders at this price; never empty while the node is in the tree
    pub level: PriceLevel,

    /// Back-reference used by rotations and traversal
    pub parent: Option<NodeKey>,
    pub left: Option<NodeKey>,
    pub right: Option<NodeKey>,
}

impl PriceNode {
    fn new(price: f64, parent: Option<NodeKey>) -> Self {
        Self {
            color: Color::Red,
            price,
            level: PriceLevel::new(),
            parent,
            left: None,
            right: None,
        }
    }
}

/// Red-black tree of price levels for one side of one ticker.
#[derive(Debug, Clone, Default)]
pub struct PriceTree {
    nodes: Slab<PriceNode>,
    orders: Slab<OrderNode>,
    root: Option<NodeKey>,
}

impl PriceTree {
    /// Create an empty tree
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty tree with pre-allocated arenas
    ///
    /// # Arguments
    ///
    /// * `levels` - Number of distinct prices to pre-allocate
    /// * `orders` - Number of resting orders to pre-allocate
    pub fn with_capacity(levels: usize, orders: usize) -> Self {
        Self {
            nodes: Slab::with_capacity(levels),
            orders: Slab::with_capacity(orders),
            root: None,
        }
    }

    // ========================================================================
    // Size and Inspection
    // ========================================================================

    /// Number of resting orders
    #[inline]
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    /// Number of distinct prices
    #[inline]
    pub fn level_count(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Root node key, None for an empty tree
    #[inline]
    pub fn root(&self) -> Option<NodeKey> {
        self.root
    }

    /// Look up a node by key
    #[inline]
    pub fn node(&self, key: NodeKey) -> Option<&PriceNode> {
        self.nodes.get(key)
    }

    /// Look up a resting order by key
    #[inline]
    pub fn order(&self, key: OrderKey) -> Option<&Order> {
        self.orders.get(key).map(|node| &node.order)
    }

    /// The level at exactly `price`
    pub fn level(&self, price: f64) -> Option<&PriceLevel> {
        self.find(price).map(|node| &self.nodes[node].level)
    }

    /// Orders resting at exactly `price`, oldest first
    pub fn orders_at(&self, price: f64) -> impl Iterator<Item = &Order> + '_ {
        self.level(price)
            .into_iter()
            .flat_map(move |level| self.level_orders(level))
    }

    /// Orders of a level obtained from this tree, oldest first
    pub fn level_orders<'a>(&'a self, level: &'a PriceLevel) -> impl Iterator<Item = &'a Order> + 'a {
        level
            .keys(&self.orders)
            .filter_map(move |key| self.orders.get(key))
            .map(|node| &node.order)
    }

    /// Iterate levels in ascending price order
    pub fn levels(&self) -> Levels<'_> {
        Levels {
            tree: self,
            cursor: self.root.map(|root| self.minimum_node(root)),
        }
    }

    /// Number of nodes on the longest root-to-leaf path
    pub fn height(&self) -> usize {
        fn walk(nodes: &Slab<PriceNode>, key: Option<NodeKey>) -> usize {
            match key.and_then(|k| nodes.get(k)) {
                Some(node) => 1 + walk(nodes, node.left).max(walk(nodes, node.right)),
                None => 0,
            }
        }
        walk(&self.nodes, self.root)
    }

    // ========================================================================
    // Best Prices
    // ========================================================================

    /// Lowest price in the tree, or 0.0 when empty
    ///
    /// An empty tree and a best price of exactly zero read the same.
    pub fn minimum_price(&self) -> f64 {
        self.root
            .map(|root| self.nodes[self.minimum_node(root)].price)
            .unwrap_or(EMPTY_SIDE_PRICE)
    }

    /// Highest price in the tree, or 0.0 when empty
    pub fn maximum_price(&self) -> f64 {
        self.root
            .map(|root| self.nodes[self.maximum_node(root)].price)
            .unwrap_or(EMPTY_SIDE_PRICE)
    }

    // ========================================================================
    // Mutation
    // ========================================================================

    /// Insert an order.
    ///
    /// Joins the existing level at the order's price, or creates a new red
    /// node and rebalances. Always succeeds.
    ///
    /// # Returns
    ///
    /// The order's slab key, used by [`remove`](Self::remove) and
    /// [`update_size`](Self::update_size)
    pub fn insert(&mut self, order: Order) -> OrderKey {
        let price = order.price;
        let key = self.orders.insert(OrderNode::new(order));

        let mut parent = None;
        let mut current = self.root;
        let mut went_left = false;

        while let Some(node) = current {
            parent = Some(node);
            match cmp_prices(price, self.nodes[node].price) {
                Ordering::Less => {
                    went_left = true;
                    current = self.nodes[node].left;
                }
                Ordering::Greater => {
                    went_left = false;
                    current = self.nodes[node].right;
                }
                Ordering::Equal => {
                    self.nodes[node].level.push_back(key, &mut self.orders);
                    return key;
                }
            }
        }

        let mut fresh = PriceNode::new(price, parent);
        fresh.level.push_back(key, &mut self.orders);
        let new_node = self.nodes.insert(fresh);

        match parent {
            None => self.root = Some(new_node),
            Some(p) if went_left => self.nodes[p].left = Some(new_node),
            Some(p) => self.nodes[p].right = Some(new_node),
        }

        debug!(price, levels = self.nodes.len(), "price level created");
        self.insert_fixup(new_node);
        key
    }

    /// Remove the order with `key` resting at `price`.
    ///
    /// If other orders share the price only this order leaves the level;
    /// otherwise the node is deleted and the tree rebalanced.
    ///
    /// # Errors
    ///
    /// * `NodeNotFound` - no level at `price`
    /// * `OrderNotFound` - the level exists but `key` is not in it
    pub fn remove(&mut self, price: f64, key: OrderKey) -> Result<Order, PriceTreeError> {
        let node = self.locate(price, key)?;

        self.nodes[node].level.unlink(key, &mut self.orders);
        let removed = self.orders.remove(key).order;

        if self.nodes[node].level.is_empty() {
            self.delete_node(node);
            debug!(price, levels = self.nodes.len(), "price level removed");
        }

        Ok(removed)
    }

    /// Set the size of the order with `key` resting at `price`.
    ///
    /// Price ordering is unaffected.
    ///
    /// # Returns
    ///
    /// The previous size
    ///
    /// # Errors
    ///
    /// Same as [`remove`](Self::remove)
    pub fn update_size(
        &mut self,
        price: f64,
        key: OrderKey,
        size: u64,
    ) -> Result<u64, PriceTreeError> {
        let node = self.locate(price, key)?;

        let previous = self.orders[key].set_size(size);
        self.nodes[node].level.resize(previous, size);
        Ok(previous)
    }

    // ========================================================================
    // Lookup Helpers
    // ========================================================================

    /// Exact-price node lookup
    fn find(&self, price: f64) -> Option<NodeKey> {
        let mut current = self.root;
        while let Some(node) = current {
            current = match cmp_prices(price, self.nodes[node].price) {
                Ordering::Less => self.nodes[node].left,
                Ordering::Greater => self.nodes[node].right,
                Ordering::Equal => return Some(node),
            };
        }
        None
    }

    /// Node holding `key` at `price`
    fn locate(&self, price: f64, key: OrderKey) -> Result<NodeKey, PriceTreeError> {
        let node = self
            .find(price)
            .ok_or(PriceTreeError::NodeNotFound { price })?;

        match self.orders.get(key) {
            Some(order) if same_price(order.price(), price) => Ok(node),
            _ => Err(PriceTreeError::OrderNotFound { price, key }),
        }
    }

    fn minimum_node(&self, mut node: NodeKey) -> NodeKey {
        while let Some(left) = self.nodes[node].left {
            node = left;
        }
        node
    }

    fn maximum_node(&self, mut node: NodeKey) -> NodeKey {
        while let Some(right) = self.nodes[node].right {
            node = right;
        }
        node
    }

    /// In-order successor via parent links
    fn successor(&self, node: NodeKey) -> Option<NodeKey> {
        if let Some(right) = self.nodes[node].right {
            return Some(self.minimum_node(right));
        }

        let mut child = node;
        let mut parent = self.nodes[node].parent;
        while let Some(p) = parent {
            if self.nodes[p].right != Some(child) {
                break;
            }
            child = p;
            parent = self.nodes[p].parent;
        }
        parent
    }

    // ========================================================================
    // Red-Black Machinery
    // ========================================================================

    /// Absent children count as black leaves
    #[inline]
    fn color(&self, node: Option<NodeKey>) -> Color {
        node.map_or(Color::Black, |n| self.nodes[n].color)
    }

    #[inline]
    fn set_color(&mut self, node: Option<NodeKey>, color: Color) {
        if let Some(n) = node {
            self.nodes[n].color = color;
        }
    }

    #[inline]
    fn parent(&self, node: NodeKey) -> Option<NodeKey> {
        self.nodes[node].parent
    }

    #[inline]
    fn left(&self, node: NodeKey) -> Option<NodeKey> {
        self.nodes[node].left
    }

    #[inline]
    fn right(&self, node: NodeKey) -> Option<NodeKey> {
        self.nodes[node].right
    }

    /// Re-point `old`'s parent (or the root) at `new`
    fn replace_child(&mut self, parent: Option<NodeKey>, old: NodeKey, new: Option<NodeKey>) {
        match parent {
            None => self.root = new,
            Some(p) if self.nodes[p].left == Some(old) => self.nodes[p].left = new,
            Some(p) => self.nodes[p].right = new,
        }
    }

    /// Left rotation at `x`; `x.right` must exist
    ///
    /// ```text
    ///     x                y
    ///    / \              / \
    ///   a   y     =>     x   c
    ///      / \          / \
    ///     b   c        a   b
    /// ```
    fn rotate_left(&mut self, x: NodeKey) {
        let Some(y) = self.right(x) else {
            return;
        };

        let inner = self.left(y);
        self.nodes[x].right = inner;
        if let Some(b) = inner {
            self.nodes[b].parent = Some(x);
        }

        let parent = self.parent(x);
        self.nodes[y].parent = parent;
        self.replace_child(parent, x, Some(y));

        self.nodes[y].left = Some(x);
        self.nodes[x].parent = Some(y);
    }

    /// Mirror of [`rotate_left`](Self::rotate_left); `x.left` must exist
    fn rotate_right(&mut self, x: NodeKey) {
        let Some(y) = self.left(x) else {
            return;
        };

        let inner = self.right(y);
        self.nodes[x].left = inner;
        if let Some(b) = inner {
            self.nodes[b].parent = Some(x);
        }

        let parent = self.parent(x);
        self.nodes[y].parent = parent;
        self.replace_child(parent, x, Some(y));

        self.nodes[y].right = Some(x);
        self.nodes[x].parent = Some(y);
    }

    /// Restore the red-black properties after attaching red node `z`
    fn insert_fixup(&mut self, mut z: NodeKey) {
        while let Some(parent) = self.parent(z) {
            // Parent black: nothing violated
            if self.nodes[parent].color == Color::Black {
                break;
            }

            // Red parent at the root: blacken it
            let Some(grandparent) = self.parent(parent) else {
                self.nodes[parent].color = Color::Black;
                break;
            };

            let parent_is_left = self.left(grandparent) == Some(parent);
            let uncle = if parent_is_left {
                self.right(grandparent)
            } else {
                self.left(grandparent)
            };

            // Red uncle: push the blackness down from the grandparent
            if self.color(uncle) == Color::Red {
                self.nodes[parent].color = Color::Black;
                self.set_color(uncle, Color::Black);
                self.nodes[grandparent].color = Color::Red;
                z = grandparent;
                continue;
            }

            // Black uncle, inner grandchild: rotate into the outer shape
            // z and parent swap roles: z now sits between grandparent and parent
            let mut parent = parent;
            if parent_is_left && self.right(parent) == Some(z) {
                self.rotate_left(parent);
                parent = z;
            } else if !parent_is_left && self.left(parent) == Some(z) {
                self.rotate_right(parent);
                parent = z;
            }

            // Black uncle, outer grandchild
            if parent_is_left {
                self.rotate_right(grandparent);
            } else {
                self.rotate_left(grandparent);
            }
            self.nodes[parent].color = Color::Black;
            self.nodes[grandparent].color = Color::Red;
            break;
        }

        if let Some(root) = self.root {
            self.nodes[root].color = Color::Black;
        }
    }

    /// Unlink node `z` from the tree, free it, and rebalance
    fn delete_node(&mut self, z: NodeKey) {
        let mut spliced_color = self.nodes[z].color;
        let replacement;
        let replacement_parent;

        match (self.left(z), self.right(z)) {
            (None, right) => {
                replacement = right;
                replacement_parent = self.parent(z);
                self.transplant(z, right);
            }
            (left @ Some(_), None) => {
                replacement = left;
                replacement_parent = self.parent(z);
                self.transplant(z, left);
            }
            (Some(left), Some(right)) => {
                // Promote the in-order successor into z's position
                let successor = self.minimum_node(right);
                spliced_color = self.nodes[successor].color;
                replacement = self.right(successor);

                if self.parent(successor) == Some(z) {
                    replacement_parent = Some(successor);
                } else {
                    replacement_parent = self.parent(successor);
                    self.transplant(successor, replacement);
                    self.nodes[successor].right = Some(right);
                    self.nodes[right].parent = Some(successor);
                }

                self.transplant(z, Some(successor));
                self.nodes[successor].left = Some(left);
                self.nodes[left].parent = Some(successor);
                self.nodes[successor].color = self.nodes[z].color;
            }
        }

        self.nodes.remove(z);

        if spliced_color == Color::Black {
            self.delete_fixup(replacement, replacement_parent);
        }
    }

    /// Replace the subtree rooted at `u` with the one rooted at `v`
    fn transplant(&mut self, u: NodeKey, v: Option<NodeKey>) {
        let parent = self.parent(u);
        self.replace_child(parent, u, v);
        if let Some(v) = v {
            self.nodes[v].parent = parent;
        }
    }

    /// Restore black height after splicing out a black node.
    ///
    /// `x` carries an extra black and may be absent, so its parent is
    /// tracked alongside it.
    fn delete_fixup(&mut self, mut x: Option<NodeKey>, mut parent: Option<NodeKey>) {
        while x != self.root && self.color(x) == Color::Black {
            let Some(p) = parent else {
                break;
            };

            if x == self.left(p) {
                let Some(mut sibling) = self.right(p) else {
                    break;
                };

                // Red sibling: rotate so the sibling is black
                if self.nodes[sibling].color == Color::Red {
                    self.nodes[sibling].color = Color::Black;
                    self.nodes[p].color = Color::Red;
                    self.rotate_left(p);
                    match self.right(p) {
                        Some(s) => sibling = s,
                        None => break,
                    }
                }

                let near = self.left(sibling);
                let far = self.right(sibling);

                // Black sibling, two black nephews: recolour and ascend
                if self.color(near) == Color::Black && self.color(far) == Color::Black {
                    self.nodes[sibling].color = Color::Red;
                    x = Some(p);
                    parent = self.parent(p);
                    continue;
                }

                // Near nephew red: rotate it into the far position
                if self.color(far) == Color::Black {
                    self.set_color(near, Color::Black);
                    self.nodes[sibling].color = Color::Red;
                    self.rotate_right(sibling);
                    match self.right(p) {
                        Some(s) => sibling = s,
                        None => break,
                    }
                }

                // Far nephew red: rotate at the parent and stop
                self.nodes[sibling].color = self.nodes[p].color;
                self.nodes[p].color = Color::Black;
                let far = self.right(sibling);
                self.set_color(far, Color::Black);
                self.rotate_left(p);
                x = self.root;
                parent = None;
            } else {
                let Some(mut sibling) = self.left(p) else {
                    break;
                };

                if self.nodes[sibling].color == Color::Red {
                    self.nodes[sibling].color = Color::Black;
                    self.nodes[p].color = Color::Red;
                    self.rotate_right(p);
                    match self.left(p) {
                        Some(s) => sibling = s,
                        None => break,
                    }
                }

                let near = self.right(sibling);
                let far = self.left(sibling);

                if self.color(near) == Color::Black && self.color(far) == Color::Black {
                    self.nodes[sibling].color = Color::Red;
                    x = Some(p);
                    parent = self.parent(p);
                    continue;
                }

                if self.color(far) == Color::Black {
                    self.set_color(near, Color::Black);
                    self.nodes[sibling].color = Color::Red;
                    self.rotate_left(sibling);
                    match self.left(p) {
                        Some(s) => sibling = s,
                        None => break,
                    }
                }

                self.nodes[sibling].color = self.nodes[p].color;
                self.nodes[p].color = Color::Black;
                let far = self.left(sibling);
                self.set_color(far, Color::Black);
                self.rotate_right(p);
                x = self.root;
                parent = None;
            }
        }

        self.set_color(x, Color::Black);
    }

    // ========================================================================
    // Invariant Checking
    // ========================================================================

    /// Verify the search-tree and red-black properties.
    ///
    /// Checks price ordering, parent back-links, root colour, the red-red
    /// rule, equal black height on every path, that every level is non-empty
    /// and agrees with its orders, and that no arena node is unreachable.
    ///
    /// # Returns
    ///
    /// The black height of the tree (absent leaves not counted)
    pub fn check_invariants(&self) -> Result<usize, InvariantViolation> {
        let Some(root) = self.root else {
            if self.nodes.is_empty() {
                return Ok(0);
            }
            return Err(InvariantViolation::NodeCount {
                reachable: 0,
                stored: self.nodes.len(),
            });
        };

        let root_node = self
            .nodes
            .get(root)
            .ok_or(InvariantViolation::Dangling { node: root })?;
        if root_node.color == Color::Red {
            return Err(InvariantViolation::RedRoot);
        }
        if root_node.parent.is_some() {
            return Err(InvariantViolation::RootHasParent);
        }

        let mut reachable = 0;
        let black_height = self.check_subtree(root, None, None, &mut reachable)?;

        if reachable != self.nodes.len() {
            return Err(InvariantViolation::NodeCount {
                reachable,
                stored: self.nodes.len(),
            });
        }

        Ok(black_height)
    }

    fn check_subtree(
        &self,
        key: NodeKey,
        lower: Option<f64>,
        upper: Option<f64>,
        reachable: &mut usize,
    ) -> Result<usize, InvariantViolation> {
        let node = self
            .nodes
            .get(key)
            .ok_or(InvariantViolation::Dangling { node: key })?;
        *reachable += 1;

        let above_lower = lower.map_or(true, |lo| cmp_prices(node.price, lo) == Ordering::Greater);
        let below_upper = upper.map_or(true, |hi| cmp_prices(node.price, hi) == Ordering::Less);
        if !above_lower || !below_upper {
            return Err(InvariantViolation::Ordering { node: key });
        }

        self.check_level(key, node)?;

        let mut heights = [0usize; 2];
        for (slot, child) in [node.left, node.right].into_iter().enumerate() {
            let Some(child) = child else {
                continue;
            };
            let child_node = self
                .nodes
                .get(child)
                .ok_or(InvariantViolation::Dangling { node: child })?;

            if child_node.parent != Some(key) {
                return Err(InvariantViolation::ParentLink { parent: key, child });
            }
            if node.color == Color::Red && child_node.color == Color::Red {
                return Err(InvariantViolation::RedRed { node: key });
            }

            heights[slot] = if slot == 0 {
                self.check_subtree(child, lower, Some(node.price), reachable)?
            } else {
                self.check_subtree(child, Some(node.price), upper, reachable)?
            };
        }

        if heights[0] != heights[1] {
            return Err(InvariantViolation::BlackHeight {
                node: key,
                left: heights[0],
                right: heights[1],
            });
        }

        Ok(heights[0] + usize::from(node.color == Color::Black))
    }

    fn check_level(&self, key: NodeKey, node: &PriceNode) -> Result<(), InvariantViolation> {
        if node.level.is_empty() {
            return Err(InvariantViolation::EmptyLevel { node: key });
        }

        let mut count = 0usize;
        let mut total = 0u64;
        for order_key in node.level.keys(&self.orders) {
            let order = self
                .orders
                .get(order_key)
                .ok_or(InvariantViolation::LevelMismatch { node: key })?;
            if !same_price(order.price(), node.price) {
                return Err(InvariantViolation::LevelMismatch { node: key });
            }
            count += 1;
            total = total.saturating_add(order.size());
        }

        if count != node.level.order_count || total != node.level.total_size {
            return Err(InvariantViolation::LevelMismatch { node: key });
        }
        Ok(())
    }
}

/// In-order iterator over `(price, level)` pairs
pub struct Levels<'a> {
    tree: &'a PriceTree,
    cursor: Option<NodeKey>,
}

impl<'a> Iterator for Levels<'a> {
    type Item = (f64, &'a PriceLevel);

    fn next(&mut self) -> Option<Self::Item> {
        let key = self.cursor?;
        self.cursor = self.tree.successor(key);
        let node = &self.tree.nodes[key];
        Some((node.price, &node.level))
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Side;

    fn order(id: &str, price: f64, size: u64) -> Order {
        Order::new(id, 0, "XYZ", price, size, Side::Bid)
    }

    fn prices(tree: &PriceTree) -> Vec<f64> {
        tree.levels().map(|(price, _)| price).collect()
    }

    #[test]
    fn test_empty_tree() {
        let tree = PriceTree::new();

        assert!(tree.is_empty());
        assert_eq!(tree.len(), 0);
        assert_eq!(tree.level_count(), 0);
        assert_eq!(tree.minimum_price(), 0.0);
        assert_eq!(tree.maximum_price(), 0.0);
        assert_eq!(tree.check_invariants(), Ok(0));
        assert_eq!(tree.levels().count(), 0);
    }

    #[test]
    fn test_insert_single_is_black_root() {
        let mut tree = PriceTree::new();
        tree.insert(order("A", 10.0, 5));

        let root = tree.node(tree.root().unwrap()).unwrap();
        assert_eq!(root.color, Color::Black);
        assert_eq!(root.price, 10.0);
        assert!(root.left.is_none());
        assert!(root.right.is_none());
        assert_eq!(tree.check_invariants(), Ok(1));
    }

    #[test]
    fn test_insert_ascending_rebalances() {
        let mut tree = PriceTree::new();
        for i in 0..3 {
            tree.insert(order(&format!("o{i}"), i as f64, 1));
        }

        // Outer-grandchild case: rotation at the grandparent
        let root = tree.node(tree.root().unwrap()).unwrap();
        assert_eq!(root.price, 1.0);
        assert_eq!(tree.node(root.left.unwrap()).unwrap().color, Color::Red);
        assert_eq!(tree.node(root.right.unwrap()).unwrap().color, Color::Red);
        assert!(tree.check_invariants().is_ok());
    }

    #[test]
    fn test_insert_inner_grandchild() {
        let mut tree = PriceTree::new();
        tree.insert(order("A", 10.0, 1));
        tree.insert(order("B", 5.0, 1));
        tree.insert(order("C", 7.0, 1));

        let root = tree.node(tree.root().unwrap()).unwrap();
        assert_eq!(root.price, 7.0);
        assert_eq!(prices(&tree), vec![5.0, 7.0, 10.0]);
        assert!(tree.check_invariants().is_ok());
    }

    #[test]
    fn test_insert_many_stays_balanced() {
        let mut tree = PriceTree::new();
        for i in 0..1024 {
            tree.insert(order(&format!("o{i}"), i as f64, 1));
            assert!(tree.check_invariants().is_ok());
        }

        // Red-black height bound: 2 * log2(n + 1)
        assert!(tree.height() <= 20);
        assert_eq!(tree.minimum_price(), 0.0);
        assert_eq!(tree.maximum_price(), 1023.0);
    }

    #[test]
    fn test_same_price_aggregates() {
        let mut tree = PriceTree::new();
        tree.insert(order("A", 10.0, 5));
        tree.insert(order("B", 10.0, 3));
        tree.insert(order("C", 10.0, 2));

        assert_eq!(tree.level_count(), 1);
        assert_eq!(tree.len(), 3);

        let level = tree.level(10.0).unwrap();
        assert_eq!(level.order_count, 3);
        assert_eq!(level.total_size, 10);

        let ids: Vec<_> = tree.orders_at(10.0).map(|o| o.order_id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_remove_one_of_many_keeps_node() {
        let mut tree = PriceTree::new();
        let a = tree.insert(order("A", 10.0, 5));
        tree.insert(order("B", 10.0, 3));

        let removed = tree.remove(10.0, a).unwrap();
        assert_eq!(removed.order_id, "A");

        assert_eq!(tree.level_count(), 1);
        assert_eq!(tree.level(10.0).unwrap().total_size, 3);
        assert_eq!(tree.maximum_price(), 10.0);
        assert!(tree.check_invariants().is_ok());
    }

    #[test]
    fn test_remove_last_order_deletes_node() {
        let mut tree = PriceTree::new();
        let a = tree.insert(order("A", 10.0, 5));
        let b = tree.insert(order("B", 12.0, 3));

        tree.remove(12.0, b).unwrap();
        assert_eq!(tree.maximum_price(), 10.0);
        assert!(tree.check_invariants().is_ok());

        tree.remove(10.0, a).unwrap();
        assert!(tree.is_empty());
        assert_eq!(tree.level_count(), 0);
        assert_eq!(tree.maximum_price(), 0.0);
    }

    #[test]
    fn test_remove_node_with_two_children() {
        let mut tree = PriceTree::new();
        let mut keys = Vec::new();
        for (i, price) in [50.0, 30.0, 70.0, 20.0, 40.0, 60.0, 80.0, 65.0].iter().enumerate() {
            keys.push((*price, tree.insert(order(&format!("o{i}"), *price, 1))));
        }

        // 70.0 has two children and its successor 80.0 is its direct right child
        let (_, k70) = keys[2];
        tree.remove(70.0, k70).unwrap();
        assert!(tree.check_invariants().is_ok());
        assert_eq!(prices(&tree), vec![20.0, 30.0, 40.0, 50.0, 60.0, 65.0, 80.0]);

        // Root removal promotes the successor from deeper in the right subtree
        let (_, k50) = keys[0];
        tree.remove(50.0, k50).unwrap();
        assert!(tree.check_invariants().is_ok());
        assert_eq!(prices(&tree), vec![20.0, 30.0, 40.0, 60.0, 65.0, 80.0]);
    }

    #[test]
    fn test_remove_errors() {
        let mut tree = PriceTree::new();
        let a = tree.insert(order("A", 10.0, 5));
        let b = tree.insert(order("B", 11.0, 5));

        assert_eq!(
            tree.remove(9.0, a),
            Err(PriceTreeError::NodeNotFound { price: 9.0 })
        );
        // Level exists but holds a different order
        assert_eq!(
            tree.remove(10.0, b),
            Err(PriceTreeError::OrderNotFound { price: 10.0, key: b })
        );
        // Vacant key
        assert_eq!(
            tree.remove(10.0, 999),
            Err(PriceTreeError::OrderNotFound { price: 10.0, key: 999 })
        );
        assert_eq!(tree.len(), 2);
        assert!(tree.check_invariants().is_ok());
    }

    #[test]
    fn test_find_is_exact() {
        let mut tree = PriceTree::new();
        let a = tree.insert(order("A", 0.3, 1));

        assert!(tree.level(0.1 + 0.2).is_none());
        assert_eq!(
            tree.remove(0.1 + 0.2, a),
            Err(PriceTreeError::NodeNotFound { price: 0.1 + 0.2 })
        );

        tree.insert(order("B", 0.1 + 0.2, 1));
        assert_eq!(tree.level_count(), 2);
    }

    #[test]
    fn test_update_size() {
        let mut tree = PriceTree::new();
        let a = tree.insert(order("A", 10.0, 5));
        tree.insert(order("B", 10.0, 3));

        assert_eq!(tree.update_size(10.0, a, 20), Ok(5));
        assert_eq!(tree.order(a).unwrap().size, 20);
        assert_eq!(tree.level(10.0).unwrap().total_size, 23);

        assert_eq!(
            tree.update_size(11.0, a, 1),
            Err(PriceTreeError::NodeNotFound { price: 11.0 })
        );
        assert!(tree.check_invariants().is_ok());
    }

    #[test]
    fn test_remove_all_in_mixed_order() {
        let mut tree = PriceTree::new();
        let mut keys = Vec::new();
        for i in 0..200u32 {
            // Scatter prices so removal hits every fixup case
            let price = f64::from((i * 37) % 200);
            keys.push((price, tree.insert(order(&format!("o{i}"), price, 1))));
        }

        for (n, (price, key)) in keys.iter().enumerate().filter(|(n, _)| n % 2 == 0) {
            tree.remove(*price, *key).unwrap();
            assert!(tree.check_invariants().is_ok(), "after removal {n}");
        }
        for (price, key) in keys.iter().skip(1).step_by(2) {
            tree.remove(*price, *key).unwrap();
            assert!(tree.check_invariants().is_ok());
        }

        assert!(tree.is_empty());
        assert_eq!(tree.minimum_price(), 0.0);
    }

    #[test]
    fn test_levels_ascending() {
        let mut tree = PriceTree::new();
        for (i, price) in [5.5, 1.25, 9.0, 3.0, 7.75].iter().enumerate() {
            tree.insert(order(&format!("o{i}"), *price, i as u64 + 1));
        }

        assert_eq!(prices(&tree), vec![1.25, 3.0, 5.5, 7.75, 9.0]);
    }
}
