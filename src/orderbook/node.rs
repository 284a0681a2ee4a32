//! Order node for slab-based storage.
//!
//! ## Design
//!
//! `OrderNode` wraps an `Order` with doubly-linked list pointers so that an
//! order can be unlinked from its price level in O(1) given its slab key.
//!
//! ## Slab Integration
//!
//! Per official slab docs (https://docs.rs/slab/0.4.11):
//! - Keys are `usize` values returned by `slab.insert()`
//! - Keys may be reused after `slab.remove()`
//! - O(1) insert, remove, and lookup
//!
//! ## Linked List
//!
//! Orders at the same price form a doubly-linked list in arrival order:
//! - `next`: the next (newer) order at this price
//! - `prev`: the previous (older) order at this price

use crate::types::Order;

/// Slab key of a resting order inside a [`crate::orderbook::PriceTree`]
pub type OrderKey = usize;

/// Order node stored in the order slab.
///
/// The order is held by value; the book's id map refers to it by key.
#[derive(Debug, Clone)]
pub struct OrderNode {
    /// The resting order
    pub order: Order,

    /// Next order at the same price (slab key), None at the tail
    pub next: Option<OrderKey>,

    /// Previous order at the same price (slab key), None at the head
    pub prev: Option<OrderKey>,
}

impl OrderNode {
    /// Create a new, unlinked order node
    ///
    /// # Example
    ///
    /// ```
    /// use price_tree_book::orderbook::OrderNode;
    /// use price_tree_book::types::{Order, Side};
    ///
    /// let node = OrderNode::new(Order::new("A", 1, "X", 10.0, 5, Side::Bid));
    ///
    /// assert!(node.is_unlinked());
    /// assert_eq!(node.order_id(), "A");
    /// ```
    #[inline]
    pub fn new(order: Order) -> Self {
        Self {
            order,
            next: None,
            prev: None,
        }
    }

    /// Check if this node is unlinked (not part of a multi-order level)
    #[inline]
    pub fn is_unlinked(&self) -> bool {
        self.next.is_none() && self.prev.is_none()
    }

    #[inline]
    pub fn order_id(&self) -> &str {
        &self.order.order_id
    }

    #[inline]
    pub fn price(&self) -> f64 {
        self.order.price
    }

    #[inline]
    pub fn size(&self) -> u64 {
        self.order.size
    }

    /// Replace the resting size, returning the previous one
    #[inline]
    pub fn set_size(&mut self, size: u64) -> u64 {
        std::mem::replace(&mut self.order.size, size)
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Side;

    fn create_test_order(id: &str, price: f64, size: u64) -> Order {
        Order::new(id, 100, "XYZ", price, size, Side::Bid)
    }

    #[test]
    fn test_order_node_new() {
        let order = create_test_order("A", 10.0, 5);
        let node = OrderNode::new(order.clone());

        assert_eq!(node.order, order);
        assert!(node.next.is_none());
        assert!(node.prev.is_none());
        assert!(node.is_unlinked());
    }

    #[test]
    fn test_order_node_accessors() {
        let node = OrderNode::new(create_test_order("abc42", 12.5, 3));

        assert_eq!(node.order_id(), "abc42");
        assert_eq!(node.price(), 12.5);
        assert_eq!(node.size(), 3);
    }

    #[test]
    fn test_order_node_set_size() {
        let mut node = OrderNode::new(create_test_order("A", 10.0, 5));

        let previous = node.set_size(40);
        assert_eq!(previous, 5);
        assert_eq!(node.size(), 40);
        assert_eq!(node.price(), 10.0);
    }

    #[test]
    fn test_order_node_linking() {
        let mut node = OrderNode::new(create_test_order("A", 10.0, 5));

        node.next = Some(2);
        assert!(!node.is_unlinked());

        node.next = None;
        node.prev = Some(0);
        assert!(!node.is_unlinked());
    }
}
