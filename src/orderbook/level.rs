//! Orders resting at a single price.
//!
//! ## Design
//!
//! A `PriceLevel` is the payload of one red-black tree node: every live
//! order at that exact price, kept in a doubly-linked list in arrival order.
//!
//! ## Queue Structure
//!
//! ```text
//! head (oldest) <-> order2 <-> order3 <-> tail (newest)
//! ```
//!
//! - New orders are appended at the tail
//! - Any order can be removed in O(1) using its slab key
//! - Arrival order is bookkeeping only; nothing matches against it

use slab::Slab;

use crate::orderbook::{OrderKey, OrderNode};

/// Orders at a single price.
///
/// The order data lives in the slab; this struct only holds the queue
/// metadata and the aggregate size.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriceLevel {
    /// Sum of the sizes of all orders at this level
    pub total_size: u64,

    /// Oldest order (slab key)
    pub head: Option<OrderKey>,

    /// Newest order (slab key)
    pub tail: Option<OrderKey>,

    /// Number of orders at this level
    pub order_count: usize,
}

impl PriceLevel {
    /// Create a new empty price level
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if the price level is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.order_count == 0
    }

    /// Append an order to the tail of the queue
    ///
    /// Returns false if `key` is not occupied in `slab`.
    pub fn push_back(&mut self, key: OrderKey, slab: &mut Slab<OrderNode>) -> bool {
        let Some(node) = slab.get_mut(key) else {
            return false;
        };
        let size = node.size();

        node.prev = self.tail;
        node.next = None;

        match self.tail.and_then(|tail| slab.get_mut(tail)) {
            Some(tail_node) => tail_node.next = Some(key),
            None => self.head = Some(key),
        }

        self.tail = Some(key);
        self.order_count += 1;
        self.total_size = self.total_size.saturating_add(size);
        true
    }

    /// Unlink an order from the queue by slab key
    ///
    /// The node stays in the slab; the caller removes it.
    ///
    /// # Returns
    ///
    /// The size of the unlinked order, or None if `key` is vacant
    pub fn unlink(&mut self, key: OrderKey, slab: &mut Slab<OrderNode>) -> Option<u64> {
        let node = slab.get(key)?;
        let size = node.size();
        let prev_key = node.prev;
        let next_key = node.next;

        match prev_key.and_then(|prev| slab.get_mut(prev)) {
            Some(prev_node) => prev_node.next = next_key,
            None => self.head = next_key,
        }

        match next_key.and_then(|next| slab.get_mut(next)) {
            Some(next_node) => next_node.prev = prev_key,
            None => self.tail = prev_key,
        }

        if let Some(node) = slab.get_mut(key) {
            node.prev = None;
            node.next = None;
        }

        self.order_count -= 1;
        self.total_size = self.total_size.saturating_sub(size);

        Some(size)
    }

    /// Record that an order's size changed from `old` to `new`
    pub fn resize(&mut self, old: u64, new: u64) {
        self.total_size = self.total_size.saturating_sub(old).saturating_add(new);
    }

    /// Iterate the slab keys of this level, oldest first
    pub fn keys<'a>(&self, slab: &'a Slab<OrderNode>) -> LevelKeys<'a> {
        LevelKeys {
            slab,
            cursor: self.head,
        }
    }
}

/// Iterator over the order keys of a [`PriceLevel`]
pub struct LevelKeys<'a> {
    slab: &'a Slab<OrderNode>,
    cursor: Option<OrderKey>,
}

impl Iterator for LevelKeys<'_> {
    type Item = OrderKey;

    fn next(&mut self) -> Option<Self::Item> {
        let key = self.cursor?;
        self.cursor = self.slab.get(key).and_then(|node| node.next);
        Some(key)
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
