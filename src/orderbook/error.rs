//! Error types for the price index and the order book.

use thiserror::Error;

use crate::orderbook::OrderKey;

/// Price index lookup failures.
///
/// With a consistent book these are unreachable: the book only asks the
/// index for orders its id map says are resting there.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PriceTreeError {
    /// No tree node carries this exact price
    #[error("no price level at {price}")]
    NodeNotFound { price: f64 },

    /// The level exists but does not hold the order
    #[error("order key {key} is not resting at price {price}")]
    OrderNotFound { price: f64, key: OrderKey },
}

/// Book-level failures, all recoverable.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OrderBookError {
    #[error("Cannot add order with id: {order_id} due to size being 0.")]
    InvalidSizeZero { order_id: String },

    #[error("Cannot add order with id: {order_id} to book, id already in use.")]
    DuplicatedOrderId { order_id: String },

    #[error("Order does not exist: {order_id}")]
    OrderDoesNotExist { order_id: String },

    /// Index and id map disagree; the book is left untouched
    #[error("price index out of sync with order map: {0}")]
    Index(#[from] PriceTreeError),
}

impl OrderBookError {
    /// True for errors that indicate a broken book invariant rather than a
    /// bad instruction
    pub fn is_internal(&self) -> bool {
        matches!(self, OrderBookError::Index(_))
    }
}

/// A violated red-black or search-tree property, reported by
/// [`crate::orderbook::PriceTree::check_invariants`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("root node is red")]
    RedRoot,

    #[error("root node has a parent link")]
    RootHasParent,

    #[error("red node {node} has a red child")]
    RedRed { node: usize },

    #[error("black height differs below node {node}: {left} vs {right}")]
    BlackHeight { node: usize, left: usize, right: usize },

    #[error("node {node} breaks price ordering")]
    Ordering { node: usize },

    #[error("child {child} does not point back to parent {parent}")]
    ParentLink { parent: usize, child: usize },

    #[error("node {node} referenced by the tree is not in the arena")]
    Dangling { node: usize },

    #[error("node {node} holds an empty price level")]
    EmptyLevel { node: usize },

    #[error("tree reaches {reachable} nodes but the arena holds {stored}")]
    NodeCount { reachable: usize, stored: usize },

    #[error("level at node {node} disagrees with its orders")]
    LevelMismatch { node: usize },
}
