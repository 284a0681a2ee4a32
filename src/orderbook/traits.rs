//! Order book interfaces.
//!
//! The processor drives any [`OrderBookOps`] and quote consumers read any
//! [`BestPriceView`], so an alternative backing store (for example a
//! table-backed book used for comparison) can stand in for [`OrderBook`]
//! without touching either side.
//!
//! [`OrderBook`]: crate::orderbook::OrderBook

use crate::orderbook::OrderBookError;
use crate::types::Order;

/// Mutating side of an order book.
pub trait OrderBookOps {
    /// Rest a new order; size-zero and duplicate ids are rejected
    fn add_order(&mut self, order: Order) -> Result<(), OrderBookError>;

    /// Remove a resting order by id
    fn cancel(&mut self, order_id: &str) -> Result<(), OrderBookError>;

    /// Change a resting order's size in place
    fn update(&mut self, order_id: &str, size: u64) -> Result<(), OrderBookError>;
}

/// Read side of an order book.
///
/// Both queries return 0.0 when the ticker is unknown or the side is empty.
pub trait BestPriceView {
    fn best_ask(&self, ticker: &str) -> f64;

    fn best_bid(&self, ticker: &str) -> f64;
}

/// Best bid and ask of one ticker
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Quote {
    pub best_bid: f64,
    pub best_ask: f64,
}

/// Read both sides of `ticker` from a view
///
/// # Example
///
/// ```
/// use price_tree_book::orderbook::{best_bid_and_ask, OrderBook, Quote};
/// use price_tree_book::types::{Order, Side};
///
/// let mut book = OrderBook::new();
/// book.add_order(Order::new("A", 1, "X", 9.5, 1, Side::Bid)).unwrap();
/// book.add_order(Order::new("B", 1, "X", 10.5, 1, Side::Ask)).unwrap();
///
/// assert_eq!(
///     best_bid_and_ask(&book, "X"),
///     Quote { best_bid: 9.5, best_ask: 10.5 }
/// );
/// ```
pub fn best_bid_and_ask<V: BestPriceView + ?Sized>(view: &V, ticker: &str) -> Quote {
    Quote {
        best_bid: view.best_bid(ticker),
        best_ask: view.best_ask(ticker),
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
