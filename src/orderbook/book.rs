//! Multi-ticker order book.
//!
//! ## Architecture
//!
//! - **Per ticker**: a bid-side and an ask-side [`PriceTree`], created
//!   together on the first order for that ticker and never removed
//! - **Order index**: `HashMap<order_id, OrderHandle>` for O(1) existence
//!   checks and for routing cancel/update to the right tree
//!
//! The index does not own a second copy of the order. A handle records
//! where the order rests (ticker, side, price, slab key) and every read or
//! size change goes through the owning tree, so the two views cannot drift.
//!
//! ## Price Ordering
//!
//! - **Bids**: best bid = highest price (tree maximum)
//! - **Asks**: best ask = lowest price (tree minimum)
//!
//! ## Example
//!
//! ```
//! use price_tree_book::orderbook::OrderBook;
//! use price_tree_book::types::{Order, Side};
//!
//! let mut book = OrderBook::new();
//!
//! book.add_order(Order::new("A", 100, "X", 10.0, 5, Side::Bid)).unwrap();
//! book.add_order(Order::new("B", 101, "X", 12.0, 3, Side::Bid)).unwrap();
//! assert_eq!(book.best_bid("X"), 12.0);
//!
//! book.cancel("B").unwrap();
//! assert_eq!(book.best_bid("X"), 10.0);
//! ```

use std::collections::HashMap;

use sha2::{Digest, Sha256};
use tracing::trace;

use crate::orderbook::error::{OrderBookError, PriceTreeError};
use crate::orderbook::traits::{BestPriceView, OrderBookOps};
use crate::orderbook::{OrderKey, PriceTree};
use crate::types::price::EMPTY_SIDE_PRICE;
use crate::types::{Order, Side};

/// Where a resting order lives.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderHandle {
    pub ticker: String,
    pub side: Side,
    pub price: f64,
    pub key: OrderKey,
}

/// Both sides of one ticker.
#[derive(Debug, Clone, Default)]
pub struct TickerBook {
    /// Buy interest
    pub bids: PriceTree,

    /// Sell interest
    pub asks: PriceTree,
}

impl TickerBook {
    /// The tree for `side`
    #[inline]
    pub fn side(&self, side: Side) -> &PriceTree {
        match side {
            Side::Bid => &self.bids,
            Side::Ask => &self.asks,
        }
    }

    #[inline]
    fn side_mut(&mut self, side: Side) -> &mut PriceTree {
        match side {
            Side::Bid => &mut self.bids,
            Side::Ask => &mut self.asks,
        }
    }

    /// Highest bid, or 0.0 without bids
    #[inline]
    pub fn best_bid(&self) -> f64 {
        self.bids.maximum_price()
    }

    /// Lowest ask, or 0.0 without asks
    #[inline]
    pub fn best_ask(&self) -> f64 {
        self.asks.minimum_price()
    }
}

/// In-memory order book over red-black price trees.
///
/// Single writer: not thread-safe. For shared use wrap the whole book in
/// one lock, so the order index and the trees change together.
#[derive(Debug, Clone, Default)]
pub struct OrderBook {
    /// Ticker to bid/ask trees
    tickers: HashMap<String, TickerBook>,

    /// Order ID to location (for O(1) cancel/update)
    order_index: HashMap<String, OrderHandle>,
}

impl OrderBook {
    /// Create a new empty book
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a book with a pre-allocated order index
    ///
    /// # Example
    ///
    /// ```
    /// use price_tree_book::orderbook::OrderBook;
    ///
    /// let book = OrderBook::with_capacity(100_000);
    /// assert!(book.is_empty());
    /// ```
    pub fn with_capacity(order_capacity: usize) -> Self {
        Self {
            tickers: HashMap::new(),
            order_index: HashMap::with_capacity(order_capacity),
        }
    }

    // ========================================================================
    // Size and Lookup
    // ========================================================================

    /// Total number of resting orders across all tickers
    #[inline]
    pub fn order_count(&self) -> usize {
        self.order_index.len()
    }

    /// Number of tickers that have ever received an order
    #[inline]
    pub fn ticker_count(&self) -> usize {
        self.tickers.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.order_index.is_empty()
    }

    #[inline]
    pub fn contains_order(&self, order_id: &str) -> bool {
        self.order_index.contains_key(order_id)
    }

    /// Location of a resting order
    #[inline]
    pub fn handle(&self, order_id: &str) -> Option<&OrderHandle> {
        self.order_index.get(order_id)
    }

    /// The resting order with `order_id`, read from its tree
    pub fn get_order(&self, order_id: &str) -> Option<&Order> {
        let handle = self.order_index.get(order_id)?;
        self.tickers
            .get(&handle.ticker)?
            .side(handle.side)
            .order(handle.key)
    }

    /// Both sides of `ticker`
    #[inline]
    pub fn ticker(&self, ticker: &str) -> Option<&TickerBook> {
        self.tickers.get(ticker)
    }

    /// Bid-side tree of `ticker`
    pub fn bids(&self, ticker: &str) -> Option<&PriceTree> {
        self.tickers.get(ticker).map(|book| &book.bids)
    }

    /// Ask-side tree of `ticker`
    pub fn asks(&self, ticker: &str) -> Option<&PriceTree> {
        self.tickers.get(ticker).map(|book| &book.asks)
    }

    /// Known tickers, sorted
    pub fn tickers(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tickers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    // ========================================================================
    // Order Management
    // ========================================================================

    /// Add an order to the book
    ///
    /// The ticker's trees are created on first use. Nothing is mutated when
    /// an error is returned.
    ///
    /// # Errors
    ///
    /// * `InvalidSizeZero` - `order.size == 0`
    /// * `DuplicatedOrderId` - the id rests anywhere in the book, under any ticker
    pub fn add_order(&mut self, order: Order) -> Result<(), OrderBookError> {
        if order.size == 0 {
            return Err(OrderBookError::InvalidSizeZero {
                order_id: order.order_id,
            });
        }

        if self.order_index.contains_key(&order.order_id) {
            return Err(OrderBookError::DuplicatedOrderId {
                order_id: order.order_id,
            });
        }

        trace!(
            order_id = %order.order_id,
            ticker = %order.ticker,
            side = %order.side,
            price = order.price,
            size = order.size,
            "add order"
        );

        let order_id = order.order_id.clone();
        let ticker = order.ticker.clone();
        let side = order.side;
        let price = order.price;

        let key = self
            .tickers
            .entry(ticker.clone())
            .or_default()
            .side_mut(side)
            .insert(order);

        let handle = OrderHandle {
            ticker,
            side,
            price,
            key,
        };
        self.order_index.insert(order_id, handle);
        Ok(())
    }

    /// Cancel an order by ID
    ///
    /// # Returns
    ///
    /// The cancelled order
    ///
    /// # Errors
    ///
    /// * `OrderDoesNotExist` - no resting order with this id
    /// * `Index` - the id map points at a missing level or order
    pub fn cancel(&mut self, order_id: &str) -> Result<Order, OrderBookError> {
        let handle = self.order_index.get(order_id).ok_or_else(|| {
            OrderBookError::OrderDoesNotExist {
                order_id: order_id.to_string(),
            }
        })?;

        let (price, key, side) = (handle.price, handle.key, handle.side);
        let order = tree_for(&mut self.tickers, handle)?.remove(price, key)?;
        self.order_index.remove(order_id);

        trace!(order_id, ticker = %order.ticker, %side, price, "cancel order");
        Ok(order)
    }

    /// Change the size of a resting order in place
    ///
    /// The order keeps its price level and its place within it.
    ///
    /// # Errors
    ///
    /// * `OrderDoesNotExist` - no resting order with this id
    /// * `InvalidSizeZero` - `size == 0` for a resting order
    /// * `Index` - the id map points at a missing level or order
    pub fn update(&mut self, order_id: &str, size: u64) -> Result<(), OrderBookError> {
        let handle = self.order_index.get(order_id).ok_or_else(|| {
            OrderBookError::OrderDoesNotExist {
                order_id: order_id.to_string(),
            }
        })?;

        if size == 0 {
            return Err(OrderBookError::InvalidSizeZero {
                order_id: order_id.to_string(),
            });
        }

        let (price, key) = (handle.price, handle.key);
        let previous = tree_for(&mut self.tickers, handle)?.update_size(price, key, size)?;

        trace!(order_id, price, previous, size, "update order");
        Ok(())
    }

    // ========================================================================
    // Best Bid/Ask
    // ========================================================================

    /// Lowest ask for `ticker`, or 0.0 if the ticker is unknown or has no asks
    pub fn best_ask(&self, ticker: &str) -> f64 {
        self.tickers
            .get(ticker)
            .map_or(EMPTY_SIDE_PRICE, TickerBook::best_ask)
    }

    /// Highest bid for `ticker`, or 0.0 if the ticker is unknown or has no bids
    pub fn best_bid(&self, ticker: &str) -> f64 {
        self.tickers
            .get(ticker)
            .map_or(EMPTY_SIDE_PRICE, TickerBook::best_bid)
    }

    // ========================================================================
    // State Root
    // ========================================================================

    /// SHA-256 over the resting content of the book.
    ///
    /// Tickers are visited in sorted order, each side's levels in ascending
    /// price order and each level's orders oldest first. Tree shape does not
    /// enter the hash.
    pub fn state_root(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();

        for name in self.tickers() {
            let Some(book) = self.tickers.get(name) else {
                continue;
            };
            hasher.update((name.len() as u64).to_le_bytes());
            hasher.update(name.as_bytes());

            for side in [Side::Bid, Side::Ask] {
                let tree = book.side(side);
                hasher.update([side.to_u8()]);
                hasher.update((tree.level_count() as u64).to_le_bytes());

                for (price, level) in tree.levels() {
                    hasher.update(price.to_bits().to_le_bytes());
                    hasher.update((level.order_count as u64).to_le_bytes());

                    for order in tree.level_orders(level) {
                        hasher.update((order.order_id.len() as u64).to_le_bytes());
                        hasher.update(order.order_id.as_bytes());
                        hasher.update(order.size.to_le_bytes());
                        hasher.update(order.timestamp.to_le_bytes());
                    }
                }
            }
        }

        hasher.finalize().into()
    }

    /// State root as a hex string
    pub fn state_root_hex(&self) -> String {
        hex::encode(self.state_root())
    }
}

/// Tree owning the order behind `handle`
fn tree_for<'a>(
    tickers: &'a mut HashMap<String, TickerBook>,
    handle: &OrderHandle,
) -> Result<&'a mut PriceTree, OrderBookError> {
    match tickers.get_mut(&handle.ticker) {
        Some(book) => Ok(book.side_mut(handle.side)),
        None => Err(PriceTreeError::NodeNotFound {
            price: handle.price,
        }
        .into()),
    }
}

impl OrderBookOps for OrderBook {
    fn add_order(&mut self, order: Order) -> Result<(), OrderBookError> {
        OrderBook::add_order(self, order)
    }

    fn cancel(&mut self, order_id: &str) -> Result<(), OrderBookError> {
        OrderBook::cancel(self, order_id).map(|_| ())
    }

    fn update(&mut self, order_id: &str, size: u64) -> Result<(), OrderBookError> {
        OrderBook::update(self, order_id, size)
    }
}

impl BestPriceView for OrderBook {
    fn best_ask(&self, ticker: &str) -> f64 {
        OrderBook::best_ask(self, ticker)
    }

    fn best_bid(&self, ticker: &str) -> f64 {
        OrderBook::best_bid(self, ticker)
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
