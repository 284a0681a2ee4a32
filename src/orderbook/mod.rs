//! Order book module.
//!
//! ## Architecture
//!
//! The book keeps, per ticker, one red-black price tree per side:
//!
//! - **Slab arenas**: tree nodes and resting orders live in slabs; links are
//!   `usize` keys
//! - **Price levels**: every order at one exact price sits in one tree node
//! - **Order index**: order id to location, for O(1) routing of cancel/update
//!
//! ## Components
//!
//! - [`OrderNode`]: an `Order` plus FIFO links within its level
//! - [`PriceLevel`]: the orders at a single price
//! - [`PriceTree`]: red-black tree of price levels for one side
//! - [`OrderBook`]: tickers, sides and the order index
//! - [`OrderBookOps`] / [`BestPriceView`]: the book's public contract
//!
//! ## Performance
//!
//! | Operation | Complexity |
//! |-----------|------------|
//! | Add order | O(log n) |
//! | Cancel order by ID | O(log n) |
//! | Update size by ID | O(log n) |
//! | Best bid/ask | O(log n) |
//!
//! n is the number of distinct prices on the side concerned.

pub mod node;
pub mod level;
pub mod tree;
pub mod book;
pub mod traits;
pub mod error;

pub use node::{OrderKey, OrderNode};
pub use level::{LevelKeys, PriceLevel};
pub use tree::{Color, Levels, NodeKey, PriceNode, PriceTree};
pub use book::{OrderBook, OrderHandle, TickerBook};
pub use traits::{best_bid_and_ask, BestPriceView, OrderBookOps, Quote};
pub use error::{InvariantViolation, OrderBookError, PriceTreeError};
