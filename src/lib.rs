//! # Price Tree Book
//!
//! Per-ticker best bid and ask over a live set of resting orders, driven by a
//! pipe-delimited add/update/cancel protocol.
//!
//! ## Architecture
//!
//! - **Types**: Core data structures (Order, Side, BatchReceipt, price helpers)
//! - **OrderBook**: per-ticker red-black price trees over slab arenas
//! - **Processor**: line validation and dispatch into the book
//!
//! ## Design Principles
//!
//! 1. **Exact prices**: two prices share a level only if their bits match
//! 2. **Arena storage**: tree links are slab keys, not pointers
//! 3. **No partial mutation**: a rejected instruction leaves the book untouched
//! 4. **Single writer**: synchronous, no interior locking
//!
//! ## Example
//!
//! ```
//! use price_tree_book::{LogSink, OrderBook, OrderProcessor};
//!
//! let processor = OrderProcessor::new();
//! let mut book = OrderBook::new();
//!
//! let receipt = processor.process_lines(
//!     &mut book,
//!     ["100|A|a|X|B|10.0|5", "101|B|a|X|B|12.0|3", "102|B|c"],
//!     &mut LogSink,
//! );
//!
//! assert_eq!(receipt.applied, 3);
//! assert_eq!(book.best_bid("X"), 10.0);
//! ```

// ============================================================================
// Module declarations
// ============================================================================

/// Core data types: Order, Side, BatchReceipt
pub mod types;

/// Order book: red-black price trees with slab-based storage
pub mod orderbook;

/// Protocol processing: validation pipelines and dispatch
pub mod processor;

// ============================================================================
// Re-exports for convenience
// ============================================================================

pub use types::{BatchReceipt, Order, Side};
pub use orderbook::{
    best_bid_and_ask, BestPriceView, OrderBook, OrderBookError, OrderBookOps, PriceTree, Quote,
};
pub use processor::{Action, Diagnostic, DiagnosticSink, LogSink, OrderProcessor, Outcome};
