//! Order types for the price tree book.
//!
//! An [`Order`] is immutable apart from `size`, which `update` instructions
//! change in place. Prices are `f64` and compared by exact bit pattern; see
//! [`crate::types::price`].

use std::fmt;

// ============================================================================
// Side enum
// ============================================================================

/// Order side: Bid or Ask
///
/// On the wire a side is a single-character marker:
/// - Bid = `B`
/// - Ask = `S`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Side {
    /// Buy interest - best bid is the highest resting price
    #[default]
    Bid,
    /// Sell interest - best ask is the lowest resting price
    Ask,
}

impl Side {
    /// Protocol marker for this side
    pub fn as_marker(self) -> &'static str {
        match self {
            Side::Bid => "B",
            Side::Ask => "S",
        }
    }

    /// Parse a protocol marker (`B` or `S`)
    pub fn from_marker(marker: &str) -> Option<Self> {
        match marker {
            "B" => Some(Side::Bid),
            "S" => Some(Side::Ask),
            _ => None,
        }
    }

    /// Convert to u8 for hashing
    pub fn to_u8(self) -> u8 {
        match self {
            Side::Bid => 0,
            Side::Ask => 1,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Bid => f.write_str("BID"),
            Side::Ask => f.write_str("ASK"),
        }
    }
}

// ============================================================================
// Order struct
// ============================================================================

/// A resting limit order.
///
/// ## Example
///
/// ```
/// use price_tree_book::types::{Order, Side};
///
/// let order = Order::new("A1", 100, "XYZ", 10.5, 5, Side::Bid);
/// assert_eq!(order.order_id, "A1");
/// assert_eq!(order.side, Side::Bid);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    /// Unique order identifier, `[A-Za-z0-9]+` when it comes off the wire
    pub order_id: String,

    /// Unix timestamp carried by the add instruction
    pub timestamp: u64,

    /// Instrument symbol
    pub ticker: String,

    /// Limit price
    pub price: f64,

    /// Resting size; never zero once the order is in a book
    pub size: u64,

    /// Bid or Ask
    pub side: Side,
}

impl Order {
    /// Create a new order
    pub fn new(
        order_id: impl Into<String>,
        timestamp: u64,
        ticker: impl Into<String>,
        price: f64,
        size: u64,
        side: Side,
    ) -> Self {
        Self {
            order_id: order_id.into(),
            timestamp,
            ticker: ticker.into(),
            price,
            size,
            side,
        }
    }

    /// Render the order as an add instruction
    pub fn to_add_line(&self) -> String {
        format!(
            "{}|{}|a|{}|{}|{}|{}",
            self.timestamp,
            self.order_id,
            self.ticker,
            self.side.as_marker(),
            self.price,
            self.size
        )
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
