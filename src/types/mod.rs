//! Core data types for the price tree book
//!
//! ## Types
//!
//! - [`Order`]: A resting limit order
//! - [`Side`]: Bid or Ask
//! - [`BatchReceipt`]: Summary of a processed batch of protocol lines
//!
//! ## Prices
//!
//! Prices are `f64` values parsed from decimal literals and compared by
//! exact bit pattern; see [`price`].

mod order;
mod receipt;
pub mod price;

// Re-export all types at module level
pub use order::{Order, Side};
pub use receipt::BatchReceipt;
