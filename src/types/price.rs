//! Price parsing and comparison utilities.
//!
//! ## Overview
//!
//! Prices arrive as decimal literals (`10.0`, `8.54321`) and are stored as
//! `f64`. Two prices belong to the same level only when their bit patterns
//! are identical: there is no tolerance-based matching, so `3.3` and
//! `3.3000000000000003` are distinct levels.
//!
//! ## Ordering
//!
//! Price ordering uses [`f64::total_cmp`], which agrees with the usual
//! numeric order for every finite value and is a total order, so the tree
//! never sees an incomparable key.
//!
//! `-0` parses to `-0.0`, which has its own bit pattern and sorts just
//! below `0.0`, so it is a separate level.
//!
//! ## Examples
//!
//! ```
//! use price_tree_book::types::price::{parse_price, same_price};
//!
//! assert_eq!(parse_price("10.25"), Some(10.25));
//! assert_eq!(parse_price("1e3"), None);
//! assert!(same_price(3.3, 3.3));
//! assert!(!same_price(3.3, 3.3000000000000003));
//! ```

use std::cmp::Ordering;
use std::str::FromStr;

/// Price reported for a side with no resting orders
pub const EMPTY_SIDE_PRICE: f64 = 0.0;

// ============================================================================
// Parsing
// ============================================================================

/// Check that `s` is a plain decimal literal: optional `-`, digits, and at
/// most one `.` with at least one digit overall.
fn is_decimal_literal(s: &str) -> bool {
    let body = s.strip_prefix('-').unwrap_or(s);
    let mut digits = 0usize;
    let mut dots = 0usize;

    for c in body.chars() {
        match c {
            '0'..='9' => digits += 1,
            '.' => dots += 1,
            _ => return false,
        }
    }

    digits > 0 && dots <= 1
}

/// Parse a protocol price literal.
///
/// The literal must be a plain decimal (`-`, digits, one optional `.`).
/// Exponents, `inf`, `NaN`, signs other than a leading `-` and digit
/// separators are all rejected.
///
/// # Returns
///
/// * `Some(f64)` - The price, parsed with round-to-nearest
/// * `None` - If the literal is malformed or overflows `f64`
pub fn parse_price(s: &str) -> Option<f64> {
    if !is_decimal_literal(s) {
        return None;
    }

    let price = f64::from_str(s).ok()?;
    price.is_finite().then_some(price)
}

// ============================================================================
// Comparison Helpers
// ============================================================================

/// Total order over prices
#[inline]
pub fn cmp_prices(a: f64, b: f64) -> Ordering {
    a.total_cmp(&b)
}

/// Exact-bit price equality
#[inline]
pub fn same_price(a: f64, b: f64) -> bool {
    a.to_bits() == b.to_bits()
}

// ============================================================================
// Unit Tests
// ============================================================================
