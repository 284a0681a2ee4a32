//! Batch receipt for a processed run of protocol lines.
//!
//! The BatchReceipt summarises how many lines were applied or rejected and
//! carries the book's state root after the batch.

/// Summary of a batch of processed protocol lines.
///
/// ## State Root
///
/// The 32-byte state root is a SHA-256 hash of the resting book content
/// (see [`crate::orderbook::OrderBook::state_root`]). Replaying the same
/// lines into an empty book always yields the same root.
///
/// ## Example
///
/// ```
/// use price_tree_book::types::BatchReceipt;
///
/// let receipt = BatchReceipt::new(10, 8, 2, [0u8; 32]);
/// assert_eq!(receipt.rejection_rate(), Some(0.2));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BatchReceipt {
    /// Number of lines handed to the processor
    pub lines_processed: u64,

    /// Lines that mutated the book
    pub applied: u64,

    /// Lines dropped with a diagnostic
    pub rejected: u64,

    /// State root after the batch (SHA-256, 32 bytes)
    pub state_root: [u8; 32],
}

impl BatchReceipt {
    /// Create a new batch receipt
    pub fn new(lines_processed: u64, applied: u64, rejected: u64, state_root: [u8; 32]) -> Self {
        Self {
            lines_processed,
            applied,
            rejected,
            state_root,
        }
    }

    /// Get the state root as a hex string
    pub fn state_root_hex(&self) -> String {
        hex::encode(self.state_root)
    }

    /// Check if no lines were processed
    pub fn is_empty(&self) -> bool {
        self.lines_processed == 0
    }

    /// Fraction of lines rejected
    ///
    /// Returns None if no lines were processed.
    pub fn rejection_rate(&self) -> Option<f64> {
        if self.lines_processed == 0 {
            None
        } else {
            Some(self.rejected as f64 / self.lines_processed as f64)
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
