//! Diagnostics for rejected protocol lines.
//!
//! Validators and the processor never fail with an `Err`: a rejected line is
//! reported through a [`DiagnosticSink`] and dropped.

use thiserror::Error;
use tracing::{error, warn};

use crate::orderbook::OrderBookError;

/// Why a protocol line was dropped
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Diagnostic {
    #[error("line should have {expected} fields, received: {line:?}")]
    FieldCount { expected: usize, line: String },

    /// Undecodable bytes are shown replaced with U+FFFD
    #[error("line is not valid UTF-8: {line:?}")]
    NotUtf8 { line: String },

    #[error("unknown action: {action:?}")]
    UnknownAction { action: String },

    #[error("invalid {field}: expected {expected}, received: {received:?}")]
    InvalidField {
        field: &'static str,
        expected: &'static str,
        received: String,
    },

    /// The line was well formed but the book refused it
    #[error(transparent)]
    Book(#[from] OrderBookError),
}

impl Diagnostic {
    /// True when the diagnostic signals an inconsistent book
    pub fn is_internal(&self) -> bool {
        matches!(self, Diagnostic::Book(err) if err.is_internal())
    }
}

/// Receives diagnostics as lines are processed
pub trait DiagnosticSink {
    fn emit(&mut self, diagnostic: Diagnostic);
}

/// Sink that forwards every diagnostic to `tracing`
///
/// Rejected input goes out at `warn`, book invariant violations at `error`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn emit(&mut self, diagnostic: Diagnostic) {
        if diagnostic.is_internal() {
            error!(%diagnostic, "order book inconsistency");
        } else {
            warn!(%diagnostic, "line rejected");
        }
    }
}

/// Collects diagnostics, mostly useful in tests
impl DiagnosticSink for Vec<Diagnostic> {
    fn emit(&mut self, diagnostic: Diagnostic) {
        self.push(diagnostic);
    }
}
