//! Protocol line processing.
//!
//! ## Flow
//!
//! ```text
//! raw line -> split on '|' -> action pipeline -> per-action pipeline
//!          -> Order / arguments -> OrderBookOps
//! ```
//!
//! Every line ends in exactly one of: rejected by validation, rejected by the
//! book, or applied. A rejected line leaves the book untouched and is
//! reported to the [`DiagnosticSink`]; processing of later lines continues.
//!
//! ## Example
//!
//! ```
//! use price_tree_book::orderbook::OrderBook;
//! use price_tree_book::processor::{Action, LogSink, OrderProcessor, Outcome};
//!
//! let processor = OrderProcessor::new();
//! let mut book = OrderBook::new();
//!
//! let outcome = processor.process(&mut book, "100|A|a|X|B|10.0|5", &mut LogSink);
//! assert_eq!(outcome, Outcome::Applied(Action::Add));
//! assert_eq!(book.best_bid("X"), 10.0);
//! ```

pub mod diagnostic;
pub mod validation;

use std::fmt;
use std::io::{self, BufRead};

use tracing::{debug, trace};

use crate::orderbook::{OrderBook, OrderBookOps};
use crate::types::{BatchReceipt, Order};

pub use diagnostic::{Diagnostic, DiagnosticSink, LogSink};
pub use validation::{FieldCheck, Pipeline, FIELD_DELIMITER};

use validation::{
    field, parse_action, parse_order_id, parse_price_field, parse_side, parse_size,
    parse_timestamp, ACTION_FIELD, ADD_SIZE_FIELD, ORDER_ID_FIELD, PRICE_FIELD, SIDE_FIELD,
    TICKER_FIELD, TIMESTAMP_FIELD, UPDATE_SIZE_FIELD,
};

/// Instruction kind, field 2 of every line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Add,
    Update,
    Cancel,
}

impl Action {
    /// Protocol code
    pub const fn code(self) -> &'static str {
        match self {
            Action::Add => "a",
            Action::Update => "u",
            Action::Cancel => "c",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "a" => Some(Action::Add),
            "u" => Some(Action::Update),
            "c" => Some(Action::Cancel),
            _ => None,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Add => f.write_str("add"),
            Action::Update => f.write_str("update"),
            Action::Cancel => f.write_str("cancel"),
        }
    }
}

/// Result of processing one line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Applied(Action),
    Rejected,
}

impl Outcome {
    #[inline]
    pub fn is_applied(self) -> bool {
        matches!(self, Outcome::Applied(_))
    }
}

/// Validates protocol lines and applies them to an order book.
///
/// Every line passes the action gate first; the chain for the line's action
/// comes from [`Pipeline::for_action`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderProcessor {
    gate: Pipeline,
}

impl Default for OrderProcessor {
    fn default() -> Self {
        Self {
            gate: Pipeline::ACTION,
        }
    }
}

impl OrderProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process one protocol line against `book`
    ///
    /// Validation failures and book errors are emitted to `sink` and yield
    /// [`Outcome::Rejected`]; nothing is returned as an `Err`.
    pub fn process<B: OrderBookOps + ?Sized>(
        &self,
        book: &mut B,
        line: &str,
        sink: &mut dyn DiagnosticSink,
    ) -> Outcome {
        let fields: Vec<&str> = line.split(FIELD_DELIMITER).collect();

        match self.apply(book, &fields) {
            Ok(action) => {
                trace!(%action, line, "line applied");
                Outcome::Applied(action)
            }
            Err(diagnostic) => {
                sink.emit(diagnostic);
                Outcome::Rejected
            }
        }
    }

    /// Process one raw line, rejecting it if it is not valid UTF-8
    pub fn process_bytes<B: OrderBookOps + ?Sized>(
        &self,
        book: &mut B,
        raw: &[u8],
        sink: &mut dyn DiagnosticSink,
    ) -> Outcome {
        match std::str::from_utf8(raw) {
            Ok(line) => self.process(book, line, sink),
            Err(_) => {
                sink.emit(Diagnostic::NotUtf8 {
                    line: String::from_utf8_lossy(raw).into_owned(),
                });
                Outcome::Rejected
            }
        }
    }

    /// Process a batch of lines against `book`
    ///
    /// # Returns
    ///
    /// A receipt with per-batch counts and the book's state root afterwards
    pub fn process_lines<I>(
        &self,
        book: &mut OrderBook,
        lines: I,
        sink: &mut dyn DiagnosticSink,
    ) -> BatchReceipt
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut tally = Tally::default();
        for line in lines {
            tally.record(self.process(book, line.as_ref(), sink));
        }
        tally.finish(book)
    }

    /// Stream newline-separated lines from `reader` into `book`
    ///
    /// Lines are read one at a time; `\n` and `\r\n` endings are both
    /// accepted. A line that is not valid UTF-8 is rejected like any other
    /// malformed line and reading continues.
    ///
    /// # Errors
    ///
    /// Only I/O errors from `reader`. Lines applied before the error stay
    /// applied.
    pub fn process_reader<R: BufRead>(
        &self,
        book: &mut OrderBook,
        mut reader: R,
        sink: &mut dyn DiagnosticSink,
    ) -> io::Result<BatchReceipt> {
        let mut tally = Tally::default();
        let mut buf = Vec::new();

        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf)? == 0 {
                break;
            }
            let raw = buf.strip_suffix(b"\n").unwrap_or(&buf[..]);
            let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
            tally.record(self.process_bytes(book, raw, sink));
        }

        Ok(tally.finish(book))
    }

    fn apply<B: OrderBookOps + ?Sized>(
        &self,
        book: &mut B,
        fields: &[&str],
    ) -> Result<Action, Diagnostic> {
        self.gate.validate(fields)?;
        let action = parse_action(field(fields, ACTION_FIELD))?;
        Pipeline::for_action(action).validate(fields)?;

        match action {
            Action::Add => Self::handle_add(book, fields)?,
            Action::Update => Self::handle_update(book, fields)?,
            Action::Cancel => Self::handle_cancel(book, fields)?,
        }
        Ok(action)
    }

    fn handle_add<B: OrderBookOps + ?Sized>(
        book: &mut B,
        fields: &[&str],
    ) -> Result<(), Diagnostic> {
        let order = Order::new(
            parse_order_id(field(fields, ORDER_ID_FIELD))?,
            parse_timestamp(field(fields, TIMESTAMP_FIELD))?,
            field(fields, TICKER_FIELD),
            parse_price_field(field(fields, PRICE_FIELD))?,
            parse_size(field(fields, ADD_SIZE_FIELD))?,
            parse_side(field(fields, SIDE_FIELD))?,
        );
        book.add_order(order)?;
        Ok(())
    }

    fn handle_update<B: OrderBookOps + ?Sized>(
        book: &mut B,
        fields: &[&str],
    ) -> Result<(), Diagnostic> {
        let order_id = parse_order_id(field(fields, ORDER_ID_FIELD))?;
        let size = parse_size(field(fields, UPDATE_SIZE_FIELD))?;
        book.update(order_id, size)?;
        Ok(())
    }

    fn handle_cancel<B: OrderBookOps + ?Sized>(
        book: &mut B,
        fields: &[&str],
    ) -> Result<(), Diagnostic> {
        let order_id = parse_order_id(field(fields, ORDER_ID_FIELD))?;
        book.cancel(order_id)?;
        Ok(())
    }
}

/// Running line counts for a batch
#[derive(Debug, Default)]
struct Tally {
    processed: u64,
    applied: u64,
}

impl Tally {
    fn record(&mut self, outcome: Outcome) {
        self.processed += 1;
        if outcome.is_applied() {
            self.applied += 1;
        }
    }

    fn finish(self, book: &OrderBook) -> BatchReceipt {
        let receipt = BatchReceipt::new(
            self.processed,
            self.applied,
            self.processed - self.applied,
            book.state_root(),
        );
        debug!(
            lines = receipt.lines_processed,
            applied = receipt.applied,
            rejected = receipt.rejected,
            "batch processed"
        );
        receipt
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orderbook::OrderBookError;
    use crate::types::Side;

    const CORRECT_ORDER_ID: &str = "bid1";

    /// Malformed lines that must never reach the book
    const INCORRECT_INPUTS: &[&str] = &[
        "",
        "kugeakufgauk",
        "123|id1",
        "123|id1|",
        "123|z42|INCORRECT-ACTION|ZZZZ|B|7.77777|1",
        "123|z42|a|ZZZZ|INCORRECT-SIDE|3.3|71",
        "123|z42|a|ZZZZ|B|3.3|",
        "123|z42|a|ZZZZ|S|3.3|",
        "123|z42|a|ZZZZ|B|3.3|a",
        "123|z42|a|ZZZZ|S|3.3|a",
        "123|z42|a|ZZZZ|B|3.3|1a",
        "123|z42|a|ZZZZ|S|3.3|1a",
        "123|z42|a|ZZZZ|B|3.3|a1",
        "123|z42|a|ZZZZ|S|3.3|a1",
        "123|z42|a|ZZZZ|B|3.3|0",
        "123|z42|a|ZZZZ|S|3.3|0",
        "123|z42|a|ZZZZ|B|3.3|-1",
        "123|z42|a|ZZZZ|S|3.3|-1",
        "123|z42|a|ZZZZ|B|three|1",
        "123|z42|a|ZZZZ|B|inf|1",
        "aaa|z42|a|ZZZZ|S|3.3|1",
        "1aa|z42|a|ZZZZ|S|3.3|1",
        "aa1|z42|a|ZZZZ|S|3.3|1",
        "1a1|z42|a|ZZZZ|S|3.3|1",
        "123|#1|a|ZZZZ|S|3.3|1",
        "123|#id|a|ZZZZ|S|3.3|1",
        "123|1#|a|ZZZZ|S|3.3|1",
        "123|id#|a|ZZZZ|S|3.3|1",
        "123|1#2|a|ZZZZ|S|3.3|1",
        "123|i#d|a|ZZZZ|S|3.3|1",
        "123|#1|c",
        "123|#id|c",
        "123|1#|c",
        "123|id#|c",
        "123|1#2|c",
        "123|i#d|c",
        "123|#1|u|1",
        "123|#id|u|1",
        "123|1#|u|1",
        "123|id#|u|1",
        "123|1#2|u|1",
        "123|i#d|u|1",
    ];

    /// Malformed lines aimed at an order that does rest in the book
    const INCORRECT_FOR_EXISTING: &[&str] = &[
        "aa|bid1|c",
        "1a|bid1|c",
        "a1|bid1|c",
        "1a1|bid1|c",
        "123|bid1|u",
        "123|bid1|u|",
        "123|bid1|u|a",
        "123|bid1|u|1a",
        "123|bid1|u|a1",
        "123|bid1|u|0",
        "123|bid1|u|-1",
        "aa|bid1|u|1",
        "1a|bid1|u|1",
        "a1|bid1|u|1",
        "1a1|bid1|u|1",
    ];

    /// Records calls instead of keeping a book
    #[derive(Default)]
    struct RecordingBook {
        calls: Vec<String>,
        fail_with: Option<OrderBookError>,
    }

    impl OrderBookOps for RecordingBook {
        fn add_order(&mut self, order: Order) -> Result<(), OrderBookError> {
            self.calls.push(format!("add {}", order.to_add_line()));
            self.fail_with.clone().map_or(Ok(()), Err)
        }

        fn cancel(&mut self, order_id: &str) -> Result<(), OrderBookError> {
            self.calls.push(format!("cancel {order_id}"));
            self.fail_with.clone().map_or(Ok(()), Err)
        }

        fn update(&mut self, order_id: &str, size: u64) -> Result<(), OrderBookError> {
            self.calls.push(format!("update {order_id} {size}"));
            self.fail_with.clone().map_or(Ok(()), Err)
        }
    }

    fn book_with_correct_order() -> OrderBook {
        let mut book = OrderBook::new();
        let outcome = OrderProcessor::new().process(
            &mut book,
            &format!("123|{CORRECT_ORDER_ID}|a|ZZZZ|B|3.3|1"),
            &mut LogSink,
        );
        assert!(outcome.is_applied());
        book
    }

    #[test]
    fn test_action_codes() {
        for action in [Action::Add, Action::Update, Action::Cancel] {
            assert_eq!(Action::from_code(action.code()), Some(action));
        }
        assert_eq!(Action::from_code("x"), None);
        assert_eq!(Action::Cancel.to_string(), "cancel");
    }

    #[test]
    fn test_dispatch_to_any_book() {
        let processor = OrderProcessor::new();
        let mut book = RecordingBook::default();
        let mut sink: Vec<Diagnostic> = Vec::new();

        assert_eq!(
            processor.process(&mut book, "100|A|a|X|S|10.5|5", &mut sink),
            Outcome::Applied(Action::Add)
        );
        assert_eq!(
            processor.process(&mut book, "101|A|u|9", &mut sink),
            Outcome::Applied(Action::Update)
        );
        assert_eq!(
            processor.process(&mut book, "102|A|c", &mut sink),
            Outcome::Applied(Action::Cancel)
        );

        assert_eq!(
            book.calls,
            vec!["add 100|A|a|X|S|10.5|5", "update A 9", "cancel A"]
        );
        assert!(sink.is_empty());
    }

    #[test]
    fn test_book_error_becomes_diagnostic() {
        let processor = OrderProcessor::new();
        let mut book = RecordingBook {
            fail_with: Some(OrderBookError::OrderDoesNotExist {
                order_id: "A".to_string(),
            }),
            ..Default::default()
        };
        let mut sink: Vec<Diagnostic> = Vec::new();

        let outcome = processor.process(&mut book, "101|A|c", &mut sink);

        assert_eq!(outcome, Outcome::Rejected);
        assert_eq!(book.calls.len(), 1);
        assert_eq!(
            sink,
            vec![Diagnostic::Book(OrderBookError::OrderDoesNotExist {
                order_id: "A".to_string()
            })]
        );
    }

    #[test]
    fn test_incorrect_inputs_emit_diagnostic() {
        let processor = OrderProcessor::new();

        for line in INCORRECT_INPUTS {
            let mut book = RecordingBook::default();
            let mut sink: Vec<Diagnostic> = Vec::new();

            assert_eq!(processor.process(&mut book, line, &mut sink), Outcome::Rejected);
            assert_eq!(sink.len(), 1, "{line:?}");
            assert!(book.calls.is_empty(), "{line:?} reached the book");
        }
    }

    #[test]
    fn test_incorrect_inputs_do_not_modify_existing_orders() {
        let processor = OrderProcessor::new();

        for line in INCORRECT_INPUTS.iter().chain(INCORRECT_FOR_EXISTING) {
            let mut book = book_with_correct_order();
            processor.process(&mut book, "123|correctid|a|KCIT|B|8.54321|17", &mut LogSink);
            let before = book.state_root();

            let mut sink: Vec<Diagnostic> = Vec::new();
            assert_eq!(processor.process(&mut book, line, &mut sink), Outcome::Rejected);
            assert_eq!(sink.len(), 1, "{line:?}");

            assert_eq!(book.state_root(), before, "{line:?} changed the book");
            let tree = book.bids("KCIT").unwrap();
            assert_eq!(tree.level_count(), 1);
            let order = book.get_order("correctid").unwrap();
            assert_eq!(
                *order,
                Order::new("correctid", 123, "KCIT", 8.54321, 17, Side::Bid)
            );
            assert_eq!(book.get_order(CORRECT_ORDER_ID).unwrap().size, 1);
        }
    }

    #[test]
    fn test_trailing_fields_on_update_and_cancel() {
        let processor = OrderProcessor::new();
        let mut book = OrderBook::new();
        let mut sink: Vec<Diagnostic> = Vec::new();

        assert!(processor.process(&mut book, "1|A|a|X|B|10.0|5", &mut sink).is_applied());
        assert_eq!(
            processor.process(&mut book, "2|A|u|7|", &mut sink),
            Outcome::Applied(Action::Update)
        );
        assert_eq!(book.get_order("A").unwrap().size, 7);

        assert_eq!(
            processor.process(&mut book, "3|A|c|", &mut sink),
            Outcome::Applied(Action::Cancel)
        );
        assert!(sink.is_empty());
        assert_eq!(book.order_count(), 0);
        assert_eq!(book.best_bid("X"), 0.0);

        // Add still wants exactly seven fields
        assert_eq!(
            processor.process(&mut book, "4|B|a|X|B|10.0|5|", &mut sink),
            Outcome::Rejected
        );
        assert!(matches!(sink[0], Diagnostic::FieldCount { expected: 7, .. }));
    }

    #[test]
    fn test_process_reader_skips_undecodable_line() {
        let processor = OrderProcessor::new();
        let mut book = OrderBook::new();
        let mut sink: Vec<Diagnostic> = Vec::new();

        let mut input = b"1|A|a|X|B|10.0|5\n2|B|a|X\xff|B|11.0|5\r\n".to_vec();
        input.extend_from_slice(b"3|C|a|X|B|12.0|5");

        let receipt = processor
            .process_reader(&mut book, io::Cursor::new(input), &mut sink)
            .unwrap();

        assert_eq!(receipt.lines_processed, 3);
        assert_eq!(receipt.applied, 2);
        assert_eq!(receipt.rejected, 1);
        assert_eq!(
            sink,
            vec![Diagnostic::NotUtf8 {
                line: "2|B|a|X\u{fffd}|B|11.0|5".to_string()
            }]
        );
        assert_eq!(book.best_bid("X"), 12.0);
        assert!(book.get_order("B").is_none());
    }

    #[test]
    fn test_process_reader_matches_process_lines() {
        let processor = OrderProcessor::new();
        let lines = ["1|A|a|X|B|10.0|5", "2|B|a|X|S|11.0|3", "3|A|u|9", "junk", "4|B|c"];

        let mut from_lines = OrderBook::new();
        let expected = processor.process_lines(&mut from_lines, lines, &mut LogSink);

        let mut from_reader = OrderBook::new();
        let text = lines.join("\r\n");
        let receipt = processor
            .process_reader(&mut from_reader, text.as_bytes(), &mut LogSink)
            .unwrap();

        assert_eq!(receipt, expected);
    }

    #[test]
    fn test_process_lines_receipt() {
        let processor = OrderProcessor::new();
        let mut book = OrderBook::new();
        let mut sink: Vec<Diagnostic> = Vec::new();

        let receipt = processor.process_lines(
            &mut book,
            [
                "100|A|a|X|B|10.0|5",
                "101|B|a|X|B|12.0|3",
                "102|A|a|Y|B|1.0|1",
                "103|B|c",
                "104|C|c",
                "junk",
            ],
            &mut sink,
        );

        assert_eq!(receipt.lines_processed, 6);
        assert_eq!(receipt.applied, 3);
        assert_eq!(receipt.rejected, 3);
        assert_eq!(receipt.state_root, book.state_root());
        assert_eq!(sink.len(), 3);
        assert!(matches!(
            sink[0],
            Diagnostic::Book(OrderBookError::DuplicatedOrderId { .. })
        ));
        assert_eq!(book.best_bid("X"), 10.0);
    }
}
