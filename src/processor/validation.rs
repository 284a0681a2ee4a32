//! Field validation for protocol lines.
//!
//! A line is split on `|` and run through a [`Pipeline`], an ordered list of
//! [`FieldCheck`]s that stops at the first failure. The pipelines are
//! constants, so each action's chain is built exactly once.
//!
//! Line layouts:
//!
//! | Action | Fields |
//! |--------|--------|
//! | add | `timestamp\|order_id\|a\|ticker\|side\|price\|size` |
//! | update | `timestamp\|order_id\|u\|size` |
//! | cancel | `timestamp\|order_id\|c` |
//!
//! Update and cancel lines may carry trailing fields, which are ignored.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::processor::diagnostic::{Diagnostic, DiagnosticSink};
use crate::processor::Action;
use crate::types::price::parse_price;
use crate::types::Side;

pub const FIELD_DELIMITER: char = '|';

pub const TIMESTAMP_FIELD: usize = 0;
pub const ORDER_ID_FIELD: usize = 1;
pub const ACTION_FIELD: usize = 2;
pub const TICKER_FIELD: usize = 3;
pub const SIDE_FIELD: usize = 4;
pub const PRICE_FIELD: usize = 5;
pub const ADD_SIZE_FIELD: usize = 6;
pub const UPDATE_SIZE_FIELD: usize = 3;

pub const ADD_FIELDS: usize = 7;
pub const UPDATE_FIELDS: usize = 4;
pub const CANCEL_FIELDS: usize = 3;

static ORDER_ID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9]+$").expect("order id pattern compiles"));

/// A single validation step over the split fields of one line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldCheck {
    /// At least this many fields
    MinFields(usize),
    /// Exactly this many fields
    Fields(usize),
    /// Field 2 is `a`, `u` or `c`
    Action,
    /// Field 0 is an unsigned integer
    Timestamp,
    /// Field 1 is non-empty ASCII alphanumeric
    OrderId,
    /// Field 4 is `B` or `S`
    Side,
    /// The field at this index is a plain decimal literal
    Price(usize),
    /// The field at this index is a positive integer
    Size(usize),
}

impl FieldCheck {
    pub fn check(&self, fields: &[&str]) -> Result<(), Diagnostic> {
        match *self {
            FieldCheck::MinFields(expected) if fields.len() < expected => {
                Err(field_count(expected, fields))
            }
            FieldCheck::Fields(expected) if fields.len() != expected => {
                Err(field_count(expected, fields))
            }
            FieldCheck::MinFields(_) | FieldCheck::Fields(_) => Ok(()),
            FieldCheck::Action => parse_action(field(fields, ACTION_FIELD)).map(drop),
            FieldCheck::Timestamp => parse_timestamp(field(fields, TIMESTAMP_FIELD)).map(drop),
            FieldCheck::OrderId => parse_order_id(field(fields, ORDER_ID_FIELD)).map(drop),
            FieldCheck::Side => parse_side(field(fields, SIDE_FIELD)).map(drop),
            FieldCheck::Price(idx) => parse_price_field(field(fields, idx)).map(drop),
            FieldCheck::Size(idx) => parse_size(field(fields, idx)).map(drop),
        }
    }
}

/// Ordered validation chain for one kind of line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pipeline {
    checks: &'static [FieldCheck],
}

impl Pipeline {
    /// Gate applied to every line before dispatch
    pub const ACTION: Pipeline = Pipeline {
        checks: &[FieldCheck::MinFields(CANCEL_FIELDS), FieldCheck::Action],
    };

    pub const CANCEL: Pipeline = Pipeline {
        checks: &[
            FieldCheck::MinFields(CANCEL_FIELDS),
            FieldCheck::Timestamp,
            FieldCheck::OrderId,
        ],
    };

    pub const UPDATE: Pipeline = Pipeline {
        checks: &[
            FieldCheck::MinFields(UPDATE_FIELDS),
            FieldCheck::Timestamp,
            FieldCheck::OrderId,
            FieldCheck::Size(UPDATE_SIZE_FIELD),
        ],
    };

    /// Add lines take exactly seven fields; update and cancel ignore any
    /// trailing ones.
    pub const ADD: Pipeline = Pipeline {
        checks: &[
            FieldCheck::Fields(ADD_FIELDS),
            FieldCheck::Timestamp,
            FieldCheck::OrderId,
            FieldCheck::Side,
            FieldCheck::Price(PRICE_FIELD),
            FieldCheck::Size(ADD_SIZE_FIELD),
        ],
    };

    /// Custom chain
    pub const fn new(checks: &'static [FieldCheck]) -> Self {
        Self { checks }
    }

    /// Pipeline for an action's full line
    pub const fn for_action(action: Action) -> Self {
        match action {
            Action::Add => Self::ADD,
            Action::Update => Self::UPDATE,
            Action::Cancel => Self::CANCEL,
        }
    }

    pub fn checks(&self) -> &'static [FieldCheck] {
        self.checks
    }

    /// First failing check, if any
    pub fn validate(&self, fields: &[&str]) -> Result<(), Diagnostic> {
        self.checks.iter().try_for_each(|check| check.check(fields))
    }

    /// Run the chain, reporting the first failure to `sink`
    pub fn is_valid(&self, fields: &[&str], sink: &mut dyn DiagnosticSink) -> bool {
        match self.validate(fields) {
            Ok(()) => true,
            Err(diagnostic) => {
                sink.emit(diagnostic);
                false
            }
        }
    }
}

// ============================================================================
// Field Parsers
// ============================================================================

/// Field at `idx`, or "" when the line is too short
pub(crate) fn field<'a>(fields: &[&'a str], idx: usize) -> &'a str {
    fields.get(idx).copied().unwrap_or("")
}

pub fn parse_action(raw: &str) -> Result<Action, Diagnostic> {
    Action::from_code(raw).ok_or_else(|| Diagnostic::UnknownAction {
        action: raw.to_string(),
    })
}

pub fn parse_timestamp(raw: &str) -> Result<u64, Diagnostic> {
    parse_digits(raw).ok_or_else(|| invalid("timestamp", "an unsigned unix timestamp", raw))
}

pub fn parse_order_id(raw: &str) -> Result<&str, Diagnostic> {
    if ORDER_ID_PATTERN.is_match(raw) {
        Ok(raw)
    } else {
        Err(invalid("order id", "ASCII letters and digits", raw))
    }
}

pub fn parse_side(raw: &str) -> Result<Side, Diagnostic> {
    Side::from_marker(raw).ok_or_else(|| invalid("side", "B or S", raw))
}

pub fn parse_price_field(raw: &str) -> Result<f64, Diagnostic> {
    parse_price(raw).ok_or_else(|| invalid("price", "a decimal literal", raw))
}

pub fn parse_size(raw: &str) -> Result<u64, Diagnostic> {
    match parse_digits(raw) {
        Some(0) => Err(invalid("size", "a positive integer", raw)),
        Some(size) => Ok(size),
        None => Err(invalid("size", "an unsigned integer", raw)),
    }
}

// u64::from_str alone would accept a leading '+'
fn parse_digits(raw: &str) -> Option<u64> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

fn invalid(field: &'static str, expected: &'static str, raw: &str) -> Diagnostic {
    Diagnostic::InvalidField {
        field,
        expected,
        received: raw.to_string(),
    }
}

fn field_count(expected: usize, fields: &[&str]) -> Diagnostic {
    Diagnostic::FieldCount {
        expected,
        line: fields.join("|"),
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn split(line: &str) -> Vec<&str> {
        line.split(FIELD_DELIMITER).collect()
    }

    #[test]
    fn test_parse_digits() {
        assert_eq!(parse_timestamp("123"), Ok(123));
        assert_eq!(parse_timestamp("0"), Ok(0));
        assert!(parse_timestamp("").is_err());
        assert!(parse_timestamp("+1").is_err());
        assert!(parse_timestamp("1a").is_err());
        assert!(parse_timestamp("-1").is_err());
        // One past u64::MAX
        assert!(parse_timestamp("18446744073709551616").is_err());
    }

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("71"), Ok(71));
        assert_eq!(
            parse_size("0"),
            Err(Diagnostic::InvalidField {
                field: "size",
                expected: "a positive integer",
                received: "0".to_string(),
            })
        );
        for raw in ["", "a", "1a", "a1", "-1", "1.5"] {
            assert!(parse_size(raw).is_err(), "{raw:?} accepted");
        }
    }

    #[test]
    fn test_parse_order_id() {
        assert_eq!(parse_order_id("z42"), Ok("z42"));
        assert_eq!(parse_order_id("ABCdef123"), Ok("ABCdef123"));
        for raw in ["", "#1", "id#", "i#d", "a b", "a-b", "id\n"] {
            assert!(parse_order_id(raw).is_err(), "{raw:?} accepted");
        }
    }

    #[test]
    fn test_parse_side_and_action() {
        assert_eq!(parse_side("B"), Ok(Side::Bid));
        assert_eq!(parse_side("S"), Ok(Side::Ask));
        assert!(parse_side("b").is_err());
        assert!(parse_side("X").is_err());

        assert_eq!(parse_action("a"), Ok(Action::Add));
        assert_eq!(parse_action("u"), Ok(Action::Update));
        assert_eq!(parse_action("c"), Ok(Action::Cancel));
        assert!(parse_action("A").is_err());
        assert!(parse_action("").is_err());
    }

    #[test]
    fn test_field_count_checks() {
        let fields = split("123|id1");
        assert!(matches!(
            FieldCheck::MinFields(3).check(&fields),
            Err(Diagnostic::FieldCount { expected: 3, .. })
        ));

        let fields = split("123|id1|c|extra");
        assert!(FieldCheck::MinFields(3).check(&fields).is_ok());
        assert!(FieldCheck::Fields(3).check(&fields).is_err());
    }

    #[test]
    fn test_empty_line_fails_action_pipeline() {
        let mut sink: Vec<Diagnostic> = Vec::new();
        assert!(!Pipeline::ACTION.is_valid(&split(""), &mut sink));
        assert!(matches!(sink[0], Diagnostic::FieldCount { .. }));
    }

    #[test]
    fn test_pipeline_short_circuits() {
        // Bad timestamp and bad side: only the timestamp is reported
        let mut sink: Vec<Diagnostic> = Vec::new();
        let fields = split("aaa|z42|a|ZZZZ|X|3.3|1");
        assert!(!Pipeline::ADD.is_valid(&fields, &mut sink));
        assert_eq!(sink.len(), 1);
        assert!(matches!(
            sink[0],
            Diagnostic::InvalidField {
                field: "timestamp",
                ..
            }
        ));
    }

    #[test]
    fn test_add_pipeline() {
        let mut sink: Vec<Diagnostic> = Vec::new();
        assert!(Pipeline::ADD.is_valid(&split("100|A|a|X|B|10.0|5"), &mut sink));
        assert!(Pipeline::ADD.is_valid(&split("100|A|a|X|S|-2.5|1"), &mut sink));
        assert!(sink.is_empty());

        for line in [
            "123|z42|a|ZZZZ|X|3.3|1",
            "123|z42|a|ZZZZ|B|NaN|1",
            "123|z42|a|ZZZZ|B|1e3|1",
            "123|z42|a|ZZZZ|B||1",
            "123|z42|a|ZZZZ|B|3.3|0",
            "123|z42|a|ZZZZ|B|3.3|",
            "123|z42|a|ZZZZ|B|3.3",
            "123|z42|a|ZZZZ|B|3.3|1|9",
        ] {
            assert!(!Pipeline::ADD.is_valid(&split(line), &mut sink), "{line} accepted");
        }
    }

    #[test]
    fn test_update_and_cancel_pipelines() {
        let mut sink: Vec<Diagnostic> = Vec::new();
        assert!(Pipeline::UPDATE.is_valid(&split("123|bid1|u|7"), &mut sink));
        assert!(Pipeline::CANCEL.is_valid(&split("123|bid1|c"), &mut sink));

        assert!(!Pipeline::UPDATE.is_valid(&split("123|bid1|u"), &mut sink));
        assert!(!Pipeline::UPDATE.is_valid(&split("123|bid1|u|0"), &mut sink));
        assert!(!Pipeline::CANCEL.is_valid(&split("1a|bid1|c"), &mut sink));
        assert_eq!(sink.len(), 3);
    }

    #[test]
    fn test_trailing_fields() {
        let mut sink: Vec<Diagnostic> = Vec::new();
        assert!(Pipeline::UPDATE.is_valid(&split("2|A|u|7|"), &mut sink));
        assert!(Pipeline::UPDATE.is_valid(&split("2|A|u|7|x|y"), &mut sink));
        assert!(Pipeline::CANCEL.is_valid(&split("3|A|c|"), &mut sink));
        assert!(sink.is_empty());

        assert!(!Pipeline::ADD.is_valid(&split("1|A|a|X|B|1.0|1|"), &mut sink));
        assert!(matches!(sink[0], Diagnostic::FieldCount { expected: 7, .. }));
    }

    #[test]
    fn test_for_action() {
        assert_eq!(Pipeline::for_action(Action::Add), Pipeline::ADD);
        assert_eq!(Pipeline::for_action(Action::Cancel).checks().len(), 3);
    }

    #[test]
    fn test_missing_field_is_invalid_not_panic() {
        // Size check without a count check in front of it
        let pipeline = Pipeline::new(&[FieldCheck::Size(6)]);
        assert!(pipeline.validate(&split("1|a")).is_err());
    }
}
