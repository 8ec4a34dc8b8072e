//! Line protocol grammar.
//!
//! The sensor board prints free text. Two kinds of lines carry meaning:
//!
//! ```text
//! Calibracion completa. Valor base: 120
//! Valor actual: 150
//! ```
//!
//! Everything else is diagnostic chatter. Recognition is driven by
//! [`LINE_RULES`]: an ordered table of marker phrases, each followed by an
//! unsigned integer. The first rule whose marker appears in the line decides
//! the outcome; a marker without a parseable integer yields
//! [`ParsedEvent::Unrecognized`].

use serde::{Deserialize, Serialize};

/// Result of interpreting one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParsedEvent {
    CalibrationComplete { baseline: u32 },
    Measurement { current_value: u32 },
    Unrecognized,
}

/// Which event a rule produces from its extracted integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Calibration,
    Measurement,
}

impl EventKind {
    fn event(self, value: u32) -> ParsedEvent {
        match self {
            EventKind::Calibration => ParsedEvent::CalibrationComplete { baseline: value },
            EventKind::Measurement => ParsedEvent::Measurement {
                current_value: value,
            },
        }
    }
}

/// A marker phrase and the event it introduces.
#[derive(Debug, Clone, Copy)]
pub struct LineRule {
    /// Literal text that must appear in the line
    pub marker: &'static str,
    /// Text after which the integer is read, searched from the marker onwards
    pub value_prefix: &'static str,
    pub kind: EventKind,
}

/// Protocol rules in priority order.
pub const LINE_RULES: &[LineRule] = &[
    LineRule {
        marker: "Calibracion completa. Valor base:",
        value_prefix: "Valor base:",
        kind: EventKind::Calibration,
    },
    LineRule {
        marker: "Valor actual:",
        value_prefix: "Valor actual:",
        kind: EventKind::Measurement,
    },
];

/// Parse a line against [`LINE_RULES`].
pub fn parse_line(line: &str) -> ParsedEvent {
    parse_with_rules(line, LINE_RULES)
}

/// Parse a line against a caller-provided rule table.
pub fn parse_with_rules(line: &str, rules: &[LineRule]) -> ParsedEvent {
    let Some((rule, at)) = rules
        .iter()
        .find_map(|rule| line.find(rule.marker).map(|at| (rule, at)))
    else {
        return ParsedEvent::Unrecognized;
    };

    let tail = &line[at..];
    tail.find(rule.value_prefix)
        .and_then(|offset| leading_integer(&tail[offset + rule.value_prefix.len()..]))
        .map(|value| rule.kind.event(value))
        .unwrap_or(ParsedEvent::Unrecognized)
}

/// Read the run of ASCII digits after optional whitespace.
fn leading_integer(text: &str) -> Option<u32> {
    let text = text.trim_start();
    let end = text
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    if end == 0 {
        return None;
    }
    text[..end].parse().ok()
}
