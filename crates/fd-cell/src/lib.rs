#![forbid(unsafe_code)]

//! Raw CSV cell text to [`Cell`].
//!
//! Parsing is total: anything that is not missing, a number, or a valid
//! list/dict literal comes back as [`Cell::Text`].

pub mod literal;

use std::borrow::Cow;
use std::collections::BTreeMap;

use fd_types::{Cell, ColumnKind, MapValue};

pub use literal::{Literal, LiteralError, MAX_NESTING_DEPTH, parse_literal};

/// Tokens read as missing, matching the pandas default NA set that shows up
/// in exported CSVs.
pub const NULL_TOKENS: [&str; 11] = [
    "NA", "N/A", "n/a", "NaN", "nan", "-nan", "None", "null", "NULL", "<NA>", "#N/A",
];

const CURRENCY_SYMBOLS: [char; 6] = ['$', '€', '£', '¥', '₹', '₩'];

#[must_use]
pub fn is_null_token(trimmed: &str) -> bool {
    NULL_TOKENS.contains(&trimmed)
}

#[must_use]
pub fn parse_cell(raw: &str) -> Cell {
    let trimmed = raw.trim();
    if trimmed.is_empty() || is_null_token(trimmed) {
        return Cell::Missing;
    }

    if looks_composite(trimmed) {
        return match parse_literal(trimmed) {
            Ok(literal) => literal_to_cell(literal, trimmed),
            Err(_) => Cell::Text(trimmed.to_owned()),
        };
    }

    match parse_number(trimmed) {
        Some(value) => Cell::Number(value),
        None => Cell::Text(trimmed.to_owned()),
    }
}

/// Parse a cell for a column whose kind is already known.
///
/// Categorical columns keep the trimmed source text, so `"1.50"` and `"1.5"`
/// stay distinct tokens.
#[must_use]
pub fn parse_cell_as(raw: &str, kind: ColumnKind) -> Cell {
    match kind {
        ColumnKind::Categorical => {
            let trimmed = raw.trim();
            if trimmed.is_empty() || is_null_token(trimmed) {
                Cell::Missing
            } else {
                Cell::Text(trimmed.to_owned())
            }
        }
        ColumnKind::Numeric | ColumnKind::ComplexSequence | ColumnKind::ComplexMapping => {
            parse_cell(raw)
        }
    }
}

#[must_use]
pub fn looks_composite(trimmed: &str) -> bool {
    (trimmed.starts_with('[') && trimmed.ends_with(']'))
        || (trimmed.starts_with('{') && trimmed.ends_with('}'))
}

fn literal_to_cell(literal: Literal, source: &str) -> Cell {
    match literal {
        Literal::List(items) => {
            Cell::Sequence(items.into_iter().filter_map(Literal::into_token).collect())
        }
        Literal::Map(pairs) => {
            let mut map = BTreeMap::new();
            for (key, value) in pairs {
                let Some(key) = key.into_token() else {
                    continue;
                };
                let value = match value {
                    Literal::Num(v) => MapValue::Number(v),
                    Literal::Null => continue,
                    other => match other.into_token() {
                        Some(text) => MapValue::Text(text),
                        None => continue,
                    },
                };
                map.insert(key, value);
            }
            Cell::Mapping(map)
        }
        Literal::Str(_) | Literal::Num(_) | Literal::Bool(_) | Literal::Null => {
            Cell::Text(source.to_owned())
        }
    }
}

fn is_currency(c: char) -> bool {
    CURRENCY_SYMBOLS.contains(&c)
}

fn split_sign(text: &str) -> (Option<char>, &str) {
    match text.chars().next() {
        Some(sign @ ('-' | '+')) => (Some(sign), &text[1..]),
        _ => (None, text),
    }
}

/// Coerce numeric-looking text to a finite `f64`.
///
/// Accepts decimal and scientific forms with an optional sign, surrounding
/// currency symbols (`-$1,234.50`, `$-5`, `12€`), and comma thousands
/// separators that group digits in threes. Rejects `inf`/`nan` spellings.
#[must_use]
pub fn parse_number(text: &str) -> Option<f64> {
    let (mut sign, mut body) = split_sign(text.trim());
    body = body.trim_matches(is_currency).trim();
    if sign.is_none() {
        (sign, body) = split_sign(body);
    }
    if !body.starts_with(|c: char| c.is_ascii_digit() || c == '.') {
        return None;
    }

    let digits = if body.contains(',') {
        Cow::Owned(strip_thousands(body)?)
    } else {
        Cow::Borrowed(body)
    };
    let value = digits.parse::<f64>().ok()?;
    if !value.is_finite() {
        return None;
    }
    Some(if sign == Some('-') { -value } else { value })
}

fn strip_thousands(body: &str) -> Option<String> {
    let split = body
        .find(|c: char| matches!(c, '.' | 'e' | 'E'))
        .unwrap_or(body.len());
    let (int_part, rest) = body.split_at(split);
    if rest.contains(',') {
        return None;
    }

    let mut groups = int_part.split(',');
    let head = groups.next()?;
    if head.is_empty() || head.len() > 3 {
        return None;
    }
    let mut out = String::with_capacity(body.len());
    out.push_str(head);
    for group in groups {
        if group.len() != 3 {
            return None;
        }
        out.push_str(group);
    }
    out.push_str(rest);
    Some(out)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use fd_types::{Cell, ColumnKind, MapValue};
    use proptest::prelude::*;

    use super::{parse_cell, parse_cell_as, parse_literal, parse_number};

    #[test]
    fn empty_and_null_tokens_are_missing() {
        for raw in ["", "   ", "NA", "nan", "None", " NaN ", "null", "#N/A"] {
            assert_eq!(parse_cell(raw), Cell::Missing, "raw={raw:?}");
        }
    }

    #[test]
    fn numbers_in_plain_and_scientific_form() {
        assert_eq!(parse_cell("42"), Cell::Number(42.0));
        assert_eq!(parse_cell(" -3.25 "), Cell::Number(-3.25));
        assert_eq!(parse_cell("1.5e3"), Cell::Number(1500.0));
        assert_eq!(parse_cell(".5"), Cell::Number(0.5));
        assert_eq!(parse_cell("+7"), Cell::Number(7.0));
    }

    #[test]
    fn currency_and_thousands_are_stripped() {
        assert_eq!(parse_number("$1,234.50"), Some(1234.5));
        assert_eq!(parse_number("-$1,234"), Some(-1234.0));
        assert_eq!(parse_number("$-5"), Some(-5.0));
        assert_eq!(parse_number("12€"), Some(12.0));
        assert_eq!(parse_number("£ 3"), Some(3.0));
        assert_eq!(parse_number("1,000,000"), Some(1_000_000.0));
    }

    #[test]
    fn malformed_grouping_and_words_stay_text() {
        assert_eq!(parse_number("12,34"), None);
        assert_eq!(parse_number("1,2345"), None);
        assert_eq!(parse_number("1.5,000"), None);
        assert_eq!(parse_number(",123"), None);
        assert_eq!(parse_number("inf"), None);
        assert_eq!(parse_number("-infinity"), None);
        assert_eq!(parse_number("1e999"), None);
        assert_eq!(parse_number("$"), None);
        assert_eq!(parse_cell("12abc"), Cell::Text("12abc".to_owned()));
        assert_eq!(parse_cell("facebook"), Cell::Text("facebook".to_owned()));
    }

    #[test]
    fn list_literal_becomes_sequence() {
        assert_eq!(
            parse_cell("['facebook', 'instagram']"),
            Cell::Sequence(vec!["facebook".to_owned(), "instagram".to_owned()])
        );
        assert_eq!(
            parse_cell("[1, None, true, [2]]"),
            Cell::Sequence(vec!["1".to_owned(), "true".to_owned(), "[2]".to_owned()])
        );
        assert_eq!(parse_cell("[]"), Cell::Sequence(Vec::new()));
    }

    #[test]
    fn dict_literal_becomes_mapping() {
        let cell = parse_cell("{'lower_bound': '1000', 'upper_bound': 1999, 'note': None}");
        let mut expected = BTreeMap::new();
        expected.insert("lower_bound".to_owned(), MapValue::Text("1000".to_owned()));
        expected.insert("upper_bound".to_owned(), MapValue::Number(1999.0));
        assert_eq!(cell, Cell::Mapping(expected));
    }

    #[test]
    fn failed_literal_falls_back_to_text() {
        assert_eq!(
            parse_cell("[not a list]"),
            Cell::Text("[not a list]".to_owned())
        );
        assert_eq!(
            parse_cell("{'a', 'b'}"),
            Cell::Text("{'a', 'b'}".to_owned())
        );
        assert_eq!(
            parse_cell("[__import__('os')]"),
            Cell::Text("[__import__('os')]".to_owned())
        );
    }

    #[test]
    fn categorical_parse_keeps_source_text() {
        assert_eq!(
            parse_cell_as(" 1.50 ", ColumnKind::Categorical),
            Cell::Text("1.50".to_owned())
        );
        assert_eq!(parse_cell_as("NA", ColumnKind::Categorical), Cell::Missing);
        assert_eq!(parse_cell_as("1.50", ColumnKind::Numeric), Cell::Number(1.5));
        assert_eq!(
            parse_cell_as("['a']", ColumnKind::ComplexSequence),
            Cell::Sequence(vec!["a".to_owned()])
        );
    }

    proptest! {
        #[test]
        fn prop_parse_cell_is_total(raw in "\\PC{0,40}") {
            let cell = parse_cell(&raw);
            if let Cell::Number(v) = cell {
                prop_assert!(v.is_finite());
            }
        }

        #[test]
        fn prop_bracketed_garbage_never_panics(inner in "[\\[\\]{}'\",:0-9a-z\\\\ ]{0,30}") {
            let _ = parse_cell(&format!("[{inner}]"));
            let _ = parse_cell(&format!("{{{inner}}}"));
        }

        #[test]
        fn prop_rendered_literal_reparses(items in proptest::collection::vec("[a-z' ]{0,6}", 0..5)) {
            let quoted: Vec<String> = items
                .iter()
                .map(|s| format!("'{}'", s.replace('\'', "\\'")))
                .collect();
            let source = format!("[{}]", quoted.join(", "));
            let parsed = parse_literal(&source).expect("generated list parses");
            prop_assert_eq!(parse_literal(&parsed.to_string()).expect("rendered reparses"), parsed);
        }
    }
}
