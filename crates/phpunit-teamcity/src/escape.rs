// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! TeamCity escape sequences
//!
//! Service message values escape six reserved characters with a leading `|`:
//!
//! | literal | escaped |
//! |---------|---------|
//! | `\|`    | `\|\|`  |
//! | `'`     | `\|'`   |
//! | `\n`    | `\|n`   |
//! | `\r`    | `\|r`   |
//! | `]`     | `\|]`   |
//! | `[`     | `\|[`   |

use serde_json::Value;

/// Placeholder that stands in for an escaped single quote while a payload is tokenized
pub const SINGLE_QUOTE_PLACEHOLDER: &str = "%%%SINGLE_QUOTE%%%";

/// Escape reserved characters in a value
#[must_use]
pub fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '|' => escaped.push_str("||"),
            '\'' => escaped.push_str("|'"),
            '\n' => escaped.push_str("|n"),
            '\r' => escaped.push_str("|r"),
            ']' => escaped.push_str("|]"),
            '[' => escaped.push_str("|["),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Replace escape sequences with the characters they stand for
///
/// A `|` that does not start a known sequence is kept as-is.
#[must_use]
pub fn unescape(value: &str) -> String {
    let mut unescaped = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '|' {
            unescaped.push(c);
            continue;
        }
        let literal = match chars.peek() {
            Some('|') => '|',
            Some('\'') => '\'',
            Some('n') => '\n',
            Some('r') => '\r',
            Some(']') => ']',
            Some('[') => '[',
            _ => {
                unescaped.push('|');
                continue;
            }
        };
        chars.next();
        unescaped.push(literal);
    }
    unescaped
}

/// Hide escaped single quotes (`|'`) behind [`SINGLE_QUOTE_PLACEHOLDER`]
///
/// Other escape sequences are skipped over, so the quote in `||'` still closes a value.
#[must_use]
pub fn escape_single_quote(value: &str) -> String {
    let mut protected = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '|' {
            protected.push(c);
            continue;
        }
        match chars.next() {
            Some('\'') => protected.push_str(SINGLE_QUOTE_PLACEHOLDER),
            Some(next) => {
                protected.push('|');
                protected.push(next);
            }
            None => protected.push('|'),
        }
    }
    protected
}

/// Turn [`SINGLE_QUOTE_PLACEHOLDER`] back into a literal single quote
#[must_use]
pub fn unescape_single_quote(value: &str) -> String {
    value.replace(SINGLE_QUOTE_PLACEHOLDER, "'")
}

/// Escape every string inside a JSON value, leaving other scalars untouched
#[must_use]
pub fn escape_value(value: Value) -> Value {
    map_strings(value, &escape)
}

/// Unescape every string inside a JSON value, leaving other scalars untouched
#[must_use]
pub fn unescape_value(value: Value) -> Value {
    map_strings(value, &unescape)
}

fn map_strings(value: Value, f: &dyn Fn(&str) -> String) -> Value {
    match value {
        Value::String(s) => Value::String(f(&s)),
        Value::Array(items) => Value::Array(items.into_iter().map(|v| map_strings(v, f)).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, map_strings(v, f)))
                .collect(),
        ),
        other => other,
    }
}
