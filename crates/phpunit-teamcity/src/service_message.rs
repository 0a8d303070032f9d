// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! TeamCity service message decoding
//!
//! A service message is a single line of the form
//!
//! ```text
//! ##teamcity[testFailed name='test_sum' message='Failed asserting that 3 is 4.' details=' /app/tests/MathTest.php:12|n' flowId='4711']
//! ```
//!
//! The first bare token is the event name, followed by `key='value'` pairs whose values use
//! the escapes from [`crate::escape`].
//!
//! # Example
//!
//! ```
//! use phpunit_teamcity::service_message::decode;
//! use phpunit_teamcity::record::TestEventKind;
//!
//! let line = "##teamcity[testStarted name='test_foo' locationHint='php_qn://src/FooTest.php::\\Ns\\FooTest::test_foo' flowId='1']";
//! let record = decode(line).unwrap().unwrap();
//! let event = record.as_test_event().unwrap();
//! assert_eq!(event.event, TestEventKind::TestStarted);
//! assert_eq!(event.file.as_deref(), Some("src/FooTest.php"));
//! assert_eq!(event.id.as_deref(), Some("Ns\\FooTest::test_foo"));
//! ```

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::error::TeamcityError;
use crate::escape::{escape, escape_single_quote, unescape, unescape_single_quote};
use crate::record::{FaultDetail, Record, TestCount, TestEvent, TestEventKind};

/// Prefix that marks a service message line
pub const MARKER: &str = "##teamcity[";

const LOCATION_SCHEME: &str = "php_qn://";

static DATA_SET_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\s+with\s+data\s+set\s+(?:#\d+|".*")$"#).expect("valid data set regex")
});

static FILE_AND_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*-*\s*(?P<file>.+?):(?P<line>\d+)\s*$").expect("valid file and line regex")
});

// ============================================================================
// Raw Messages
// ============================================================================

/// A tokenized service message: event name plus ordered attributes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceMessage {
    /// Event name, e.g. `testStarted`
    pub event: String,
    /// Unescaped attributes in the order they appeared
    pub attributes: Vec<(String, String)>,
}

impl ServiceMessage {
    /// Create a message with no attributes
    #[must_use]
    pub fn new(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            attributes: Vec::new(),
        }
    }

    /// Add an attribute
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }

    /// Check whether a line is a service message
    #[must_use]
    pub fn is_service_message(line: &str) -> bool {
        line.trim_start().starts_with(MARKER)
    }

    /// Parse a line into a service message
    ///
    /// Returns `Ok(None)` when the line does not start with [`MARKER`].
    ///
    /// # Errors
    ///
    /// Returns `TeamcityError::MalformedMessage` if the payload is not a bracketed
    /// event name followed by `key='value'` pairs.
    pub fn parse(line: &str) -> Result<Option<Self>, TeamcityError> {
        let Some(rest) = line.trim_start().strip_prefix(MARKER) else {
            return Ok(None);
        };
        let payload = rest
            .trim_end()
            .strip_suffix(']')
            .ok_or_else(|| TeamcityError::malformed("missing closing bracket", line))?;

        let unescaped = unescape(&escape_single_quote(payload));
        tokenize(&unescaped)
            .map(Some)
            .map_err(|reason| TeamcityError::malformed(reason, line))
    }

    /// Look up an attribute value
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Render the message back to a protocol line
    #[must_use]
    pub fn to_line(&self) -> String {
        let mut line = format!("{MARKER}{}", self.event);
        for (key, value) in &self.attributes {
            line.push_str(&format!(" {key}='{}'", escape(value)));
        }
        line.push(']');
        line
    }
}

/// Split an unescaped payload into the event name and its `key='value'` pairs
///
/// Escaped quotes must already be replaced by the placeholder; they are restored per value.
fn tokenize(payload: &str) -> Result<ServiceMessage, &'static str> {
    let mut rest = payload.trim_start();

    let name_end = rest.find(char::is_whitespace).unwrap_or(rest.len());
    let event = &rest[..name_end];
    if event.is_empty() {
        return Err("missing event name");
    }
    if event.contains(['=', '\'']) {
        return Err("event name must be a bare token");
    }
    let mut message = ServiceMessage::new(event);
    rest = rest[name_end..].trim_start();

    while !rest.is_empty() {
        let (key, after_key) = rest.split_once("='").ok_or("expected key='value'")?;
        if key.is_empty() || key.contains(char::is_whitespace) {
            return Err("invalid attribute name");
        }
        let (value, after_value) = after_key.split_once('\'').ok_or("unterminated value")?;
        if !after_value.is_empty() && !after_value.starts_with(char::is_whitespace) {
            return Err("attributes must be separated by whitespace");
        }
        message
            .attributes
            .push((key.to_string(), unescape_single_quote(value)));
        rest = after_value.trim_start();
    }

    Ok(message)
}

// ============================================================================
// Derived Fields
// ============================================================================

/// File and declaration path encoded in a `php_qn://` location hint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationHint {
    /// Source file path
    pub file: String,
    /// Declaration path, e.g. `Ns\FooTest::test_foo with data set #1`
    pub id: Option<String>,
    /// Declaration path without the data set suffix
    pub test_id: Option<String>,
}

/// Split a location hint into file, id and stable test id
#[must_use]
pub fn parse_location_hint(hint: &str) -> LocationHint {
    let hint = hint.strip_prefix(LOCATION_SCHEME).unwrap_or(hint);
    let collapsed = hint.replace("::\\", "::");
    let mut segments = collapsed.split("::");
    let file = segments.next().unwrap_or_default().to_string();
    let id = segments.collect::<Vec<_>>().join("::");

    if id.is_empty() {
        return LocationHint {
            file,
            id: None,
            test_id: None,
        };
    }
    let test_id = strip_data_set(&id).to_string();
    LocationHint {
        file,
        id: Some(id),
        test_id: Some(test_id),
    }
}

/// Remove a trailing ` with data set #N` / ` with data set "name"` suffix
#[must_use]
pub fn strip_data_set(id: &str) -> &str {
    match DATA_SET_SUFFIX.find(id) {
        Some(m) => &id[..m.start()],
        None => id,
    }
}

/// Read a `<path>:<line>` location from one line of text
fn file_and_line(line: &str) -> Option<FaultDetail> {
    let caps = FILE_AND_LINE.captures(line)?;
    let file = caps.name("file")?.as_str().trim();
    let line = caps.name("line")?.as_str().parse().ok()?;
    Some(FaultDetail {
        file: file.to_string(),
        line,
    })
}

/// Pull source locations out of a fault's message and details
///
/// Location lines found in `message` are dropped from it and come first, followed by the
/// locations listed in `details`. Returns the trimmed message and the locations.
#[must_use]
pub fn parse_fault_details(message: &str, details: &str) -> (String, Vec<FaultDetail>) {
    let mut kept = Vec::new();
    let mut found = Vec::new();
    for line in message.lines() {
        match file_and_line(line) {
            Some(detail) => found.push(detail),
            None => kept.push(line),
        }
    }
    found.extend(details.lines().filter_map(file_and_line));
    (kept.join("\n").trim().to_string(), found)
}

// ============================================================================
// Decoding
// ============================================================================

/// Decode a line into a record if it is a service message
///
/// Returns `Ok(None)` for lines without the marker and for service messages this crate
/// has no record type for.
///
/// # Errors
///
/// Returns `TeamcityError::MalformedMessage` if the payload cannot be tokenized or a
/// lifecycle event lacks a name or carries a non-numeric flow id, duration or count.
pub fn decode(line: &str) -> Result<Option<Record>, TeamcityError> {
    let Some(message) = ServiceMessage::parse(line)? else {
        return Ok(None);
    };

    if message.event == "testCount" {
        let count = required_number(&message, "count", line)?;
        let flow_id = optional_number(&message, "flowId", line)?;
        return Ok(Some(Record::TestCount(TestCount { count, flow_id })));
    }

    let Some(kind) = TestEventKind::from_event_name(&message.event) else {
        debug!(event = %message.event, "Ignoring unsupported service message");
        return Ok(None);
    };

    let name = message
        .get("name")
        .ok_or_else(|| TeamcityError::malformed("missing name", line))?;
    let mut event = TestEvent::new(kind, name);
    event.flow_id = optional_number(&message, "flowId", line)?;
    event.duration = optional_duration(&message, line)?;
    event.message = message.get("message").map(str::to_string);
    event.fault_type = message.get("type").map(str::to_string);
    event.actual = message.get("actual").map(str::to_string);
    event.expected = message.get("expected").map(str::to_string);

    if let Some(hint) = message.get("locationHint") {
        let location = parse_location_hint(hint);
        event.location_hint = Some(hint.to_string());
        event.file = Some(location.file);
        event.id = location.id;
        event.test_id = location.test_id;
    }

    if let Some(details) = message.get("details") {
        let (cleaned, found) = parse_fault_details(event.message.as_deref().unwrap_or(""), details);
        event.message = Some(cleaned);
        event.details = found;
    }

    Ok(Some(Record::Test(event)))
}

fn optional_number(
    message: &ServiceMessage,
    key: &str,
    line: &str,
) -> Result<Option<u64>, TeamcityError> {
    message
        .get(key)
        .map(|raw| {
            raw.trim()
                .parse()
                .map_err(|_| TeamcityError::malformed(format!("{key} is not a number"), line))
        })
        .transpose()
}

fn required_number(message: &ServiceMessage, key: &str, line: &str) -> Result<u64, TeamcityError> {
    optional_number(message, key, line)?
        .ok_or_else(|| TeamcityError::malformed(format!("missing {key}"), line))
}

/// Durations are whole milliseconds, but fractional values are tolerated and rounded
fn optional_duration(message: &ServiceMessage, line: &str) -> Result<Option<u64>, TeamcityError> {
    let Some(raw) = message.get("duration") else {
        return Ok(None);
    };
    let raw = raw.trim();
    if let Ok(millis) = raw.parse::<u64>() {
        return Ok(Some(millis));
    }
    match raw.parse::<f64>() {
        Ok(millis) if millis.is_finite() && millis >= 0.0 => Ok(Some(millis.round() as u64)),
        _ => Err(TeamcityError::malformed("duration is not a number", line)),
    }
}
