// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Error types for phpunit-teamcity

use thiserror::Error;

/// Errors that can occur while decoding runner output
#[derive(Debug, Error)]
pub enum TeamcityError {
    /// A `##teamcity[...]` line whose payload could not be decoded
    #[error("Malformed service message ({reason}): {line}")]
    MalformedMessage {
        /// What was wrong with the payload
        reason: String,
        /// The offending line
        line: String,
    },

    /// A recognizer accepted a line but could not extract its fields
    #[error("{recognizer} recognizer could not parse line: {line}")]
    Recognizer {
        /// Name of the recognizer that accepted the line
        recognizer: &'static str,
        /// The offending line
        line: String,
    },

    /// Error serializing a record
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TeamcityError {
    pub(crate) fn malformed(reason: impl Into<String>, line: &str) -> Self {
        Self::MalformedMessage {
            reason: reason.into(),
            line: line.to_string(),
        }
    }

    pub(crate) fn recognizer(recognizer: &'static str, line: &str) -> Self {
        Self::Recognizer {
            recognizer,
            line: line.to_string(),
        }
    }
}
