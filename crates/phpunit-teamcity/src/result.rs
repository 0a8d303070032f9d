// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Test result types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::record::{FaultDetail, TestEvent, TestEventKind};

/// Represents the terminal outcome of one test
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResult {
    /// Test display name
    pub name: String,
    /// Stable identifier without data set suffix, when known
    pub test_id: Option<String>,
    /// Identifier including data set suffix, when known
    pub id: Option<String>,
    /// Source file, when known
    pub file: Option<String>,
    /// Flow the test ran in
    pub flow_id: Option<u64>,
    /// Test outcome
    pub outcome: TestOutcome,
    /// Duration in milliseconds
    pub duration_ms: u64,
    /// Timestamp when the result was recorded
    pub timestamp: DateTime<Utc>,
    /// Failure or skip message
    pub message: Option<String>,
    /// Source locations attached to the failure
    pub details: Vec<FaultDetail>,
}

/// Possible test outcomes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestOutcome {
    /// Test passed
    Passed,
    /// Test failed
    Failed,
    /// Test was ignored/skipped
    Ignored,
}

impl TestOutcome {
    /// Outcome implied by a terminal lifecycle event
    #[must_use]
    pub fn from_event(event: TestEventKind) -> Self {
        match event {
            TestEventKind::TestFailed => Self::Failed,
            TestEventKind::TestIgnored => Self::Ignored,
            TestEventKind::TestSuiteStarted
            | TestEventKind::TestSuiteFinished
            | TestEventKind::TestStarted
            | TestEventKind::TestFinished => Self::Passed,
        }
    }
}

impl TestResult {
    /// Build a result from a terminal event emitted by the correlator
    #[must_use]
    pub fn from_event(event: TestEvent, timestamp: DateTime<Utc>) -> Self {
        Self {
            outcome: TestOutcome::from_event(event.event),
            name: event.name,
            test_id: event.test_id,
            id: event.id,
            file: event.file,
            flow_id: event.flow_id,
            duration_ms: event.duration.unwrap_or(0),
            timestamp,
            message: event.message,
            details: event.details,
        }
    }

    /// Check if the test passed
    #[must_use]
    pub fn passed(&self) -> bool {
        self.outcome == TestOutcome::Passed
    }

    /// Check if the test failed
    #[must_use]
    pub fn failed(&self) -> bool {
        self.outcome == TestOutcome::Failed
    }

    /// Check if the test was ignored
    #[must_use]
    pub fn ignored(&self) -> bool {
        self.outcome == TestOutcome::Ignored
    }
}
