// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Decoded record types
//!
//! Every recognized output line becomes one [`Record`]. Lifecycle records wrap a
//! [`TestEvent`]; everything else is informational and carries no correlation key.

use serde::{Deserialize, Serialize, Serializer};

use crate::error::TeamcityError;

// ============================================================================
// Lifecycle Events
// ============================================================================

/// The six lifecycle events of the TeamCity protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TestEventKind {
    /// `testSuiteStarted`
    TestSuiteStarted,
    /// `testSuiteFinished`
    TestSuiteFinished,
    /// `testStarted`
    TestStarted,
    /// `testFinished`
    TestFinished,
    /// `testFailed`
    TestFailed,
    /// `testIgnored`
    TestIgnored,
}

/// Where an event sits in a test's lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Opens a key
    Started,
    /// Marks the open key as failed or ignored
    Fault,
    /// Closes a key
    Finished,
}

impl TestEventKind {
    /// Look up the event for a service message name
    #[must_use]
    pub fn from_event_name(name: &str) -> Option<Self> {
        match name {
            "testSuiteStarted" => Some(Self::TestSuiteStarted),
            "testSuiteFinished" => Some(Self::TestSuiteFinished),
            "testStarted" => Some(Self::TestStarted),
            "testFinished" => Some(Self::TestFinished),
            "testFailed" => Some(Self::TestFailed),
            "testIgnored" => Some(Self::TestIgnored),
            _ => None,
        }
    }

    /// The service message name of this event
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TestSuiteStarted => "testSuiteStarted",
            Self::TestSuiteFinished => "testSuiteFinished",
            Self::TestStarted => "testStarted",
            Self::TestFinished => "testFinished",
            Self::TestFailed => "testFailed",
            Self::TestIgnored => "testIgnored",
        }
    }

    /// Group the event into started-like, fault-like or finished-like
    #[must_use]
    pub fn phase(self) -> Phase {
        match self {
            Self::TestSuiteStarted | Self::TestStarted => Phase::Started,
            Self::TestFailed | Self::TestIgnored => Phase::Fault,
            Self::TestSuiteFinished | Self::TestFinished => Phase::Finished,
        }
    }

    /// Check if this is a failed or ignored event
    #[must_use]
    pub fn is_fault(self) -> bool {
        self.phase() == Phase::Fault
    }

    /// Check if this event belongs to a suite rather than a single test
    #[must_use]
    pub fn is_suite(self) -> bool {
        matches!(self, Self::TestSuiteStarted | Self::TestSuiteFinished)
    }
}

impl std::fmt::Display for TestEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A source location reported alongside a failure
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FaultDetail {
    /// Path of the file
    pub file: String,
    /// 1-based line number
    pub line: u32,
}

/// Key identifying one in-flight test across concurrent flows
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CorrelationKey {
    /// Test display name
    pub name: String,
    /// Flow the test runs in
    pub flow_id: u64,
}

impl std::fmt::Display for CorrelationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (flow {})", self.name, self.flow_id)
    }
}

/// A lifecycle event decoded from a service message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestEvent {
    /// Lifecycle event
    pub event: TestEventKind,
    /// Test or suite display name
    pub name: String,
    /// Concurrent execution lane
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow_id: Option<u64>,
    /// Declaration path derived from the location hint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// File path derived from the location hint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    /// Raw `php_qn://` location hint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_hint: Option<String>,
    /// `id` without any data set suffix
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_id: Option<String>,
    /// Duration in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
    /// Failure or skip message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Source locations extracted from the message and details
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<FaultDetail>,
    /// Failure type, e.g. `comparisonFailure`
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub fault_type: Option<String>,
    /// Actual value of a comparison failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual: Option<String>,
    /// Expected value of a comparison failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
}

impl TestEvent {
    /// Create an event with only a kind and a name
    #[must_use]
    pub fn new(event: TestEventKind, name: impl Into<String>) -> Self {
        Self {
            event,
            name: name.into(),
            flow_id: None,
            id: None,
            file: None,
            location_hint: None,
            test_id: None,
            duration: None,
            message: None,
            details: Vec::new(),
            fault_type: None,
            actual: None,
            expected: None,
        }
    }

    /// Set the flow id
    #[must_use]
    pub fn with_flow_id(mut self, flow_id: u64) -> Self {
        self.flow_id = Some(flow_id);
        self
    }

    /// Set the message
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Set the duration in milliseconds
    #[must_use]
    pub fn with_duration(mut self, duration: u64) -> Self {
        self.duration = Some(duration);
        self
    }

    /// The correlation key, if the event carries a flow id
    #[must_use]
    pub fn key(&self) -> Option<CorrelationKey> {
        self.flow_id.map(|flow_id| CorrelationKey {
            name: self.name.clone(),
            flow_id,
        })
    }

    /// Check if this event is a failed or ignored event
    #[must_use]
    pub fn is_fault(&self) -> bool {
        self.event.is_fault()
    }

    /// Overlay every field `other` carries onto `self`, including its event
    pub fn merge_from(&mut self, other: TestEvent) {
        self.event = other.event;
        self.name = other.name;
        overlay(&mut self.flow_id, other.flow_id);
        overlay(&mut self.id, other.id);
        overlay(&mut self.file, other.file);
        overlay(&mut self.location_hint, other.location_hint);
        overlay(&mut self.test_id, other.test_id);
        overlay(&mut self.duration, other.duration);
        overlay(&mut self.message, other.message);
        overlay(&mut self.fault_type, other.fault_type);
        overlay(&mut self.actual, other.actual);
        overlay(&mut self.expected, other.expected);
        if !other.details.is_empty() {
            self.details = other.details;
        }
    }

    /// Fold a further fault message into this one
    ///
    /// Messages are joined by a blank line and details appended in arrival order.
    pub fn append_fault(&mut self, other: TestEvent) {
        self.message = match (self.message.take(), other.message) {
            (Some(first), Some(second)) => Some(format!("{first}\n\n{second}")),
            (first, second) => first.or(second),
        };
        self.details.extend(other.details);
    }
}

fn overlay<T>(target: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *target = value;
    }
}

// ============================================================================
// Informational Records
// ============================================================================

/// Number of tests a suite is about to run (`testCount`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCount {
    /// Number of tests
    pub count: u64,
    /// Flow that reported the count
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow_id: Option<u64>,
}

/// `PHPUnit 10.5.0 by Sebastian Bergmann and contributors.`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
    /// PHPUnit version
    pub phpunit: String,
    /// ParaTest version, when tests run in parallel
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paratest: Option<String>,
    /// The original line
    pub text: String,
}

/// `Runtime:       PHP 8.3.0`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeInfo {
    /// Runtime description
    pub runtime: String,
    /// The original line
    pub text: String,
}

/// `Configuration: /app/phpunit.xml`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigurationInfo {
    /// Configuration file path
    pub configuration: String,
    /// The original line
    pub text: String,
}

/// `Processes:     8`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessesInfo {
    /// Worker process count as printed
    pub processes: String,
    /// The original line
    pub text: String,
}

/// `Time: 00:00.049, Memory: 6.00 MB`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingInfo {
    /// Elapsed time as printed
    pub time: String,
    /// Peak memory as printed
    pub memory: String,
    /// The original line
    pub text: String,
}

/// Aggregate counts from the closing summary line
///
/// A `None` field was not mentioned on the line, which is not the same as zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tests: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assertions: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failures: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skipped: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub incomplete: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risky: Option<u64>,
    /// The original line
    pub text: String,
}

// ============================================================================
// Record
// ============================================================================

/// The `kind` tag of a serialized record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RecordKind {
    TestSuiteStarted,
    TestSuiteFinished,
    TestStarted,
    TestFinished,
    TestFailed,
    TestIgnored,
    TestCount,
    TestVersion,
    TestRuntime,
    TestConfiguration,
    TestProcesses,
    TestDuration,
    TestResultSummary,
}

impl From<TestEventKind> for RecordKind {
    fn from(event: TestEventKind) -> Self {
        match event {
            TestEventKind::TestSuiteStarted => Self::TestSuiteStarted,
            TestEventKind::TestSuiteFinished => Self::TestSuiteFinished,
            TestEventKind::TestStarted => Self::TestStarted,
            TestEventKind::TestFinished => Self::TestFinished,
            TestEventKind::TestFailed => Self::TestFailed,
            TestEventKind::TestIgnored => Self::TestIgnored,
        }
    }
}

/// One decoded line of runner output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    /// Lifecycle event, subject to correlation
    Test(TestEvent),
    /// `testCount` service message
    TestCount(TestCount),
    /// Version banner
    Version(VersionInfo),
    /// Runtime banner
    Runtime(RuntimeInfo),
    /// Configuration path
    Configuration(ConfigurationInfo),
    /// Worker process count
    Processes(ProcessesInfo),
    /// Time and memory footer
    Timing(TimingInfo),
    /// Pass/fail summary
    Summary(SummaryInfo),
}

impl Record {
    /// The `kind` tag of this record
    #[must_use]
    pub fn kind(&self) -> RecordKind {
        match self {
            Self::Test(event) => event.event.into(),
            Self::TestCount(_) => RecordKind::TestCount,
            Self::Version(_) => RecordKind::TestVersion,
            Self::Runtime(_) => RecordKind::TestRuntime,
            Self::Configuration(_) => RecordKind::TestConfiguration,
            Self::Processes(_) => RecordKind::TestProcesses,
            Self::Timing(_) => RecordKind::TestDuration,
            Self::Summary(_) => RecordKind::TestResultSummary,
        }
    }

    /// Borrow the lifecycle event, if this is one
    #[must_use]
    pub fn as_test_event(&self) -> Option<&TestEvent> {
        match self {
            Self::Test(event) => Some(event),
            _ => None,
        }
    }

    /// Take the lifecycle event, if this is one
    #[must_use]
    pub fn into_test_event(self) -> Option<TestEvent> {
        match self {
            Self::Test(event) => Some(event),
            _ => None,
        }
    }

    /// Serialize the record as a single JSON line
    ///
    /// # Errors
    ///
    /// Returns `TeamcityError::Json` if serialization fails.
    pub fn to_json(&self) -> Result<String, TeamcityError> {
        serde_json::to_string(self).map_err(TeamcityError::from)
    }
}

#[derive(Serialize)]
struct Tagged<'a, T: Serialize> {
    kind: RecordKind,
    #[serde(flatten)]
    body: &'a T,
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let kind = self.kind();
        match self {
            Self::Test(body) => Tagged { kind, body }.serialize(serializer),
            Self::TestCount(body) => Tagged { kind, body }.serialize(serializer),
            Self::Version(body) => Tagged { kind, body }.serialize(serializer),
            Self::Runtime(body) => Tagged { kind, body }.serialize(serializer),
            Self::Configuration(body) => Tagged { kind, body }.serialize(serializer),
            Self::Processes(body) => Tagged { kind, body }.serialize(serializer),
            Self::Timing(body) => Tagged { kind, body }.serialize(serializer),
            Self::Summary(body) => Tagged { kind, body }.serialize(serializer),
        }
    }
}
