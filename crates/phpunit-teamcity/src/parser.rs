// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Line-by-line parsing of PHPUnit output
//!
//! [`OutputParser`] classifies each line, decodes it and runs lifecycle events through an
//! [`EventCorrelator`]. One parser belongs to one test run.
//!
//! # Example
//!
//! ```
//! use phpunit_teamcity::parser::OutputParser;
//!
//! let mut parser = OutputParser::new();
//! for line in [
//!     "PHPUnit 10.5.0 by Sebastian Bergmann and contributors.",
//!     "##teamcity[testStarted name='test_ok' flowId='1']",
//!     "##teamcity[testFinished name='test_ok' duration='2' flowId='1']",
//!     "OK (1 test, 1 assertion)",
//! ] {
//!     parser.process_line(line).unwrap();
//! }
//!
//! let summary = parser.finish();
//! assert_eq!(summary.passed, 1);
//! assert!(summary.all_passed());
//! ```

use std::collections::BTreeMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::correlator::EventCorrelator;
use crate::error::TeamcityError;
use crate::record::{
    ConfigurationInfo, CorrelationKey, Phase, ProcessesInfo, Record, RuntimeInfo, SummaryInfo,
    TestEvent, TimingInfo, VersionInfo,
};
use crate::recognizers::recognize;
use crate::result::{TestOutcome, TestResult};
use crate::service_message::{self, ServiceMessage};

/// Decode a single line without correlating it
///
/// Service messages are tried first, then the informational recognizers. Lines that
/// match nothing yield `Ok(None)`.
///
/// # Errors
///
/// Returns `TeamcityError` if a service message is malformed or a recognizer accepts the
/// line but cannot parse it.
pub fn decode_line(line: &str) -> Result<Option<Record>, TeamcityError> {
    if ServiceMessage::is_service_message(line) {
        return service_message::decode(line);
    }
    let record = recognize(line)?;
    if record.is_none() && !line.trim().is_empty() {
        debug!(line, "Dropping unrecognized line");
    }
    Ok(record)
}

// ============================================================================
// Run Summary
// ============================================================================

/// Informational records seen during a run; later lines replace earlier ones
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunInfo {
    /// Version banner
    pub version: Option<VersionInfo>,
    /// Runtime banner
    pub runtime: Option<RuntimeInfo>,
    /// Configuration path
    pub configuration: Option<ConfigurationInfo>,
    /// Worker process count
    pub processes: Option<ProcessesInfo>,
    /// Time and memory footer
    pub timing: Option<TimingInfo>,
    /// Summary line counts
    pub summary: Option<SummaryInfo>,
}

/// Aggregated results from a test run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// Tests announced by `testCount`, summed over flows
    pub expected: u64,
    /// Tests that reached a terminal record
    pub total: usize,
    /// Tests passed
    pub passed: usize,
    /// Tests failed
    pub failed: usize,
    /// Tests ignored
    pub ignored: usize,
    /// Sum of test durations in milliseconds
    pub duration_ms: u64,
    /// Informational records
    pub info: RunInfo,
    /// Individual test results in completion order
    pub results: Vec<TestResult>,
    /// Tests and suites that started but never finished
    pub unfinished: Vec<TestEvent>,
}

impl RunSummary {
    /// Check if all tests passed and nothing was left open
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.failed == 0 && self.unfinished.is_empty()
    }

    /// Get failing tests
    #[must_use]
    pub fn failing_tests(&self) -> Vec<&TestResult> {
        self.results.iter().filter(|r| r.failed()).collect()
    }
}

// ============================================================================
// Streaming Parser
// ============================================================================

/// A streaming parser for PHPUnit TeamCity output
#[derive(Debug, Default)]
pub struct OutputParser {
    correlator: EventCorrelator,
    results: Vec<TestResult>,
    info: RunInfo,
    test_counts: BTreeMap<Option<u64>, u64>,
    /// Faults of tests without a flow id, waiting for their finish
    uncorrelated_faults: BTreeMap<String, TestEvent>,
}

impl OutputParser {
    /// Create a new parser for one run
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Process a single line of output
    ///
    /// Returns the record to surface for this line: started events as they happen,
    /// terminal records once a test finishes, and informational records unchanged.
    /// Faults are held back until their test finishes.
    ///
    /// # Errors
    ///
    /// Returns `TeamcityError` if the line is a malformed service message or a
    /// recognizer cannot parse a line it accepted.
    pub fn process_line(&mut self, line: &str) -> Result<Option<Record>, TeamcityError> {
        let Some(record) = decode_line(line)? else {
            return Ok(None);
        };
        let emitted = self.correlator.handle(record);
        if let Some(record) = &emitted {
            self.observe(record);
        }
        Ok(emitted)
    }

    fn observe(&mut self, record: &Record) {
        match record {
            Record::Test(event) if event.event.is_suite() => {}
            Record::Test(event) => match (event.event.phase(), event.key()) {
                (Phase::Started, _) => {}
                (Phase::Fault, None) => match self.uncorrelated_faults.get_mut(&event.name) {
                    Some(stored) => stored.append_fault(event.clone()),
                    None => {
                        self.uncorrelated_faults
                            .insert(event.name.clone(), event.clone());
                    }
                },
                (Phase::Finished, None) => {
                    let terminal = match self.uncorrelated_faults.remove(&event.name) {
                        Some(mut fault) => {
                            fault.duration = event.duration.or(fault.duration);
                            fault
                        }
                        None => event.clone(),
                    };
                    self.results
                        .push(TestResult::from_event(terminal, Utc::now()));
                }
                (Phase::Fault | Phase::Finished, Some(_)) => {
                    self.results
                        .push(TestResult::from_event(event.clone(), Utc::now()));
                }
            },
            Record::TestCount(count) => {
                self.test_counts.entry(count.flow_id).or_insert(count.count);
            }
            Record::Version(version) => self.info.version = Some(version.clone()),
            Record::Runtime(runtime) => self.info.runtime = Some(runtime.clone()),
            Record::Configuration(config) => self.info.configuration = Some(config.clone()),
            Record::Processes(processes) => self.info.processes = Some(processes.clone()),
            Record::Timing(timing) => self.info.timing = Some(timing.clone()),
            Record::Summary(summary) => self.info.summary = Some(summary.clone()),
        }
    }

    /// Get all accumulated results
    #[must_use]
    pub fn results(&self) -> &[TestResult] {
        &self.results
    }

    /// Informational records seen so far
    #[must_use]
    pub fn info(&self) -> &RunInfo {
        &self.info
    }

    /// Keys started but not yet finished
    #[must_use]
    pub fn open_keys(&self) -> Vec<&CorrelationKey> {
        self.correlator.open_keys()
    }

    /// Finalize the run and return its summary
    ///
    /// Anything still open is reported in [`RunSummary::unfinished`].
    #[must_use]
    pub fn finish(self) -> RunSummary {
        let count = |outcome| self.results.iter().filter(|r| r.outcome == outcome).count();
        let passed = count(TestOutcome::Passed);
        let failed = count(TestOutcome::Failed);
        let ignored = count(TestOutcome::Ignored);
        let duration_ms: u64 = self.results.iter().map(|r| r.duration_ms).sum();
        let mut unfinished = self.correlator.finish();
        for (name, fault) in self.uncorrelated_faults {
            warn!(%name, event = %fault.event, "Test never finished");
            unfinished.push(fault);
        }

        RunSummary {
            expected: self.test_counts.values().sum(),
            total: self.results.len(),
            passed,
            failed,
            ignored,
            duration_ms,
            info: self.info,
            results: self.results,
            unfinished,
        }
    }
}

/// Parse a complete captured output
///
/// Malformed lines are logged and skipped.
#[must_use]
pub fn parse_output(output: &str) -> RunSummary {
    let mut parser = OutputParser::new();
    for (index, line) in output.lines().enumerate() {
        if let Err(err) = parser.process_line(line) {
            warn!(line = index + 1, error = %err, "Skipping malformed line");
        }
    }
    parser.finish()
}
