// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Fuzz target for lifecycle correlation
//!
//! Builds structured lifecycle messages from arbitrary steps so the correlator sees
//! well-formed but out-of-order, repeated and unfinished sequences across flows.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use phpunit_teamcity::OutputParser;
use phpunit_teamcity::service_message::ServiceMessage;

#[derive(Debug, Arbitrary)]
enum Step {
    Started { test: u8, flow: u8 },
    Failed { test: u8, flow: u8, message: String, details: String },
    Ignored { test: u8, flow: u8 },
    Finished { test: u8, flow: u8, duration: u16 },
    SuiteStarted { flow: u8 },
    SuiteFinished { flow: u8 },
}

impl Step {
    fn to_line(&self) -> String {
        let message = match self {
            Step::Started { test, flow } => ServiceMessage::new("testStarted")
                .with("name", format!("test_{test}"))
                .with("flowId", flow.to_string()),
            Step::Failed {
                test,
                flow,
                message,
                details,
            } => ServiceMessage::new("testFailed")
                .with("name", format!("test_{test}"))
                .with("message", message.clone())
                .with("details", details.clone())
                .with("flowId", flow.to_string()),
            Step::Ignored { test, flow } => ServiceMessage::new("testIgnored")
                .with("name", format!("test_{test}"))
                .with("message", "skipped")
                .with("flowId", flow.to_string()),
            Step::Finished {
                test,
                flow,
                duration,
            } => ServiceMessage::new("testFinished")
                .with("name", format!("test_{test}"))
                .with("duration", duration.to_string())
                .with("flowId", flow.to_string()),
            Step::SuiteStarted { flow } => ServiceMessage::new("testSuiteStarted")
                .with("name", "Tests\\FuzzTest")
                .with("flowId", flow.to_string()),
            Step::SuiteFinished { flow } => ServiceMessage::new("testSuiteFinished")
                .with("name", "Tests\\FuzzTest")
                .with("flowId", flow.to_string()),
        };
        message.to_line()
    }
}

fuzz_target!(|steps: Vec<Step>| {
    let mut parser = OutputParser::new();
    for step in &steps {
        // Rendered messages are always well formed
        assert!(parser.process_line(&step.to_line()).is_ok());
    }
    let summary = parser.finish();
    assert_eq!(
        summary.total,
        summary.passed + summary.failed + summary.ignored
    );
});
