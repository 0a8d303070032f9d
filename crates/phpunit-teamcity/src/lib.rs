// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! phpunit-teamcity: decoding of PHPUnit TeamCity reporter output
//!
//! This library crate turns the lines PHPUnit (or ParaTest) prints with `--teamcity` into
//! typed records, and folds the start/fail/finish messages of each test into a single
//! terminal record even when parallel workers interleave their output.
//!
//! # Example
//!
//! ```no_run
//! use phpunit_teamcity::{OutputParser, parse_output};
//!
//! // Parse complete output
//! let output = "##teamcity[testStarted name='test_ok' flowId='1']";
//! let summary = parse_output(output);
//!
//! // Or feed lines as the runner prints them
//! let mut parser = OutputParser::new();
//! if let Some(record) = parser.process_line(output).unwrap() {
//!     println!("{}", record.to_json().unwrap());
//! }
//! ```

pub mod correlator;
pub mod discovery;
pub mod error;
pub mod escape;
pub mod parser;
pub mod recognizers;
pub mod record;
pub mod result;
pub mod service_message;

pub use correlator::EventCorrelator;
pub use error::TeamcityError;
pub use parser::{OutputParser, RunInfo, RunSummary, decode_line, parse_output};
pub use record::{CorrelationKey, FaultDetail, Record, RecordKind, TestEvent, TestEventKind};
pub use result::{TestOutcome, TestResult};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::TeamcityError;
    pub use crate::parser::{OutputParser, RunSummary, parse_output};
    pub use crate::record::{Record, TestEvent, TestEventKind};
    pub use crate::result::{TestOutcome, TestResult};
}
