// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Driving a parser over an input stream
//!
//! [`run`] feeds every line of the input through an [`OutputParser`] and writes what it
//! emits in the configured [`OutputFormat`]. Logging goes through `tracing`, never to the
//! output writer.

use std::borrow::Cow;
use std::io::{BufRead, Write};

use phpunit_teamcity::record::{Record, TestEvent, TestEventKind};
use phpunit_teamcity::{OutputParser, RunSummary, TeamcityError};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{Command, Config, OutputFormat};

/// Errors that stop a run
#[derive(Debug, Error)]
pub enum RunError {
    /// Reading input or writing output failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A malformed line was found in strict mode
    #[error("Line {line}: {source}")]
    Malformed {
        /// 1-based line number in the input
        line: usize,
        /// The decoding error
        source: TeamcityError,
    },

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Options for a single run
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Stream records or only summarize
    pub command: Command,
    /// Rendering of written output
    pub format: OutputFormat,
    /// Stop at the first malformed line
    pub strict: bool,
}

impl From<&Config> for RunOptions {
    fn from(config: &Config) -> Self {
        Self {
            command: config.command_or_default(),
            format: config.format,
            strict: config.strict,
        }
    }
}

/// Decode `input` line by line, writing to `out`, and return the run summary
///
/// # Errors
///
/// Returns `RunError` if reading or writing fails, or if a line is malformed and
/// `options.strict` is set.
pub fn run<R, W>(mut input: R, out: &mut W, options: RunOptions) -> Result<RunSummary, RunError>
where
    R: BufRead,
    W: Write,
{
    let mut parser = OutputParser::new();
    let mut skipped = 0usize;

    let mut buf = Vec::new();
    for index in 0.. {
        buf.clear();
        if input.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        let raw = buf.strip_suffix(b"\n").unwrap_or(&buf);
        let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
        let line = String::from_utf8_lossy(raw);
        if matches!(line, Cow::Owned(_)) {
            debug!(line = index + 1, "Replaced invalid UTF-8");
        }
        let record = match parser.process_line(&line) {
            Ok(record) => record,
            Err(source) if options.strict => {
                return Err(RunError::Malformed {
                    line: index + 1,
                    source,
                });
            }
            Err(err) => {
                warn!(line = index + 1, error = %err, "Skipping malformed line");
                skipped += 1;
                continue;
            }
        };
        if let Some(record) = record
            && options.command == Command::Decode
        {
            write_record(out, &record, options.format)?;
        }
    }

    for key in parser.open_keys() {
        warn!(%key, "Test started but never finished");
    }

    let summary = parser.finish();
    info!(
        total = summary.total,
        passed = summary.passed,
        failed = summary.failed,
        ignored = summary.ignored,
        unfinished = summary.unfinished.len(),
        skipped,
        "Run complete"
    );

    match (options.command, options.format) {
        (_, OutputFormat::Summary) => write_text_summary(out, &summary)?,
        (Command::Summary, OutputFormat::Json) => {
            serde_json::to_writer(&mut *out, &summary)?;
            writeln!(out)?;
        }
        (Command::Summary, OutputFormat::Pretty) => {
            serde_json::to_writer_pretty(&mut *out, &summary)?;
            writeln!(out)?;
        }
        (Command::Decode, _) => {}
    }
    out.flush()?;

    Ok(summary)
}

fn write_record<W: Write>(out: &mut W, record: &Record, format: OutputFormat) -> Result<(), RunError> {
    match format {
        OutputFormat::Json => {
            serde_json::to_writer(&mut *out, record)?;
            writeln!(out)?;
        }
        OutputFormat::Pretty => {
            if let Some(text) = describe(record) {
                writeln!(out, "{text}")?;
            }
        }
        OutputFormat::Summary => {}
    }
    Ok(())
}

/// Render a record as human-readable text
///
/// Started tests render nothing; their terminal record follows.
#[must_use]
pub fn describe(record: &Record) -> Option<String> {
    match record {
        Record::Test(event) => describe_event(event),
        Record::TestCount(count) => Some(format!("Running {} tests", count.count)),
        Record::Version(version) => Some(version.text.clone()),
        Record::Runtime(runtime) => Some(runtime.text.clone()),
        Record::Configuration(config) => Some(config.text.clone()),
        Record::Processes(processes) => Some(processes.text.clone()),
        Record::Timing(timing) => Some(timing.text.clone()),
        Record::Summary(summary) => Some(summary.text.clone()),
    }
}

fn describe_event(event: &TestEvent) -> Option<String> {
    let duration = event
        .duration
        .map(|ms| format!(" ({ms} ms)"))
        .unwrap_or_default();
    let label = match event.event {
        TestEventKind::TestSuiteStarted => return Some(event.name.clone()),
        TestEventKind::TestStarted => {
            debug!(name = %event.name, "Started");
            return None;
        }
        TestEventKind::TestSuiteFinished => return None,
        TestEventKind::TestFinished => "PASS",
        TestEventKind::TestFailed => "FAIL",
        TestEventKind::TestIgnored => "SKIP",
    };

    let mut text = format!("  {label} {}{duration}", event.name);
    if let Some(message) = event.message.as_deref().filter(|m| !m.is_empty()) {
        for line in message.lines() {
            text.push_str("\n      ");
            text.push_str(line);
        }
    }
    for detail in &event.details {
        text.push_str(&format!("\n      at {}:{}", detail.file, detail.line));
    }
    Some(text)
}

fn write_text_summary<W: Write>(out: &mut W, summary: &RunSummary) -> Result<(), RunError> {
    writeln!(
        out,
        "Tests: {}, Passed: {}, Failed: {}, Ignored: {}, Unfinished: {}",
        summary.total,
        summary.passed,
        summary.failed,
        summary.ignored,
        summary.unfinished.len()
    )?;
    if summary.expected > 0 && summary.expected != summary.total as u64 {
        writeln!(out, "Expected {} tests", summary.expected)?;
    }
    for result in summary.failing_tests() {
        let id = result.test_id.as_deref().unwrap_or(&result.name);
        writeln!(out, "FAIL {id}")?;
    }
    for event in &summary.unfinished {
        writeln!(out, "UNFINISHED {}", event.name)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use similar_asserts::assert_eq;

    const OUTPUT: &str = "\
PHPUnit 10.5.0 by Sebastian Bergmann and contributors.
##teamcity[testCount count='2' flowId='7']
##teamcity[testStarted name='test_ok' flowId='7']
##teamcity[testFinished name='test_ok' duration='3' flowId='7']
##teamcity[testStarted name='test_bad' locationHint='php_qn:///app/tests/ATest.php::\\Tests\\ATest::test_bad' flowId='7']
##teamcity[testFailed name='test_bad' message='boom' details=' /app/tests/ATest.php:12|n' flowId='7']
##teamcity[testFinished name='test_bad' duration='4' flowId='7']
";

    fn run_to_string(input: &str, options: RunOptions) -> (Result<RunSummary, RunError>, String) {
        let mut out = Vec::new();
        let result = run(input.as_bytes(), &mut out, options);
        (result, String::from_utf8(out).expect("utf-8 output"))
    }

    #[test]
    fn test_options_from_config() {
        let config = Config {
            command: Some(Command::Summary),
            format: OutputFormat::Pretty,
            strict: true,
            ..Default::default()
        };
        let options = RunOptions::from(&config);
        assert_eq!(options.command, Command::Summary);
        assert_eq!(options.format, OutputFormat::Pretty);
        assert!(options.strict);
    }

    #[test]
    fn test_decode_json_writes_one_record_per_line() {
        let (result, out) = run_to_string(OUTPUT, RunOptions::default());
        let summary = result.expect("run");
        assert_eq!(summary.total, 2);

        let kinds: Vec<String> = out
            .lines()
            .map(|line| {
                let json: serde_json::Value = serde_json::from_str(line).expect("valid JSON");
                json["kind"].as_str().unwrap_or_default().to_string()
            })
            .collect();
        assert_eq!(
            kinds,
            vec![
                "testVersion",
                "testCount",
                "testStarted",
                "testFinished",
                "testStarted",
                "testFailed",
            ]
        );
    }

    #[test]
    fn test_decode_pretty() {
        let options = RunOptions {
            format: OutputFormat::Pretty,
            ..Default::default()
        };
        let (result, out) = run_to_string(OUTPUT, options);
        result.expect("run");
        assert!(out.contains("  PASS test_ok (3 ms)"));
        assert!(out.contains("  FAIL test_bad (4 ms)\n      boom\n      at /app/tests/ATest.php:12"));
    }

    #[test]
    fn test_summary_json() {
        let options = RunOptions {
            command: Command::Summary,
            ..Default::default()
        };
        let (result, out) = run_to_string(OUTPUT, options);
        result.expect("run");
        assert_eq!(out.lines().count(), 1);
        let json: serde_json::Value = serde_json::from_str(&out).expect("valid JSON");
        assert_eq!(json["passed"], 1);
        assert_eq!(json["failed"], 1);
        assert_eq!(json["expected"], 2);
    }

    #[test]
    fn test_summary_text() {
        let options = RunOptions {
            format: OutputFormat::Summary,
            ..Default::default()
        };
        let (result, out) = run_to_string(OUTPUT, options);
        result.expect("run");
        assert_eq!(
            out,
            "Tests: 2, Passed: 1, Failed: 1, Ignored: 0, Unfinished: 0\nFAIL Tests\\ATest::test_bad\n"
        );
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let input = "##teamcity[testStarted name='t' flowId='one']\n##teamcity[testStarted name='t' flowId='1']\n##teamcity[testFinished name='t' flowId='1']\n";
        let (result, _) = run_to_string(input, RunOptions::default());
        assert_eq!(result.expect("run").passed, 1);
    }

    #[test]
    fn test_invalid_utf8_lines_do_not_stop_the_run() {
        let input = b"##teamcity[testStarted name='t' flowId='1']\nCaf\xe9 deprecated notice\r\n##teamcity[testFinished name='t' duration='2' flowId='1']\n";
        for strict in [false, true] {
            let options = RunOptions {
                strict,
                ..Default::default()
            };
            let mut out = Vec::new();
            let summary = run(&input[..], &mut out, options).expect("run");
            assert_eq!(summary.passed, 1);
            assert_eq!(summary.results[0].duration_ms, 2);
        }
    }

    #[test]
    fn test_strict_stops_at_malformed_line() {
        let input = "##teamcity[testStarted name='t' flowId='1']\n##teamcity[testFinished name='t' flowId='x']\n";
        let options = RunOptions {
            strict: true,
            ..Default::default()
        };
        let (result, _) = run_to_string(input, options);
        assert!(matches!(result, Err(RunError::Malformed { line: 2, .. })));
    }

    #[test]
    fn test_unfinished_reported_in_text_summary() {
        let options = RunOptions {
            format: OutputFormat::Summary,
            ..Default::default()
        };
        let (result, out) = run_to_string("##teamcity[testStarted name='t_hang' flowId='1']\n", options);
        let summary = result.expect("run");
        assert!(!summary.all_passed());
        assert!(out.contains("UNFINISHED t_hang"));
    }
}
