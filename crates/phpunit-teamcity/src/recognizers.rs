// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Recognizers for the informational lines PHPUnit prints around service messages

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::error::TeamcityError;
use crate::record::{
    ConfigurationInfo, ProcessesInfo, Record, RuntimeInfo, SummaryInfo, TimingInfo, VersionInfo,
};

/// A matcher for one shape of informational line
pub trait LineRecognizer: Sync {
    /// Short name used in errors and logs
    fn name(&self) -> &'static str;

    /// Check whether the line has this recognizer's shape
    fn matches(&self, line: &str) -> bool;

    /// Parse a line accepted by [`LineRecognizer::matches`]
    ///
    /// # Errors
    ///
    /// Returns `TeamcityError::Recognizer` if a required field cannot be extracted.
    fn parse(&self, line: &str) -> Result<Record, TeamcityError>;
}

/// Every recognizer, in the order lines are tried against them
pub static RECOGNIZERS: [&dyn LineRecognizer; 6] = [
    &VersionLine,
    &RuntimeLine,
    &ConfigurationLine,
    &ProcessesLine,
    &TimingLine,
    &SummaryLine,
];

/// Find the recognizer for a line and parse it
///
/// Returns `Ok(None)` when no recognizer matches.
///
/// # Errors
///
/// Returns `TeamcityError::Recognizer` if the matching recognizer cannot parse the line.
pub fn recognize(line: &str) -> Result<Option<Record>, TeamcityError> {
    RECOGNIZERS
        .iter()
        .find(|recognizer| recognizer.matches(line))
        .map(|recognizer| recognizer.parse(line))
        .transpose()
}

fn capture<'a>(caps: &Captures<'a>, group: &str) -> Option<&'a str> {
    caps.name(group).map(|m| m.as_str())
}

// ============================================================================
// Version
// ============================================================================

static VERSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\s*(?:ParaTest\s+v?(?P<paratest>\d+(?:\.\d+)*(?:-[\w.]+)?)\b.*?)?PHPUnit\s+(?P<phpunit>\d+(?:\.\d+)*(?:-[\w.]+)?)",
    )
    .expect("valid version regex")
});

/// `ParaTest v7.3.1 upon PHPUnit 10.5.0 by Sebastian Bergmann and contributors.`
pub struct VersionLine;

impl LineRecognizer for VersionLine {
    fn name(&self) -> &'static str {
        "version"
    }

    fn matches(&self, line: &str) -> bool {
        VERSION.is_match(line)
    }

    fn parse(&self, line: &str) -> Result<Record, TeamcityError> {
        let caps = VERSION
            .captures(line)
            .ok_or_else(|| TeamcityError::recognizer(self.name(), line))?;
        let phpunit = capture(&caps, "phpunit")
            .ok_or_else(|| TeamcityError::recognizer(self.name(), line))?;
        Ok(Record::Version(VersionInfo {
            phpunit: phpunit.to_string(),
            paratest: capture(&caps, "paratest").map(str::to_string),
            text: line.to_string(),
        }))
    }
}

// ============================================================================
// Labelled Values
// ============================================================================

static RUNTIME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*Runtime:\s*(?P<value>.+?)\s*$").expect("valid regex"));

static CONFIGURATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*Configuration:\s*(?P<value>.+?)\s*$").expect("valid regex")
});

static PROCESSES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*Processes:\s*(?P<value>.+?)\s*$").expect("valid regex"));

fn labelled_value<'a>(
    regex: &Regex,
    recognizer: &'static str,
    line: &'a str,
) -> Result<&'a str, TeamcityError> {
    regex
        .captures(line)
        .and_then(|caps| capture(&caps, "value"))
        .ok_or_else(|| TeamcityError::recognizer(recognizer, line))
}

/// `Runtime:       PHP 8.3.0`
pub struct RuntimeLine;

impl LineRecognizer for RuntimeLine {
    fn name(&self) -> &'static str {
        "runtime"
    }

    fn matches(&self, line: &str) -> bool {
        RUNTIME.is_match(line)
    }

    fn parse(&self, line: &str) -> Result<Record, TeamcityError> {
        let runtime = labelled_value(&RUNTIME, self.name(), line)?;
        Ok(Record::Runtime(RuntimeInfo {
            runtime: runtime.to_string(),
            text: line.to_string(),
        }))
    }
}

/// `Configuration: /app/phpunit.xml`
pub struct ConfigurationLine;

impl LineRecognizer for ConfigurationLine {
    fn name(&self) -> &'static str {
        "configuration"
    }

    fn matches(&self, line: &str) -> bool {
        CONFIGURATION.is_match(line)
    }

    fn parse(&self, line: &str) -> Result<Record, TeamcityError> {
        let configuration = labelled_value(&CONFIGURATION, self.name(), line)?;
        Ok(Record::Configuration(ConfigurationInfo {
            configuration: configuration.to_string(),
            text: line.to_string(),
        }))
    }
}

/// `Processes:     8`
pub struct ProcessesLine;

impl LineRecognizer for ProcessesLine {
    fn name(&self) -> &'static str {
        "processes"
    }

    fn matches(&self, line: &str) -> bool {
        PROCESSES.is_match(line)
    }

    fn parse(&self, line: &str) -> Result<Record, TeamcityError> {
        let processes = labelled_value(&PROCESSES, self.name(), line)?;
        Ok(Record::Processes(ProcessesInfo {
            processes: processes.to_string(),
            text: line.to_string(),
        }))
    }
}

// ============================================================================
// Timing
// ============================================================================

static TIMING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\s*Time:\s*(?P<time>\d[\d:.]*(?:\s*[a-z]+)?)\s*,\s*Memory:\s*(?P<memory>\d[\d.]*\s*[a-z]+)",
    )
    .expect("valid timing regex")
});

/// `Time: 00:00.049, Memory: 6.00 MB`
pub struct TimingLine;

impl LineRecognizer for TimingLine {
    fn name(&self) -> &'static str {
        "timing"
    }

    fn matches(&self, line: &str) -> bool {
        TIMING.is_match(line)
    }

    fn parse(&self, line: &str) -> Result<Record, TeamcityError> {
        let caps = TIMING
            .captures(line)
            .ok_or_else(|| TeamcityError::recognizer(self.name(), line))?;
        let (Some(time), Some(memory)) = (capture(&caps, "time"), capture(&caps, "memory")) else {
            return Err(TeamcityError::recognizer(self.name(), line));
        };
        Ok(Record::Timing(TimingInfo {
            time: time.to_string(),
            memory: memory.to_string(),
            text: line.to_string(),
        }))
    }
}

// ============================================================================
// Summary
// ============================================================================

static SUMMARY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:OK\s+\(\s*\d+\s+tests?\b|Tests?:\s*\d+)").expect("valid summary regex")
});

const SUMMARY_NAMES: &str = "tests?|assertions?|errors?|failures?|skipped|incomplete|risky";

static SUMMARY_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\b(?:(?P<name>{SUMMARY_NAMES}):\s*(?P<count>\d+)|(?P<count_first>\d+)\s+(?P<name_last>{SUMMARY_NAMES})\b)"
    ))
    .expect("valid summary field regex")
});

/// `OK (5 tests, 10 assertions)` or `Tests: 5, Assertions: 10, Failures: 2, Skipped: 1.`
pub struct SummaryLine;

/// Lowercase a summary field name and pluralize the count nouns
///
/// `skipped`, `incomplete` and `risky` are kept as written.
#[must_use]
pub fn normalize_summary_field(name: &str) -> String {
    let name = name.to_lowercase();
    match name.as_str() {
        "skipped" | "incomplete" | "risky" => name,
        _ if name.ends_with('s') => name,
        _ => format!("{name}s"),
    }
}

impl LineRecognizer for SummaryLine {
    fn name(&self) -> &'static str {
        "summary"
    }

    fn matches(&self, line: &str) -> bool {
        SUMMARY.is_match(line)
    }

    fn parse(&self, line: &str) -> Result<Record, TeamcityError> {
        let mut summary = SummaryInfo {
            text: line.to_string(),
            ..Default::default()
        };
        let mut found = false;

        for caps in SUMMARY_FIELD.captures_iter(line) {
            let name = capture(&caps, "name").or_else(|| capture(&caps, "name_last"));
            let count = capture(&caps, "count").or_else(|| capture(&caps, "count_first"));
            let (Some(name), Some(count)) = (name, count) else {
                continue;
            };
            let Ok(count) = count.parse::<u64>() else {
                return Err(TeamcityError::recognizer(self.name(), line));
            };
            let field = match normalize_summary_field(name).as_str() {
                "tests" => &mut summary.tests,
                "assertions" => &mut summary.assertions,
                "errors" => &mut summary.errors,
                "failures" => &mut summary.failures,
                "skipped" => &mut summary.skipped,
                "incomplete" => &mut summary.incomplete,
                "risky" => &mut summary.risky,
                _ => continue,
            };
            *field = Some(count);
            found = true;
        }

        if !found {
            return Err(TeamcityError::recognizer(self.name(), line));
        }
        Ok(Record::Summary(summary))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use similar_asserts::assert_eq;

    fn summary(line: &str) -> SummaryInfo {
        match recognize(line).expect("parse").expect("recognized") {
            Record::Summary(summary) => summary,
            other => panic!("expected summary, got {other:?}"),
        }
    }

    #[test]
    fn test_version_phpunit_only() {
        let record = recognize("PHPUnit 10.5.0 by Sebastian Bergmann and contributors.")
            .expect("parse")
            .expect("recognized");
        assert_eq!(
            record,
            Record::Version(VersionInfo {
                phpunit: "10.5.0".to_string(),
                paratest: None,
                text: "PHPUnit 10.5.0 by Sebastian Bergmann and contributors.".to_string(),
            })
        );
    }

    #[test]
    fn test_version_with_paratest() {
        let line = "ParaTest v7.3.1 upon PHPUnit 10.5.0 by Sebastian Bergmann and contributors.";
        let Some(Record::Version(version)) = recognize(line).expect("parse") else {
            panic!("expected version");
        };
        assert_eq!(version.paratest.as_deref(), Some("7.3.1"));
        assert_eq!(version.phpunit, "10.5.0");
    }

    #[test]
    fn test_version_requires_line_start() {
        assert!(!VersionLine.matches("Tests written for PHPUnit 9 are fine"));
    }

    #[test]
    fn test_labelled_lines() {
        assert_eq!(
            recognize("Runtime:       PHP 8.3.0").expect("parse"),
            Some(Record::Runtime(RuntimeInfo {
                runtime: "PHP 8.3.0".to_string(),
                text: "Runtime:       PHP 8.3.0".to_string(),
            }))
        );
        assert_eq!(
            recognize("configuration: /app/phpunit.xml").expect("parse"),
            Some(Record::Configuration(ConfigurationInfo {
                configuration: "/app/phpunit.xml".to_string(),
                text: "configuration: /app/phpunit.xml".to_string(),
            }))
        );
        assert_eq!(
            recognize("Processes:     8").expect("parse"),
            Some(Record::Processes(ProcessesInfo {
                processes: "8".to_string(),
                text: "Processes:     8".to_string(),
            }))
        );
    }

    #[test]
    fn test_timing_lines() {
        let Some(Record::Timing(timing)) =
            recognize("Time: 00:00.049, Memory: 6.00 MB").expect("parse")
        else {
            panic!("expected timing");
        };
        assert_eq!(timing.time, "00:00.049");
        assert_eq!(timing.memory, "6.00 MB");

        let Some(Record::Timing(timing)) = recognize("Time: 49 ms, Memory: 4.00MB").expect("parse")
        else {
            panic!("expected timing");
        };
        assert_eq!(timing.time, "49 ms");
        assert_eq!(timing.memory, "4.00MB");
    }

    #[test]
    fn test_terse_summary_is_partial() {
        let parsed = summary("OK (5 tests, 10 assertions)");
        assert_eq!(parsed.tests, Some(5));
        assert_eq!(parsed.assertions, Some(10));
        assert_eq!(parsed.errors, None);
        assert_eq!(parsed.failures, None);
    }

    #[test]
    fn test_terse_summary_singular() {
        let parsed = summary("OK (1 test, 1 assertion)");
        assert_eq!(parsed.tests, Some(1));
        assert_eq!(parsed.assertions, Some(1));
    }

    #[test]
    fn test_verbose_summary() {
        let parsed = summary("Tests: 5, Assertions: 10, Failures: 2, Skipped: 1.");
        assert_eq!(
            parsed,
            SummaryInfo {
                tests: Some(5),
                assertions: Some(10),
                failures: Some(2),
                skipped: Some(1),
                text: "Tests: 5, Assertions: 10, Failures: 2, Skipped: 1.".to_string(),
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_verbose_summary_all_fields_and_unknown_names() {
        let parsed = summary(
            "Tests: 19, Assertions: 15, Errors: 2, Failures: 4, Warnings: 1, Skipped: 1, Incomplete: 1, Risky: 2.",
        );
        assert_eq!(parsed.tests, Some(19));
        assert_eq!(parsed.assertions, Some(15));
        assert_eq!(parsed.errors, Some(2));
        assert_eq!(parsed.failures, Some(4));
        assert_eq!(parsed.skipped, Some(1));
        assert_eq!(parsed.incomplete, Some(1));
        assert_eq!(parsed.risky, Some(2));
    }

    #[test]
    fn test_verbose_summary_singular_names() {
        let parsed = summary("Tests: 3, Assertions: 3, Error: 1, Failure: 1.");
        assert_eq!(parsed.errors, Some(1));
        assert_eq!(parsed.failures, Some(1));
    }

    #[test]
    fn test_normalize_summary_field() {
        assert_eq!(normalize_summary_field("Test"), "tests");
        assert_eq!(normalize_summary_field("Assertions"), "assertions");
        assert_eq!(normalize_summary_field("Error"), "errors");
        assert_eq!(normalize_summary_field("Skipped"), "skipped");
        assert_eq!(normalize_summary_field("INCOMPLETE"), "incomplete");
        assert_eq!(normalize_summary_field("Risky"), "risky");
    }

    #[test]
    fn test_unrecognized_lines() {
        for line in [
            "",
            ".....F.S.                                                          9 / 9 (100%)",
            "FAILURES!",
            "PHP Deprecated:  something old",
        ] {
            assert!(recognize(line).expect("parse").is_none(), "{line}");
        }
    }
}
