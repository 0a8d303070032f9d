// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Correlation of lifecycle events into terminal test records
//!
//! A test reports `testStarted`, any number of `testFailed`/`testIgnored` and finally
//! `testFinished`. Parallel workers interleave these lines, so events are grouped by
//! [`CorrelationKey`] (test name plus flow id) and folded into one record per key.
//!
//! # Example
//!
//! ```
//! use phpunit_teamcity::correlator::EventCorrelator;
//! use phpunit_teamcity::record::{Record, TestEvent, TestEventKind};
//!
//! let mut correlator = EventCorrelator::new();
//! let event = |kind| Record::Test(TestEvent::new(kind, "t").with_flow_id(1));
//!
//! assert!(correlator.handle(event(TestEventKind::TestStarted)).is_some());
//! assert!(correlator.handle(event(TestEventKind::TestFailed)).is_none());
//!
//! let done = correlator.handle(event(TestEventKind::TestFinished)).unwrap();
//! assert_eq!(done.as_test_event().unwrap().event, TestEventKind::TestFailed);
//! assert_eq!(correlator.open_count(), 0);
//! ```

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::record::{CorrelationKey, Phase, Record, TestEvent};

/// Folds interleaved lifecycle events into one record per test
#[derive(Debug, Default)]
pub struct EventCorrelator {
    open: HashMap<CorrelationKey, TestEvent>,
}

impl EventCorrelator {
    /// Create a correlator with no open keys
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one record through the correlator
    ///
    /// Started events are emitted immediately, faults are held back until the key
    /// finishes, and finished events emit the merged terminal record. Records without a
    /// correlation key are returned unchanged.
    pub fn handle(&mut self, record: Record) -> Option<Record> {
        match record {
            Record::Test(event) => match event.key() {
                Some(key) => self.handle_event(key, event).map(Record::Test),
                None => Some(Record::Test(event)),
            },
            other => Some(other),
        }
    }

    fn handle_event(&mut self, key: CorrelationKey, event: TestEvent) -> Option<TestEvent> {
        match event.event.phase() {
            Phase::Started => {
                debug!(%key, "Opening");
                if self.open.insert(key.clone(), event.clone()).is_some() {
                    warn!(%key, "Started again before finishing; replacing previous record");
                }
                Some(event)
            }
            Phase::Fault => {
                match self.open.get_mut(&key) {
                    Some(stored) if stored.is_fault() => {
                        debug!(%key, "Appending further fault");
                        stored.append_fault(event);
                    }
                    Some(stored) => {
                        debug!(%key, event = %event.event, "Recording fault");
                        stored.merge_from(event);
                    }
                    None => {
                        debug!(%key, event = %event.event, "Recording fault without start");
                        self.open.insert(key, event);
                    }
                }
                None
            }
            Phase::Finished => {
                let Some(mut stored) = self.open.remove(&key) else {
                    warn!(%key, "Finished without a matching start; passing through as-is");
                    return Some(event);
                };
                let resolved = if stored.is_fault() {
                    stored.event
                } else {
                    event.event
                };
                stored.merge_from(event);
                stored.event = resolved;
                debug!(%key, event = %resolved, "Closing");
                Some(stored)
            }
        }
    }

    /// Number of keys started but not yet finished
    #[must_use]
    pub fn open_count(&self) -> usize {
        self.open.len()
    }

    /// Keys started but not yet finished, sorted for stable reporting
    #[must_use]
    pub fn open_keys(&self) -> Vec<&CorrelationKey> {
        let mut keys: Vec<_> = self.open.keys().collect();
        keys.sort();
        keys
    }

    /// Close the run, returning the records of every key that never finished
    #[must_use]
    pub fn finish(self) -> Vec<TestEvent> {
        let mut leftover: Vec<_> = self.open.into_iter().collect();
        leftover.sort_by(|(a, _), (b, _)| a.cmp(b));
        leftover
            .into_iter()
            .map(|(key, event)| {
                warn!(%key, event = %event.event, "Test never finished");
                event
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{FaultDetail, TestEventKind};
    use similar_asserts::assert_eq;

    fn event(kind: TestEventKind, name: &str, flow_id: u64) -> TestEvent {
        TestEvent::new(kind, name).with_flow_id(flow_id)
    }

    fn feed(correlator: &mut EventCorrelator, event: TestEvent) -> Option<TestEvent> {
        correlator
            .handle(Record::Test(event))
            .and_then(Record::into_test_event)
    }

    fn detail(file: &str, line: u32) -> FaultDetail {
        FaultDetail {
            file: file.to_string(),
            line,
        }
    }

    #[test]
    fn test_started_is_emitted_and_stored() {
        let mut correlator = EventCorrelator::new();
        let started = event(TestEventKind::TestStarted, "t", 1);

        assert_eq!(feed(&mut correlator, started.clone()), Some(started));
        assert_eq!(correlator.open_count(), 1);
    }

    #[test]
    fn test_pass_is_finished_event() {
        let mut correlator = EventCorrelator::new();
        let mut started = event(TestEventKind::TestStarted, "t", 1);
        started.file = Some("tests/ATest.php".to_string());
        feed(&mut correlator, started);

        let finished = feed(
            &mut correlator,
            event(TestEventKind::TestFinished, "t", 1).with_duration(4),
        )
        .expect("terminal record");

        assert_eq!(finished.event, TestEventKind::TestFinished);
        assert_eq!(finished.duration, Some(4));
        assert_eq!(finished.file.as_deref(), Some("tests/ATest.php"));
        assert_eq!(correlator.open_count(), 0);
    }

    #[test]
    fn test_fault_is_sticky_until_finished() {
        let mut correlator = EventCorrelator::new();
        feed(&mut correlator, event(TestEventKind::TestStarted, "t", 1));

        let failed = feed(
            &mut correlator,
            event(TestEventKind::TestFailed, "t", 1).with_message("boom"),
        );
        assert!(failed.is_none());

        let terminal = feed(
            &mut correlator,
            event(TestEventKind::TestFinished, "t", 1).with_duration(12),
        )
        .expect("terminal record");

        assert_eq!(terminal.event, TestEventKind::TestFailed);
        assert!(terminal.message.as_deref().unwrap_or_default().contains("boom"));
        assert_eq!(terminal.duration, Some(12));
    }

    #[test]
    fn test_ignored_is_terminal_event() {
        let mut correlator = EventCorrelator::new();
        feed(&mut correlator, event(TestEventKind::TestStarted, "t", 1));
        feed(
            &mut correlator,
            event(TestEventKind::TestIgnored, "t", 1).with_message("skipped"),
        );
        let terminal = feed(&mut correlator, event(TestEventKind::TestFinished, "t", 1))
            .expect("terminal record");
        assert_eq!(terminal.event, TestEventKind::TestIgnored);
    }

    #[test]
    fn test_multiple_faults_concatenate() {
        let mut correlator = EventCorrelator::new();
        feed(&mut correlator, event(TestEventKind::TestStarted, "t", 1));

        let mut first = event(TestEventKind::TestFailed, "t", 1).with_message("A");
        first.details = vec![detail("a.php", 1), detail("a.php", 2)];
        let mut second = event(TestEventKind::TestFailed, "t", 1).with_message("B");
        second.details = vec![detail("b.php", 3)];
        assert!(feed(&mut correlator, first).is_none());
        assert!(feed(&mut correlator, second).is_none());

        let terminal = feed(&mut correlator, event(TestEventKind::TestFinished, "t", 1))
            .expect("terminal record");
        assert_eq!(terminal.message.as_deref(), Some("A\n\nB"));
        assert_eq!(
            terminal.details,
            vec![detail("a.php", 1), detail("a.php", 2), detail("b.php", 3)]
        );
    }

    #[test]
    fn test_fault_without_start_is_buffered() {
        let mut correlator = EventCorrelator::new();
        assert!(
            feed(
                &mut correlator,
                event(TestEventKind::TestFailed, "t", 1).with_message("early"),
            )
            .is_none()
        );
        let terminal = feed(&mut correlator, event(TestEventKind::TestFinished, "t", 1))
            .expect("terminal record");
        assert_eq!(terminal.event, TestEventKind::TestFailed);
        assert_eq!(terminal.message.as_deref(), Some("early"));
    }

    #[test]
    fn test_flows_are_independent() {
        let mut correlator = EventCorrelator::new();
        feed(&mut correlator, event(TestEventKind::TestStarted, "t", 1));
        feed(&mut correlator, event(TestEventKind::TestStarted, "t", 2));
        feed(
            &mut correlator,
            event(TestEventKind::TestFailed, "t", 2).with_message("flow two"),
        );
        assert_eq!(correlator.open_count(), 2);

        let one = feed(&mut correlator, event(TestEventKind::TestFinished, "t", 1))
            .expect("flow 1 record");
        let two = feed(&mut correlator, event(TestEventKind::TestFinished, "t", 2))
            .expect("flow 2 record");

        assert_eq!(one.event, TestEventKind::TestFinished);
        assert_eq!(one.message, None);
        assert_eq!(two.event, TestEventKind::TestFailed);
        assert_eq!(two.flow_id, Some(2));
    }

    #[test]
    fn test_suites_correlate_like_tests() {
        let mut correlator = EventCorrelator::new();
        feed(&mut correlator, event(TestEventKind::TestSuiteStarted, "Suite", 1));
        feed(&mut correlator, event(TestEventKind::TestStarted, "t", 1));
        feed(&mut correlator, event(TestEventKind::TestFinished, "t", 1));
        let suite = feed(
            &mut correlator,
            event(TestEventKind::TestSuiteFinished, "Suite", 1),
        )
        .expect("suite record");
        assert_eq!(suite.event, TestEventKind::TestSuiteFinished);
        assert_eq!(correlator.open_count(), 0);
    }

    #[test]
    fn test_orphan_finish_passes_through() {
        let mut correlator = EventCorrelator::new();
        let finished = event(TestEventKind::TestFinished, "t", 9).with_duration(1);
        assert_eq!(feed(&mut correlator, finished.clone()), Some(finished));
        assert_eq!(correlator.open_count(), 0);
    }

    #[test]
    fn test_records_without_flow_bypass_store() {
        let mut correlator = EventCorrelator::new();
        let failed = TestEvent::new(TestEventKind::TestFailed, "t");
        assert_eq!(feed(&mut correlator, failed.clone()), Some(failed));
        assert_eq!(correlator.open_count(), 0);
    }

    #[test]
    fn test_informational_records_pass_through() {
        let mut correlator = EventCorrelator::new();
        let record = Record::TestCount(crate::record::TestCount {
            count: 3,
            flow_id: Some(1),
        });
        assert_eq!(correlator.handle(record.clone()), Some(record));
    }

    #[test]
    fn test_finish_reports_open_keys() {
        let mut correlator = EventCorrelator::new();
        feed(&mut correlator, event(TestEventKind::TestStarted, "b", 1));
        feed(&mut correlator, event(TestEventKind::TestStarted, "a", 2));

        let keys: Vec<_> = correlator
            .open_keys()
            .into_iter()
            .map(|k| k.name.clone())
            .collect();
        assert_eq!(keys, vec!["a".to_string(), "b".to_string()]);

        let leftover = correlator.finish();
        assert_eq!(leftover.len(), 2);
        assert_eq!(leftover[0].name, "a");
    }
}
