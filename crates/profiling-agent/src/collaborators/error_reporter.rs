// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Aggregates recorded errors per group and message.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use serde_json::json;

use super::message_queue::MessageQueue;
use super::{AgentContext, Collaborator, ErrorRecorder};
use crate::diagnostics::Diagnostics;
use crate::error::AgentError;
use crate::guard::StartGuard;

pub const ERRORS_TOPIC: &str = "errors";

/// Distinct (group, message) pairs held between two reports.
pub const MAX_ERROR_KINDS: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorStats {
    pub group: String,
    pub message: String,
    pub count: u64,
    /// Frames to skip, as received with the first occurrence
    pub skip_frames: usize,
}

#[derive(Debug, Default)]
struct Aggregates {
    errors: HashMap<(String, String), ErrorStats>,
    /// Records of new kinds refused while at capacity.
    dropped: u64,
}

#[derive(Debug)]
pub struct ErrorReporter {
    guard: StartGuard,
    diagnostics: Diagnostics,
    run_id: String,
    agent_enabled: Arc<AtomicBool>,
    queue: Arc<MessageQueue>,
    capacity: usize,
    aggregates: Mutex<Aggregates>,
}

impl ErrorReporter {
    pub fn new(ctx: &AgentContext, queue: Arc<MessageQueue>) -> Self {
        Self::with_capacity(ctx, queue, MAX_ERROR_KINDS)
    }

    pub fn with_capacity(ctx: &AgentContext, queue: Arc<MessageQueue>, capacity: usize) -> Self {
        Self {
            guard: StartGuard::new(),
            diagnostics: ctx.diagnostics.clone(),
            run_id: ctx.run_id.clone(),
            agent_enabled: Arc::clone(&ctx.agent_enabled),
            queue,
            capacity,
            aggregates: Mutex::new(Aggregates::default()),
        }
    }

    /// Current aggregates, sorted by group then message.
    pub fn snapshot(&self) -> Vec<ErrorStats> {
        let aggregates = self
            .aggregates
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        sorted(aggregates.errors.values().cloned().collect())
    }

    /// Records refused since the last report because the capacity was reached.
    pub fn dropped(&self) -> u64 {
        self.aggregates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .dropped
    }

    /// Moves the current aggregates into a message queue entry and starts over.
    ///
    /// Returns the number of distinct errors reported.
    pub fn report(&self) -> usize {
        let Aggregates { errors, dropped } = std::mem::take(
            &mut *self
                .aggregates
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        if errors.is_empty() && dropped == 0 {
            return 0;
        }

        let errors = sorted(errors.into_values().collect());
        let reported = errors.len();
        self.queue.add(
            ERRORS_TOPIC,
            json!({
                "run_id": self.run_id,
                "errors": errors,
                "dropped": dropped,
            }),
        );
        self.diagnostics
            .log(format!("Reported {reported} errors, dropped {dropped}."));
        reported
    }
}

fn sorted(mut errors: Vec<ErrorStats>) -> Vec<ErrorStats> {
    errors.sort_by(|a, b| (&a.group, &a.message).cmp(&(&b.group, &b.message)));
    errors
}

impl Collaborator for ErrorReporter {
    fn name(&self) -> &'static str {
        "error reporter"
    }

    fn start(&self) -> Result<(), AgentError> {
        self.guard.acquire_for(self.name())
    }
}

impl ErrorRecorder for ErrorReporter {
    fn record_error(&self, group: &str, error: anyhow::Error, skip_frames: usize) {
        if !self.guard.is_acquired() || !self.agent_enabled.load(Ordering::Acquire) {
            return;
        }

        let key = (group.to_string(), error.to_string());
        let mut aggregates = self
            .aggregates
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let Aggregates { errors, dropped } = &mut *aggregates;
        let full = errors.len() >= self.capacity;

        match errors.entry(key) {
            Entry::Occupied(mut entry) => entry.get_mut().count += 1,
            Entry::Vacant(_) if full => *dropped += 1,
            Entry::Vacant(entry) => {
                let (group, message) = entry.key().clone();
                entry.insert(ErrorStats {
                    group,
                    message,
                    count: 1,
                    skip_frames,
                });
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::collaborators::test_context;
    use crate::config::AgentConfig;

    fn reporter() -> (ErrorReporter, Arc<MessageQueue>) {
        let ctx = test_context(AgentConfig::default());
        let queue = Arc::new(MessageQueue::new(&ctx));
        queue.start().unwrap();
        (ErrorReporter::new(&ctx, Arc::clone(&queue)), queue)
    }

    #[test]
    fn test_records_ignored_before_start() {
        let (reporter, _queue) = reporter();
        reporter.record_error("db", anyhow::anyhow!("timeout"), 1);
        assert!(reporter.snapshot().is_empty());
    }

    #[test]
    fn test_aggregates_by_group_and_message() {
        let (reporter, _queue) = reporter();
        reporter.start().unwrap();

        reporter.record_error("db", anyhow::anyhow!("timeout"), 1);
        reporter.record_error("db", anyhow::anyhow!("timeout"), 3);
        reporter.record_error("db", anyhow::anyhow!("refused"), 1);
        reporter.record_error("http", anyhow::anyhow!("timeout"), 2);

        let snapshot = reporter.snapshot();
        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot[0].group, "db");
        assert_eq!(snapshot[0].message, "refused");
        assert_eq!(
            snapshot[1],
            ErrorStats {
                group: "db".to_string(),
                message: "timeout".to_string(),
                count: 2,
                skip_frames: 1,
            }
        );
        assert_eq!(snapshot[2].group, "http");
    }

    #[test]
    fn test_new_kinds_dropped_at_capacity() {
        let ctx = test_context(AgentConfig::default());
        let queue = Arc::new(MessageQueue::new(&ctx));
        queue.start().unwrap();
        let reporter = ErrorReporter::with_capacity(&ctx, Arc::clone(&queue), 2);
        reporter.start().unwrap();

        for n in 0..5 {
            reporter.record_error("db", anyhow::anyhow!("timeout for id {n}"), 1);
        }
        reporter.record_error("db", anyhow::anyhow!("timeout for id 0"), 1);

        let snapshot = reporter.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].count, 2);
        assert_eq!(reporter.dropped(), 3);

        assert_eq!(reporter.report(), 2);
        assert_eq!(reporter.dropped(), 0);
        assert_eq!(queue.drain()[0].content["dropped"], 3);
    }

    #[test]
    fn test_default_capacity_bounds_distinct_messages() {
        let (reporter, _queue) = reporter();
        reporter.start().unwrap();

        for n in 0..(MAX_ERROR_KINDS + 500) {
            reporter.record_error("db", anyhow::anyhow!("timeout for id {n}"), 1);
        }

        assert_eq!(reporter.snapshot().len(), MAX_ERROR_KINDS);
        assert_eq!(reporter.dropped(), 500);
    }

    #[test]
    fn test_records_stop_while_agent_disabled() {
        let ctx = test_context(AgentConfig::default());
        let queue = Arc::new(MessageQueue::new(&ctx));
        let reporter = ErrorReporter::new(&ctx, queue);
        reporter.start().unwrap();

        ctx.agent_enabled.store(false, Ordering::Release);
        reporter.record_error("db", anyhow::anyhow!("timeout"), 1);
        assert!(reporter.snapshot().is_empty());

        ctx.agent_enabled.store(true, Ordering::Release);
        reporter.record_error("db", anyhow::anyhow!("timeout"), 1);
        assert_eq!(reporter.snapshot().len(), 1);
    }

    #[test]
    fn test_concurrent_report_loses_nothing() {
        const RECORDS: u64 = 5000;

        let (reporter, queue) = reporter();
        let reporter = Arc::new(reporter);
        reporter.start().unwrap();

        let recorder = {
            let reporter = Arc::clone(&reporter);
            std::thread::spawn(move || {
                for n in 0..RECORDS {
                    reporter.record_error("db", anyhow::anyhow!("timeout {}", n % 100), 1);
                }
            })
        };

        let mut reported = 0;
        while !recorder.is_finished() {
            reporter.report();
            reported += drained_count(&queue);
        }
        recorder.join().unwrap();
        reporter.report();
        reported += drained_count(&queue);

        assert_eq!(reported, RECORDS);
    }

    fn drained_count(queue: &MessageQueue) -> u64 {
        queue
            .drain()
            .iter()
            .flat_map(|message| message.content["errors"].as_array().cloned().unwrap_or_default())
            .map(|stats| stats["count"].as_u64().unwrap())
            .sum()
    }

    #[test]
    fn test_report_moves_aggregates_to_queue() {
        let (reporter, queue) = reporter();
        reporter.start().unwrap();
        reporter.record_error("db", anyhow::anyhow!("42"), 1);

        assert_eq!(reporter.report(), 1);
        assert!(reporter.snapshot().is_empty());

        let messages = queue.drain();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].topic, ERRORS_TOPIC);
        assert_eq!(messages[0].content["errors"][0]["message"], "42");
        assert_eq!(messages[0].content["errors"][0]["count"], 1);
    }
}
