// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Aggregates timed segments per path and reports them through the message queue.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use serde_json::json;

use super::message_queue::MessageQueue;
use super::{AgentContext, Collaborator, SegmentRecorder};
use crate::diagnostics::Diagnostics;
use crate::error::AgentError;
use crate::guard::StartGuard;

/// Separator used to flatten a segment path into its aggregation key.
pub const PATH_SEPARATOR: &str = "/";

pub const SEGMENTS_TOPIC: &str = "segments";

/// Distinct paths held between two reports.
pub const MAX_SEGMENT_PATHS: usize = 1000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SegmentStats {
    pub count: u64,
    pub total: i64,
    pub max: i64,
}

impl SegmentStats {
    fn add(&mut self, duration: i64) {
        self.count += 1;
        self.total = self.total.saturating_add(duration);
        self.max = if self.count == 1 {
            duration
        } else {
            self.max.max(duration)
        };
    }
}

#[derive(Debug, Default)]
struct Aggregates {
    segments: HashMap<String, SegmentStats>,
    /// Records of new paths refused while at capacity.
    dropped: u64,
}

#[derive(Debug)]
pub struct SegmentReporter {
    guard: StartGuard,
    diagnostics: Diagnostics,
    run_id: String,
    agent_enabled: Arc<AtomicBool>,
    queue: Arc<MessageQueue>,
    capacity: usize,
    aggregates: Mutex<Aggregates>,
}

impl SegmentReporter {
    pub fn new(ctx: &AgentContext, queue: Arc<MessageQueue>) -> Self {
        Self::with_capacity(ctx, queue, MAX_SEGMENT_PATHS)
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

    /// Current aggregates keyed by the `/`-joined path.
    pub fn snapshot(&self) -> HashMap<String, SegmentStats> {
        self.aggregates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .segments
            .clone()
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
    /// Returns the number of distinct paths reported.
    pub fn report(&self) -> usize {
        let Aggregates { segments, dropped } = std::mem::take(
            &mut *self
                .aggregates
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        if segments.is_empty() && dropped == 0 {
            return 0;
        }

        let reported = segments.len();
        self.queue.add(
            SEGMENTS_TOPIC,
            json!({
                "run_id": self.run_id,
                "segments": segments,
                "dropped": dropped,
            }),
        );
        self.diagnostics.log(format!(
            "Reported {reported} segment paths, dropped {dropped}."
        ));
        reported
    }
}

impl Collaborator for SegmentReporter {
    fn name(&self) -> &'static str {
        "segment reporter"
    }

    fn start(&self) -> Result<(), AgentError> {
        self.guard.acquire_for(self.name())
    }
}

impl SegmentRecorder for SegmentReporter {
    fn record_segment(&self, path: &[&str], duration: i64) {
        if !self.guard.is_acquired() || !self.agent_enabled.load(Ordering::Acquire) {
            return;
        }
        if path.is_empty() {
            self.diagnostics.log("Ignoring segment with an empty path.");
            return;
        }

        let key = path.join(PATH_SEPARATOR);
        let mut aggregates = self
            .aggregates
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let Aggregates { segments, dropped } = &mut *aggregates;
        let full = segments.len() >= self.capacity;

        match segments.entry(key) {
            Entry::Occupied(mut entry) => entry.get_mut().add(duration),
            Entry::Vacant(_) if full => *dropped += 1,
            Entry::Vacant(entry) => entry.insert(SegmentStats::default()).add(duration),
        }
    }
}
