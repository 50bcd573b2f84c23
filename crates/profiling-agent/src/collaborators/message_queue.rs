// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Bounded in-memory queue of outgoing messages.
//!
//! Reporters push serialized aggregates here; whoever owns delivery drains it. The
//! queue keeps at most [`MESSAGE_QUEUE_CAPACITY`] messages and evicts the oldest one
//! first so a stalled consumer never grows memory without bound.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use serde::Serialize;

use super::{AgentContext, Collaborator};
use crate::diagnostics::Diagnostics;
use crate::error::AgentError;
use crate::guard::StartGuard;
use crate::id::unix_seconds;

pub const MESSAGE_QUEUE_CAPACITY: usize = 1000;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub topic: String,
    pub content: serde_json::Value,
    /// Seconds since epoch
    pub added_at: i64,
}

#[derive(Debug)]
pub struct MessageQueue {
    guard: StartGuard,
    diagnostics: Diagnostics,
    capacity: usize,
    messages: Mutex<VecDeque<Message>>,
}

impl MessageQueue {
    pub fn new(ctx: &AgentContext) -> Self {
        Self::with_capacity(ctx, MESSAGE_QUEUE_CAPACITY)
    }

    pub fn with_capacity(ctx: &AgentContext, capacity: usize) -> Self {
        Self {
            guard: StartGuard::new(),
            diagnostics: ctx.diagnostics.clone(),
            capacity: capacity.max(1),
            messages: Mutex::new(VecDeque::new()),
        }
    }

    /// Queues a message. Dropped silently before the queue is started.
    pub fn add(&self, topic: &str, content: serde_json::Value) {
        if !self.guard.is_acquired() {
            self.diagnostics
                .log(format!("Message queue not started, dropping {topic} message."));
            return;
        }

        let mut messages = self.messages.lock().unwrap_or_else(PoisonError::into_inner);
        if messages.len() >= self.capacity {
            messages.pop_front();
            self.diagnostics
                .log("Message queue full, evicted oldest message");
        }
        messages.push_back(Message {
            topic: topic.to_string(),
            content,
            added_at: unix_seconds(),
        });
    }

    /// Removes and returns every queued message, oldest first.
    pub fn drain(&self) -> Vec<Message> {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Collaborator for MessageQueue {
    fn name(&self) -> &'static str {
        "message queue"
    }

    fn start(&self) -> Result<(), AgentError> {
        self.guard.acquire_for(self.name())
    }
}
