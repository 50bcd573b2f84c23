// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Collaborator contracts and the standard collaborator set.
//!
//! A collaborator is a component the agent creates at construction and starts exactly
//! once during [`crate::Agent::start`]. The agent only relies on the traits defined
//! here; the standard implementations live in the submodules and can be replaced
//! wholesale through [`crate::AgentBuilder::build_with`].
//!
//! ## Start order
//!
//! 1. Configuration loader
//! 2. Message queue
//! 3. Process reporter
//! 4. CPU reporter
//! 5. Allocation reporter
//! 6. Block reporter
//! 7. Segment reporter
//! 8. Error reporter
//!
//! The outbound request builder ([`Transport`]) is created with the others but is never
//! started: it holds no state of its own until a message is sent.

pub mod api_request;
pub mod config_loader;
pub mod error_reporter;
pub mod message_queue;
pub mod profile_reporter;
pub mod segment_reporter;
pub mod standard;

use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use crate::config::SharedConfig;
use crate::diagnostics::Diagnostics;
use crate::error::AgentError;

pub use standard::StandardCollaborators;

/// Minimal lifecycle contract every collaborator satisfies.
pub trait Collaborator: Send + Sync {
    /// Human readable name used in diagnostics.
    fn name(&self) -> &'static str;

    /// Invoked exactly once by the agent. Must not block indefinitely.
    fn start(&self) -> Result<(), AgentError>;
}

/// Receives timed segments from [`crate::Agent::record_segment`].
pub trait SegmentRecorder: Collaborator {
    fn record_segment(&self, path: &[&str], duration: i64);
}

/// Receives normalized errors from [`crate::Agent::record_error`].
pub trait ErrorRecorder: Collaborator {
    /// `skip_frames` counts frames above the agent's own entry point.
    fn record_error(&self, group: &str, error: anyhow::Error, skip_frames: usize);
}

/// Outbound request builder toward the dashboard.
pub trait Transport: Send + Sync {
    fn name(&self) -> &'static str;

    /// Dashboard URL for `endpoint`.
    fn url(&self, endpoint: &str) -> String;

    /// Wraps a queued message body with the agent metadata sent alongside it.
    fn envelope(&self, topic: &str, content: serde_json::Value) -> serde_json::Value;
}

/// What a collaborator factory gets to see of the agent.
#[derive(Debug, Clone)]
pub struct AgentContext {
    pub config: SharedConfig,
    /// Serializes instrumentation work that adds overhead to the host.
    pub overhead_lock: Arc<Mutex<()>>,
    pub diagnostics: Diagnostics,
    pub run_id: String,
    /// Dashboard kill switch. Reporters stop recording while it is cleared.
    pub agent_enabled: Arc<AtomicBool>,
}

/// The fixed collaborator set owned by an agent.
pub struct Collaborators {
    pub config_loader: Arc<dyn Collaborator>,
    pub message_queue: Arc<dyn Collaborator>,
    pub process_reporter: Arc<dyn Collaborator>,
    pub cpu_reporter: Arc<dyn Collaborator>,
    pub allocation_reporter: Arc<dyn Collaborator>,
    pub block_reporter: Arc<dyn Collaborator>,
    pub segment_reporter: Arc<dyn SegmentRecorder>,
    pub error_reporter: Arc<dyn ErrorRecorder>,
    /// Never started; not part of [`Collaborators::start_order`].
    pub api_request: Arc<dyn Transport>,
}

impl Collaborators {
    /// Collaborators in the order they must be started.
    pub fn start_order(&self) -> [&dyn Collaborator; 8] {
        [
            self.config_loader.as_ref(),
            self.message_queue.as_ref(),
            self.process_reporter.as_ref(),
            self.cpu_reporter.as_ref(),
            self.allocation_reporter.as_ref(),
            self.block_reporter.as_ref(),
            self.segment_reporter.as_ref(),
            self.error_reporter.as_ref(),
        ]
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.start_order().iter().map(|c| c.name()))
            .entry(&self.api_request.name())
            .finish()
    }
}

#[cfg(test)]
pub(crate) fn test_context(config: crate::config::AgentConfig) -> AgentContext {
    let config = SharedConfig::new(config);
    AgentContext {
        diagnostics: Diagnostics::new(config.clone()),
        config,
        overhead_lock: Arc::new(Mutex::new(())),
        run_id: "test-run".to_string(),
        agent_enabled: Arc::new(AtomicBool::new(true)),
    }
}
