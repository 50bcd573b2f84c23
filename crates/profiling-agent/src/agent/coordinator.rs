// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Agent Coordinator Implementation
//!
//! The agent owns configuration and the collaborator set, starts the collaborators once,
//! and exposes the recording facade used by instrumented code.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use super::payload::ErrorPayload;
use crate::collaborators::{AgentContext, Collaborators, StandardCollaborators};
use crate::config::{AgentConfig, SharedConfig};
use crate::diagnostics::Diagnostics;
use crate::guard::StartGuard;
use crate::hostname::{detect_hostname, HostNameResolver};
use crate::id::{unix_seconds, IdGenerator};

/// Lifecycle state of a single agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentState {
    /// Constructed; configuration may still change.
    Created,
    /// Won the start race, collaborators are being started.
    Starting,
    /// Collaborators started; the recording facade forwards.
    Started,
}

impl AgentState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Created,
            1 => Self::Starting,
            _ => Self::Started,
        }
    }
}

/// Builder for [`Agent`].
///
/// ```
/// use profiling_agent::{Agent, AgentConfig};
///
/// let agent = Agent::builder()
///     .config(AgentConfig {
///         app_name: "checkout".to_string(),
///         ..Default::default()
///     })
///     .build();
/// assert_eq!(agent.config().app_name, "checkout");
/// ```
#[derive(Debug)]
pub struct AgentBuilder {
    config: AgentConfig,
    start_guard: &'static StartGuard,
    host_name_resolver: HostNameResolver,
}

impl Default for AgentBuilder {
    fn default() -> Self {
        Self {
            config: AgentConfig::default(),
            start_guard: StartGuard::process(),
            host_name_resolver: detect_hostname,
        }
    }
}

impl AgentBuilder {
    #[must_use]
    pub fn config(mut self, config: AgentConfig) -> Self {
        self.config = config;
        self
    }

    /// Replaces the process-wide start guard.
    ///
    /// Agents sharing a guard are mutually exclusive: only the first to start runs.
    #[must_use]
    pub fn start_guard(mut self, start_guard: &'static StartGuard) -> Self {
        self.start_guard = start_guard;
        self
    }

    /// Replaces OS host name detection, used at start when no host name is configured.
    #[must_use]
    pub fn host_name_resolver(mut self, resolver: HostNameResolver) -> Self {
        self.host_name_resolver = resolver;
        self
    }

    /// Builds the agent with the standard collaborator set.
    pub fn build(self) -> Agent {
        self.build_with(|ctx| StandardCollaborators::new(ctx).collaborators())
    }

    /// Builds the agent with collaborators produced by `factory`.
    ///
    /// The factory runs exactly once, after the run identifier has been assigned.
    pub fn build_with(self, factory: impl FnOnce(&AgentContext) -> Collaborators) -> Agent {
        let run_ts = unix_seconds();
        let ids = IdGenerator::new();
        let run_id = ids.generate();

        let config = SharedConfig::new(self.config);
        let diagnostics = Diagnostics::new(config.clone());
        let overhead_lock = Arc::new(Mutex::new(()));
        let agent_enabled = Arc::new(AtomicBool::new(true));

        let ctx = AgentContext {
            config: config.clone(),
            overhead_lock: Arc::clone(&overhead_lock),
            diagnostics: diagnostics.clone(),
            run_id: run_id.clone(),
            agent_enabled: Arc::clone(&agent_enabled),
        };
        let collaborators = factory(&ctx);

        Agent {
            ids,
            run_id,
            run_ts,
            overhead_lock,
            agent_enabled,
            config,
            diagnostics,
            start_guard: self.start_guard,
            resolve_host_name: self.host_name_resolver,
            state: AtomicU8::new(AgentState::Created as u8),
            collaborators,
            degraded: Mutex::new(Vec::new()),
        }
    }
}

/// The process-embedded agent.
///
/// ## Lifecycle
///
/// 1. **Construction** ([`Agent::new`], [`Agent::builder`]): run id assigned, every
///    collaborator created.
/// 2. **Configuration** ([`Agent::configure`]): allowed until `start`.
/// 3. **Start** ([`Agent::start`]): at most once per start guard, which defaults to a
///    process-wide one.
///
/// There is no teardown: the agent lives until the process exits.
///
/// ## Thread Safety
///
/// All methods take `&self`. The recording facade is meant to be called from any
/// number of threads; it never blocks on the agent and never panics into the caller.
#[derive(Debug)]
pub struct Agent {
    ids: IdGenerator,
    run_id: String,
    run_ts: i64,
    overhead_lock: Arc<Mutex<()>>,
    agent_enabled: Arc<AtomicBool>,
    config: SharedConfig,
    diagnostics: Diagnostics,
    start_guard: &'static StartGuard,
    resolve_host_name: HostNameResolver,
    state: AtomicU8,
    collaborators: Collaborators,
    /// Collaborators whose start failed or panicked.
    degraded: Mutex<Vec<&'static str>>,
}

impl Default for Agent {
    fn default() -> Self {
        Self::new()
    }
}

impl Agent {
    /// Agent with default configuration, the process-wide start guard and the standard
    /// collaborators.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> AgentBuilder {
        AgentBuilder::default()
    }

    /// Mutates configuration before start.
    ///
    /// `f` edits a copy that is written back afterwards, so it may read the agent.
    /// Once `start` has been called the change is dropped and `false` is returned.
    pub fn configure(&self, f: impl FnOnce(&mut AgentConfig)) -> bool {
        if self.state() != AgentState::Created {
            self.diagnostics
                .warn("Agent already started, configuration change ignored.");
            return false;
        }

        let mut config = self.config.snapshot();
        f(&mut config);
        *self.config.write() = config;
        true
    }

    /// Starts the agent.
    ///
    /// A no-op (with a debug-gated warning) when another agent sharing the start guard,
    /// or this one, already started. Collaborator failures are logged and recorded in
    /// [`Agent::degraded_collaborators`]; they never abort the sequence.
    pub fn start(&self) {
        if !self.start_guard.try_acquire() {
            self.diagnostics.warn(
                "Agent configuration failed. Another agent has already been initialized.",
            );
            return;
        }
        self.set_state(AgentState::Starting);

        self.diagnostics
            .recover_and_log("resolve_host_name", || self.fill_host_name());
        self.start_collaborators();
        self.set_state(AgentState::Started);
        self.diagnostics.log("Agent started.");
    }

    /// Reports a timed segment identified by `path`.
    ///
    /// Ignored until the agent is started.
    pub fn record_segment(&self, path: &[&str], duration: i64) {
        if !self.is_started() {
            return;
        }

        self.diagnostics.recover_and_log("record_segment", || {
            self.collaborators
                .segment_reporter
                .record_segment(path, duration);
        });
    }

    /// Reports an error under `group`.
    ///
    /// `skip_frames` is relative to the caller; the agent accounts for its own frame.
    /// Ignored until the agent is started.
    pub fn record_error(&self, group: &str, payload: impl Into<ErrorPayload>, skip_frames: usize) {
        if !self.is_started() {
            return;
        }

        self.diagnostics.recover_and_log("record_error", || {
            let error = payload.into().into_error();
            self.collaborators.error_reporter.record_error(
                group,
                error,
                skip_frames.saturating_add(1),
            );
        });
    }

    /// Generates a new correlation identifier.
    pub fn next_id(&self) -> String {
        self.ids.generate()
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Creation time, seconds since epoch.
    pub fn run_ts(&self) -> i64 {
        self.run_ts
    }

    pub fn overhead_lock(&self) -> Arc<Mutex<()>> {
        Arc::clone(&self.overhead_lock)
    }

    /// Copy of the current configuration.
    pub fn config(&self) -> AgentConfig {
        self.config.snapshot()
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn state(&self) -> AgentState {
        AgentState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_started(&self) -> bool {
        self.state() == AgentState::Started
    }

    /// Cleared by the dashboard through the configuration loader.
    pub fn is_enabled(&self) -> bool {
        self.agent_enabled.load(Ordering::Acquire)
    }

    /// Names of the collaborators whose start failed, in start order.
    pub fn degraded_collaborators(&self) -> Vec<&'static str> {
        self.degraded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_state(&self, state: AgentState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Fills in the host name from the OS unless it was configured.
    fn fill_host_name(&self) {
        if !self.config.read().host_name.is_empty() {
            return;
        }

        let host_name = match (self.resolve_host_name)() {
            Ok(host_name) => host_name,
            Err(e) => {
                self.diagnostics.error(&e);
                String::new()
            }
        };

        let mut config = self.config.write();
        if config.host_name.is_empty() {
            config.host_name = host_name;
        }
    }

    fn start_collaborators(&self) {
        for collaborator in self.collaborators.start_order() {
            let name = collaborator.name();
            let outcome = self
                .diagnostics
                .guard(name, || collaborator.start())
                .and_then(|started| started);

            if let Err(e) = outcome {
                self.diagnostics.error(&e);
                self.degraded
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(name);
            }
        }
    }
}
