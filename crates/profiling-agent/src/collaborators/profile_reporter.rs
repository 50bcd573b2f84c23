// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Process, CPU, allocation and block reporters.
//!
//! Sampling itself is out of this crate's hands. A reporter tracks whether it is active
//! and serializes profiling runs on the agent's overhead lock, so at most one profile
//! is taken at a time across all reporters of an agent.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use super::{AgentContext, Collaborator};
use crate::config::SharedConfig;
use crate::diagnostics::Diagnostics;
use crate::error::AgentError;
use crate::guard::StartGuard;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProfileKind {
    Process,
    Cpu,
    Allocation,
    Block,
}

impl ProfileKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Process => "process reporter",
            Self::Cpu => "cpu reporter",
            Self::Allocation => "allocation reporter",
            Self::Block => "block reporter",
        }
    }

    /// Whether `disable_profiling` turns this reporter off.
    pub fn is_profiler(self) -> bool {
        !matches!(self, Self::Process)
    }
}

#[derive(Debug)]
pub struct ProfileReporter {
    kind: ProfileKind,
    guard: StartGuard,
    config: SharedConfig,
    diagnostics: Diagnostics,
    overhead_lock: Arc<Mutex<()>>,
    active: AtomicBool,
    agent_enabled: Arc<AtomicBool>,
    profiles_taken: AtomicU64,
}

impl ProfileReporter {
    pub fn new(kind: ProfileKind, ctx: &AgentContext) -> Self {
        Self {
            kind,
            guard: StartGuard::new(),
            config: ctx.config.clone(),
            diagnostics: ctx.diagnostics.clone(),
            overhead_lock: Arc::clone(&ctx.overhead_lock),
            active: AtomicBool::new(false),
            agent_enabled: Arc::clone(&ctx.agent_enabled),
            profiles_taken: AtomicU64::new(0),
        }
    }

    pub fn kind(&self) -> ProfileKind {
        self.kind
    }

    /// Started, agent enabled and, for profilers, not disabled at the time of the run.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
            && self.agent_enabled.load(Ordering::Acquire)
            && !(self.kind.is_profiler() && self.config.profiling_disabled())
    }

    /// Runs one profiling pass while holding the overhead lock.
    ///
    /// Returns `None` without running `profile` when the reporter is inactive.
    pub fn run_profile<R>(&self, profile: impl FnOnce() -> R) -> Option<R> {
        if !self.is_active() {
            return None;
        }

        let _overhead = self
            .overhead_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let result = profile();
        self.profiles_taken.fetch_add(1, Ordering::Relaxed);
        Some(result)
    }

    pub fn profiles_taken(&self) -> u64 {
        self.profiles_taken.load(Ordering::Relaxed)
    }
}

impl Collaborator for ProfileReporter {
    fn name(&self) -> &'static str {
        self.kind.name()
    }

    fn start(&self) -> Result<(), AgentError> {
        self.guard.acquire_for(self.name())?;

        if self.kind.is_profiler() && self.config.profiling_disabled() {
            self.diagnostics
                .log(format!("Profiling disabled, {} inactive.", self.name()));
        }
        self.active.store(true, Ordering::Release);
        Ok(())
    }
}
