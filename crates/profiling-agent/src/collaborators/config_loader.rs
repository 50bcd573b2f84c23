// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Applies dashboard-provided settings to the shared configuration.
//!
//! Fetching the settings is the transport's job; the loader only owns what happens once
//! they arrive. Settings received before the loader is started are ignored.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::{AgentContext, Collaborator};
use crate::config::SharedConfig;
use crate::diagnostics::Diagnostics;
use crate::error::AgentError;
use crate::guard::StartGuard;

/// Settings pushed from the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteSettings {
    pub agent_enabled: bool,
    pub profiling_disabled: bool,
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            agent_enabled: true,
            profiling_disabled: false,
        }
    }
}

#[derive(Debug)]
pub struct ConfigLoader {
    guard: StartGuard,
    config: SharedConfig,
    diagnostics: Diagnostics,
    /// Shared with every reporter of the agent.
    agent_enabled: Arc<AtomicBool>,
}

impl ConfigLoader {
    pub fn new(ctx: &AgentContext) -> Self {
        Self {
            guard: StartGuard::new(),
            config: ctx.config.clone(),
            diagnostics: ctx.diagnostics.clone(),
            agent_enabled: Arc::clone(&ctx.agent_enabled),
        }
    }

    /// Applies `settings`. Returns `false` when the loader is not started yet.
    pub fn apply(&self, settings: RemoteSettings) -> bool {
        if !self.guard.is_acquired() {
            return false;
        }

        let was_enabled = self
            .agent_enabled
            .swap(settings.agent_enabled, Ordering::AcqRel);
        if was_enabled != settings.agent_enabled {
            if settings.agent_enabled {
                self.diagnostics.log("Agent enabled.");
            } else {
                self.diagnostics.log("Agent disabled.");
            }
        }

        let mut config = self.config.write();
        if config.disable_profiling != settings.profiling_disabled {
            config.disable_profiling = settings.profiling_disabled;
            drop(config);
            if settings.profiling_disabled {
                self.diagnostics.log("Profiling disabled.");
            } else {
                self.diagnostics.log("Profiling enabled.");
            }
        }

        true
    }

    pub fn is_agent_enabled(&self) -> bool {
        self.agent_enabled.load(Ordering::Acquire)
    }
}

impl Collaborator for ConfigLoader {
    fn name(&self) -> &'static str {
        "config loader"
    }

    fn start(&self) -> Result<(), AgentError> {
        self.guard.acquire_for(self.name())
    }
}
