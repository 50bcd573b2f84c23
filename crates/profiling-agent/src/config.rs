// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::error::AgentError;
use std::env;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Default dashboard endpoint used when none is configured.
pub const SAAS_DASHBOARD_ADDRESS: &str = "https://agent-api.stackimpact.com";

/// Agent options set by the embedding application before `start`.
///
/// Fields are plain values and are not validated when assigned. Call
/// [`AgentConfig::validate`] explicitly if the values come from an untrusted source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentConfig {
    /// Dashboard endpoint URL
    pub dashboard_address: String,
    /// Agent authentication key
    pub agent_key: String,
    pub app_name: String,
    pub app_version: String,
    /// Application environment label (e.g., production, staging)
    pub app_environment: String,
    /// Host name override. Detected from the OS at start when empty.
    pub host_name: String,
    /// Enables agent diagnostics
    pub debug: bool,
    /// Disables the CPU, allocation and block profilers
    pub disable_profiling: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            dashboard_address: SAAS_DASHBOARD_ADDRESS.to_string(),
            agent_key: String::new(),
            app_name: String::new(),
            app_version: String::new(),
            app_environment: String::new(),
            host_name: String::new(),
            debug: false,
            disable_profiling: false,
        }
    }
}

impl AgentConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self, AgentError> {
        let defaults = Self::default();

        let config = Self {
            dashboard_address: env::var("PROFILING_AGENT_DASHBOARD_ADDRESS")
                .unwrap_or(defaults.dashboard_address),
            agent_key: env::var("PROFILING_AGENT_KEY").unwrap_or_default(),
            app_name: env::var("PROFILING_AGENT_APP_NAME").unwrap_or_default(),
            app_version: env::var("PROFILING_AGENT_APP_VERSION").unwrap_or_default(),
            app_environment: env::var("PROFILING_AGENT_APP_ENVIRONMENT").unwrap_or_default(),
            host_name: env::var("PROFILING_AGENT_HOST_NAME").unwrap_or_default(),
            debug: env_flag("PROFILING_AGENT_DEBUG"),
            disable_profiling: env_flag("PROFILING_AGENT_DISABLE_PROFILING"),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), AgentError> {
        let address = self.dashboard_address.trim();
        if address.is_empty() {
            return Err(AgentError::InvalidConfig(
                "dashboard address cannot be empty".to_string(),
            ));
        }

        if !(address.starts_with("https://") || address.starts_with("http://")) {
            return Err(AgentError::InvalidConfig(format!(
                "dashboard address '{address}' must be an http(s) URL"
            )));
        }

        if self.agent_key.chars().any(char::is_whitespace) {
            return Err(AgentError::InvalidConfig(
                "agent key must not contain whitespace".to_string(),
            ));
        }

        Ok(())
    }
}

fn env_flag(key: &str) -> bool {
    env::var(key)
        .map(|val| matches!(val.trim().to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(false)
}

/// Read-mostly configuration handle shared between the agent and its collaborators.
///
/// Collaborators only ever see this handle, never the agent itself. A poisoned lock is
/// recovered rather than propagated: configuration values stay usable after a panic in
/// an unrelated writer.
#[derive(Debug, Clone, Default)]
pub struct SharedConfig {
    inner: Arc<RwLock<AgentConfig>>,
}

impl SharedConfig {
    pub fn new(config: AgentConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(config)),
        }
    }

    pub fn read(&self) -> RwLockReadGuard<'_, AgentConfig> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, AgentConfig> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of the current values.
    pub fn snapshot(&self) -> AgentConfig {
        self.read().clone()
    }

    pub fn debug(&self) -> bool {
        self.read().debug
    }

    pub fn profiling_disabled(&self) -> bool {
        self.read().disable_profiling
    }
}
