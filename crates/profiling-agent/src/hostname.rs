// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Hostname detection

use crate::error::AgentError;

/// Source of the host name used when none is configured.
pub type HostNameResolver = fn() -> Result<String, AgentError>;

/// Get the system hostname.
///
/// Non-UTF-8 hostnames are converted lossily. An empty hostname is returned as-is;
/// the caller decides whether that is acceptable.
#[cfg(unix)]
pub fn detect_hostname() -> Result<String, AgentError> {
    nix::unistd::gethostname()
        .map(|hostname| hostname.to_string_lossy().into_owned())
        .map_err(|e| AgentError::HostName(e.to_string()))
}

/// Windows has no `gethostname` in nix; the computer name is exported to every process.
#[cfg(not(unix))]
pub fn detect_hostname() -> Result<String, AgentError> {
    std::env::var("COMPUTERNAME").map_err(|e| AgentError::HostName(e.to_string()))
}
