// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

/// Errors that can occur inside the agent.
///
/// None of these ever reach application code through the recording facade; they
/// surface only from configuration helpers and at collaborator boundaries, where the
/// coordinator logs them.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to detect host name: {0}")]
    HostName(String),

    #[error("Failed to start {name}: {reason}")]
    CollaboratorStart { name: &'static str, reason: String },

    #[error("{0} already started")]
    AlreadyStarted(&'static str),

    #[error("Recovered from panic in {operation}: {message}")]
    Panic { operation: String, message: String },
}
