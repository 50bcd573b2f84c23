// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Debug-gated diagnostics and panic recovery.
//!
//! Every line the agent writes goes through [`Diagnostics`]. When the `debug` option is
//! off, nothing is emitted at all, independently of the installed subscriber's filter:
//! an embedded agent must stay silent in the host's logs unless asked otherwise.
//!
//! The recovery wrapper ([`Diagnostics::guard`], [`Diagnostics::recover_and_log`]) is
//! placed at the agent's public API boundary. A panic raised underneath it is caught,
//! logged, and turned into a value so the host application keeps running.

use std::any::Any;
use std::fmt::Display;
use std::panic::{self, AssertUnwindSafe};

use tracing::{error, info, warn};

use crate::config::SharedConfig;
use crate::error::AgentError;

#[derive(Debug, Clone)]
pub struct Diagnostics {
    config: SharedConfig,
}

impl Diagnostics {
    pub fn new(config: SharedConfig) -> Self {
        Self { config }
    }

    pub fn enabled(&self) -> bool {
        self.config.debug()
    }

    /// Informational line.
    pub fn log(&self, message: impl Display) {
        if self.enabled() {
            info!("{message}");
        }
    }

    pub fn warn(&self, message: impl Display) {
        if self.enabled() {
            warn!("{message}");
        }
    }

    /// Error banner followed by the error's text.
    pub fn error(&self, err: &dyn Display) {
        if self.enabled() {
            error!("Error: {err}");
        }
    }

    /// Runs `f`, converting a panic into [`AgentError::Panic`].
    ///
    /// Nothing is logged here; callers decide what a failure means for them.
    pub fn guard<R>(&self, operation: &str, f: impl FnOnce() -> R) -> Result<R, AgentError> {
        panic::catch_unwind(AssertUnwindSafe(f)).map_err(|payload| AgentError::Panic {
            operation: operation.to_string(),
            message: format_panic(payload.as_ref()),
        })
    }

    /// Runs `f` and swallows any panic after logging it.
    ///
    /// Returns `None` when `f` panicked.
    pub fn recover_and_log<R>(&self, operation: &str, f: impl FnOnce() -> R) -> Option<R> {
        match self.guard(operation, f) {
            Ok(value) => Some(value),
            Err(err) => {
                self.log(&err);
                None
            }
        }
    }
}

fn format_panic(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else {
        "unknown panic".to_string()
    }
}
