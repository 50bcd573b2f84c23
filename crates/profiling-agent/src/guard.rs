// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Start-once guards.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::AgentError;

static PROCESS_START_GUARD: StartGuard = StartGuard::new();

/// One-shot flag acquired with a compare-and-swap.
///
/// Only the first [`StartGuard::try_acquire`] call succeeds, even when several threads
/// race on it.
#[derive(Debug, Default)]
pub struct StartGuard {
    acquired: AtomicBool,
}

impl StartGuard {
    pub const fn new() -> Self {
        Self {
            acquired: AtomicBool::new(false),
        }
    }

    /// The guard shared by every agent in this process.
    pub fn process() -> &'static StartGuard {
        &PROCESS_START_GUARD
    }

    /// Returns `true` for the single caller that flips the guard.
    pub fn try_acquire(&self) -> bool {
        self.acquired
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Like [`StartGuard::try_acquire`], reporting a lost race as
    /// [`AgentError::AlreadyStarted`] for `name`.
    pub fn acquire_for(&self, name: &'static str) -> Result<(), AgentError> {
        if self.try_acquire() {
            Ok(())
        } else {
            Err(AgentError::AlreadyStarted(name))
        }
    }

    pub fn is_acquired(&self) -> bool {
        self.acquired.load(Ordering::Acquire)
    }
}
