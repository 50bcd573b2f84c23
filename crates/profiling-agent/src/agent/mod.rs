// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Agent lifecycle and the recording facade.

mod coordinator;
mod payload;

pub use coordinator::{Agent, AgentBuilder, AgentState};
pub use payload::ErrorPayload;
