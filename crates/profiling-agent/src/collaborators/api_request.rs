// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Request envelopes for the dashboard.
//!
//! Only the addressing and the metadata wrapped around each message live here; the
//! delivery itself belongs to the embedder.

use serde_json::json;

use super::{AgentContext, Transport};
use crate::config::SharedConfig;
use crate::id::unix_seconds;
use crate::AGENT_VERSION;

/// Path prefix of every agent endpoint on the dashboard.
pub const API_PATH_PREFIX: &str = "agent/v1";

pub const RUNTIME_TYPE: &str = "rust";

#[derive(Debug)]
pub struct ApiRequest {
    config: SharedConfig,
    run_id: String,
}

impl ApiRequest {
    pub fn new(ctx: &AgentContext) -> Self {
        Self {
            config: ctx.config.clone(),
            run_id: ctx.run_id.clone(),
        }
    }
}

impl Transport for ApiRequest {
    fn name(&self) -> &'static str {
        "api request"
    }

    fn url(&self, endpoint: &str) -> String {
        format!(
            "{}/{}/{}",
            self.config.read().dashboard_address.trim_end_matches('/'),
            API_PATH_PREFIX,
            endpoint.trim_start_matches('/')
        )
    }

    fn envelope(&self, topic: &str, content: serde_json::Value) -> serde_json::Value {
        let config = self.config.snapshot();
        json!({
            "runtime_type": RUNTIME_TYPE,
            "agent_version": AGENT_VERSION,
            "app_name": config.app_name,
            "app_version": config.app_version,
            "app_environment": config.app_environment,
            "host_name": config.host_name,
            "run_id": self.run_id,
            "sent_at": unix_seconds(),
            "topic": topic,
            "payload": content,
        })
    }
}
