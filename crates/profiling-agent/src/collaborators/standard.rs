// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use super::api_request::ApiRequest;
use super::config_loader::ConfigLoader;
use super::error_reporter::ErrorReporter;
use super::message_queue::MessageQueue;
use super::profile_reporter::{ProfileKind, ProfileReporter};
use super::segment_reporter::SegmentReporter;
use super::{AgentContext, Collaborators};

/// Typed handles to the default collaborator set.
///
/// The agent only sees the trait objects returned by [`StandardCollaborators::collaborators`];
/// embedders keep this value to reach the concrete types (draining the message queue,
/// pushing remote settings, triggering reports).
#[derive(Debug, Clone)]
pub struct StandardCollaborators {
    pub config_loader: Arc<ConfigLoader>,
    pub message_queue: Arc<MessageQueue>,
    pub process_reporter: Arc<ProfileReporter>,
    pub cpu_reporter: Arc<ProfileReporter>,
    pub allocation_reporter: Arc<ProfileReporter>,
    pub block_reporter: Arc<ProfileReporter>,
    pub segment_reporter: Arc<SegmentReporter>,
    pub error_reporter: Arc<ErrorReporter>,
    pub api_request: Arc<ApiRequest>,
}

impl StandardCollaborators {
    pub fn new(ctx: &AgentContext) -> Self {
        let message_queue = Arc::new(MessageQueue::new(ctx));

        Self {
            config_loader: Arc::new(ConfigLoader::new(ctx)),
            process_reporter: Arc::new(ProfileReporter::new(ProfileKind::Process, ctx)),
            cpu_reporter: Arc::new(ProfileReporter::new(ProfileKind::Cpu, ctx)),
            allocation_reporter: Arc::new(ProfileReporter::new(ProfileKind::Allocation, ctx)),
            block_reporter: Arc::new(ProfileReporter::new(ProfileKind::Block, ctx)),
            segment_reporter: Arc::new(SegmentReporter::new(ctx, Arc::clone(&message_queue))),
            error_reporter: Arc::new(ErrorReporter::new(ctx, Arc::clone(&message_queue))),
            api_request: Arc::new(ApiRequest::new(ctx)),
            message_queue,
        }
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            config_loader: self.config_loader.clone(),
            message_queue: self.message_queue.clone(),
            process_reporter: self.process_reporter.clone(),
            cpu_reporter: self.cpu_reporter.clone(),
            allocation_reporter: self.allocation_reporter.clone(),
            block_reporter: self.block_reporter.clone(),
            segment_reporter: self.segment_reporter.clone(),
            error_reporter: self.error_reporter.clone(),
            api_request: self.api_request.clone(),
        }
    }

    /// Reports segment and error aggregates to the message queue.
    pub fn report(&self) {
        self.segment_reporter.report();
        self.error_reporter.report();
    }
}
