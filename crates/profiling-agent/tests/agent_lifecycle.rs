// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

mod common;

use common::{leaked_guard, Recorders, START_ORDER};
use profiling_agent::collaborators::config_loader::RemoteSettings;
use profiling_agent::collaborators::segment_reporter::SEGMENTS_TOPIC;
use profiling_agent::{
    Agent, AgentConfig, AgentState, ErrorPayload, StandardCollaborators, Transport,
};
use std::sync::Arc;

fn config() -> AgentConfig {
    AgentConfig {
        agent_key: "key-123".to_string(),
        app_name: "checkout".to_string(),
        host_name: "web-1".to_string(),
        ..Default::default()
    }
}

#[test]
fn test_factory_runs_once_with_the_run_id() {
    let recorders = Recorders::new();
    let agent = Agent::builder()
        .config(config())
        .start_guard(leaked_guard())
        .build_with(recorders.factory());

    let contexts = recorders.contexts.lock().unwrap();
    assert_eq!(contexts.len(), 1);
    assert_eq!(contexts[0].run_id, agent.run_id());
    assert!(Arc::ptr_eq(&contexts[0].overhead_lock, &agent.overhead_lock()));
}

#[test]
fn test_start_sequence() {
    let recorders = Recorders::new();
    let agent = Agent::builder()
        .config(config())
        .start_guard(leaked_guard())
        .build_with(recorders.factory());
    assert_eq!(agent.state(), AgentState::Created);
    assert!(recorders.journal.lock().unwrap().is_empty());

    agent.start();
    agent.start();

    let expected: Vec<String> = START_ORDER.iter().map(|n| format!("start {n}")).collect();
    assert_eq!(*recorders.journal.lock().unwrap(), expected);
    assert!(recorders.all.iter().all(|r| r.starts() == 1));
    assert_eq!(agent.state(), AgentState::Started);
}

#[test]
fn test_recording_facade_end_to_end() {
    let recorders = Recorders::new();
    let agent = Agent::builder()
        .config(config())
        .start_guard(leaked_guard())
        .build_with(recorders.factory());

    agent.record_segment(&["ignored"], 1);
    agent.record_error("ignored", 1, 0);
    agent.start();

    agent.record_segment(&["http", "GET /cart"], 35);
    agent.record_segment(&[], 0);
    agent.record_error("db", 42, 0);
    agent.record_error("db", ErrorPayload::value(3.5), 2);
    agent.record_error(
        "io",
        std::io::Error::new(std::io::ErrorKind::NotFound, "missing file"),
        0,
    );

    let segments = recorders.segment().segments.lock().unwrap();
    assert_eq!(
        *segments,
        vec![
            (vec!["http".to_string(), "GET /cart".to_string()], 35),
            (Vec::new(), 0),
        ]
    );

    let errors = recorders.error().errors.lock().unwrap();
    assert_eq!(
        *errors,
        vec![
            ("db".to_string(), "42".to_string(), 1),
            ("db".to_string(), "3.5".to_string(), 3),
            ("io".to_string(), "missing file".to_string(), 1),
        ]
    );
}

#[test]
fn test_configuration_before_and_after_start() {
    let recorders = Recorders::new();
    let agent = Agent::builder()
        .start_guard(leaked_guard())
        .build_with(recorders.factory());

    assert!(agent.configure(|c| *c = config()));
    agent.start();
    assert!(!agent.configure(|c| c.agent_key = "other".to_string()));

    let config = agent.config();
    assert_eq!(config.agent_key, "key-123");
    assert_eq!(config.host_name, "web-1");
    assert_eq!(recorders.contexts.lock().unwrap()[0].config.snapshot(), config);
}

#[test]
fn test_agents_on_separate_guards_start_independently() {
    let first = Recorders::new();
    let second = Recorders::new();
    let a = Agent::builder()
        .start_guard(leaked_guard())
        .build_with(first.factory());
    let b = Agent::builder()
        .start_guard(leaked_guard())
        .build_with(second.factory());

    a.start();
    b.start();

    assert!(a.is_started() && b.is_started());
    assert_ne!(a.run_id(), b.run_id());
}

#[test]
fn test_standard_collaborators_report_through_the_queue() {
    let mut handles = None;
    let agent = Agent::builder()
        .config(config())
        .start_guard(leaked_guard())
        .build_with(|ctx| {
            let standard = StandardCollaborators::new(ctx);
            let collaborators = standard.collaborators();
            handles = Some(standard);
            collaborators
        });
    let standard = handles.unwrap();

    agent.start();
    assert!(agent.degraded_collaborators().is_empty());

    agent.record_segment(&["db", "query"], 120);
    agent.record_segment(&["db", "query"], 30);
    agent.record_error("db", "connection reset", 0);
    standard.report();

    let messages = standard.message_queue.drain();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].topic, SEGMENTS_TOPIC);
    assert_eq!(messages[0].content["run_id"], agent.run_id());
    assert_eq!(messages[0].content["segments"]["db/query"]["count"], 2);
    assert_eq!(messages[1].content["errors"][0]["message"], "connection reset");
    assert_eq!(messages[1].content["errors"][0]["skip_frames"], 1);

    assert!(standard.config_loader.apply(RemoteSettings {
        agent_enabled: true,
        profiling_disabled: true,
    }));
    assert!(agent.config().disable_profiling);
    assert!(standard.process_reporter.is_active());
    assert!(!standard.cpu_reporter.is_active());
}

fn standard_agent() -> (Agent, StandardCollaborators) {
    let mut handles = None;
    let agent = Agent::builder()
        .config(config())
        .start_guard(leaked_guard())
        .build_with(|ctx| {
            let standard = StandardCollaborators::new(ctx);
            let collaborators = standard.collaborators();
            handles = Some(standard);
            collaborators
        });
    (agent, handles.unwrap())
}

#[test]
fn test_remote_disable_stops_recording() {
    let (agent, standard) = standard_agent();
    agent.start();

    assert!(standard.config_loader.apply(RemoteSettings {
        agent_enabled: false,
        profiling_disabled: false,
    }));
    assert!(!agent.is_enabled());

    agent.record_segment(&["db", "query"], 120);
    agent.record_error("db", "connection reset", 0);
    assert!(standard.segment_reporter.snapshot().is_empty());
    assert!(standard.error_reporter.snapshot().is_empty());
    assert!(!standard.process_reporter.is_active());

    assert!(standard.config_loader.apply(RemoteSettings::default()));
    agent.record_segment(&["db", "query"], 120);
    assert_eq!(standard.segment_reporter.snapshot().len(), 1);
}

#[test]
fn test_api_request_wraps_queued_messages() {
    let (agent, standard) = standard_agent();
    agent.start();
    agent.record_segment(&["db"], 1);
    standard.report();

    let message = standard.message_queue.drain().remove(0);
    let envelope = standard
        .api_request
        .envelope(&message.topic, message.content.clone());

    assert_eq!(envelope["run_id"], agent.run_id());
    assert_eq!(envelope["app_name"], "checkout");
    assert_eq!(envelope["host_name"], "web-1");
    assert_eq!(envelope["payload"], message.content);
    assert!(standard
        .api_request
        .url("upload")
        .starts_with(profiling_agent::SAAS_DASHBOARD_ADDRESS));
}
