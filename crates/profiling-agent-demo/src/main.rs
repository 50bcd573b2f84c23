// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

use std::{env, sync::Arc};

use anyhow::Context;
use rand::Rng;
use tokio::time::{interval, Duration};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use profiling_agent::{
    logger::Formatter, Agent, AgentConfig, StandardCollaborators, Transport,
};

const WORKLOAD_TICK: Duration = Duration::from_millis(200);
const REPORT_INTERVAL: Duration = Duration::from_secs(1);
const DEFAULT_RUN_SECONDS: u64 = 5;

#[tokio::main]
pub async fn main() {
    let log_level = env::var("PROFILING_AGENT_LOG_LEVEL")
        .map(|val| val.to_lowercase())
        .unwrap_or("info".to_string());

    if let Err(e) = init_logging(&log_level) {
        eprintln!("Failed to initialize logging: {e:#}");
        return;
    }

    if let Err(e) = run().await {
        error!("Demo workload failed: {e:#}");
    }
}

fn init_logging(log_level: &str) -> anyhow::Result<()> {
    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_new(log_level).context("could not parse PROFILING_AGENT_LOG_LEVEL")?,
        )
        .event_format(Formatter)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")?;
    debug!("Logging subsystem enabled");
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    let config = AgentConfig::from_env().context("invalid agent configuration")?;
    let run_seconds = env::var("PROFILING_AGENT_DEMO_SECONDS")
        .ok()
        .and_then(|val| val.parse::<u64>().ok())
        .unwrap_or(DEFAULT_RUN_SECONDS);

    let mut handles = None;
    let agent = Agent::builder().config(config).build_with(|ctx| {
        let standard = StandardCollaborators::new(ctx);
        let collaborators = standard.collaborators();
        handles = Some(standard);
        collaborators
    });
    let standard = handles.context("collaborator factory was not invoked")?;
    let agent = Arc::new(agent);

    agent.start();
    // Second start exercises the process guard; it only warns.
    agent.start();
    info!(
        "Agent run {} started, degraded collaborators: {:?}",
        agent.run_id(),
        agent.degraded_collaborators()
    );

    let cancel = CancellationToken::new();
    let worker = tokio::spawn(workload(Arc::clone(&agent), standard.clone(), cancel.clone()));

    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, stopping workload");
            shutdown.cancel();
        }
    });

    let mut reports = interval(REPORT_INTERVAL);
    let deadline = tokio::time::sleep(Duration::from_secs(run_seconds));
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = reports.tick() => flush(&standard)?,
            () = &mut deadline => {
                cancel.cancel();
                break;
            }
            () = cancel.cancelled() => break,
        }
    }

    worker.await.context("workload task failed")?;
    flush(&standard)?;
    Ok(())
}

/// Simulated request handling instrumented with the agent.
async fn workload(agent: Arc<Agent>, standard: StandardCollaborators, cancel: CancellationToken) {
    let mut ticks = interval(WORKLOAD_TICK);
    let mut request: u64 = 0;

    loop {
        tokio::select! {
            _ = ticks.tick() => {}
            () = cancel.cancelled() => return,
        }
        request += 1;

        let (duration, failed) = {
            let mut rng = rand::thread_rng();
            (rng.gen_range(1..250_i64), rng.gen_bool(0.2))
        };
        agent.record_segment(&["http", "GET /cart"], duration);
        if duration > 200 {
            agent.record_segment(&["http", "GET /cart", "db"], duration - 200);
        }

        if failed {
            agent.record_error(
                "checkout",
                anyhow::anyhow!("cart service unavailable (request {request})"),
                0,
            );
        }
        if request % 10 == 0 {
            agent.record_error("checkout", request, 0);
        }

        standard
            .cpu_reporter
            .run_profile(|| debug!("cpu profile taken for request {request}"));
    }
}

/// Moves aggregates into the queue and prints each queued message as it would be sent.
fn flush(standard: &StandardCollaborators) -> anyhow::Result<()> {
    standard.report();
    let url = standard.api_request.url("upload");
    for message in standard.message_queue.drain() {
        let envelope = standard.api_request.envelope(&message.topic, message.content);
        let line = serde_json::to_string(&envelope).context("failed to serialize message")?;
        println!("POST {url} {line}");
    }
    Ok(())
}
