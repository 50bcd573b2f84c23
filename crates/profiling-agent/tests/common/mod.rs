// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use profiling_agent::{
    AgentContext, AgentError, Collaborator, Collaborators, ErrorRecorder, SegmentRecorder,
    StartGuard, Transport,
};

pub const START_ORDER: [&str; 8] = [
    "config loader",
    "message queue",
    "process reporter",
    "cpu reporter",
    "allocation reporter",
    "block reporter",
    "segment reporter",
    "error reporter",
];

/// A guard private to one test, so tests do not race on the process guard.
pub fn leaked_guard() -> &'static StartGuard {
    Box::leak(Box::new(StartGuard::new()))
}

/// Records every call it receives.
pub struct Recorder {
    name: &'static str,
    journal: Arc<Mutex<Vec<String>>>,
    starts: AtomicUsize,
    pub segments: Mutex<Vec<(Vec<String>, i64)>>,
    pub errors: Mutex<Vec<(String, String, usize)>>,
}

impl Recorder {
    fn new(name: &'static str, journal: &Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            name,
            journal: Arc::clone(journal),
            starts: AtomicUsize::new(0),
            segments: Mutex::new(Vec::new()),
            errors: Mutex::new(Vec::new()),
        }
    }

    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }
}

impl Collaborator for Recorder {
    fn name(&self) -> &'static str {
        self.name
    }

    fn start(&self) -> Result<(), AgentError> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        self.journal
            .lock()
            .unwrap()
            .push(format!("start {}", self.name));
        Ok(())
    }
}

impl SegmentRecorder for Recorder {
    fn record_segment(&self, path: &[&str], duration: i64) {
        self.segments
            .lock()
            .unwrap()
            .push((path.iter().map(|s| (*s).to_string()).collect(), duration));
    }
}

impl ErrorRecorder for Recorder {
    fn record_error(&self, group: &str, error: anyhow::Error, skip_frames: usize) {
        self.errors
            .lock()
            .unwrap()
            .push((group.to_string(), error.to_string(), skip_frames));
    }
}

impl Transport for Recorder {
    fn name(&self) -> &'static str {
        self.name
    }

    fn url(&self, endpoint: &str) -> String {
        format!("http://localhost/{endpoint}")
    }

    fn envelope(&self, _topic: &str, content: serde_json::Value) -> serde_json::Value {
        content
    }
}

/// The recording collaborator set plus the journal of start calls.
pub struct Recorders {
    pub journal: Arc<Mutex<Vec<String>>>,
    pub all: Vec<Arc<Recorder>>,
    pub contexts: Arc<Mutex<Vec<AgentContext>>>,
}

impl Recorders {
    pub fn new() -> Self {
        let journal = Arc::new(Mutex::new(Vec::new()));
        let all = START_ORDER
            .into_iter()
            .map(|name| Arc::new(Recorder::new(name, &journal)))
            .collect();
        Self {
            journal,
            all,
            contexts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn segment(&self) -> &Recorder {
        &self.all[6]
    }

    pub fn error(&self) -> &Recorder {
        &self.all[7]
    }

    /// Factory for `AgentBuilder::build_with`.
    pub fn factory(&self) -> impl FnOnce(&AgentContext) -> Collaborators + '_ {
        move |ctx: &AgentContext| {
            self.contexts.lock().unwrap().push(ctx.clone());
            Collaborators {
                config_loader: self.all[0].clone(),
                message_queue: self.all[1].clone(),
                process_reporter: self.all[2].clone(),
                cpu_reporter: self.all[3].clone(),
                allocation_reporter: self.all[4].clone(),
                block_reporter: self.all[5].clone(),
                segment_reporter: self.all[6].clone(),
                error_reporter: self.all[7].clone(),
                api_request: Arc::new(Recorder::new("api request", &self.journal)),
            }
        }
    }
}
