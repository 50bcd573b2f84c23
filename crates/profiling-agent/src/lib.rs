//! # Profiling Agent
//!
//! An in-process agent embedded into an application. It owns configuration, a run
//! identifier and a fixed set of collaborators (configuration loader, message queue,
//! profile reporters, segment and error reporters), starts them exactly once per
//! process, and exposes a recording facade that never blocks or panics into the host.
//!
//! ## Architecture
//!
//! - [`agent`]: the [`Agent`] coordinator, its builder and the facade payloads
//! - [`collaborators`]: collaborator traits and the standard implementations
//! - [`config`]: options and the shared configuration handle
//! - [`diagnostics`]: debug-gated logging and panic recovery
//! - [`guard`]: the process-wide start guard
//! - [`id`]: correlation identifiers
//! - [`logger`]: tracing formatter for agent output
//!
//! ## Usage
//!
//! ```
//! use profiling_agent::{Agent, StartGuard};
//!
//! static GUARD: StartGuard = StartGuard::new();
//!
//! let agent = Agent::builder().start_guard(&GUARD).build();
//! agent.configure(|config| {
//!     config.app_name = "checkout".to_string();
//!     config.host_name = "web-1".to_string();
//! });
//! agent.start();
//!
//! agent.record_segment(&["db", "query"], 120);
//! agent.record_error("db", "connection reset", 0);
//! assert!(agent.is_started());
//! ```

#![deny(clippy::all)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(unused_extern_crates)]
#![deny(unused_allocation)]
#![deny(unused_assignments)]
#![deny(unused_comparisons)]
#![deny(missing_copy_implementations)]
#![allow(missing_docs)]
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

/// Agent coordinator and recording facade
pub mod agent;

/// Collaborator contracts and the standard collaborator set
pub mod collaborators;

pub mod config;

pub mod diagnostics;

pub mod error;

/// Start-once guards
pub mod guard;

pub mod hostname;

pub mod id;

/// Diagnostic line formatting
pub mod logger;

/// Version reported in diagnostics.
pub const AGENT_VERSION: &str = "1.2.2";

pub use agent::{Agent, AgentBuilder, AgentState, ErrorPayload};
pub use collaborators::{
    AgentContext, Collaborator, Collaborators, ErrorRecorder, SegmentRecorder,
    StandardCollaborators, Transport,
};
pub use config::{AgentConfig, SharedConfig, SAAS_DASHBOARD_ADDRESS};
pub use error::AgentError;
pub use hostname::HostNameResolver;
pub use guard::StartGuard;
