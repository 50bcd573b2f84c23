//! Custom tracing formatter for agent diagnostics.
//!
//! Every line is prefixed with a millisecond timestamp and the agent version so agent
//! output can be told apart from the host application's own logs.
//!
//! # Format
//!
//! ```text
//! [Mmm DD HH:MM:SS.mmm] ProfilingAgent VERSION: LEVEL [span_name{span_fields}:] message {event_fields}
//! ```
//!
//! # Examples
//!
//! ```text
//! [Oct 19 14:02:11.093] ProfilingAgent 1.2.2: INFO Agent started.
//! [Oct 19 14:02:11.094] ProfilingAgent 1.2.2: WARN Agent configuration failed. Another agent has already been initialized.
//! [Oct 19 14:02:11.120] ProfilingAgent 1.2.2: ERROR Error: Failed to detect host name: EPERM
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use tracing_subscriber::FmtSubscriber;
//! use profiling_agent::logger::Formatter;
//!
//! let subscriber = FmtSubscriber::builder()
//!     .event_format(Formatter)
//!     .with_max_level(tracing::Level::INFO)
//!     .finish();
//!
//! tracing::subscriber::set_global_default(subscriber)?;
//! ```

use std::fmt;
use tracing_core::{Event, Subscriber};
use tracing_subscriber::fmt::{
    format::{self, FormatEvent, FormatFields},
    FmtContext, FormattedFields,
};
use tracing_subscriber::registry::LookupSpan;

use crate::AGENT_VERSION;

/// Timestamp layout of the line prefix (month, day, time with milliseconds).
const TIMESTAMP_FORMAT: &str = "%b %e %H:%M:%S%.3f";

/// Custom log formatter that prefixes messages with a timestamp and the agent version.
#[derive(Debug, Clone, Copy)]
pub struct Formatter;

impl<S, N> FormatEvent<S, N> for Formatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: format::Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let metadata = event.metadata();
        write!(
            &mut writer,
            "[{}] ProfilingAgent {}: {} ",
            chrono::Local::now().format(TIMESTAMP_FORMAT),
            AGENT_VERSION,
            metadata.level()
        )?;

        if let Some(scope) = ctx.event_scope() {
            for span in scope.from_root() {
                write!(writer, "{}", span.name())?;

                let ext = span.extensions();
                if let Some(fields) = ext.get::<FormattedFields<N>>() {
                    if !fields.is_empty() {
                        write!(writer, "{{{fields}}}")?;
                    }
                }
                write!(writer, ": ")?;
            }
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;

        writeln!(writer)
    }
}
