//! Bridges between `tracing` and the output stream.
//!
//! | Direction | Type |
//! |-----------|------|
//! | host `tracing` events into run logs | [`RunLogLayer`] |
//! | output lines into host `tracing` events | [`TracingWriter`] |
//!
//! Events emitted by the `ocptv_*` crates themselves are never forwarded, so
//! a run can write to a [`TracingWriter`] while its own [`RunLogLayer`] is
//! installed. Lines written while the layer forwards an event are raised
//! inside that event's dispatch, and `tracing` drops such nested events.

use std::fmt::{self, Debug};
use std::io;
use std::sync::Arc;

use ocptv_core::LogSeverity;
use tracing::field::{Field, Visit};
use tracing::{debug, error, info, trace, warn, Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

use crate::run::TestRun;
use crate::source::SourceLocation;
use crate::writer::Writer;

/// Target of the events written by [`TracingWriter`].
pub const SINK_TARGET: &str = "ocptv_output::sink";

const LIBRARY_TARGETS: [&str; 2] = ["ocptv_output", "ocptv_core"];

/// Run log severity for a `tracing` level.
pub fn severity_for(level: &Level) -> LogSeverity {
    match *level {
        Level::ERROR => LogSeverity::Error,
        Level::WARN => LogSeverity::Warning,
        Level::INFO => LogSeverity::Info,
        _ => LogSeverity::Debug,
    }
}

/// `tracing` layer writing every event as a run-level log.
///
/// The event's file and line become the log's source location.
pub struct RunLogLayer {
    run: Arc<TestRun>,
    max_level: Level,
}

impl RunLogLayer {
    /// Forward events up to `DEBUG` verbosity to `run`.
    pub fn new(run: Arc<TestRun>) -> Self {
        Self {
            run,
            max_level: Level::DEBUG,
        }
    }

    /// Drop events more verbose than `level`.
    pub fn with_max_level(mut self, level: Level) -> Self {
        self.max_level = level;
        self
    }
}

impl Debug for RunLogLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunLogLayer")
            .field("run", &self.run.name())
            .field("max_level", &self.max_level)
            .finish()
    }
}

impl<S: Subscriber> Layer<S> for RunLogLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if *metadata.level() > self.max_level || is_library_target(metadata.target()) {
            return;
        }

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        let location = match (metadata.file(), metadata.line()) {
            (Some(file), Some(line)) => SourceLocation::at(file, line),
            _ => SourceLocation::Omit,
        };

        // events raised while this one is dispatched are dropped by tracing,
        // so a failed write has nowhere to be reported
        let _ = self.run.add_log_with(
            severity_for(metadata.level()),
            visitor.into_message(),
            location,
        );
    }
}

fn is_library_target(target: &str) -> bool {
    LIBRARY_TARGETS.iter().any(|prefix| target.starts_with(prefix))
}

/// Collects an event's message followed by its other fields as `key=value`.
#[derive(Debug, Default)]
pub(crate) struct MessageVisitor {
    message: String,
    fields: Vec<String>,
}

impl MessageVisitor {
    pub(crate) fn into_message(self) -> String {
        if self.fields.is_empty() {
            return self.message;
        }
        let fields = self.fields.join(" ");
        if self.message.is_empty() {
            fields
        } else {
            format!("{} {fields}", self.message)
        }
    }
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_owned();
        } else {
            self.fields.push(format!("{}={value}", field.name()));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        } else {
            self.fields.push(format!("{}={value:?}", field.name()));
        }
    }
}

/// Sink handing every output line to `tracing` as one event under
/// [`SINK_TARGET`].
#[derive(Debug, Clone, Copy)]
pub struct TracingWriter {
    level: Level,
}

impl TracingWriter {
    /// Writer emitting `INFO` events.
    pub fn new() -> Self {
        Self { level: Level::INFO }
    }

    pub fn with_level(level: Level) -> Self {
        Self { level }
    }
}

impl Default for TracingWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl Writer for TracingWriter {
    fn write(&self, line: &str) -> io::Result<()> {
        match self.level {
            Level::ERROR => error!(target: SINK_TARGET, "{line}"),
            Level::WARN => warn!(target: SINK_TARGET, "{line}"),
            Level::INFO => info!(target: SINK_TARGET, "{line}"),
            Level::DEBUG => debug!(target: SINK_TARGET, "{line}"),
            _ => trace!(target: SINK_TARGET, "{line}"),
        }
        Ok(())
    }
}
