//! Output configuration.
//!
//! A [`Config`] is a cloneable handle over one mutex-guarded [`Settings`]
//! value. Readers take a snapshot per access; no lock is held while
//! records are serialized or written.
//!
//! | Setting | Default | Read |
//! |---------|---------|------|
//! | writer | [`StdoutWriter`] | once, when a `TestRun` is created |
//! | runtime checks | enabled | per emitted record |
//! | timezone | UTC (`None` = local offset) | per emitted record |

use std::fmt::{self, Debug, Formatter};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use ocptv_core::FormatContext;
use time::UtcOffset;

use crate::writer::{StdoutWriter, Writer};

/// Snapshot of the output configuration.
#[derive(Clone)]
pub struct Settings {
    pub writer: Arc<dyn Writer>,
    pub runtime_checks: bool,
    pub timezone: Option<UtcOffset>,
}

impl Settings {
    /// Timestamp formatting context for these settings.
    pub fn format_context(&self) -> FormatContext {
        FormatContext::new(self.timezone)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            writer: Arc::new(StdoutWriter::new()),
            runtime_checks: true,
            timezone: Some(UtcOffset::UTC),
        }
    }
}

impl Debug for Settings {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("runtime_checks", &self.runtime_checks)
            .field("timezone", &self.timezone)
            .finish_non_exhaustive()
    }
}

/// Shared, mutable output configuration.
#[derive(Debug, Clone, Default)]
pub struct Config {
    inner: Arc<Mutex<Settings>>,
}

static GLOBAL: OnceLock<Config> = OnceLock::new();

impl Config {
    /// Configuration with default settings: stdout, runtime checks on, UTC.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration writing to the given sink, other settings at defaults.
    pub fn with_writer(writer: Arc<dyn Writer>) -> Self {
        let config = Self::new();
        config.set_writer(writer);
        config
    }

    /// Process-wide configuration used when a run is not given one.
    pub fn global() -> &'static Config {
        GLOBAL.get_or_init(Config::new)
    }

    /// Copy of the current settings.
    pub fn snapshot(&self) -> Settings {
        self.lock().clone()
    }

    /// Sink lines are written to.
    pub fn writer(&self) -> Arc<dyn Writer> {
        Arc::clone(&self.lock().writer)
    }

    /// Replace the sink. Runs built afterwards write to it.
    pub fn set_writer(&self, writer: Arc<dyn Writer>) {
        self.lock().writer = writer;
    }

    /// Whether records are type-checked before serialization.
    pub fn runtime_checks(&self) -> bool {
        self.lock().runtime_checks
    }

    /// Turn the runtime type check on or off.
    pub fn enable_runtime_checks(&self, enabled: bool) {
        self.lock().runtime_checks = enabled;
    }

    /// Display timezone; `None` is the local system offset.
    pub fn timezone(&self) -> Option<UtcOffset> {
        self.lock().timezone
    }

    /// `None` renders timestamps in the local system offset.
    pub fn set_timezone(&self, timezone: Option<UtcOffset>) {
        self.lock().timezone = timezone;
    }

    /// Restore every setting to its default.
    pub fn reset(&self) {
        *self.lock() = Settings::default();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Settings> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::BufferWriter;

    #[test]
    fn defaults_are_checked_utc_stdout() {
        let config = Config::new();
        assert!(config.runtime_checks());
        assert_eq!(config.timezone(), Some(UtcOffset::UTC));
        assert_eq!(config.snapshot().format_context(), FormatContext::default());
    }

    #[test]
    fn clones_share_settings() {
        let config = Config::new();
        let clone = config.clone();
        clone.enable_runtime_checks(false);
        clone.set_timezone(None);
        assert!(!config.runtime_checks());
        assert_eq!(config.timezone(), None);

        config.reset();
        assert!(clone.runtime_checks());
    }

    #[test]
    fn writer_can_be_swapped() {
        let buffer = Arc::new(BufferWriter::new());
        let config = Config::with_writer(buffer.clone());
        config.writer().write("line").expect("write");
        assert_eq!(buffer.lines(), ["line"]);
    }
}
