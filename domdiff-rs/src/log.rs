//! Injected diagnostics sink.
//!
//! The classification engine reports progress and invariant violations
//! through a [`Logger`] handed to it by the caller rather than through a
//! process-wide logger. [`TracingLogger`] forwards to `tracing`, so callers
//! that install a subscriber get structured events with no extra wiring.

use tracing::Level;

/// Capability for receiving diagnostic messages.
pub trait Logger {
    /// Records one message at the given level.
    fn log(&self, level: Level, message: &str);

    /// Returns false when messages at `level` would be discarded.
    ///
    /// Used to skip formatting expensive messages.
    fn enabled(&self, _level: Level) -> bool {
        true
    }
}

/// Logger that forwards to the `tracing` macros.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log(&self, level: Level, message: &str) {
        match level {
            Level::TRACE => tracing::trace!(target: "xml_domdiff", "{}", message),
            Level::DEBUG => tracing::debug!(target: "xml_domdiff", "{}", message),
            Level::INFO => tracing::info!(target: "xml_domdiff", "{}", message),
            Level::WARN => tracing::warn!(target: "xml_domdiff", "{}", message),
            Level::ERROR => tracing::error!(target: "xml_domdiff", "{}", message),
        }
    }

    fn enabled(&self, level: Level) -> bool {
        match level {
            Level::TRACE => tracing::enabled!(target: "xml_domdiff", Level::TRACE),
            Level::DEBUG => tracing::enabled!(target: "xml_domdiff", Level::DEBUG),
            Level::INFO => tracing::enabled!(target: "xml_domdiff", Level::INFO),
            Level::WARN => tracing::enabled!(target: "xml_domdiff", Level::WARN),
            Level::ERROR => tracing::enabled!(target: "xml_domdiff", Level::ERROR),
        }
    }
}

/// Logger that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullLogger;

impl Logger for NullLogger {
    fn log(&self, _level: Level, _message: &str) {}

    fn enabled(&self, _level: Level) -> bool {
        false
    }
}

impl<L: Logger + ?Sized> Logger for &L {
    fn log(&self, level: Level, message: &str) {
        (**self).log(level, message)
    }

    fn enabled(&self, level: Level) -> bool {
        (**self).enabled(level)
    }
}
