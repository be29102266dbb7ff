//! Kernel logging facility
//!
//! Provides thread-safe logging functionality for the kernel using the `log` crate.
//! Records are formatted as `[LEVEL] message` and handed to whatever [`LogSink`]
//! the host installed (a terminal, a capture buffer in tests, ...).

use core::fmt;
use log::{Level, LevelFilter, Log, Metadata, Record};
use spin::Mutex;

/// Destination for formatted log lines.
pub trait LogSink: Sync {
    fn write_line(&self, level: Level, line: fmt::Arguments<'_>);
}

/// Global logger instance available throughout the kernel
pub static LOGGER: Logger = Logger::new();

/// Thread-safe logger implementation
pub struct Logger {
    inner: Mutex<Option<&'static dyn LogSink>>,
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

impl Logger {
    /// Creates a new logger instance with no sink; records are dropped until
    /// one is installed.
    pub const fn new() -> Logger {
        Logger {
            inner: Mutex::new(None),
        }
    }

    pub fn set_sink(&self, sink: &'static dyn LogSink) {
        *self.inner.lock() = Some(sink);
    }
}

impl Log for Logger {
    /// Determines if a log message should be processed based on its level
    ///
    /// Returns true if the message level is less than or equal to the maximum configured level
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    /// Processes and outputs a log record
    ///
    /// Formats messages as "[LEVEL] message"
    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let guard = self.inner.lock();
            if let Some(sink) = *guard {
                sink.write_line(
                    record.level(),
                    format_args!("[{}] {}", record.level(), record.args()),
                );
            }
        }
    }

    /// Flush buffered logs (no-op in this implementation)
    fn flush(&self) {}
}

/// Default level: `Debug` in debug builds, `Info` in release builds.
pub const fn default_level() -> LevelFilter {
    #[cfg(debug_assertions)]
    {
        LevelFilter::Debug
    }
    #[cfg(not(debug_assertions))]
    {
        LevelFilter::Info
    }
}

/// Initializes the logging system
///
/// Installs `sink` and registers [`LOGGER`] with the `log` facade. Fails if
/// another logger was registered first.
pub fn init(sink: &'static dyn LogSink, level: LevelFilter) -> Result<(), log::SetLoggerError> {
    LOGGER.set_sink(sink);
    log::set_logger(&LOGGER).map(|()| log::set_max_level(level))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::{format, string::String, vec::Vec};

    struct Capture(Mutex<Vec<String>>);

    impl LogSink for Capture {
        fn write_line(&self, _level: Level, line: fmt::Arguments<'_>) {
            self.0.lock().push(format!("{}", line));
        }
    }

    #[test]
    fn test_records_are_prefixed_with_level() {
        static CAPTURE: Capture = Capture(Mutex::new(Vec::new()));
        let logger = Logger::new();
        logger.set_sink(&CAPTURE);

        log::set_max_level(LevelFilter::Trace);
        logger.log(
            &Record::builder()
                .level(Level::Warn)
                .args(format_args!("frame {} busy", 3))
                .build(),
        );

        assert_eq!(CAPTURE.0.lock().as_slice(), ["[WARN] frame 3 busy"]);
    }

    #[test]
    fn test_default_level_follows_build_profile() {
        let expected = if cfg!(debug_assertions) {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        };
        assert_eq!(default_level(), expected);
    }

    #[test]
    fn test_no_sink_drops_records() {
        let logger = Logger::new();
        logger.log(&Record::builder().args(format_args!("dropped")).build());
    }
}
