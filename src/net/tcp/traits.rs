/// Log levels for socket diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// Logger trait for socket diagnostics
///
/// Servers and clients report through the logger held in their configuration,
/// so an application can route diagnostics wherever it wants. The default,
/// [`LogFacade`], forwards to the `log` crate.
pub trait Logger: Send + Sync {
    fn log(&self, level: LogLevel, message: &str);
}

/// Forwards every message to the `log` facade under the `mill_socket` target.
#[derive(Default, Clone)]
pub struct LogFacade;

impl Logger for LogFacade {
    fn log(&self, level: LogLevel, message: &str) {
        let level = match level {
            LogLevel::Debug => log::Level::Debug,
            LogLevel::Info => log::Level::Info,
            LogLevel::Warn => log::Level::Warn,
            LogLevel::Error => log::Level::Error,
        };
        log::log!(target: "mill_socket", level, "{}", message);
    }
}

/// Logger that discards all messages
#[derive(Default, Clone)]
pub struct NoOpLogger;

impl Logger for NoOpLogger {
    fn log(&self, _level: LogLevel, _message: &str) {
        // Do nothing
    }
}
