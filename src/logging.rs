//! Logging infrastructure - structured tracing for binding and native calls
//!
//! The library only emits `tracing` events; it never installs a subscriber on
//! its own. Hosts that want output call [`init`] (environment driven) or
//! [`init_with_config`] once at startup.
//!
//! Event targets:
//! - `cppcall::dispatch` - raw native calls and arity rejections
//! - `cppcall::bind` - vtable resolution and proxy construction
//! - `cppcall::marshal` - argument packing and return unpacking
//! - `cppcall::ffi` - bound callable invocations

use once_cell::sync::OnceCell;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

/// Global logging state
static LOGGER_INITIALIZED: OnceCell<()> = OnceCell::new();

/// Flushes the file writer when dropped; kept for the process lifetime
static FILE_GUARD: Mutex<Option<WorkerGuard>> = Mutex::new(None);

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Default log level
    pub level: Level,
    /// Log file path; console only when unset
    pub log_path: Option<PathBuf>,
    /// Enable JSON format (vs human-readable)
    pub json_format: bool,
    /// Show span events (enter/exit)
    pub show_spans: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            log_path: None,
            json_format: false,
            show_spans: false,
        }
    }
}

impl LogConfig {
    /// Create config from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        // CPPCALL_LOG_LEVEL: trace, debug, info, warn, error
        if let Ok(level_str) = std::env::var("CPPCALL_LOG_LEVEL") {
            config.level = parse_level(&level_str).unwrap_or(Level::INFO);
        }

        if let Ok(path) = std::env::var("CPPCALL_LOG_FILE") {
            config.log_path = Some(PathBuf::from(path));
        }

        config.json_format = std::env::var("CPPCALL_LOG_JSON").is_ok();
        config.show_spans = std::env::var("CPPCALL_LOG_SPANS").is_ok();

        config
    }

    /// Create debug config (verbose logging)
    pub fn debug() -> Self {
        Self {
            level: Level::TRACE,
            log_path: None,
            json_format: false,
            show_spans: true,
        }
    }
}

fn parse_level(s: &str) -> Option<Level> {
    match s.to_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        _ => None,
    }
}

/// Initialize logging with environment configuration
pub fn init() {
    init_with_config(LogConfig::from_env());
}

/// Initialize logging with custom configuration. Later calls are no-ops.
pub fn init_with_config(config: LogConfig) {
    LOGGER_INITIALIZED.get_or_init(|| {
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("cppcall={}", config.level.as_str().to_lowercase())));

        let span_events = if config.show_spans {
            FmtSpan::ENTER | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        };

        let (writer, guard) = match &config.log_path {
            Some(path) => {
                let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
                let file = path.file_name().map(PathBuf::from).unwrap_or_else(|| "cppcall.log".into());
                let appender = tracing_appender::rolling::never(dir.unwrap_or_else(|| Path::new(".")), file);
                let (writer, guard) = tracing_appender::non_blocking(appender);
                (fmt::writer::BoxMakeWriter::new(writer), Some(guard))
            }
            None => (fmt::writer::BoxMakeWriter::new(io::stderr), None),
        };

        let layer = fmt::layer()
            .with_writer(writer)
            .with_span_events(span_events)
            .with_target(true)
            .with_thread_ids(cfg!(debug_assertions));
        let layer = if config.json_format {
            layer.json().boxed()
        } else {
            layer.compact().boxed()
        };

        // Another subscriber may already be installed by the host.
        let _ = tracing_subscriber::registry().with(env_filter).with(layer).try_init();

        if let Some(guard) = guard {
            if let Ok(mut slot) = FILE_GUARD.lock() {
                *slot = Some(guard);
            }
        }
    });
}

/// Check if logging is initialized
pub fn is_initialized() -> bool {
    LOGGER_INITIALIZED.get().is_some()
}

/// Log a proxy bind
pub fn log_bind(base: usize, methods: usize) {
    tracing::debug!(
        target: "cppcall::bind",
        event = "proxy_bound",
        base,
        methods,
        "Proxy bound"
    );
}

/// Log a method resolution
pub fn log_resolution(method: &str, address: usize) {
    tracing::trace!(
        target: "cppcall::bind",
        event = "method_resolved",
        method,
        address,
        "Method resolved"
    );
}

/// Log a bound callable invocation
pub fn log_ffi_call(fn_name: &str, arg_count: usize) {
    tracing::trace!(
        target: "cppcall::ffi",
        event = "ffi_call",
        function = fn_name,
        args = arg_count,
        "FFI function called"
    );
}

/// Log a bound callable return
pub fn log_ffi_return(fn_name: &str) {
    tracing::trace!(
        target: "cppcall::ffi",
        event = "ffi_return",
        function = fn_name,
        "FFI function returned"
    );
}

/// Log a rejected invocation or bind
pub fn log_ffi_error(fn_name: &str, error: &dyn std::error::Error) {
    tracing::debug!(
        target: "cppcall::ffi",
        event = "ffi_error",
        function = fn_name,
        error = %error,
        "FFI function error"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_creation() {
        let config = LogConfig::default();
        assert_eq!(config.level, Level::INFO);
        assert!(config.log_path.is_none());

        let debug_config = LogConfig::debug();
        assert_eq!(debug_config.level, Level::TRACE);
        assert!(debug_config.show_spans);
    }

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("WARN"), Some(Level::WARN));
        assert_eq!(parse_level("verbose"), None);
    }

    #[test]
    fn test_init_idempotent() {
        init_with_config(LogConfig::default());
        init_with_config(LogConfig::debug()); // Should not panic
        assert!(is_initialized());
    }

    #[test]
    fn test_logging_functions() {
        // These should not panic
        log_bind(0x1000, 3);
        log_resolution("add", 0x2000);
        log_ffi_call("add", 2);
        log_ffi_return("add");
        log_ffi_error("add", &crate::errors::CallError::MissingReceiver);
    }
}
