//! Logging and tracing setup.
//!
//! Structured logging through the tracing crate. The binding layer logs at
//! `debug`/`trace` on its entry points and at `warn` when a setter loses bits.

use std::sync::Once;
#[allow(unused_imports)]
use tracing::{debug, error, info, trace, warn};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

static INIT: Once = Once::new();

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initialize the global tracing subscriber.
///
/// Subsequent calls are ignored, as is the case where another subscriber
/// was already installed by the host.
pub fn init_tracing() {
    INIT.call_once(|| {
        let fmt_layer = fmt::layer()
            .with_span_events(FmtSpan::CLOSE)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true);

        if tracing_subscriber::registry()
            .with(env_filter())
            .with(fmt_layer)
            .try_init()
            .is_ok()
        {
            info!("nalt-bind tracing initialized");
        }
    });
}

/// Initialize tracing with JSON output for structured logging.
pub fn init_tracing_json() {
    INIT.call_once(|| {
        let fmt_layer = fmt::layer()
            .json()
            .with_span_events(FmtSpan::CLOSE)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_current_span(true);

        if tracing_subscriber::registry()
            .with(env_filter())
            .with(fmt_layer)
            .try_init()
            .is_ok()
        {
            info!("nalt-bind tracing initialized (JSON mode)");
        }
    });
}

/// Log levels for Python integration
#[cfg(feature = "python-ext")]
#[pyo3::prelude::pyclass(eq, eq_int)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

#[cfg(feature = "python-ext")]
#[pyo3::prelude::pymethods]
impl LogLevel {
    fn __str__(&self) -> String {
        match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
        .to_string()
    }
}

/// Initialize logging from Python
#[cfg(feature = "python-ext")]
#[pyo3::prelude::pyfunction]
#[pyo3(signature = (json=false))]
pub fn init_logging(json: bool) -> pyo3::PyResult<()> {
    if json {
        init_tracing_json();
    } else {
        init_tracing();
    }
    Ok(())
}

/// Log a message from Python
#[cfg(feature = "python-ext")]
#[pyo3::prelude::pyfunction]
pub fn log_message(level: LogLevel, message: &str) -> pyo3::PyResult<()> {
    match level {
        LogLevel::Trace => trace!("{}", message),
        LogLevel::Debug => debug!("{}", message),
        LogLevel::Info => info!("{}", message),
        LogLevel::Warn => warn!("{}", message),
        LogLevel::Error => error!("{}", message),
    }
    Ok(())
}
