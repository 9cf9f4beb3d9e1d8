use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use parking_lot::Mutex;
use std::path::Path;
use crate::error::{Result, HubError};
use tracing::{info, warn, error};

/// Initializes the logging system (both console and file).
/// Returns a guard that must be kept alive for file logging to work.
pub fn init_logging(log_dir: &str, file_level: &str, console_level: &str) -> Result<WorkerGuard> {
    // Ensure log directory exists
    let log_path = Path::new(log_dir);
    if !log_path.exists() {
        std::fs::create_dir_all(log_path)
            .map_err(HubError::Io)?;
    }

    // --- File Logger ---
    let file_appender = rolling::daily(log_dir, "wallet-health.log");
    let (non_blocking_appender, guard) = tracing_appender::non_blocking(file_appender);

    let file_filter = EnvFilter::try_new(file_level)
        .map_err(|e| HubError::ConfigError(format!("Invalid file log level filter '{}': {}", file_level, e)))?;
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_appender)
        .with_ansi(false) // No ANSI colors in files
        .with_span_events(FmtSpan::CLOSE)
        .json()
        .with_filter(file_filter);

    // --- Console Logger ---
    let console_filter = EnvFilter::try_new(console_level)
        .map_err(|e| HubError::ConfigError(format!("Invalid console log level filter '{}': {}", console_level, e)))?;
    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(console_filter);

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| HubError::InternalError(format!("Failed to initialize tracing subscriber: {}", e)))?;

    Ok(guard)
}

// --- Notifications ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Info,
    Success,
    Error,
}

/// A user-facing notification. The dashboard rendered these as toasts; here
/// they go to whatever `Notifier` the hub was built with.
#[derive(Debug, Clone, PartialEq)]
pub struct Toast {
    pub title: String,
    pub description: String,
    pub level: ToastLevel,
    /// Explorer link for the last successful transaction, if any.
    pub link: Option<String>,
}

impl Toast {
    pub fn info(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            level: ToastLevel::Info,
            link: None,
        }
    }

    pub fn success(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            level: ToastLevel::Success,
            ..Self::info(title, description)
        }
    }

    pub fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            level: ToastLevel::Error,
            ..Self::info(title, description)
        }
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, toast: Toast);
}

/// Sends notifications to the log under the `notification` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, toast: Toast) {
        let link = toast.link.as_deref().unwrap_or("");
        match toast.level {
            ToastLevel::Error => {
                error!(target: "notification", title = %toast.title, link, "{}", toast.description);
            }
            ToastLevel::Success => {
                info!(target: "notification", title = %toast.title, link, "{}", toast.description);
            }
            ToastLevel::Info => {
                info!(target: "notification", title = %toast.title, "{}", toast.description);
            }
        }
    }
}

/// Buffers notifications so a presentation layer can drain and render them.
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    toasts: Mutex<Vec<Toast>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drain(&self) -> Vec<Toast> {
        std::mem::take(&mut *self.toasts.lock())
    }

    pub fn snapshot(&self) -> Vec<Toast> {
        self.toasts.lock().clone()
    }

    pub fn last(&self) -> Option<Toast> {
        self.toasts.lock().last().cloned()
    }
}

impl Notifier for MemoryNotifier {
    fn notify(&self, toast: Toast) {
        if toast.level == ToastLevel::Error {
            warn!(target: "notification", title = %toast.title, "{}", toast.description);
        }
        self.toasts.lock().push(toast);
    }
}
