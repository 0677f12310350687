use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use std::fs;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Where and how verbosely to log.
#[derive(Debug, Clone)]
pub struct LogOptions {
    /// Directory for log files (e.g., "logs")
    pub dir: Utf8PathBuf,
    /// Prefix for the daily log files (e.g., "tryon")
    pub prefix: String,
    /// Use the debug level instead of info
    pub debug: bool,
    /// Also log to the console with ANSI colors
    pub console: bool,
}

impl LogOptions {
    pub fn new(dir: impl Into<Utf8PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
            debug: false,
            console: false,
        }
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn console(mut self, console: bool) -> Self {
        self.console = console;
        self
    }
}

/// Level filter: `RUST_LOG` when set, otherwise debug or info.
pub fn build_filter(debug: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if debug {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    })
}

/// Install the global subscriber: a daily rotating file plus optional console.
///
/// # Returns
/// A guard that must be held for the duration of the program to keep logging active
///
/// # Errors
/// Fails if the log directory can't be created or a global subscriber is
/// already installed.
pub fn setup_logging(options: &LogOptions) -> Result<WorkerGuard> {
    if !options.dir.exists() {
        fs::create_dir_all(&options.dir)
            .with_context(|| format!("Failed to create log directory: {}", options.dir))?;
    }

    let file_appender = rolling::daily(&options.dir, &options.prefix);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false) // No ANSI codes in log files
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    let console_layer = options.console.then(|| {
        tracing_subscriber::fmt::layer()
            .with_ansi(true)
            .with_target(false)
    });

    tracing_subscriber::registry()
        .with(build_filter(options.debug))
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    tracing::info!(
        "Logging initialized: dir={}, prefix={}, debug={}, console={}",
        options.dir,
        options.prefix,
        options.debug,
        options.console
    );

    Ok(guard)
}
