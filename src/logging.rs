//! Tracing subscriber setup.
//!
//! Output is pretty-printed for local runs and JSON in production, written to
//! stdout, stderr or a (daily rotated) file under `LOG_DIR`. `RUST_LOG`
//! replaces the default filter entirely.

use anyhow::{Context, Result};
use std::env;
use std::io;
use std::path::PathBuf;
use std::str::FromStr;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::sync::SyncPass;

const SERVICE_NAME: &str = "vocab-sync";

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub format: LogFormat,
    pub output: LogOutput,
    /// Only used with [`LogOutput::File`].
    pub log_dir: PathBuf,
    pub log_file_prefix: String,
    /// `ENVIRONMENT` (or `ENV`); `production`/`prod` switch the defaults.
    pub environment: String,
    pub enable_rotation: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" | "text" => Ok(LogFormat::Pretty),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutput {
    Stdout,
    Stderr,
    File,
}

impl FromStr for LogOutput {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "stdout" => Ok(LogOutput::Stdout),
            "stderr" => Ok(LogOutput::Stderr),
            "file" => Ok(LogOutput::File),
            other => Err(format!("unknown log output '{other}'")),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self::for_environment(
            env::var("ENVIRONMENT")
                .or_else(|_| env::var("ENV"))
                .unwrap_or_else(|_| "development".to_string()),
        )
    }
}

impl LoggingConfig {
    /// Defaults for `environment` before any `LOG_*` override.
    pub fn for_environment(environment: impl Into<String>) -> Self {
        let environment = environment.into();
        let format = if is_production(&environment) {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        };
        Self {
            format,
            // stdout carries command output (IDs, the JSON report)
            output: LogOutput::Stderr,
            log_dir: PathBuf::from("logs"),
            log_file_prefix: SERVICE_NAME.to_string(),
            environment,
            enable_rotation: true,
        }
    }

    /// Applies `LOG_FORMAT`, `LOG_OUTPUT` and `LOG_DIR` on top of the
    /// environment defaults. Unparseable values are ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_overrides(
            env::var("LOG_FORMAT").ok().as_deref(),
            env::var("LOG_OUTPUT").ok().as_deref(),
            env::var("LOG_DIR").ok(),
        );
        config
    }

    fn apply_overrides(&mut self, format: Option<&str>, output: Option<&str>, log_dir: Option<String>) {
        if let Some(format) = format.and_then(|f| f.parse().ok()) {
            self.format = format;
        }
        if let Some(output) = output.and_then(|o| o.parse().ok()) {
            self.output = output;
        }
        if let Some(dir) = log_dir.filter(|d| !d.trim().is_empty()) {
            self.log_dir = PathBuf::from(dir);
        }
    }

    /// Filter used when `RUST_LOG` is unset.
    pub fn default_directive(&self) -> String {
        let level = if is_production(&self.environment) {
            "info"
        } else {
            "debug"
        };
        format!("{level},hyper=info,hyper_util=info,reqwest=info")
    }

    fn writer(&self) -> Result<(NonBlocking, WorkerGuard)> {
        Ok(match self.output {
            LogOutput::Stdout => tracing_appender::non_blocking(io::stdout()),
            LogOutput::Stderr => tracing_appender::non_blocking(io::stderr()),
            LogOutput::File => {
                std::fs::create_dir_all(&self.log_dir).with_context(|| {
                    format!("failed to create log directory {:?}", self.log_dir)
                })?;
                let appender = if self.enable_rotation {
                    tracing_appender::rolling::daily(&self.log_dir, &self.log_file_prefix)
                } else {
                    tracing_appender::rolling::never(&self.log_dir, &self.log_file_prefix)
                };
                tracing_appender::non_blocking(appender)
            }
        })
    }
}

fn is_production(environment: &str) -> bool {
    matches!(environment, "production" | "prod")
}

/// Installs the global subscriber. Keep the returned guard alive until exit
/// or buffered lines are lost.
pub fn init_logging(config: LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.default_directive()));
    let (writer, guard) = config.writer()?;

    let layer = match config.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(writer)
            .with_current_span(true)
            .with_span_list(false)
            .with_span_events(FmtSpan::CLOSE)
            .with_file(true)
            .with_line_number(true)
            .with_filter(filter)
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .pretty()
            .with_writer(writer)
            .with_ansi(config.output != LogOutput::File)
            .with_file(false)
            .with_line_number(false)
            .with_filter(filter)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(layer)
        .try_init()
        .context("failed to install tracing subscriber")?;

    tracing::info!(
        service = SERVICE_NAME,
        version = env!("CARGO_PKG_VERSION"),
        environment = %config.environment,
        format = ?config.format,
        output = ?config.output,
        "logging initialized"
    );

    Ok(Some(guard))
}

/// Span wrapping one synchronization pass.
pub fn pass_span(pass: SyncPass) -> tracing::Span {
    tracing::info_span!("sync_pass", pass = %pass)
}
