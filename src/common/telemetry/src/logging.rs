// SPDX-License-Identifier: GNU GENERAL PUBLIC LICENSE Version 3
//
// Copyleft (c) 2024 James Wong. This file is part of James Wong.
// is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the
// Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// James Wong is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with James Wong.  If not, see <https://www.gnu.org/licenses/>.
//
// IMPORTANT: Any software that fully or partially contains or uses materials
// covered by this license must also be released under the GNU GPL license.
// This includes modifications and derived works.

use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_log::LogTracer;
use tracing_subscriber::fmt::Layer;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{filter, EnvFilter, Registry};

pub const DEFAULT_LOG_TARGETS: &str = "info";

/// The logging options that used to initialize the logger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct LoggingOptions {
    /// The directory to store log files. If empty, logs are only written to stdout.
    pub dir: String,

    /// The log level that can be one of "trace", "debug", "info", "warn", "error", or
    /// per-target directives such as "info,torwaf_updater=debug". Default is "info".
    pub level: Option<String>,

    /// The log format that can be one of "json" or "text". Default is "text".
    #[serde(alias = "log_format")]
    pub log_format: LogFormat,

    /// The maximum number of rolled log files kept in `dir`.
    #[serde(alias = "max_log_files")]
    pub max_log_files: usize,

    /// Whether to append logs to stdout. Default is true.
    #[serde(alias = "append_stdout")]
    pub append_stdout: bool,
}

#[derive(Clone, Debug, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Json,
    Text,
}

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("error parsing log level string '{level}': {reason}")]
    InvalidLevel { level: String, reason: String },
    #[error("initializing rolling file appender at {dir} failed: {reason}")]
    Appender { dir: String, reason: String },
    #[error("global logger already initialized: {0}")]
    AlreadyInitialized(String),
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self {
            dir: String::new(),
            level: None,
            log_format: LogFormat::Text,
            append_stdout: true,
            // Rotation hourly, 24 files per day, keeps log files of 7 days
            max_log_files: 168,
        }
    }
}

fn rolling_appender(dir: &str, prefix: &str, max_log_files: usize) -> Result<RollingFileAppender, LoggingError> {
    RollingFileAppender::builder()
        .rotation(Rotation::HOURLY)
        .filename_prefix(prefix)
        .max_log_files(max_log_files)
        .build(dir)
        .map_err(|e| LoggingError::Appender {
            dir: dir.to_string(),
            reason: e.to_string(),
        })
}

/// Resolves log level settings from, in order: the options, the `RUST_LOG`
/// environment variable, then [`DEFAULT_LOG_TARGETS`].
pub fn resolve_filter(opts: &LoggingOptions) -> Result<filter::Targets, LoggingError> {
    let level = opts
        .level
        .clone()
        .or_else(|| env::var(EnvFilter::DEFAULT_ENV).ok())
        .unwrap_or_else(|| DEFAULT_LOG_TARGETS.to_string());

    level.parse::<filter::Targets>().map_err(|e| LoggingError::InvalidLevel {
        level: level.clone(),
        reason: e.to_string(),
    })
}

/// Installs the global subscriber. Keep the returned guards alive for the lifetime of
/// the process, dropping them stops the non-blocking writers.
pub fn init_global_logging(app_name: &str, opts: &LoggingOptions) -> Result<Vec<WorkerGuard>, LoggingError> {
    let mut guards = vec![];

    // Configure the stdout logging layer.
    let stdout_logging_layer = if opts.append_stdout {
        let (writer, guard) = tracing_appender::non_blocking(std::io::stdout());
        guards.push(guard);

        if opts.log_format == LogFormat::Json {
            Some(
                Layer::new()
                    .json()
                    .with_writer(writer)
                    .with_ansi(atty::is(atty::Stream::Stdout))
                    .boxed(),
            )
        } else {
            Some(
                Layer::new()
                    .with_writer(writer)
                    .with_ansi(atty::is(atty::Stream::Stdout))
                    .boxed(),
            )
        }
    } else {
        None
    };

    // Configure the file logging layer with rolling policy.
    let file_logging_layer = if !opts.dir.is_empty() {
        let (writer, guard) =
            tracing_appender::non_blocking(rolling_appender(&opts.dir, app_name, opts.max_log_files)?);
        guards.push(guard);

        if opts.log_format == LogFormat::Json {
            Some(Layer::new().json().with_writer(writer).with_ansi(false).boxed())
        } else {
            Some(Layer::new().with_writer(writer).with_ansi(false).boxed())
        }
    } else {
        None
    };

    // Configure the error file logging layer with rolling policy.
    let err_file_logging_layer = if !opts.dir.is_empty() {
        let prefix = format!("{}-err", app_name);
        let (writer, guard) = tracing_appender::non_blocking(rolling_appender(&opts.dir, &prefix, opts.max_log_files)?);
        guards.push(guard);

        if opts.log_format == LogFormat::Json {
            Some(
                Layer::new()
                    .json()
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_filter(filter::LevelFilter::ERROR)
                    .boxed(),
            )
        } else {
            Some(
                Layer::new()
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_filter(filter::LevelFilter::ERROR)
                    .boxed(),
            )
        }
    } else {
        None
    };

    let subscriber = Registry::default()
        .with(resolve_filter(opts)?)
        .with(stdout_logging_layer)
        .with(file_logging_layer)
        .with(err_file_logging_layer);

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))?;

    // Enable log compatible layer to convert log records (reqwest, hyper) to tracing events.
    LogTracer::init().map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))?;

    Ok(guards)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_deserialize_with_defaults() {
        let opts: LoggingOptions = serde_json::from_str(r#"{"level":"debug","log-format":"json"}"#).unwrap();
        assert_eq!(opts.level.as_deref(), Some("debug"));
        assert_eq!(opts.log_format, LogFormat::Json);
        assert!(opts.append_stdout);
        assert!(opts.dir.is_empty());
    }

    #[test]
    fn test_options_accept_snake_case_keys() {
        let opts: LoggingOptions =
            serde_json::from_str(r#"{"log_format":"json","append_stdout":false,"max_log_files":3}"#).unwrap();
        assert_eq!(opts.log_format, LogFormat::Json);
        assert!(!opts.append_stdout);
        assert_eq!(opts.max_log_files, 3);
    }

    #[test]
    fn test_resolve_filter() {
        let opts = LoggingOptions {
            level: Some("warn,torwaf_updater=debug".to_string()),
            ..Default::default()
        };
        assert!(resolve_filter(&opts).is_ok());

        let opts = LoggingOptions {
            level: Some("=[".to_string()),
            ..Default::default()
        };
        assert!(matches!(resolve_filter(&opts), Err(LoggingError::InvalidLevel { .. })));
    }
}
