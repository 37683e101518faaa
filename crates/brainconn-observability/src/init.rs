// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Unified logging initialization for brainconn
//!
//! Console output always goes to stderr so command output on stdout stays
//! machine-readable. With a log directory, each run also gets per-crate JSON
//! log files and configurable retention.

use anyhow::{Context, Result};
use chrono::{NaiveDateTime, Utc};
use std::path::{Path, PathBuf};
use tracing_appender::rolling;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::cli::CrateDebugFlags;
use crate::config::{LogFormat, LoggingOptions};

const RUN_PREFIX: &str = "run_";
const RUN_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Logging initialization result
///
/// Holds the non-blocking writer guards; dropping it flushes file logs.
pub struct LoggingGuard {
    _file_guards: Vec<tracing_appender::non_blocking::WorkerGuard>,
    log_dir: Option<PathBuf>,
}

impl LoggingGuard {
    /// Run folder for this process, if file logging is enabled
    pub fn log_dir(&self) -> Option<&Path> {
        self.log_dir.as_deref()
    }
}

/// Initialize logging with console output and optional file output
///
/// With `options.log_dir` set, creates a timestamped folder structure:
/// ```text
/// ./logs/
///   └── run_20250101_120000/
///       ├── brainconn-io.log
///       ├── brainconn-connectivity.log
///       ├── brainconn-artifacts.log
///       └── brainconn.log (combined)
/// ```
///
/// # Errors
///
/// Fails if the run folder cannot be created or a global subscriber is
/// already installed.
pub fn init_logging(debug_flags: &CrateDebugFlags, options: &LoggingOptions) -> Result<LoggingGuard> {
    let filter = debug_flags.to_filter_string_with_base(&options.level);
    let env_filter = EnvFilter::try_new(&filter)
        .with_context(|| format!("Invalid log filter: {}", filter))?;

    let mut layers: Vec<BoxedLayer> = Vec::new();
    let mut file_guards = Vec::new();

    let console_layer = match options.format {
        LogFormat::Text => tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_file(false)
            .with_line_number(false)
            .with_filter(env_filter.clone())
            .boxed(),
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .json()
            .with_filter(env_filter.clone())
            .boxed(),
    };
    layers.push(console_layer);

    let mut run_folder = None;
    if let Some(base_log_dir) = &options.log_dir {
        let folder = create_run_folder(base_log_dir)?;
        cleanup_old_logs(base_log_dir, options.retention_days, options.retention_runs)?;

        // One file per crate, debug level regardless of console filter
        for crate_name in crate::KNOWN_CRATES {
            let file_appender = rolling::never(&folder, format!("{}.log", crate_name));
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            file_guards.push(guard);

            let file_layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .json()
                .with_filter(EnvFilter::new(format!("{}=debug", crate_name)))
                .boxed();
            layers.push(file_layer);
        }

        let combined_appender = rolling::never(&folder, "brainconn.log");
        let (combined_non_blocking, combined_guard) =
            tracing_appender::non_blocking(combined_appender);
        file_guards.push(combined_guard);

        let combined_layer = tracing_subscriber::fmt::layer()
            .with_writer(combined_non_blocking)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .json()
            .with_filter(env_filter)
            .boxed();
        layers.push(combined_layer);

        run_folder = Some(folder);
    }

    Registry::default()
        .with(layers)
        .try_init()
        .context("A global tracing subscriber is already installed")?;

    Ok(LoggingGuard {
        _file_guards: file_guards,
        log_dir: run_folder,
    })
}

/// Initialize console-only logging at `info`
pub fn init_logging_default(debug_flags: &CrateDebugFlags) -> Result<LoggingGuard> {
    init_logging(debug_flags, &LoggingOptions::default())
}

fn create_run_folder(base_log_dir: &Path) -> Result<PathBuf> {
    let timestamp = Utc::now().format(RUN_TIMESTAMP_FORMAT);
    let run_folder = base_log_dir.join(format!("{}{}", RUN_PREFIX, timestamp));
    std::fs::create_dir_all(&run_folder)
        .with_context(|| format!("Failed to create log directory: {}", run_folder.display()))?;
    Ok(run_folder)
}

/// Clean up old run folders based on retention policy
///
/// Removes runs older than `retention_days`, then the oldest runs beyond
/// `retention_runs`. Folders that do not match `run_YYYYMMDD_HHMMSS` are
/// left alone.
pub fn cleanup_old_logs(
    base_log_dir: &Path,
    retention_days: u64,
    retention_runs: usize,
) -> Result<()> {
    if !base_log_dir.exists() {
        return Ok(());
    }

    let cutoff = Utc::now().naive_utc() - chrono::Duration::days(retention_days as i64);

    let mut runs: Vec<(PathBuf, NaiveDateTime)> = Vec::new();
    for entry in std::fs::read_dir(base_log_dir)? {
        let path = entry?.path();
        if !path.is_dir() {
            continue;
        }
        let Some(timestamp_str) = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| n.strip_prefix(RUN_PREFIX))
        else {
            continue;
        };
        if let Ok(dt) = NaiveDateTime::parse_from_str(timestamp_str, RUN_TIMESTAMP_FORMAT) {
            runs.push((path, dt));
        }
    }

    // Oldest first
    runs.sort_by_key(|(_, dt)| *dt);

    let (expired, kept): (Vec<_>, Vec<_>) = runs.into_iter().partition(|(_, dt)| *dt < cutoff);
    let surplus = kept.len().saturating_sub(retention_runs);

    for (path, _) in expired.iter().chain(kept.iter().take(surplus)) {
        if let Err(e) = std::fs::remove_dir_all(path) {
            eprintln!(
                "Warning: Failed to remove old log directory {}: {}",
                path.display(),
                e
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn make_run(base: &Path, timestamp: &str) -> PathBuf {
        let path = base.join(format!("run_{}", timestamp));
        std::fs::create_dir_all(&path).unwrap();
        path
    }

    #[test]
    fn test_cleanup_keeps_most_recent_runs() {
        let dir = tempdir().unwrap();
        let now = Utc::now().naive_utc();
        let stamps: Vec<String> = (0..5)
            .map(|i| {
                (now - chrono::Duration::minutes(i))
                    .format(RUN_TIMESTAMP_FORMAT)
                    .to_string()
            })
            .collect();
        let paths: Vec<PathBuf> = stamps.iter().map(|s| make_run(dir.path(), s)).collect();

        cleanup_old_logs(dir.path(), 30, 2).unwrap();

        assert!(paths[0].exists());
        assert!(paths[1].exists());
        for path in &paths[2..] {
            assert!(!path.exists(), "{} should be pruned", path.display());
        }
    }

    #[test]
    fn test_cleanup_removes_expired_runs() {
        let dir = tempdir().unwrap();
        let old = make_run(dir.path(), "20000101_000000");
        let fresh = make_run(
            dir.path(),
            &Utc::now().format(RUN_TIMESTAMP_FORMAT).to_string(),
        );
        let unrelated = dir.path().join("keep-me");
        std::fs::create_dir_all(&unrelated).unwrap();

        cleanup_old_logs(dir.path(), 30, 10).unwrap();

        assert!(!old.exists());
        assert!(fresh.exists());
        assert!(unrelated.exists());
    }

    #[test]
    fn test_cleanup_missing_dir_is_ok() {
        let dir = tempdir().unwrap();
        assert!(cleanup_old_logs(&dir.path().join("absent"), 30, 10).is_ok());
    }
}
