// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! CLI argument parsing for per-crate debug flags
//!
//! Supports flags like `--debug-brainconn-io`, `--debug-brainconn-connectivity`, etc.
//! to enable debug logging per crate.

use std::collections::HashMap;
use std::env;

use crate::KNOWN_CRATES;

/// Environment variable listing crates to debug (comma-separated, or `all`)
pub const DEBUG_ENV_VAR: &str = "BRAINCONN_DEBUG";

/// Parse debug flags from command-line arguments
///
/// # Example
/// ```rust
/// use brainconn_observability::CrateDebugFlags;
///
/// let flags = CrateDebugFlags::from_args(std::env::args());
/// if flags.is_enabled("brainconn-io") {
///     // Enable debug logging for brainconn-io crate
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct CrateDebugFlags {
    pub enabled_crates: HashMap<String, bool>,
}

impl CrateDebugFlags {
    /// Parse debug flags from command-line arguments
    ///
    /// Looks for arguments matching `--debug-{crate-name}` pattern.
    /// Also supports `--debug-all` to enable all crates.
    pub fn from_args<I>(args: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut flags = CrateDebugFlags::default();

        for arg in args {
            if arg == "--debug-all" {
                flags.enable_all();
                continue;
            }

            if let Some(crate_name) = arg.strip_prefix("--debug-") {
                flags.enable(crate_name);
            }
        }

        flags
    }

    /// Enable debug logging for one crate
    pub fn enable(&mut self, crate_name: &str) {
        self.enabled_crates.insert(crate_name.to_string(), true);
    }

    /// Enable debug logging for every known crate
    pub fn enable_all(&mut self) {
        for crate_name in KNOWN_CRATES {
            self.enable(crate_name);
        }
    }

    /// Merge a `BRAINCONN_DEBUG`-style value: `all` or comma-separated crate names
    pub fn merge_env_value(&mut self, value: &str) {
        if value.trim() == "all" {
            self.enable_all();
            return;
        }
        for crate_name in value.split(',') {
            let crate_name = crate_name.trim();
            if !crate_name.is_empty() {
                self.enable(crate_name);
            }
        }
    }

    /// Check if debug is enabled for a specific crate
    pub fn is_enabled(&self, crate_name: &str) -> bool {
        self.enabled_crates.contains_key(crate_name)
    }

    /// Get all enabled crates
    pub fn enabled_crates(&self) -> Vec<&String> {
        self.enabled_crates.keys().collect()
    }

    /// Check if debug is enabled for any crate
    pub fn any_enabled(&self) -> bool {
        !self.enabled_crates.is_empty()
    }

    /// Get log level filter for a crate
    ///
    /// Returns `tracing::Level::DEBUG` if enabled, `tracing::Level::INFO` otherwise.
    pub fn log_level(&self, crate_name: &str) -> tracing::Level {
        if self.is_enabled(crate_name) {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }

    /// Create a tracing filter from debug flags
    ///
    /// Format: "brainconn-io=debug,brainconn-connectivity=debug,info" or "info" if none enabled.
    pub fn to_filter_string(&self) -> String {
        self.to_filter_string_with_base("info")
    }

    /// Like [`Self::to_filter_string`], with a custom level for everything not flagged
    pub fn to_filter_string_with_base(&self, base_level: &str) -> String {
        let mut crates: Vec<&String> = self.enabled_crates.keys().collect();
        crates.sort();

        let mut filters: Vec<String> = crates
            .into_iter()
            .map(|crate_name| format!("{}=debug", crate_name))
            .collect();
        filters.push(base_level.to_lowercase());
        filters.join(",")
    }
}

/// Helper function to parse debug flags from the process
///
/// Checks both command-line arguments and the `BRAINCONN_DEBUG` environment variable.
pub fn parse_debug_flags() -> CrateDebugFlags {
    let mut flags = CrateDebugFlags::from_args(env::args());

    if let Ok(env_var) = env::var(DEBUG_ENV_VAR) {
        flags.merge_env_value(&env_var);
    }

    flags
}

/// Generate help text for debug flags
pub fn debug_flags_help() -> String {
    format!(
        r#"Debug Flags:
  --debug-all                    Enable debug logging for all crates
  --debug-{{crate-name}}          Enable debug logging for specific crate

Available crates:
  {}

Environment Variable:
  BRAINCONN_DEBUG={{crate-name}}[,{{crate-name}}]  Enable debug for crates (comma-separated)
  BRAINCONN_DEBUG=all                               Enable debug for all crates

Examples:
  --debug-brainconn-connectivity
  --debug-brainconn-io --debug-brainconn-artifacts
  BRAINCONN_DEBUG=brainconn-io,brainconn-connectivity
"#,
        KNOWN_CRATES.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_crate_flag() {
        let flags = CrateDebugFlags::from_args(vec!["--debug-brainconn-io".to_string()]);
        assert!(flags.is_enabled("brainconn-io"));
        assert!(!flags.is_enabled("brainconn-connectivity"));
    }

    #[test]
    fn test_unrelated_args_ignored() {
        let flags = CrateDebugFlags::from_args(vec![
            "brainconn".to_string(),
            "process".to_string(),
            "scan.nii.gz".to_string(),
        ]);
        assert!(!flags.any_enabled());
        assert_eq!(flags.to_filter_string(), "info");
    }

    #[test]
    fn test_debug_all() {
        let flags = CrateDebugFlags::from_args(vec!["--debug-all".to_string()]);
        for crate_name in KNOWN_CRATES {
            assert!(flags.is_enabled(crate_name), "{} should be enabled", crate_name);
        }
    }

    #[test]
    fn test_env_value_merge() {
        let mut flags = CrateDebugFlags::default();
        flags.merge_env_value(" brainconn-io , ,brainconn-artifacts");
        assert!(flags.is_enabled("brainconn-io"));
        assert!(flags.is_enabled("brainconn-artifacts"));
        assert_eq!(flags.enabled_crates().len(), 2);

        flags.merge_env_value("all");
        assert_eq!(flags.enabled_crates().len(), KNOWN_CRATES.len());
    }

    #[test]
    fn test_filter_string() {
        let flags = CrateDebugFlags::from_args(vec![
            "--debug-brainconn-io".to_string(),
            "--debug-brainconn-connectivity".to_string(),
        ]);
        assert_eq!(
            flags.to_filter_string_with_base("WARN"),
            "brainconn-connectivity=debug,brainconn-io=debug,warn"
        );
    }

    #[test]
    fn test_log_level() {
        let flags = CrateDebugFlags::from_args(vec!["--debug-brainconn-io".to_string()]);
        assert_eq!(flags.log_level("brainconn-io"), tracing::Level::DEBUG);
        assert_eq!(flags.log_level("brainconn-artifacts"), tracing::Level::INFO);
    }
}
