// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # brainconn-observability
//!
//! Unified logging infrastructure for brainconn.
//!
//! Provides consistent logging patterns across all brainconn crates with
//! per-crate debug flag support. Every crate logs through `tracing` with its
//! crate name as the target, so filters and per-crate log files line up with
//! [`KNOWN_CRATES`].

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cli;
pub mod config;
pub mod init;

pub use cli::*;
pub use config::*;
pub use init::*;

/// Known brainconn crate names (tracing targets) for debug flags
pub const KNOWN_CRATES: &[&str] = &[
    "brainconn-io",
    "brainconn-serialization",
    "brainconn-config",
    "brainconn-connectivity",
    "brainconn-artifacts",
    "brainconn-cli",
];
