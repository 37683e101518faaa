// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

/// Result type for pipeline operations
pub type ConnectivityResult<T> = Result<T, ConnectivityError>;

/// Error surfaced by any stage of the connectivity pipeline.
///
/// Every variant carries a human-readable message. None of them are retried:
/// a scan that fails once fails identically until its data changes.
///
/// # Examples
/// ```
/// use brainconn_structures::{ConnectivityError, ErrorKind};
///
/// let err = ConnectivityError::Input("scan has 1 timepoint, need at least 2".into());
/// assert_eq!(err.kind(), ErrorKind::Input);
/// assert!(err.to_string().contains("timepoint"));
/// ```
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConnectivityError {
    /// Unreadable or malformed scan, wrong dimensionality, too few timepoints
    #[error("Input error: {0}")]
    Input(String),

    /// Atlas/scan geometry mismatch or degenerate region extraction
    #[error("Data error: {0}")]
    Data(String),

    /// Weight load failure, shape mismatch, invalid model output
    #[error("Model error: {0}")]
    Model(String),

    /// Failure writing or publishing a generated artifact
    #[error("Artifact error: {0}")]
    Artifact(String),
}

/// Discriminant of [`ConnectivityError`], serializable for client responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Input,
    Data,
    Model,
    Artifact,
}

impl ConnectivityError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConnectivityError::Input(_) => ErrorKind::Input,
            ConnectivityError::Data(_) => ErrorKind::Data,
            ConnectivityError::Model(_) => ErrorKind::Model,
            ConnectivityError::Artifact(_) => ErrorKind::Artifact,
        }
    }

    /// The message without the kind prefix
    pub fn message(&self) -> &str {
        match self {
            ConnectivityError::Input(msg)
            | ConnectivityError::Data(msg)
            | ConnectivityError::Model(msg)
            | ConnectivityError::Artifact(msg) => msg,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::Model).unwrap();
        assert_eq!(json, "\"model\"");
    }

    #[test]
    fn test_display_includes_kind() {
        let err = ConnectivityError::Data("no regions".into());
        assert_eq!(err.to_string(), "Data error: no regions");
        assert_eq!(err.message(), "no regions");
    }
}
