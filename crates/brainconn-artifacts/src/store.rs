// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Per-request artifact directories
//!
//! Every request writes into `<root>/.staging-<request_id>/`. Publishing
//! renames that directory to `<root>/<request_id>/` in one step, so readers
//! only ever see complete request directories. A staging directory that is
//! dropped without being published is deleted.

use brainconn_structures::{ConnectivityError, ConnectivityResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

const STAGING_PREFIX: &str = ".staging-";

/// Generated artifact type, each with a fixed file name inside the request directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Heatmap,
    Connectome,
    ConnectionTable,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 3] = [
        ArtifactKind::Heatmap,
        ArtifactKind::Connectome,
        ArtifactKind::ConnectionTable,
    ];

    pub fn file_name(self) -> &'static str {
        match self {
            ArtifactKind::Heatmap => "connectivity_matrix.png",
            ArtifactKind::Connectome => "connectome.png",
            ArtifactKind::ConnectionTable => "connection_strengths.csv",
        }
    }
}

/// A published artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactHandle {
    pub kind: ArtifactKind,
    pub request_id: Uuid,
    pub path: PathBuf,
}

/// An artifact that could not be produced
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtifactFailure {
    pub kind: ArtifactKind,
    pub error: String,
}

/// Outcome of artifact generation for one request
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ArtifactReport {
    pub published: Vec<ArtifactHandle>,
    pub failures: Vec<ArtifactFailure>,
}

impl ArtifactReport {
    /// Every kind failed with the same error
    pub fn all_failed(error: &ConnectivityError) -> Self {
        Self {
            published: Vec::new(),
            failures: ArtifactKind::ALL
                .iter()
                .map(|&kind| ArtifactFailure {
                    kind,
                    error: error.to_string(),
                })
                .collect(),
        }
    }

    pub fn get(&self, kind: ArtifactKind) -> Option<&ArtifactHandle> {
        self.published.iter().find(|handle| handle.kind == kind)
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Counts from [`ArtifactStore::purge_expired`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PurgeReport {
    pub removed_requests: usize,
    pub removed_staging: usize,
}

/// Owns the artifact output directory and its expiry policy
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
    ttl: Duration,
}

impl ArtifactStore {
    /// Open (creating if needed) the output directory
    pub fn new<P: Into<PathBuf>>(root: P, ttl: Duration) -> ConnectivityResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| {
            ConnectivityError::Artifact(format!(
                "cannot create artifact directory {}: {}",
                root.display(),
                e
            ))
        })?;
        Ok(Self { root, ttl })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Final location of a request's artifacts
    pub fn request_dir(&self, request_id: Uuid) -> PathBuf {
        self.root.join(request_id.to_string())
    }

    /// Path of a published artifact, an error when the request never published it
    /// or it has since expired
    pub fn locate(&self, request_id: Uuid, kind: ArtifactKind) -> ConnectivityResult<PathBuf> {
        let path = self.request_dir(request_id).join(kind.file_name());
        if !path.is_file() {
            return Err(ConnectivityError::Artifact(format!(
                "{} not found for request {}",
                kind.file_name(),
                request_id
            )));
        }
        Ok(path)
    }

    fn staging_dir(&self, request_id: Uuid) -> PathBuf {
        self.root.join(format!("{}{}", STAGING_PREFIX, request_id))
    }

    /// Create a private staging directory for one request
    pub fn begin(&self, request_id: Uuid) -> ConnectivityResult<StagedRequest<'_>> {
        let dir = self.staging_dir(request_id);
        fs::create_dir(&dir).map_err(|e| {
            ConnectivityError::Artifact(format!(
                "cannot create staging directory {}: {}",
                dir.display(),
                e
            ))
        })?;
        debug!(target: "brainconn-artifacts", "Staging artifacts in {}", dir.display());
        Ok(StagedRequest {
            store: self,
            request_id,
            dir,
            written: Vec::new(),
            failures: Vec::new(),
            published: false,
        })
    }

    /// Delete published request directories and staging directories older than the TTL
    pub fn purge_expired(&self) -> ConnectivityResult<PurgeReport> {
        let mut report = PurgeReport::default();
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(report),
            Err(e) => {
                return Err(ConnectivityError::Artifact(format!(
                    "cannot list {}: {}",
                    self.root.display(),
                    e
                )))
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let is_staging = name.starts_with(STAGING_PREFIX);
            if !is_staging && Uuid::parse_str(name).is_err() {
                continue;
            }
            let Ok(metadata) = entry.metadata() else {
                continue;
            };
            if !metadata.is_dir() {
                continue;
            }
            let age = metadata
                .modified()
                .ok()
                .and_then(|modified| modified.elapsed().ok())
                .unwrap_or(Duration::ZERO);
            if age < self.ttl {
                continue;
            }

            match fs::remove_dir_all(&path) {
                Ok(()) if is_staging => report.removed_staging += 1,
                Ok(()) => report.removed_requests += 1,
                Err(e) => warn!(
                    target: "brainconn-artifacts",
                    "Failed to remove expired artifacts {}: {}",
                    path.display(),
                    e
                ),
            }
        }

        info!(
            target: "brainconn-artifacts",
            "Purged {} expired request(s) and {} stale staging dir(s) from {}",
            report.removed_requests,
            report.removed_staging,
            self.root.display()
        );
        Ok(report)
    }
}

/// Artifacts of one request, not yet visible under the request id
pub struct StagedRequest<'a> {
    store: &'a ArtifactStore,
    request_id: Uuid,
    dir: PathBuf,
    written: Vec<ArtifactKind>,
    failures: Vec<ArtifactFailure>,
    published: bool,
}

impl StagedRequest<'_> {
    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Render and write one artifact. A failure is recorded, not returned,
    /// so the remaining artifacts still get a chance.
    pub fn write<F>(&mut self, kind: ArtifactKind, render: F)
    where
        F: FnOnce() -> ConnectivityResult<Vec<u8>>,
    {
        let path = self.dir.join(kind.file_name());
        let result = render().and_then(|bytes| {
            fs::write(&path, bytes).map_err(|e| {
                ConnectivityError::Artifact(format!("cannot write {}: {}", path.display(), e))
            })
        });
        match result {
            Ok(()) => self.written.push(kind),
            Err(e) => {
                warn!(target: "brainconn-artifacts", "Artifact {:?} failed: {}", kind, e);
                self.failures.push(ArtifactFailure {
                    kind,
                    error: e.to_string(),
                });
            }
        }
    }

    /// Move the staging directory to its final name.
    ///
    /// With nothing written, nothing is published and the staging directory
    /// is removed.
    pub fn publish(mut self) -> ArtifactReport {
        let mut failures = std::mem::take(&mut self.failures);
        let written = std::mem::take(&mut self.written);
        if written.is_empty() {
            return ArtifactReport {
                published: Vec::new(),
                failures,
            };
        }

        let target = self.store.request_dir(self.request_id);
        if let Err(e) = fs::rename(&self.dir, &target) {
            let error = ConnectivityError::Artifact(format!(
                "cannot publish {} to {}: {}",
                self.dir.display(),
                target.display(),
                e
            ));
            warn!(target: "brainconn-artifacts", "{}", error);
            failures.extend(written.into_iter().map(|kind| ArtifactFailure {
                kind,
                error: error.to_string(),
            }));
            return ArtifactReport {
                published: Vec::new(),
                failures,
            };
        }
        self.published = true;

        info!(
            target: "brainconn-artifacts",
            "Published {} artifact(s) to {}",
            written.len(),
            target.display()
        );
        ArtifactReport {
            published: written
                .into_iter()
                .map(|kind| ArtifactHandle {
                    kind,
                    request_id: self.request_id,
                    path: target.join(kind.file_name()),
                })
                .collect(),
            failures,
        }
    }
}

impl Drop for StagedRequest<'_> {
    fn drop(&mut self) {
        if self.published {
            return;
        }
        if let Err(e) = fs::remove_dir_all(&self.dir) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(
                    target: "brainconn-artifacts",
                    "Failed to remove staging directory {}: {}",
                    self.dir.display(),
                    e
                );
            }
        }
    }
}
