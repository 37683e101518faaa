// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # brainconn Checkpoint Serialization
//!
//! Binary checkpoint format for the connectivity GCN weights.
//!
//! ## Design Goals
//! - **Strict**: every tensor shape is validated against the declared model
//!   shape before a checkpoint is handed to the model
//! - **Compact**: optional LZ4 compression
//! - **Data only**: the payload is plain bincode, nothing in it is executed
//! - **Version-safe**: format versioning and a payload checksum
//!
//! ## Usage
//! ```ignore
//! use brainconn_serialization::{save_checkpoint, load_checkpoint};
//!
//! save_checkpoint(&checkpoint, "gcn.ckpt")?;
//! let checkpoint = load_checkpoint("gcn.ckpt")?;
//! ```

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;
use thiserror::Error;

mod tensor;

pub use tensor::SerializableTensor;

/// Checkpoint I/O errors
#[derive(Error, Debug)]
pub enum CheckpointError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Version mismatch: file version {file_version}, expected {expected_version}")]
    VersionMismatch {
        file_version: u32,
        expected_version: u32,
    },

    #[error("Invalid magic number: expected BCGCN, got {0:?}")]
    InvalidMagic([u8; 5]),

    #[error("Checksum mismatch: file may be corrupted")]
    ChecksumMismatch,

    #[error("Compression error: {0}")]
    Compression(String),

    #[error("Shape mismatch for {tensor}: expected {expected:?}, found {actual:?}")]
    ShapeMismatch {
        tensor: String,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("Invalid tensor: {0}")]
    InvalidTensor(String),
}

pub type Result<T> = std::result::Result<T, CheckpointError>;
pub type CheckpointResult<T> = Result<T>;

/// Magic number for checkpoint files: "BCGCN"
const MAGIC: &[u8; 5] = b"BCGCN";

/// Current format version (increment when format changes)
pub const FORMAT_VERSION: u32 = 1;

/// Model dimensions a checkpoint was trained for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GcnShape {
    /// Atlas regions (graph nodes, and output width)
    pub num_regions: usize,
    /// Timepoints per region (input feature width)
    pub num_features: usize,
    /// Hidden width of both convolution layers
    pub hidden_dim: usize,
}

/// Complete GCN weight snapshot
///
/// Weight layouts:
/// - `conv*_weight`: `in x out`
/// - `fc_weight`: `out x in` (regions x hidden)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GcnCheckpoint {
    /// Format version (for backward compatibility)
    pub version: u32,

    pub shape: GcnShape,

    pub conv1_weight: SerializableTensor,
    pub conv1_bias: SerializableTensor,
    pub conv2_weight: SerializableTensor,
    pub conv2_bias: SerializableTensor,
    pub fc_weight: SerializableTensor,
    pub fc_bias: SerializableTensor,

    /// Region names in node order, empty when unknown
    pub region_names: Vec<String>,

    pub metadata: CheckpointMetadata,
}

/// Checkpoint metadata (for tracking and debugging)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointMetadata {
    /// When this checkpoint was saved
    pub timestamp: u64,

    /// Human-readable description
    pub description: String,

    /// Source (e.g., "training run 42", "untrained: seed 7")
    pub source: String,

    /// Custom tags for organization
    pub tags: AHashMap<String, String>,
}

impl Default for CheckpointMetadata {
    fn default() -> Self {
        Self {
            timestamp: std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0),
            description: String::new(),
            source: String::from("unknown"),
            tags: AHashMap::new(),
        }
    }
}

impl GcnCheckpoint {
    /// Check every tensor against `shape`
    pub fn validate(&self) -> Result<()> {
        let GcnShape {
            num_regions,
            num_features,
            hidden_dim,
        } = self.shape;
        if num_regions == 0 || num_features == 0 || hidden_dim == 0 {
            return Err(CheckpointError::InvalidTensor(format!(
                "model dimensions must be positive, got {:?}",
                self.shape
            )));
        }
        self.conv1_weight.check("conv1_weight", &[num_features, hidden_dim])?;
        self.conv1_bias.check("conv1_bias", &[hidden_dim])?;
        self.conv2_weight.check("conv2_weight", &[hidden_dim, hidden_dim])?;
        self.conv2_bias.check("conv2_bias", &[hidden_dim])?;
        self.fc_weight.check("fc_weight", &[num_regions, hidden_dim])?;
        self.fc_bias.check("fc_bias", &[num_regions])?;
        if !self.region_names.is_empty() && self.region_names.len() != num_regions {
            return Err(CheckpointError::InvalidTensor(format!(
                "{} region names for {} regions",
                self.region_names.len(),
                num_regions
            )));
        }
        Ok(())
    }
}

/// Save a checkpoint to a file with optional LZ4 compression
///
/// # Format
/// ```text
/// [Header]
/// - Magic: "BCGCN" (5 bytes)
/// - Version: u32 (4 bytes)
/// - Flags: u8 (1 byte) - bit 0: compressed
/// - Uncompressed Size: u64 (8 bytes, original size before compression)
/// - Checksum: u64 (8 bytes, FNV-1a of data)
/// [Data]
/// - Bincode-serialized GcnCheckpoint (optionally LZ4 compressed)
/// ```
pub fn save_checkpoint<P: AsRef<Path>>(checkpoint: &GcnCheckpoint, path: P) -> Result<()> {
    checkpoint.validate()?;
    let bytes = encode_checkpoint(checkpoint)?;
    let mut file = BufWriter::new(File::create(path)?);
    file.write_all(&bytes)?;
    file.flush()?;
    Ok(())
}

/// Encode a checkpoint into the on-disk byte layout
pub fn encode_checkpoint(checkpoint: &GcnCheckpoint) -> Result<Vec<u8>> {
    let data = bincode::serialize(checkpoint)
        .map_err(|e| CheckpointError::Serialization(e.to_string()))?;

    #[cfg(feature = "compression")]
    let (final_data, flags, uncompressed_size) = {
        let original_size = data.len();
        let compressed = lz4::block::compress(&data, None, false)
            .map_err(|e| CheckpointError::Compression(e.to_string()))?;
        (compressed, 1u8, original_size as u64) // Flag bit 0 = compressed
    };

    #[cfg(not(feature = "compression"))]
    let (final_data, flags, uncompressed_size) = (data, 0u8, 0u64);

    let mut out = Vec::with_capacity(26 + final_data.len());
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    out.push(flags);
    out.extend_from_slice(&uncompressed_size.to_le_bytes());
    out.extend_from_slice(&calculate_checksum(&final_data).to_le_bytes());
    out.extend_from_slice(&final_data);
    Ok(out)
}

/// Load a checkpoint from a file and validate its tensor shapes
pub fn load_checkpoint<P: AsRef<Path>>(path: P) -> Result<GcnCheckpoint> {
    let mut file = File::open(path)?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;
    decode_checkpoint(&bytes)
}

/// Decode and validate the on-disk byte layout
pub fn decode_checkpoint(bytes: &[u8]) -> Result<GcnCheckpoint> {
    let mut cursor = bytes;

    // Read and verify magic number
    let mut magic = [0u8; 5];
    cursor.read_exact(&mut magic)?;
    if &magic != MAGIC {
        return Err(CheckpointError::InvalidMagic(magic));
    }

    // Read and verify version
    let mut version_bytes = [0u8; 4];
    cursor.read_exact(&mut version_bytes)?;
    let version = u32::from_le_bytes(version_bytes);
    if version != FORMAT_VERSION {
        return Err(CheckpointError::VersionMismatch {
            file_version: version,
            expected_version: FORMAT_VERSION,
        });
    }

    let mut flags = [0u8; 1];
    cursor.read_exact(&mut flags)?;
    let is_compressed = (flags[0] & 1) != 0;

    let mut size_bytes = [0u8; 8];
    cursor.read_exact(&mut size_bytes)?;
    let uncompressed_size = u64::from_le_bytes(size_bytes) as usize;

    let mut checksum_bytes = [0u8; 8];
    cursor.read_exact(&mut checksum_bytes)?;
    let expected_checksum = u64::from_le_bytes(checksum_bytes);

    // Verify checksum
    if calculate_checksum(cursor) != expected_checksum {
        return Err(CheckpointError::ChecksumMismatch);
    }

    // Decompress if needed
    let data = if is_compressed {
        #[cfg(feature = "compression")]
        {
            let size = i32::try_from(uncompressed_size).map_err(|_| {
                CheckpointError::Compression(format!(
                    "uncompressed size {} is too large",
                    uncompressed_size
                ))
            })?;
            lz4::block::decompress(cursor, Some(size))
                .map_err(|e| CheckpointError::Compression(format!("Decompression failed: {}", e)))?
        }
        #[cfg(not(feature = "compression"))]
        {
            let _ = uncompressed_size;
            return Err(CheckpointError::Compression(
                "File is compressed but compression feature is not enabled".to_string(),
            ));
        }
    } else {
        cursor.to_vec()
    };

    let checkpoint: GcnCheckpoint = bincode::deserialize(&data)
        .map_err(|e| CheckpointError::Deserialization(e.to_string()))?;
    checkpoint.validate()?;
    Ok(checkpoint)
}

/// Calculate a simple checksum (FNV-1a)
fn calculate_checksum(data: &[u8]) -> u64 {
    const FNV_OFFSET: u64 = 14695981039346656037;
    const FNV_PRIME: u64 = 1099511628211;

    let mut hash = FNV_OFFSET;
    for &byte in data {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}
