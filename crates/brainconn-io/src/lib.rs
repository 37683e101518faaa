// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # brainconn-io
//!
//! Minimal NIfTI-1 support for the connectivity pipeline.
//!
//! ## Supported
//! - single-file images (`n+1` magic), plain `.nii` or gzip-compressed `.nii.gz`
//! - little- and big-endian headers
//! - integer and floating point datatypes (u8, i8, i16, u16, i32, u32, f32, f64)
//! - `scl_slope` / `scl_inter` intensity scaling
//! - sform, qform and pixdim-only affines
//!
//! ## Not supported
//! - header/image pairs (`.hdr` + `.img`), NIfTI-2, complex and RGB datatypes
//!
//! ## Usage
//! ```ignore
//! use brainconn_io::{load_scan, load_label_volume};
//!
//! let scan = load_scan("sub-01_bold.nii.gz")?;
//! let atlas = load_label_volume("atlas.nii.gz")?;
//! ```

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

mod error;
mod header;
mod reader;
mod volumes;
mod writer;

pub use error::{NiftiError, NiftiResult};
pub use header::{NiftiDataType, NiftiHeader, HEADER_SIZE};
pub use reader::{read_nifti, read_nifti_bytes, NiftiImage};
pub use volumes::{load_label_volume, load_scan, scan_from_image};
pub use writer::{encode_nifti, write_nifti};
