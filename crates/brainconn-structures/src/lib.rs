// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! The core crate for brainconn. Defines the data model shared by every stage
//! of the connectivity pipeline:
//!
//! - [`Scan`]: a 4D functional volume with its voxel-to-world affine
//! - [`LabelVolume`]: a 3D integer parcellation with its affine
//! - [`RegionTimeSeries`]: one z-scored time course per atlas region
//! - [`ConnectivityMatrix`]: the validated, symmetric model output
//! - [`ConnectionTable`]: the flattened upper triangle of a matrix
//!
//! Errors from every stage are expressed as [`ConnectivityError`].

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

mod affine;
mod error;
mod matrix;
mod series;
mod volume;

pub use affine::Affine;
pub use error::{ConnectivityError, ConnectivityResult, ErrorKind};
pub use matrix::{ConnectionRow, ConnectionTable, ConnectivityMatrix};
pub use series::RegionTimeSeries;
pub use volume::{LabelVolume, Scan};
