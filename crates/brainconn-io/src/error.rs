// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use thiserror::Error;

/// NIfTI I/O errors
#[derive(Error, Debug)]
pub enum NiftiError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid NIfTI header: {0}")]
    InvalidHeader(String),

    #[error("Unsupported NIfTI datatype code {0}")]
    UnsupportedDatatype(i16),

    #[error("Unsupported NIfTI layout: {0}")]
    UnsupportedLayout(String),

    #[error("Truncated image data: expected {expected} bytes after offset, found {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("Invalid image shape: {0}")]
    InvalidShape(String),
}

pub type NiftiResult<T> = std::result::Result<T, NiftiError>;
