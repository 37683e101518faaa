// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use crate::{CheckpointError, Result};
use serde::{Deserialize, Serialize};

/// Dense row-major tensor as stored in a checkpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SerializableTensor {
    pub shape: Vec<usize>,
    pub data: Vec<f64>,
}

impl SerializableTensor {
    pub fn new(shape: Vec<usize>, data: Vec<f64>) -> Result<Self> {
        let tensor = Self { shape, data };
        tensor.check_len("tensor")?;
        Ok(tensor)
    }

    pub fn matrix(rows: usize, cols: usize, data: Vec<f64>) -> Result<Self> {
        Self::new(vec![rows, cols], data)
    }

    pub fn vector(data: Vec<f64>) -> Result<Self> {
        Self::new(vec![data.len()], data)
    }

    /// Number of values the shape declares, an error when it overflows `usize`
    pub fn element_count(&self) -> Result<usize> {
        self.shape
            .iter()
            .try_fold(1usize, |n, &d| n.checked_mul(d))
            .ok_or_else(|| {
                CheckpointError::InvalidTensor(format!("shape {:?} overflows", self.shape))
            })
    }

    /// Verify the declared shape and every value
    pub(crate) fn check(&self, name: &str, expected: &[usize]) -> Result<()> {
        if self.shape != expected {
            return Err(CheckpointError::ShapeMismatch {
                tensor: name.to_string(),
                expected: expected.to_vec(),
                actual: self.shape.clone(),
            });
        }
        self.check_len(name)?;
        if let Some(index) = self.data.iter().position(|v| !v.is_finite()) {
            return Err(CheckpointError::InvalidTensor(format!(
                "{} has a non-finite value at flat index {}",
                name, index
            )));
        }
        Ok(())
    }

    fn check_len(&self, name: &str) -> Result<()> {
        let expected = self.element_count()?;
        if self.data.len() != expected {
            return Err(CheckpointError::InvalidTensor(format!(
                "{} declares shape {:?} ({} values) but holds {}",
                name,
                self.shape,
                expected,
                self.data.len()
            )));
        }
        Ok(())
    }
}
