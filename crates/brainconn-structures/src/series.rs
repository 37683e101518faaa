// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use crate::{ConnectivityError, ConnectivityResult};
use ndarray::{Array2, ArrayView1, Axis};

/// Per-region time courses, `regions x timepoints`.
///
/// Row order matches the atlas label order and `names`/`labels` line up with
/// the rows. Values are always finite.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionTimeSeries {
    data: Array2<f64>,
    names: Vec<String>,
    labels: Vec<i32>,
}

impl RegionTimeSeries {
    pub fn new(data: Array2<f64>, names: Vec<String>, labels: Vec<i32>) -> ConnectivityResult<Self> {
        let regions = data.nrows();
        if names.len() != regions || labels.len() != regions {
            return Err(ConnectivityError::Data(format!(
                "time series has {} rows but {} names and {} labels",
                regions,
                names.len(),
                labels.len()
            )));
        }
        if data.iter().any(|v| !v.is_finite()) {
            return Err(ConnectivityError::Data(
                "time series contains non-finite values".to_string(),
            ));
        }
        Ok(Self {
            data,
            names,
            labels,
        })
    }

    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn labels(&self) -> &[i32] {
        &self.labels
    }

    pub fn num_regions(&self) -> usize {
        self.data.nrows()
    }

    pub fn timepoints(&self) -> usize {
        self.data.len_of(Axis(1))
    }

    pub fn row(&self, region: usize) -> ArrayView1<'_, f64> {
        self.data.row(region)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_rejects_mismatched_names() {
        let data = array![[0.0, 1.0], [1.0, 0.0]];
        let result = RegionTimeSeries::new(data, vec!["a".into()], vec![1, 2]);
        assert!(matches!(result, Err(ConnectivityError::Data(_))));
    }

    #[test]
    fn test_rejects_nan() {
        let data = array![[0.0, f64::NAN]];
        let result = RegionTimeSeries::new(data, vec!["a".into()], vec![1]);
        assert!(result.is_err());
    }
}
