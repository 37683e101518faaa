// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Conversion from raw NIfTI images to pipeline volumes

use crate::{read_nifti, NiftiImage};
use brainconn_structures::{ConnectivityError, ConnectivityResult, LabelVolume, Scan};
use ndarray::{ArrayD, Axis, Ix3, Ix4};
use std::path::Path;
use tracing::{debug, info};

/// Load a functional scan. Any read or decode failure is an input error.
pub fn load_scan<P: AsRef<Path>>(path: P) -> ConnectivityResult<Scan> {
    let path = path.as_ref();
    let image = read_nifti(path).map_err(|e| {
        ConnectivityError::Input(format!("cannot read scan {}: {}", path.display(), e))
    })?;
    let scan = scan_from_image(image)?;
    info!(
        target: "brainconn-io",
        "Loaded scan {} grid={:?} timepoints={}",
        path.display(),
        scan.grid(),
        scan.timepoints()
    );
    Ok(scan)
}

/// Interpret a decoded image as a 4D scan.
///
/// 3D images become single-timepoint scans and are therefore rejected;
/// trailing singleton dimensions past the fourth are dropped.
pub fn scan_from_image(image: NiftiImage) -> ConnectivityResult<Scan> {
    let affine = image.header.affine();
    let mut data = image.data;
    if data.ndim() < 3 {
        return Err(ConnectivityError::Input(format!(
            "scan must be 4D (x, y, z, time), got shape {:?}",
            data.shape()
        )));
    }
    data = squeeze_trailing(data, 4)
        .map_err(|shape| ConnectivityError::Input(format!("scan must be 4D, got shape {:?}", shape)))?;
    if data.ndim() == 3 {
        data = data.insert_axis(Axis(3));
    }
    let data = data
        .into_dimensionality::<Ix4>()
        .map_err(|e| ConnectivityError::Input(format!("scan must be 4D: {}", e)))?;
    Scan::new(data, affine)
}

/// Load an atlas label volume. Voxel values must be whole numbers.
pub fn load_label_volume<P: AsRef<Path>>(path: P) -> ConnectivityResult<LabelVolume> {
    let path = path.as_ref();
    let image = read_nifti(path).map_err(|e| {
        ConnectivityError::Data(format!("cannot read atlas {}: {}", path.display(), e))
    })?;
    let affine = image.header.affine();
    let data = squeeze_trailing(image.data, 3).map_err(|shape| {
        ConnectivityError::Data(format!("atlas must be a 3D label volume, got shape {:?}", shape))
    })?;
    let data = data
        .into_dimensionality::<Ix3>()
        .map_err(|e| ConnectivityError::Data(format!("atlas must be 3D: {}", e)))?;

    if let Some(bad) = data.iter().find(|v| !v.is_finite() || v.fract() != 0.0) {
        return Err(ConnectivityError::Data(format!(
            "atlas {} contains non-integer label value {}",
            path.display(),
            bad
        )));
    }
    let labels = data.mapv(|v| v as i32);
    debug!(target: "brainconn-io", "Loaded label volume {} grid={:?}", path.display(), labels.dim());
    Ok(LabelVolume::new(labels, affine))
}

/// Drop trailing singleton axes until at most `keep` remain.
/// Returns the offending shape when a non-singleton axis would be dropped.
fn squeeze_trailing(mut data: ArrayD<f64>, keep: usize) -> Result<ArrayD<f64>, Vec<usize>> {
    while data.ndim() > keep {
        let last = data.ndim() - 1;
        if data.len_of(Axis(last)) != 1 {
            return Err(data.shape().to_vec());
        }
        data = data.index_axis_move(Axis(last), 0);
    }
    Ok(data)
}
