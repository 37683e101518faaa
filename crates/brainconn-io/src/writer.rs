// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use crate::{NiftiDataType, NiftiError, NiftiHeader, NiftiResult, HEADER_SIZE};
use brainconn_structures::Affine;
use byteorder::{ByteOrder, LittleEndian};
use flate2::write::GzEncoder;
use flate2::Compression;
use ndarray::ArrayViewD;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Data starts right after the header and the 4-byte extension flag
const VOX_OFFSET: usize = HEADER_SIZE + 4;

/// Millimetres + seconds
const XYZT_UNITS_MM_SEC: u8 = 2 | 8;

/// Encode an image as a little-endian single-file NIfTI-1 (sform only).
///
/// Integer datatypes round and saturate.
pub fn encode_nifti(
    data: ArrayViewD<'_, f64>,
    affine: &Affine,
    datatype: NiftiDataType,
) -> NiftiResult<Vec<u8>> {
    let dims = data.shape().to_vec();
    if dims.is_empty() || dims.len() > 7 {
        return Err(NiftiError::InvalidShape(format!(
            "NIfTI supports 1 to 7 dimensions, got {}",
            dims.len()
        )));
    }
    if let Some(extent) = dims.iter().find(|&&d| d == 0 || d > i16::MAX as usize) {
        return Err(NiftiError::InvalidShape(format!("extent {} out of range", extent)));
    }

    let rows = affine.rows();
    let mut pixdim = [0f32; 8];
    pixdim[0] = 1.0;
    for axis in 0..3 {
        let norm = (0..3).map(|r| rows[r][axis] * rows[r][axis]).sum::<f64>().sqrt();
        pixdim[axis + 1] = norm as f32;
    }
    for (axis, value) in pixdim.iter_mut().enumerate().skip(4) {
        *value = if axis <= dims.len() { 1.0 } else { 0.0 };
    }

    let mut srow = [[0f32; 4]; 3];
    for (r, row) in srow.iter_mut().enumerate() {
        for (c, value) in row.iter_mut().enumerate() {
            *value = rows[r][c] as f32;
        }
    }

    let header = NiftiHeader {
        big_endian: false,
        dims,
        datatype,
        pixdim,
        vox_offset: VOX_OFFSET as f32,
        scl_slope: 1.0,
        scl_inter: 0.0,
        xyzt_units: XYZT_UNITS_MM_SEC,
        qform_code: 0,
        sform_code: 1,
        quatern: [0.0; 3],
        qoffset: [0.0; 3],
        srow,
    };

    let width = datatype.bytes_per_voxel();
    let mut out = Vec::with_capacity(VOX_OFFSET + data.len() * width);
    out.extend_from_slice(&header.encode());
    out.extend_from_slice(&[0u8; VOX_OFFSET - HEADER_SIZE]);

    // Reversing the axes turns logical order into NIfTI's x-fastest order
    let mut chunk = [0u8; 8];
    for &value in data.t().iter() {
        encode_voxel(value, datatype, &mut chunk[..width]);
        out.extend_from_slice(&chunk[..width]);
    }
    Ok(out)
}

/// Write an image to disk, gzip-compressing when the path ends in `.gz`
pub fn write_nifti<P: AsRef<Path>>(
    path: P,
    data: ArrayViewD<'_, f64>,
    affine: &Affine,
    datatype: NiftiDataType,
) -> NiftiResult<()> {
    let path = path.as_ref();
    let bytes = encode_nifti(data, affine, datatype)?;
    let file = BufWriter::new(File::create(path)?);
    if path.extension().map(|ext| ext == "gz").unwrap_or(false) {
        let mut encoder = GzEncoder::new(file, Compression::default());
        encoder.write_all(&bytes)?;
        encoder.finish()?.flush()?;
    } else {
        let mut file = file;
        file.write_all(&bytes)?;
        file.flush()?;
    }
    Ok(())
}

fn encode_voxel(value: f64, datatype: NiftiDataType, buf: &mut [u8]) {
    match datatype {
        NiftiDataType::UInt8 => buf[0] = value.round() as u8,
        NiftiDataType::Int8 => buf[0] = value.round() as i8 as u8,
        NiftiDataType::Int16 => LittleEndian::write_i16(buf, value.round() as i16),
        NiftiDataType::UInt16 => LittleEndian::write_u16(buf, value.round() as u16),
        NiftiDataType::Int32 => LittleEndian::write_i32(buf, value.round() as i32),
        NiftiDataType::UInt32 => LittleEndian::write_u32(buf, value.round() as u32),
        NiftiDataType::Float32 => LittleEndian::write_f32(buf, value as f32),
        NiftiDataType::Float64 => LittleEndian::write_f64(buf, value),
    }
}
