// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use crate::{NiftiDataType, NiftiError, NiftiHeader, NiftiResult};
use byteorder::{BigEndian, ByteOrder, LittleEndian};
use flate2::read::MultiGzDecoder;
use ndarray::{ArrayD, IxDyn, ShapeBuilder};
use std::fs;
use std::io::Read;
use std::path::Path;
use tracing::debug;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// A decoded NIfTI image: header plus voxel values in `(x, y, z, ...)` order
#[derive(Debug, Clone)]
pub struct NiftiImage {
    pub header: NiftiHeader,
    pub data: ArrayD<f64>,
}

/// Read a `.nii` or `.nii.gz` file. Compression is detected from content,
/// not from the file extension.
pub fn read_nifti<P: AsRef<Path>>(path: P) -> NiftiResult<NiftiImage> {
    let path = path.as_ref();
    let raw = fs::read(path)?;
    debug!(target: "brainconn-io", "Read {} bytes from {}", raw.len(), path.display());
    read_nifti_bytes(&raw)
}

/// Decode an in-memory NIfTI file (optionally gzip-compressed)
pub fn read_nifti_bytes(raw: &[u8]) -> NiftiResult<NiftiImage> {
    let inflated;
    let bytes: &[u8] = if raw.starts_with(&GZIP_MAGIC) {
        let mut buf = Vec::new();
        MultiGzDecoder::new(raw).read_to_end(&mut buf)?;
        inflated = buf;
        &inflated
    } else {
        raw
    };

    let header = NiftiHeader::parse(bytes)?;
    let offset = header.data_offset();
    let expected = header
        .voxel_count()
        .and_then(|n| n.checked_mul(header.datatype.bytes_per_voxel()))
        .ok_or_else(|| NiftiError::InvalidShape(format!("{:?} overflows", header.dims)))?;
    let available = bytes.len().saturating_sub(offset);
    if available < expected {
        return Err(NiftiError::Truncated {
            expected,
            actual: available,
        });
    }
    let payload = &bytes[offset..offset + expected];

    let mut values = if header.big_endian {
        decode_voxels::<BigEndian>(payload, header.datatype)
    } else {
        decode_voxels::<LittleEndian>(payload, header.datatype)
    };
    if let Some((slope, inter)) = header.scaling() {
        for value in values.iter_mut() {
            *value = *value * slope + inter;
        }
    }

    // NIfTI stores the first axis fastest, i.e. column-major
    let data = ArrayD::from_shape_vec(IxDyn(&header.dims).f(), values)
        .map_err(|e| NiftiError::InvalidShape(e.to_string()))?;

    debug!(
        target: "brainconn-io",
        "Decoded NIfTI image {:?} ({:?}, sform={}, qform={})",
        header.dims, header.datatype, header.sform_code, header.qform_code
    );
    Ok(NiftiImage { header, data })
}

fn decode_voxels<B: ByteOrder>(payload: &[u8], datatype: NiftiDataType) -> Vec<f64> {
    let width = datatype.bytes_per_voxel();
    payload
        .chunks_exact(width)
        .map(|chunk| match datatype {
            NiftiDataType::UInt8 => chunk[0] as f64,
            NiftiDataType::Int8 => chunk[0] as i8 as f64,
            NiftiDataType::Int16 => B::read_i16(chunk) as f64,
            NiftiDataType::UInt16 => B::read_u16(chunk) as f64,
            NiftiDataType::Int32 => B::read_i32(chunk) as f64,
            NiftiDataType::UInt32 => B::read_u32(chunk) as f64,
            NiftiDataType::Float32 => B::read_f32(chunk) as f64,
            NiftiDataType::Float64 => B::read_f64(chunk),
        })
        .collect()
}
