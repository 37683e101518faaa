// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! NIfTI-1 header layout
//!
//! ```text
//! offset  field
//!      0  sizeof_hdr   i32 (always 348, also used to detect endianness)
//!     40  dim          i16[8]   dim[0] = number of dimensions
//!     70  datatype     i16
//!     72  bitpix       i16
//!     76  pixdim       f32[8]   pixdim[0] = qfac
//!    108  vox_offset   f32
//!    112  scl_slope    f32
//!    116  scl_inter    f32
//!    123  xyzt_units   u8
//!    252  qform_code   i16
//!    254  sform_code   i16
//!    256  quatern_bcd  f32[3]
//!    268  qoffset_xyz  f32[3]
//!    280  srow_x/y/z   f32[4] x 3
//!    344  magic        "n+1\0" | "ni1\0"
//! ```

use crate::{NiftiError, NiftiResult};
use brainconn_structures::Affine;
use byteorder::{BigEndian, ByteOrder, LittleEndian};

/// Size of a NIfTI-1 header in bytes
pub const HEADER_SIZE: usize = 348;

const MAGIC_SINGLE_FILE: &[u8; 4] = b"n+1\0";
const MAGIC_PAIR: &[u8; 4] = b"ni1\0";

/// Voxel storage type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NiftiDataType {
    UInt8,
    Int8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Float32,
    Float64,
}

impl NiftiDataType {
    pub fn from_code(code: i16) -> NiftiResult<Self> {
        match code {
            2 => Ok(Self::UInt8),
            4 => Ok(Self::Int16),
            8 => Ok(Self::Int32),
            16 => Ok(Self::Float32),
            64 => Ok(Self::Float64),
            256 => Ok(Self::Int8),
            512 => Ok(Self::UInt16),
            768 => Ok(Self::UInt32),
            other => Err(NiftiError::UnsupportedDatatype(other)),
        }
    }

    pub fn code(self) -> i16 {
        match self {
            Self::UInt8 => 2,
            Self::Int16 => 4,
            Self::Int32 => 8,
            Self::Float32 => 16,
            Self::Float64 => 64,
            Self::Int8 => 256,
            Self::UInt16 => 512,
            Self::UInt32 => 768,
        }
    }

    pub fn bytes_per_voxel(self) -> usize {
        match self {
            Self::UInt8 | Self::Int8 => 1,
            Self::Int16 | Self::UInt16 => 2,
            Self::Int32 | Self::UInt32 | Self::Float32 => 4,
            Self::Float64 => 8,
        }
    }
}

/// Decoded NIfTI-1 header fields used by the pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct NiftiHeader {
    pub big_endian: bool,
    pub dims: Vec<usize>,
    pub datatype: NiftiDataType,
    pub pixdim: [f32; 8],
    pub vox_offset: f32,
    pub scl_slope: f32,
    pub scl_inter: f32,
    pub xyzt_units: u8,
    pub qform_code: i16,
    pub sform_code: i16,
    pub quatern: [f32; 3],
    pub qoffset: [f32; 3],
    pub srow: [[f32; 4]; 3],
}

impl NiftiHeader {
    /// Parse the first [`HEADER_SIZE`] bytes of a NIfTI-1 file
    pub fn parse(bytes: &[u8]) -> NiftiResult<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(NiftiError::InvalidHeader(format!(
                "file is {} bytes, shorter than the {}-byte header",
                bytes.len(),
                HEADER_SIZE
            )));
        }
        if LittleEndian::read_i32(&bytes[0..4]) == HEADER_SIZE as i32 {
            Self::parse_with::<LittleEndian>(bytes, false)
        } else if BigEndian::read_i32(&bytes[0..4]) == HEADER_SIZE as i32 {
            Self::parse_with::<BigEndian>(bytes, true)
        } else {
            Err(NiftiError::InvalidHeader(
                "sizeof_hdr is not 348 in either byte order".to_string(),
            ))
        }
    }

    fn parse_with<B: ByteOrder>(bytes: &[u8], big_endian: bool) -> NiftiResult<Self> {
        let magic = &bytes[344..348];
        if magic == MAGIC_PAIR {
            return Err(NiftiError::UnsupportedLayout(
                "header/image pairs (.hdr/.img) are not supported".to_string(),
            ));
        }
        if magic != MAGIC_SINGLE_FILE {
            return Err(NiftiError::InvalidHeader(format!(
                "bad magic {:?}",
                String::from_utf8_lossy(magic)
            )));
        }

        let mut raw_dim = [0i16; 8];
        for (i, value) in raw_dim.iter_mut().enumerate() {
            *value = B::read_i16(&bytes[40 + 2 * i..]);
        }
        let ndim = raw_dim[0];
        if !(1..=7).contains(&ndim) {
            return Err(NiftiError::InvalidHeader(format!("dim[0] = {} is not in 1..=7", ndim)));
        }
        let mut dims = Vec::with_capacity(ndim as usize);
        for &extent in &raw_dim[1..=ndim as usize] {
            if extent < 1 {
                return Err(NiftiError::InvalidHeader(format!(
                    "non-positive dimension extent {} in {:?}",
                    extent,
                    &raw_dim[1..=ndim as usize]
                )));
            }
            dims.push(extent as usize);
        }

        let datatype = NiftiDataType::from_code(B::read_i16(&bytes[70..]))?;

        let mut pixdim = [0f32; 8];
        for (i, value) in pixdim.iter_mut().enumerate() {
            *value = B::read_f32(&bytes[76 + 4 * i..]);
        }

        let mut srow = [[0f32; 4]; 3];
        for (r, row) in srow.iter_mut().enumerate() {
            for (c, value) in row.iter_mut().enumerate() {
                *value = B::read_f32(&bytes[280 + 16 * r + 4 * c..]);
            }
        }

        Ok(Self {
            big_endian,
            dims,
            datatype,
            pixdim,
            vox_offset: B::read_f32(&bytes[108..]),
            scl_slope: B::read_f32(&bytes[112..]),
            scl_inter: B::read_f32(&bytes[116..]),
            xyzt_units: bytes[123],
            qform_code: B::read_i16(&bytes[252..]),
            sform_code: B::read_i16(&bytes[254..]),
            quatern: [
                B::read_f32(&bytes[256..]),
                B::read_f32(&bytes[260..]),
                B::read_f32(&bytes[264..]),
            ],
            qoffset: [
                B::read_f32(&bytes[268..]),
                B::read_f32(&bytes[272..]),
                B::read_f32(&bytes[276..]),
            ],
            srow,
        })
    }

    /// Serialize as a little-endian single-file header
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        LittleEndian::write_i32(&mut buf[0..4], HEADER_SIZE as i32);
        buf[38] = b'r';

        LittleEndian::write_i16(&mut buf[40..], self.dims.len() as i16);
        for (i, &extent) in self.dims.iter().enumerate() {
            LittleEndian::write_i16(&mut buf[42 + 2 * i..], extent as i16);
        }
        for i in self.dims.len()..7 {
            LittleEndian::write_i16(&mut buf[42 + 2 * i..], 1);
        }

        LittleEndian::write_i16(&mut buf[70..], self.datatype.code());
        LittleEndian::write_i16(&mut buf[72..], (self.datatype.bytes_per_voxel() * 8) as i16);
        for (i, value) in self.pixdim.iter().enumerate() {
            LittleEndian::write_f32(&mut buf[76 + 4 * i..], *value);
        }
        LittleEndian::write_f32(&mut buf[108..], self.vox_offset);
        LittleEndian::write_f32(&mut buf[112..], self.scl_slope);
        LittleEndian::write_f32(&mut buf[116..], self.scl_inter);
        buf[123] = self.xyzt_units;

        LittleEndian::write_i16(&mut buf[252..], self.qform_code);
        LittleEndian::write_i16(&mut buf[254..], self.sform_code);
        for (i, value) in self.quatern.iter().enumerate() {
            LittleEndian::write_f32(&mut buf[256 + 4 * i..], *value);
        }
        for (i, value) in self.qoffset.iter().enumerate() {
            LittleEndian::write_f32(&mut buf[268 + 4 * i..], *value);
        }
        for (r, row) in self.srow.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                LittleEndian::write_f32(&mut buf[280 + 16 * r + 4 * c..], *value);
            }
        }
        buf[344..348].copy_from_slice(MAGIC_SINGLE_FILE);
        buf
    }

    /// Byte offset of the voxel data (never inside the header)
    pub fn data_offset(&self) -> usize {
        let offset = self.vox_offset.max(0.0) as usize;
        offset.max(HEADER_SIZE)
    }

    /// Total number of voxels, `None` when the extents overflow `usize`
    pub fn voxel_count(&self) -> Option<usize> {
        self.dims.iter().try_fold(1usize, |n, &d| n.checked_mul(d))
    }

    /// Intensity scaling `(slope, intercept)`, `None` when the header asks for raw values
    pub fn scaling(&self) -> Option<(f64, f64)> {
        let slope = self.scl_slope as f64;
        let inter = self.scl_inter as f64;
        if slope == 0.0 || !slope.is_finite() || (slope == 1.0 && inter == 0.0) {
            None
        } else {
            Some((slope, if inter.is_finite() { inter } else { 0.0 }))
        }
    }

    /// Voxel-to-world transform: sform, then qform, then pixdim scaling
    pub fn affine(&self) -> Affine {
        if self.sform_code > 0 {
            let mut rows = [[0.0; 4]; 3];
            for (r, row) in rows.iter_mut().enumerate() {
                for (c, value) in row.iter_mut().enumerate() {
                    *value = self.srow[r][c] as f64;
                }
            }
            return Affine::from_spatial_rows(rows);
        }
        if self.qform_code > 0 {
            return self.qform_affine();
        }
        Affine::from_scaling([
            voxel_size(self.pixdim[1]),
            voxel_size(self.pixdim[2]),
            voxel_size(self.pixdim[3]),
        ])
    }

    fn qform_affine(&self) -> Affine {
        let (mut b, mut c, mut d) = (
            self.quatern[0] as f64,
            self.quatern[1] as f64,
            self.quatern[2] as f64,
        );
        let sum = b * b + c * c + d * d;
        let a = if sum > 1.0 {
            let norm = sum.sqrt();
            b /= norm;
            c /= norm;
            d /= norm;
            0.0
        } else {
            (1.0 - sum).sqrt()
        };

        let rotation = [
            [a * a + b * b - c * c - d * d, 2.0 * (b * c - a * d), 2.0 * (b * d + a * c)],
            [2.0 * (b * c + a * d), a * a + c * c - b * b - d * d, 2.0 * (c * d - a * b)],
            [2.0 * (b * d - a * c), 2.0 * (c * d + a * b), a * a + d * d - c * c - b * b],
        ];
        let qfac = if self.pixdim[0] < 0.0 { -1.0 } else { 1.0 };
        let scale = [
            voxel_size(self.pixdim[1]),
            voxel_size(self.pixdim[2]),
            voxel_size(self.pixdim[3]) * qfac,
        ];

        let mut rows = [[0.0; 4]; 3];
        for r in 0..3 {
            for c in 0..3 {
                rows[r][c] = rotation[r][c] * scale[c];
            }
            rows[r][3] = self.qoffset[r] as f64;
        }
        Affine::from_spatial_rows(rows)
    }
}

fn voxel_size(pixdim: f32) -> f64 {
    if pixdim.is_finite() && pixdim > 0.0 {
        pixdim as f64
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(dims: Vec<usize>) -> NiftiHeader {
        NiftiHeader {
            big_endian: false,
            dims,
            datatype: NiftiDataType::Float32,
            pixdim: [1.0, 2.0, 2.0, 2.0, 1.0, 0.0, 0.0, 0.0],
            vox_offset: 352.0,
            scl_slope: 1.0,
            scl_inter: 0.0,
            xyzt_units: 10,
            qform_code: 0,
            sform_code: 1,
            quatern: [0.0; 3],
            qoffset: [0.0; 3],
            srow: [
                [2.0, 0.0, 0.0, -90.0],
                [0.0, 2.0, 0.0, -126.0],
                [0.0, 0.0, 2.0, -72.0],
            ],
        }
    }

    #[test]
    fn test_encode_parse_preserves_fields() {
        let original = header(vec![4, 5, 6, 10]);
        let parsed = NiftiHeader::parse(&original.encode()).unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn test_rejects_bad_sizeof_hdr() {
        let mut bytes = header(vec![2, 2, 2]).encode();
        bytes[0] = 0;
        assert!(matches!(NiftiHeader::parse(&bytes), Err(NiftiError::InvalidHeader(_))));
    }

    #[test]
    fn test_rejects_pair_magic() {
        let mut bytes = header(vec![2, 2, 2]).encode();
        bytes[344..348].copy_from_slice(b"ni1\0");
        assert!(matches!(NiftiHeader::parse(&bytes), Err(NiftiError::UnsupportedLayout(_))));
    }

    #[test]
    fn test_qform_identity_rotation() {
        let mut h = header(vec![2, 2, 2]);
        h.sform_code = 0;
        h.qform_code = 1;
        h.qoffset = [-10.0, 5.0, 0.0];
        let affine = h.affine();
        assert_eq!(affine.apply([1.0, 1.0, 1.0]), [-8.0, 7.0, 2.0]);
    }

    #[test]
    fn test_qform_negative_qfac_flips_z() {
        let mut h = header(vec![2, 2, 2]);
        h.sform_code = 0;
        h.qform_code = 1;
        h.pixdim[0] = -1.0;
        assert_eq!(h.affine().apply([0.0, 0.0, 1.0]), [0.0, 0.0, -2.0]);
    }

    #[test]
    fn test_pixdim_fallback() {
        let mut h = header(vec![2, 2, 2]);
        h.sform_code = 0;
        h.pixdim[2] = 0.0;
        assert_eq!(h.affine().apply([1.0, 1.0, 1.0]), [2.0, 1.0, 2.0]);
    }

    #[test]
    fn test_scaling_identity_is_none() {
        let mut h = header(vec![2]);
        assert_eq!(h.scaling(), None);
        h.scl_slope = 0.0;
        assert_eq!(h.scaling(), None);
        h.scl_slope = 2.0;
        h.scl_inter = 1.0;
        assert_eq!(h.scaling(), Some((2.0, 1.0)));
    }
}
