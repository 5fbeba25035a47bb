//! Pixel payload decoding.
//!
//! This module turns the raw bytes named by a header into a dense 3D
//! sample array. Integer payloads decode losslessly into their native
//! width and sign. Floating payloads are normalized for DICOM output:
//! the volume is mirrored along its depth and height axes and every
//! sample is mapped onto the unsigned 16-bit range through a linear
//! transform that is handed back alongside the data.

pub mod element;

use self::element::Sample;
use crate::error::{ConvertError, Result};
use crate::model::InterfileHeader;
use crate::typedef::SampleType;
use byteordered::Endianness;
use half::f16;
use ndarray::{Array3, Axis};
use num_traits::{AsPrimitive, ToBytes};
use std::fs;
use std::mem::size_of;
use std::path::Path;
use tracing::debug;

/// Linear transform from stored sample values to physical values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rescale {
    /// Multiplicative term (DICOM `RescaleSlope`).
    pub slope: f64,
    /// Additive term (DICOM `RescaleIntercept`).
    pub intercept: f64,
}

impl Rescale {
    /// The transform recorded for integer payloads, which are stored as-is.
    pub fn identity() -> Rescale {
        Rescale {
            slope: 1.,
            intercept: 0.,
        }
    }

    /// Physical value of a stored sample.
    pub fn apply(&self, stored: f64) -> f64 {
        stored * self.slope + self.intercept
    }
}

/// Decoded samples in their storage form, indexed `[depth, height, width]`.
///
/// Floating payloads never appear here: the decoder stores them as
/// rescaled unsigned 16-bit samples (see [`DecodedVolume`]).
#[derive(Debug, Clone, PartialEq)]
pub enum VolumeData {
    /// unsigned 8-bit samples
    U8(Array3<u8>),
    /// signed 8-bit samples
    I8(Array3<i8>),
    /// unsigned 16-bit samples
    U16(Array3<u16>),
    /// signed 16-bit samples
    I16(Array3<i16>),
    /// unsigned 32-bit samples
    U32(Array3<u32>),
    /// signed 32-bit samples
    I32(Array3<i32>),
    /// unsigned 64-bit samples
    U64(Array3<u64>),
    /// signed 64-bit samples
    I64(Array3<i64>),
}

impl VolumeData {
    /// Array extents as `(slices, rows of the plane, columns of the plane)`.
    pub fn dim(&self) -> (usize, usize, usize) {
        match self {
            VolumeData::U8(a) => a.dim(),
            VolumeData::I8(a) => a.dim(),
            VolumeData::U16(a) => a.dim(),
            VolumeData::I16(a) => a.dim(),
            VolumeData::U32(a) => a.dim(),
            VolumeData::I32(a) => a.dim(),
            VolumeData::U64(a) => a.dim(),
            VolumeData::I64(a) => a.dim(),
        }
    }

    /// Number of 2D planes along the slowest axis.
    pub fn num_slices(&self) -> usize {
        self.dim().0
    }

    /// The storage encoding of the samples.
    pub fn sample_type(&self) -> SampleType {
        match self {
            VolumeData::U8(_) => SampleType::Uint8,
            VolumeData::I8(_) => SampleType::Int8,
            VolumeData::U16(_) => SampleType::Uint16,
            VolumeData::I16(_) => SampleType::Int16,
            VolumeData::U32(_) => SampleType::Uint32,
            VolumeData::I32(_) => SampleType::Int32,
            VolumeData::U64(_) => SampleType::Uint64,
            VolumeData::I64(_) => SampleType::Int64,
        }
    }

    /// Pixel bytes of one plane, row-major, little endian.
    ///
    /// Panics when `index` is out of bounds.
    pub fn slice_bytes(&self, index: usize) -> Vec<u8> {
        match self {
            VolumeData::U8(a) => plane_bytes(a, index),
            VolumeData::I8(a) => plane_bytes(a, index),
            VolumeData::U16(a) => plane_bytes(a, index),
            VolumeData::I16(a) => plane_bytes(a, index),
            VolumeData::U32(a) => plane_bytes(a, index),
            VolumeData::I32(a) => plane_bytes(a, index),
            VolumeData::U64(a) => plane_bytes(a, index),
            VolumeData::I64(a) => plane_bytes(a, index),
        }
    }

    /// Pixel bytes of the whole volume, row-major, little endian.
    pub fn volume_bytes(&self) -> Vec<u8> {
        match self {
            VolumeData::U8(a) => array_bytes(a),
            VolumeData::I8(a) => array_bytes(a),
            VolumeData::U16(a) => array_bytes(a),
            VolumeData::I16(a) => array_bytes(a),
            VolumeData::U32(a) => array_bytes(a),
            VolumeData::I32(a) => array_bytes(a),
            VolumeData::U64(a) => array_bytes(a),
            VolumeData::I64(a) => array_bytes(a),
        }
    }
}

/// A decoded pixel volume together with the transform and byte order
/// that were actually applied while decoding it.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedVolume {
    /// Sample array.
    pub data: VolumeData,
    /// Stored-to-physical transform. Identity for integer payloads.
    pub rescale: Rescale,
    /// Byte order used for decoding, after resolving `system`.
    pub byte_order: Endianness,
}

impl DecodedVolume {
    /// Decode the payload file declared by the given header.
    pub fn from_interfile(header: &InterfileHeader) -> Result<DecodedVolume> {
        let bytes = read_payload(&header.data_file)?;
        let payload = bytes.get(header.data_offset as usize..).unwrap_or_default();

        let sample_width = u64::from(header.bytes_per_pixel);
        if payload.len() as u64 != header.payload_size() {
            return Err(ConvertError::PixelCountMismatch(
                header.sample_count(),
                payload.len() as u64 / sample_width,
            ));
        }

        debug!(
            "decoding {}: {:?} samples, {:?} byte order",
            header.data_file.display(),
            header.sample_type,
            header.byte_order
        );

        let shape = (
            header.depth as usize,
            header.height as usize,
            header.width as usize,
        );
        let (data, rescale) =
            decode_samples(header.sample_type, payload, shape, header.byte_order)?;
        Ok(DecodedVolume {
            data,
            rescale,
            byte_order: header.byte_order,
        })
    }

    /// Decode a headerless raw image file laid out as `layout` describes.
    ///
    /// Unlike the Interfile path, the sample sequence is kept exactly in
    /// file order with no axis mirroring, and floating encodings are not
    /// accepted.
    pub fn from_raw_file<P: AsRef<Path>>(path: P, layout: &RawLayout) -> Result<DecodedVolume> {
        if layout.sample_type.is_float() {
            return Err(ConvertError::UnsupportedDataFormat(
                "floating-point raw images".to_owned(),
            ));
        }
        let bytes = read_payload(path.as_ref())?;
        let expected = layout.sample_count();
        let actual = bytes.len() as u64 / layout.sample_type.size_of() as u64;
        if actual != expected {
            return Err(ConvertError::PixelCountMismatch(expected, actual));
        }
        let shape = (
            layout.frames as usize,
            layout.width as usize,
            layout.height as usize,
        );
        let (data, rescale) = decode_samples(layout.sample_type, &bytes, shape, layout.byte_order)?;
        Ok(DecodedVolume {
            data,
            rescale,
            byte_order: layout.byte_order,
        })
    }
}

/// Geometry of a headerless raw image file.
#[derive(Debug, Clone, PartialEq)]
pub struct RawLayout {
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Number of frames in the file.
    pub frames: u32,
    /// Sample encoding.
    pub sample_type: SampleType,
    /// Byte order of the samples.
    pub byte_order: Endianness,
}

impl RawLayout {
    /// Total number of samples the layout describes, saturating when the
    /// extents overflow. A saturated count can never match a real file.
    pub fn sample_count(&self) -> u64 {
        u64::from(self.width)
            .saturating_mul(u64::from(self.height))
            .saturating_mul(u64::from(self.frames))
    }
}

fn read_payload(path: &Path) -> Result<Vec<u8>> {
    if !path.is_file() {
        return Err(ConvertError::FileNotFound(path.to_owned()));
    }
    fs::read(path).map_err(From::from)
}

fn decode_samples(
    kind: SampleType,
    bytes: &[u8],
    shape: (usize, usize, usize),
    order: Endianness,
) -> Result<(VolumeData, Rescale)> {
    let identity = Rescale::identity();
    match kind {
        SampleType::Uint8 => Ok((
            VolumeData::U8(reshape(u8::from_raw_vec(bytes, order)?, shape)),
            identity,
        )),
        SampleType::Int8 => Ok((
            VolumeData::I8(reshape(i8::from_raw_vec(bytes, order)?, shape)),
            identity,
        )),
        SampleType::Uint16 => Ok((
            VolumeData::U16(reshape(u16::from_raw_vec(bytes, order)?, shape)),
            identity,
        )),
        SampleType::Int16 => Ok((
            VolumeData::I16(reshape(i16::from_raw_vec(bytes, order)?, shape)),
            identity,
        )),
        SampleType::Uint32 => Ok((
            VolumeData::U32(reshape(u32::from_raw_vec(bytes, order)?, shape)),
            identity,
        )),
        SampleType::Int32 => Ok((
            VolumeData::I32(reshape(i32::from_raw_vec(bytes, order)?, shape)),
            identity,
        )),
        SampleType::Uint64 => Ok((
            VolumeData::U64(reshape(u64::from_raw_vec(bytes, order)?, shape)),
            identity,
        )),
        SampleType::Int64 => Ok((
            VolumeData::I64(reshape(i64::from_raw_vec(bytes, order)?, shape)),
            identity,
        )),
        SampleType::Float16 => rescale_floats::<f16>(bytes, shape, order),
        SampleType::Float32 => rescale_floats::<f32>(bytes, shape, order),
        SampleType::Float64 => rescale_floats::<f64>(bytes, shape, order),
    }
}

/// Decode floating samples and map them onto the unsigned 16-bit range.
///
/// The depth and height axes are mirrored to the reference orientation
/// first; the width axis keeps its order. The returned transform maps a
/// stored sample back to its physical value.
fn rescale_floats<T>(
    bytes: &[u8],
    shape: (usize, usize, usize),
    order: Endianness,
) -> Result<(VolumeData, Rescale)>
where
    T: Sample,
{
    let samples: Vec<f64> = T::from_raw_vec(bytes, order)?
        .into_iter()
        .map(|v| v.as_())
        .collect();
    let mut values = reshape(samples, shape);
    values.invert_axis(Axis(0));
    values.invert_axis(Axis(1));

    let min = values.fold(f64::INFINITY, |m, &v| m.min(v));
    let max = values.fold(f64::NEG_INFINITY, |m, &v| m.max(v));
    let rescale = if max > min {
        Rescale {
            slope: (max - min) / f64::from(i16::MAX),
            intercept: min,
        }
    } else {
        // a uniform volume would make the slope zero; store zeros against
        // an identity slope instead
        Rescale {
            slope: 1.,
            intercept: min,
        }
    };
    let stored = values.mapv(|v| ((v - rescale.intercept) / rescale.slope).round() as u16);
    Ok((VolumeData::U16(stored), rescale))
}

fn reshape<A>(samples: Vec<A>, shape: (usize, usize, usize)) -> Array3<A> {
    Array3::from_shape_vec(shape, samples).expect("Inconsistent payload size")
}

fn plane_bytes<A>(data: &Array3<A>, index: usize) -> Vec<u8>
where
    A: ToBytes + Copy,
{
    let plane = data.index_axis(Axis(0), index);
    let mut out = Vec::with_capacity(plane.len() * size_of::<A>());
    for v in plane.iter() {
        out.extend_from_slice(v.to_le_bytes().as_ref());
    }
    out
}

fn array_bytes<A>(data: &Array3<A>) -> Vec<u8>
where
    A: ToBytes + Copy,
{
    let mut out = Vec::with_capacity(data.len() * size_of::<A>());
    for v in data.iter() {
        out.extend_from_slice(v.to_le_bytes().as_ref());
    }
    out
}
