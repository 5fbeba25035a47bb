//! Typed view of an Interfile header.
//!
//! [`InterfileHeader`] is the validating projection of a
//! [`RawHeader`](crate::header::RawHeader): every field the conversion
//! pipeline relies on, extracted once, checked once. Construction either
//! yields a model that downstream code can trust blindly, or an error
//! naming exactly what was wrong.
use crate::error::{ConvertError, Result};
use crate::header::{HeaderValue, RawHeader};
use crate::settings::Settings;
use crate::typedef::{Modality, SampleType};
use byteordered::Endianness;
use std::convert::TryFrom;
use std::path::{Path, PathBuf};
use tracing::warn;

mod keys {
    pub const MODALITY: &str = "imaging modality";
    pub const KEYS_VERSION: &str = "version of keys";
    pub const CASTOR_VERSION: &str = "CASToR version";
    pub const DATA_OFFSET: &str = "data offset in bytes";
    pub const DATA_FILE: &str = "name of data file";
    pub const BYTE_ORDER: &str = "imagedata byte order";
    pub const IMAGES_NUMBER: &str = "total number of images";
    pub const DIMENSIONS: &str = "number of dimensions";
    pub const NUMBER_FORMAT: &str = "number format";
    pub const BYTES_PER_PIXEL: &str = "number of bytes per pixel";
    pub const RESCALE_OFFSET: &str = "data rescale offset";
    pub const RESCALE_SLOPE: &str = "data rescale slope";
    pub const QUANTIFICATION_UNITS: &str = "quantification units";

    pub fn matrix_size(axis: u32) -> String {
        format!("matrix size [{}]", axis)
    }

    pub fn scaling_factor(axis: u32) -> String {
        format!("scaling factor (mm/pixel) [{}]", axis)
    }
}

/// A validated Interfile header.
#[derive(Debug, Clone, PartialEq)]
pub struct InterfileHeader {
    /// Imaging modality (`imaging modality`).
    pub modality: Modality,
    /// Header keys version (`version of keys`), provenance only.
    pub keys_version: String,
    /// Producing CASToR version (`CASToR version`).
    pub castor_version: String,
    /// Byte offset where pixel data starts in the payload file.
    pub data_offset: u64,
    /// Payload path, already resolved against the header's directory.
    pub data_file: PathBuf,
    /// Payload byte order after resolving a `system` declaration.
    pub byte_order: Endianness,
    /// Declared total number of images (`total number of images`).
    pub images_number: u32,
    /// Declared dimensionality (`number of dimensions`).
    pub dimensions: u32,
    /// Matrix extent along the fastest-varying axis (`matrix size [1]`).
    pub width: u32,
    /// Matrix extent along the middle axis (`matrix size [2]`).
    pub height: u32,
    /// Matrix extent along the slowest axis (`matrix size [3]`).
    pub depth: u32,
    /// Raw `number format` value; kept because signedness branching on
    /// emission re-reads the original spelling.
    pub number_format: String,
    /// Sample encoding resolved from format and width.
    pub sample_type: SampleType,
    /// Declared sample width in bytes.
    pub bytes_per_pixel: u32,
    /// Pixel spacing in mm along x and y (`scaling factor` 1 and 2).
    pub pixel_spacing: [f64; 2],
    /// Slice thickness in mm (`scaling factor (mm/pixel) [3]`).
    pub slice_thickness: f64,
    /// Declared rescale intercept (`data rescale offset`).
    pub rescale_offset: f64,
    /// Declared rescale slope (`data rescale slope`).
    pub rescale_slope: f64,
    /// Quantification units, passed through verbatim.
    pub quantification_units: String,
}

impl InterfileHeader {
    /// Parse a header file and project it into the typed model.
    pub fn from_file<P: AsRef<Path>>(path: P, settings: &Settings) -> Result<InterfileHeader> {
        let raw = RawHeader::from_file(path)?;
        InterfileHeader::from_raw(&raw, settings)
    }

    /// Project a raw header into the typed model, validating as it goes.
    pub fn from_raw(raw: &RawHeader, settings: &Settings) -> Result<InterfileHeader> {
        let castor_version = require_text(raw, keys::CASTOR_VERSION)?;
        if !settings.supports_castor(&castor_version) {
            return Err(ConvertError::UnsupportedCastorVersion(castor_version));
        }

        let modality = Modality::from_header(&require_text(raw, keys::MODALITY)?);
        let keys_version = require_text(raw, keys::KEYS_VERSION)?;
        let data_offset = optional_u64(raw, keys::DATA_OFFSET)?.unwrap_or(0);
        let data_file = raw.dir().join(require_text(raw, keys::DATA_FILE)?);
        let byte_order = resolve_byte_order(require_value(raw, keys::BYTE_ORDER)?, settings)?;
        let images_number = require_u32(raw, keys::IMAGES_NUMBER)?;
        let dimensions = require_u32(raw, keys::DIMENSIONS)?;
        let width = matrix_size(raw, 1, dimensions)?;
        let height = matrix_size(raw, 2, dimensions)?;
        let depth = matrix_size(raw, 3, dimensions)?;
        let number_format = require_text(raw, keys::NUMBER_FORMAT)?;
        let bytes_per_pixel = require_u32(raw, keys::BYTES_PER_PIXEL)?;
        let sample_type = SampleType::from_format(&number_format, bytes_per_pixel)?;
        // the declared sample count and byte size must stay representable
        let _ = u64::from(width)
            .checked_mul(u64::from(height))
            .and_then(|n| n.checked_mul(u64::from(depth)))
            .ok_or_else(|| ConvertError::InvalidHeaderValue(keys::matrix_size(3)))?
            .checked_mul(u64::from(bytes_per_pixel))
            .ok_or_else(|| ConvertError::InvalidHeaderValue(keys::BYTES_PER_PIXEL.to_owned()))?;
        let pixel_spacing = [
            require_f64(raw, &keys::scaling_factor(1))?,
            require_f64(raw, &keys::scaling_factor(2))?,
        ];
        let slice_thickness = require_f64(raw, &keys::scaling_factor(3))?;
        let rescale_offset = require_f64(raw, keys::RESCALE_OFFSET)?;
        let rescale_slope = require_f64(raw, keys::RESCALE_SLOPE)?;
        let quantification_units = require_value(raw, keys::QUANTIFICATION_UNITS)?.to_text();

        Ok(InterfileHeader {
            modality,
            keys_version,
            castor_version,
            data_offset,
            data_file,
            byte_order,
            images_number,
            dimensions,
            width,
            height,
            depth,
            number_format,
            sample_type,
            bytes_per_pixel,
            pixel_spacing,
            slice_thickness,
            rescale_offset,
            rescale_slope,
            quantification_units,
        })
    }

    /// Total number of samples in the declared volume.
    ///
    /// Saturates when the extent product overflows;
    /// [`from_raw`](Self::from_raw) rejects such geometry up front.
    pub fn sample_count(&self) -> u64 {
        u64::from(self.width)
            .saturating_mul(u64::from(self.height))
            .saturating_mul(u64::from(self.depth))
    }

    /// Declared payload size in bytes, excluding the data offset.
    pub fn payload_size(&self) -> u64 {
        self.sample_count().saturating_mul(u64::from(self.bytes_per_pixel))
    }
}

fn require_value<'a>(raw: &'a RawHeader, key: &str) -> Result<&'a HeaderValue> {
    raw.get(key)
        .ok_or_else(|| ConvertError::MissingRequiredField(key.to_owned()))
}

/// Required key, textual form, surrounding whitespace removed.
fn require_text(raw: &RawHeader, key: &str) -> Result<String> {
    Ok(require_value(raw, key)?.to_text().trim().to_owned())
}

fn require_u32(raw: &RawHeader, key: &str) -> Result<u32> {
    match require_value(raw, key)? {
        HeaderValue::Integer(v) => {
            u32::try_from(*v).map_err(|_| ConvertError::InvalidHeaderValue(key.to_owned()))
        }
        _ => Err(ConvertError::InvalidHeaderValue(key.to_owned())),
    }
}

fn optional_u64(raw: &RawHeader, key: &str) -> Result<Option<u64>> {
    match raw.get(key) {
        None | Some(HeaderValue::Empty) => Ok(None),
        Some(HeaderValue::Integer(v)) => u64::try_from(*v)
            .map(Some)
            .map_err(|_| ConvertError::InvalidHeaderValue(key.to_owned())),
        Some(HeaderValue::Text(_)) => Err(ConvertError::InvalidHeaderValue(key.to_owned())),
    }
}

fn require_f64(raw: &RawHeader, key: &str) -> Result<f64> {
    match require_value(raw, key)? {
        HeaderValue::Integer(v) => Ok(*v as f64),
        HeaderValue::Text(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| ConvertError::InvalidHeaderValue(key.to_owned())),
        HeaderValue::Empty => Err(ConvertError::InvalidHeaderValue(key.to_owned())),
    }
}

/// `matrix size [axis]`; axes beyond the declared dimensionality default to 1.
fn matrix_size(raw: &RawHeader, axis: u32, dimensions: u32) -> Result<u32> {
    let key = keys::matrix_size(axis);
    match raw.get(&key) {
        Some(HeaderValue::Integer(v)) => match u32::try_from(*v) {
            Ok(size) if size > 0 => Ok(size),
            _ => Err(ConvertError::InvalidHeaderValue(key)),
        },
        Some(_) => Err(ConvertError::InvalidHeaderValue(key)),
        None if axis > dimensions => Ok(1),
        None => Err(ConvertError::MissingRequiredField(key)),
    }
}

/// Resolve the declared byte order. A `system` declaration is honored but
/// flagged: the payload may have been produced on a different machine.
fn resolve_byte_order(value: &HeaderValue, settings: &Settings) -> Result<Endianness> {
    let text = value.to_text();
    let lower = text.to_lowercase();
    if lower.contains("little") {
        Ok(Endianness::Little)
    } else if lower.contains("big") {
        Ok(Endianness::Big)
    } else if lower.contains("system") {
        let order = settings.native_order;
        warn!(
            "header declares system byte order; decoding as {:?}",
            order
        );
        Ok(order)
    } else {
        Err(ConvertError::UnsupportedByteOrder(text))
    }
}

#[cfg(test)]
mod tests {
    use super::InterfileHeader;
    use crate::error::ConvertError;
    use crate::header::RawHeader;
    use crate::settings::Settings;
    use crate::typedef::{Modality, SampleType};
    use byteordered::Endianness;
    use std::io::Cursor;
    use std::path::{Path, PathBuf};

    fn model_from(text: &str) -> crate::error::Result<InterfileHeader> {
        let raw = RawHeader::from_reader(Cursor::new(text.to_owned()), PathBuf::from("recon"))?;
        InterfileHeader::from_raw(&raw, &Settings::default())
    }

    fn full_header() -> String {
        "!INTERFILE := \n\
         !imaging modality := PT\n\
         !version of keys := 3.3\n\
         !CASToR version := 3.1\n\
         !name of data file := recon_it3.img\n\
         !data offset in bytes := 0\n\
         imagedata byte order := LITTLEENDIAN\n\
         !total number of images := 4\n\
         !number of dimensions := 3\n\
         !matrix size [1] := 128\n\
         !matrix size [2] := 96\n\
         !matrix size [3] := 4\n\
         !number format := unsigned integer\n\
         !number of bytes per pixel := 2\n\
         scaling factor (mm/pixel) [1] := 2.5\n\
         scaling factor (mm/pixel) [2] := 2.5\n\
         scaling factor (mm/pixel) [3] := 3\n\
         data rescale offset := 0\n\
         data rescale slope := 1\n\
         quantification units := 1\n\
         !END OF INTERFILE :=\n"
            .to_owned()
    }

    #[test]
    fn full_header_projects() {
        let model = model_from(&full_header()).unwrap();
        assert_eq!(model.modality, Modality::Pt);
        assert_eq!(model.castor_version, "3.1");
        assert_eq!(model.data_file, Path::new("recon").join("recon_it3.img"));
        assert_eq!(model.byte_order, Endianness::Little);
        assert_eq!((model.width, model.height, model.depth), (128, 96, 4));
        assert_eq!(model.sample_type, SampleType::Uint16);
        assert_eq!(model.pixel_spacing, [2.5, 2.5]);
        assert_eq!(model.slice_thickness, 3.0);
        assert_eq!(model.rescale_slope, 1.0);
        assert_eq!(model.sample_count(), 128 * 96 * 4);
        assert_eq!(model.payload_size(), 128 * 96 * 4 * 2);
    }

    #[test]
    fn missing_key_is_named() {
        let text = full_header().replace("!total number of images := 4\n", "");
        let err = model_from(&text).unwrap_err();
        assert!(matches!(
            err,
            ConvertError::MissingRequiredField(key) if key == "total number of images"
        ));
    }

    #[test]
    fn castor_version_allowlist() {
        let text = full_header().replace(
            "!CASToR version := 3.1\n",
            "!CASToR version := 2.0\n",
        );
        let err = model_from(&text).unwrap_err();
        assert!(matches!(
            err,
            ConvertError::UnsupportedCastorVersion(v) if v == "2.0"
        ));
    }

    #[test]
    fn byte_order_resolution() {
        let big = full_header().replace("LITTLEENDIAN", "BIGENDIAN");
        assert_eq!(model_from(&big).unwrap().byte_order, Endianness::Big);

        let system = full_header().replace("LITTLEENDIAN", "SYSTEM");
        assert_eq!(
            model_from(&system).unwrap().byte_order,
            Endianness::native()
        );

        let junk = full_header().replace("LITTLEENDIAN", "middle endian");
        let err = model_from(&junk).unwrap_err();
        assert!(matches!(
            err,
            ConvertError::UnsupportedByteOrder(o) if o == "middle endian"
        ));
    }

    #[test]
    fn missing_matrix_axis_defaults_beyond_dimensionality() {
        let text = full_header()
            .replace("!number of dimensions := 3\n", "!number of dimensions := 2\n")
            .replace("!matrix size [3] := 4\n", "");
        let model = model_from(&text).unwrap();
        assert_eq!(model.depth, 1);

        // within the declared dimensionality the axis stays required
        let text = full_header().replace("!matrix size [2] := 96\n", "");
        let err = model_from(&text).unwrap_err();
        assert!(matches!(
            err,
            ConvertError::MissingRequiredField(key) if key == "matrix size [2]"
        ));
    }

    #[test]
    fn data_offset_defaults_to_zero() {
        let text = full_header().replace("!data offset in bytes := 0\n", "");
        assert_eq!(model_from(&text).unwrap().data_offset, 0);
    }

    #[test]
    fn non_numeric_size_is_invalid() {
        let text = full_header().replace(
            "!matrix size [1] := 128\n",
            "!matrix size [1] := lots\n",
        );
        let err = model_from(&text).unwrap_err();
        assert!(matches!(
            err,
            ConvertError::InvalidHeaderValue(key) if key == "matrix size [1]"
        ));
    }

    #[test]
    fn zero_extent_is_invalid() {
        let text = full_header().replace(
            "!matrix size [3] := 4\n",
            "!matrix size [3] := 0\n",
        );
        let err = model_from(&text).unwrap_err();
        assert!(matches!(
            err,
            ConvertError::InvalidHeaderValue(key) if key == "matrix size [3]"
        ));
    }

    #[test]
    fn oversized_geometry_is_rejected() {
        let text = full_header()
            .replace("!matrix size [1] := 128\n", "!matrix size [1] := 4294967295\n")
            .replace("!matrix size [2] := 96\n", "!matrix size [2] := 4294967295\n")
            .replace("!matrix size [3] := 4\n", "!matrix size [3] := 4294967295\n");
        let err = model_from(&text).unwrap_err();
        assert!(matches!(
            err,
            ConvertError::InvalidHeaderValue(key) if key == "matrix size [3]"
        ));

        // extents whose sample count still fits can overflow the byte size
        let text = full_header()
            .replace("!matrix size [1] := 128\n", "!matrix size [1] := 2097152\n")
            .replace("!matrix size [2] := 96\n", "!matrix size [2] := 2097152\n")
            .replace("!matrix size [3] := 4\n", "!matrix size [3] := 2097152\n");
        let err = model_from(&text).unwrap_err();
        assert!(matches!(
            err,
            ConvertError::InvalidHeaderValue(key) if key == "number of bytes per pixel"
        ));
    }
}
