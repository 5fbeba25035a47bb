//! Sample encodings and imaging modalities declared by Interfile headers.
use crate::error::{ConvertError, Result};
use std::fmt;

/// The binary encoding of one pixel sample, as resolved from the
/// `number format` and `number of bytes per pixel` header keys.
///
/// Floating encodings only exist on the input side: the decoder turns them
/// into rescaled unsigned 16-bit samples (see the `volume` module).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleType {
    /// unsigned char
    Uint8,
    /// signed char
    Int8,
    /// unsigned short
    Uint16,
    /// signed short
    Int16,
    /// unsigned int
    Uint32,
    /// signed int
    Int32,
    /// unsigned long
    Uint64,
    /// signed long
    Int64,
    /// half-precision float
    Float16,
    /// single-precision float
    Float32,
    /// double-precision float
    Float64,
}

impl SampleType {
    /// Resolve the sample type from the raw `number format` value and the
    /// declared width in bytes.
    ///
    /// The substring tests run in a fixed priority order. `"float"` is
    /// checked first; a bare `"short"` or `"long"` is still treated as a
    /// floating width (the reconstruction pipeline writes `short float`
    /// headers, and a stray spelling without the `float` word keeps the
    /// same meaning). `"unsigned"` must be tested before `"signed"`,
    /// which it contains.
    pub fn from_format(format: &str, bytes_per_pixel: u32) -> Result<SampleType> {
        let invalid = || ConvertError::InvalidPixelEncoding(format.to_owned(), bytes_per_pixel);
        if !matches!(bytes_per_pixel, 1 | 2 | 4 | 8) {
            return Err(invalid());
        }
        let f = format.to_lowercase();
        if f.contains("float") {
            match bytes_per_pixel {
                2 => Ok(SampleType::Float16),
                4 => Ok(SampleType::Float32),
                8 => Ok(SampleType::Float64),
                _ => Err(invalid()),
            }
        } else if f.contains("short") {
            if bytes_per_pixel != 2 {
                return Err(invalid());
            }
            Ok(SampleType::Float16)
        } else if f.contains("long") {
            if bytes_per_pixel != 8 {
                return Err(invalid());
            }
            Ok(SampleType::Float64)
        } else if f.contains("unsigned") {
            Ok(match bytes_per_pixel {
                1 => SampleType::Uint8,
                2 => SampleType::Uint16,
                4 => SampleType::Uint32,
                _ => SampleType::Uint64,
            })
        } else if f.contains("signed") {
            Ok(match bytes_per_pixel {
                1 => SampleType::Int8,
                2 => SampleType::Int16,
                4 => SampleType::Int32,
                _ => SampleType::Int64,
            })
        } else {
            Err(ConvertError::UnsupportedDataFormat(format.to_owned()))
        }
    }

    /// Width of one sample in bytes.
    pub fn size_of(self) -> usize {
        match self {
            SampleType::Uint8 | SampleType::Int8 => 1,
            SampleType::Uint16 | SampleType::Int16 | SampleType::Float16 => 2,
            SampleType::Uint32 | SampleType::Int32 | SampleType::Float32 => 4,
            SampleType::Uint64 | SampleType::Int64 | SampleType::Float64 => 8,
        }
    }

    /// Whether samples are IEEE-754 floating values.
    pub fn is_float(self) -> bool {
        matches!(
            self,
            SampleType::Float16 | SampleType::Float32 | SampleType::Float64
        )
    }

    /// Whether samples carry a sign bit. Floating types report `true`.
    pub fn is_signed(self) -> bool {
        !matches!(
            self,
            SampleType::Uint8 | SampleType::Uint16 | SampleType::Uint32 | SampleType::Uint64
        )
    }
}

/// Imaging modality declared by the `imaging modality` header key.
///
/// `CT` and `PT` (exact spellings) receive dedicated attribute handling
/// during emission; any other value passes through verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Modality {
    /// computed tomography
    Ct,
    /// positron emission tomography
    Pt,
    /// any other modality code, emitted as-is
    Other(String),
}

impl Modality {
    /// Interpret a raw header value as a modality.
    pub fn from_header(value: &str) -> Modality {
        match value {
            "CT" => Modality::Ct,
            "PT" => Modality::Pt,
            other => Modality::Other(other.to_owned()),
        }
    }

    /// The DICOM modality code to emit.
    pub fn as_str(&self) -> &str {
        match self {
            Modality::Ct => "CT",
            Modality::Pt => "PT",
            Modality::Other(s) => s,
        }
    }

    /// Whether this modality takes the PET-specific attribute set.
    pub fn is_pet(&self) -> bool {
        *self == Modality::Pt
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::{Modality, SampleType};
    use crate::error::ConvertError;

    #[test]
    fn number_format_resolution() {
        assert_eq!(
            SampleType::from_format("unsigned integer", 2).unwrap(),
            SampleType::Uint16
        );
        assert_eq!(
            SampleType::from_format("signed integer", 2).unwrap(),
            SampleType::Int16
        );
        assert_eq!(
            SampleType::from_format("unsigned integer", 8).unwrap(),
            SampleType::Uint64
        );
        assert_eq!(
            SampleType::from_format("float", 4).unwrap(),
            SampleType::Float32
        );
        assert_eq!(
            SampleType::from_format("short float", 2).unwrap(),
            SampleType::Float16
        );
        assert_eq!(
            SampleType::from_format("long float", 8).unwrap(),
            SampleType::Float64
        );
        // a bare "short" is still a floating width
        assert_eq!(
            SampleType::from_format("short", 2).unwrap(),
            SampleType::Float16
        );
    }

    #[test]
    fn unknown_format_is_rejected() {
        let err = SampleType::from_format("complex", 4).unwrap_err();
        assert!(matches!(err, ConvertError::UnsupportedDataFormat(f) if f == "complex"));
    }

    #[test]
    fn invalid_widths_are_rejected() {
        assert!(matches!(
            SampleType::from_format("unsigned integer", 3),
            Err(ConvertError::InvalidPixelEncoding(_, 3))
        ));
        // "short" promises a 2-byte float
        assert!(matches!(
            SampleType::from_format("short", 4),
            Err(ConvertError::InvalidPixelEncoding(_, 4))
        ));
        // floats are never single-byte
        assert!(matches!(
            SampleType::from_format("float", 1),
            Err(ConvertError::InvalidPixelEncoding(_, 1))
        ));
    }

    #[test]
    fn modality_codes() {
        assert_eq!(Modality::from_header("CT"), Modality::Ct);
        assert_eq!(Modality::from_header("PT"), Modality::Pt);
        assert!(Modality::from_header("PT").is_pet());
        let nm = Modality::from_header("NM");
        assert_eq!(nm.as_str(), "NM");
        assert!(!nm.is_pet());
        // matching is exact; lower case is not a recognized code
        assert_eq!(
            Modality::from_header("ct"),
            Modality::Other("ct".to_owned())
        );
    }
}
