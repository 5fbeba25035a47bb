//! Crate-level error types.
use quick_error::quick_error;
use std::io::Error as IoError;
use std::path::PathBuf;

quick_error! {
    /// Error type for all error variants originated by this crate.
    #[derive(Debug)]
    pub enum ConvertError {
        /// The file is not a readable Interfile header
        InvalidHeaderFormat(reason: String) {
            display("invalid Interfile header: {}", reason)
        }
        /// A header value could not be coerced to the required type
        InvalidHeaderValue(key: String) {
            display("invalid value for header key `{}`", key)
        }
        /// A required header key is absent
        MissingRequiredField(key: String) {
            display("missing required header key `{}`", key)
        }
        /// The header declares a CASToR version outside the supported set
        UnsupportedCastorVersion(version: String) {
            display("unsupported CASToR version `{}`", version)
        }
        /// The number format matched none of the recognized classes
        UnsupportedDataFormat(format: String) {
            display("unsupported number format `{}`", format)
        }
        /// The byte order specifier matched none of little/big/system
        UnsupportedByteOrder(order: String) {
            display("unsupported imagedata byte order `{}`", order)
        }
        /// Sample width outside {1, 2, 4, 8}, or inconsistent with the format
        InvalidPixelEncoding(format: String, bytes: u32) {
            display(
                "invalid pixel encoding: {} bytes per pixel for number format `{}`",
                bytes, format
            )
        }
        /// The payload size does not match the declared matrix dimensions
        PixelCountMismatch(expected: u64, actual: u64) {
            display(
                "pixel data does not match the declared dimensions: \
                 {} pixels declared, {} found in the data file",
                expected, actual
            )
        }
        /// The pixel data file is absent
        FileNotFound(path: PathBuf) {
            display("data file not found: {}", path.display())
        }
        /// I/O error
        Io(err: IoError) {
            from()
            source(err)
            display("I/O error: {}", err)
        }
        /// The external metadata document could not be parsed
        Meta(err: serde_json::Error) {
            from()
            source(err)
            display("invalid metadata document: {}", err)
        }
        /// The DICOM object could not be assembled with its file meta group
        CreateDicom(err: dicom_object::WithMetaError) {
            from()
            source(err)
            display("could not assemble DICOM object: {}", err)
        }
        /// The DICOM object could not be serialized to a file
        WriteDicom(err: dicom_object::WriteError) {
            from()
            source(err)
            display("could not write DICOM file: {}", err)
        }
    }
}

pub type Result<T> = std::result::Result<T, ConvertError>;
