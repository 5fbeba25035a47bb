//! Shared fixtures for the integration tests.

use std::fs;
use std::path::{Path, PathBuf};

/// Header text for a small CASToR PET reconstruction: 4 slices of 2x2
/// pixels, unsigned 16-bit samples, 2 mm pixel spacing and 3 mm slice
/// thickness, pointing at `data_file`.
#[allow(dead_code)]
pub fn pet_header_text(data_file: &str) -> String {
    format!(
        "!INTERFILE := \n\
         !imaging modality := PT\n\
         !version of keys := 3.3\n\
         CASToR version := 3.1\n\
         !GENERAL DATA := \n\
         !name of data file := {}\n\
         !data offset in bytes := 0\n\
         imagedata byte order := LITTLEENDIAN\n\
         !total number of images := 4\n\
         !number of dimensions := 3\n\
         !matrix size [1] := 2\n\
         !matrix size [2] := 2\n\
         !matrix size [3] := 4\n\
         !number format := unsigned integer\n\
         !number of bytes per pixel := 2\n\
         scaling factor (mm/pixel) [1] := 2\n\
         scaling factor (mm/pixel) [2] := 2\n\
         scaling factor (mm/pixel) [3] := 3\n\
         data rescale offset := 0\n\
         data rescale slope := 1\n\
         quantification units := Bq/ml\n\
         !END OF INTERFILE :=\n",
        data_file
    )
}

/// The same geometry re-declared as 4-byte floating point samples.
#[allow(dead_code)]
pub fn float_header_text(data_file: &str) -> String {
    pet_header_text(data_file)
        .replace(
            "!number format := unsigned integer\n",
            "!number format := short float\n",
        )
        .replace(
            "!number of bytes per pixel := 2\n",
            "!number of bytes per pixel := 4\n",
        )
}

/// Writes `<name>.hdr` holding `header` and `<name>.img` holding `payload`
/// side by side under `dir`, returning the header path.
#[allow(dead_code)]
pub fn write_image(dir: &Path, name: &str, header: &str, payload: &[u8]) -> PathBuf {
    let header_path = dir.join(format!("{}.hdr", name));
    fs::write(&header_path, header).unwrap();
    fs::write(dir.join(format!("{}.img", name)), payload).unwrap();
    header_path
}

/// Little-endian buffer of `count` consecutive 16-bit samples starting
/// at `first`.
#[allow(dead_code)]
pub fn u16_ramp(first: u16, count: u16) -> Vec<u8> {
    (first..first + count)
        .flat_map(|v| v.to_le_bytes())
        .collect()
}

/// Little-endian buffer of the given 32-bit floating point samples.
#[allow(dead_code)]
pub fn f32_payload(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}
