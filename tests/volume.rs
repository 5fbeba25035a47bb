use approx::assert_relative_eq;
use byteordered::Endianness;
use interfile2dicom::{
    ConvertError, DecodedVolume, InterfileHeader, RawLayout, SampleType, Settings, VolumeData,
};
use ndarray::Array3;
use pretty_assertions::assert_eq;
use std::fs;
use tempfile::tempdir;

mod util;
use util::{f32_payload, float_header_text, pet_header_text, u16_ramp, write_image};

fn as_u16(data: VolumeData) -> Array3<u16> {
    match data {
        VolumeData::U16(values) => values,
        other => panic!("unexpected volume data: {:?}", other),
    }
}

/// 2 slices of 3x4 pixels, so every axis has a distinct extent.
fn asymmetric_header_text(data_file: &str) -> String {
    pet_header_text(data_file)
        .replace("!matrix size [1] := 2\n", "!matrix size [1] := 4\n")
        .replace("!matrix size [2] := 2\n", "!matrix size [2] := 3\n")
        .replace("!matrix size [3] := 4\n", "!matrix size [3] := 2\n")
        .replace(
            "!total number of images := 4\n",
            "!total number of images := 2\n",
        )
}

#[test]
fn interfile_payload_decodes_in_file_order() {
    let dir = tempdir().unwrap();
    let header_path = write_image(
        dir.path(),
        "recon",
        &asymmetric_header_text("recon.img"),
        &u16_ramp(0, 24),
    );

    let header = InterfileHeader::from_file(&header_path, &Settings::default()).unwrap();
    let volume = DecodedVolume::from_interfile(&header).unwrap();
    assert_eq!(volume.byte_order, Endianness::Little);
    assert_relative_eq!(volume.rescale.slope, 1.0);
    assert_relative_eq!(volume.rescale.intercept, 0.0);

    let values = as_u16(volume.data);
    assert_eq!(values.dim(), (2, 3, 4));
    assert_eq!(values[[0, 0, 0]], 0);
    assert_eq!(values[[0, 1, 2]], 6);
    assert_eq!(values[[1, 0, 0]], 12);
    assert_eq!(values[[1, 2, 3]], 23);
}

#[test]
fn short_payload_is_a_pixel_count_mismatch() {
    let dir = tempdir().unwrap();
    let header_path = write_image(
        dir.path(),
        "recon",
        &pet_header_text("recon.img"),
        &u16_ramp(0, 16)[..30],
    );

    let header = InterfileHeader::from_file(&header_path, &Settings::default()).unwrap();
    let err = DecodedVolume::from_interfile(&header).unwrap_err();
    assert!(matches!(err, ConvertError::PixelCountMismatch(16, 15)));
}

#[test]
fn trailing_bytes_are_a_pixel_count_mismatch() {
    let dir = tempdir().unwrap();
    let mut payload = u16_ramp(0, 16);
    payload.extend_from_slice(&[0, 0]);
    let header_path = write_image(dir.path(), "recon", &pet_header_text("recon.img"), &payload);

    let header = InterfileHeader::from_file(&header_path, &Settings::default()).unwrap();
    let err = DecodedVolume::from_interfile(&header).unwrap_err();
    assert!(matches!(err, ConvertError::PixelCountMismatch(16, 17)));
}

#[test]
fn data_offset_skips_the_leading_block() {
    let dir = tempdir().unwrap();
    let mut payload = vec![0xAB; 16];
    payload.extend_from_slice(&u16_ramp(100, 16));
    let text = pet_header_text("recon.img").replace(
        "!data offset in bytes := 0\n",
        "!data offset in bytes := 16\n",
    );
    let header_path = write_image(dir.path(), "recon", &text, &payload);

    let header = InterfileHeader::from_file(&header_path, &Settings::default()).unwrap();
    let volume = DecodedVolume::from_interfile(&header).unwrap();
    let values = as_u16(volume.data);
    assert_eq!(values.dim(), (4, 2, 2));
    assert_eq!(values[[0, 0, 0]], 100);
    assert_eq!(values[[3, 1, 1]], 115);
}

#[test]
fn absent_payload_is_file_not_found() {
    let dir = tempdir().unwrap();
    let header_path = dir.path().join("recon.hdr");
    fs::write(&header_path, pet_header_text("recon.img")).unwrap();

    let header = InterfileHeader::from_file(&header_path, &Settings::default()).unwrap();
    let err = DecodedVolume::from_interfile(&header).unwrap_err();
    match err {
        ConvertError::FileNotFound(path) => assert_eq!(path, dir.path().join("recon.img")),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn floating_payload_is_mirrored_and_rescaled_from_file() {
    let dir = tempdir().unwrap();
    let samples: Vec<f32> = (0..16).map(|v| v as f32).collect();
    let header_path = write_image(
        dir.path(),
        "recon",
        &float_header_text("recon.img"),
        &f32_payload(&samples),
    );

    let header = InterfileHeader::from_file(&header_path, &Settings::default()).unwrap();
    assert_eq!(header.sample_type, SampleType::Float32);

    let volume = DecodedVolume::from_interfile(&header).unwrap();
    assert_relative_eq!(volume.rescale.slope, 15.0 / 32767.0);
    assert_relative_eq!(volume.rescale.intercept, 0.0);

    // depth and height run backwards relative to the file order
    let values = as_u16(volume.data);
    assert_eq!(values.dim(), (4, 2, 2));
    assert_eq!(values[[0, 0, 1]], 32767); // source sample 15.0
    assert_eq!(values[[3, 1, 0]], 0); // source sample 0.0
    assert_eq!(values[[3, 1, 1]], 2184); // source sample 1.0
    assert_relative_eq!(volume.rescale.apply(32767.0), 15.0, epsilon = 1e-9);
}

#[test]
fn raw_file_ignores_a_trailing_partial_sample() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("frame.raw");
    let mut payload = u16_ramp(0, 6);
    payload.push(0xFF);
    fs::write(&path, payload).unwrap();

    let layout = RawLayout {
        width: 3,
        height: 2,
        frames: 1,
        sample_type: SampleType::Uint16,
        byte_order: Endianness::Little,
    };
    let volume = DecodedVolume::from_raw_file(&path, &layout).unwrap();
    let values = as_u16(volume.data);
    assert_eq!(values.dim(), (1, 3, 2));
    assert_eq!(values[[0, 0, 0]], 0);
    assert_eq!(values[[0, 2, 1]], 5);
}

#[test]
fn raw_file_with_missing_samples_is_a_mismatch() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("frame.raw");
    fs::write(&path, u16_ramp(0, 5)).unwrap();

    let layout = RawLayout {
        width: 3,
        height: 2,
        frames: 1,
        sample_type: SampleType::Uint16,
        byte_order: Endianness::Little,
    };
    let err = DecodedVolume::from_raw_file(&path, &layout).unwrap_err();
    assert!(matches!(err, ConvertError::PixelCountMismatch(6, 5)));
}

#[test]
fn oversized_raw_layout_is_a_mismatch() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("frame.raw");
    fs::write(&path, u16_ramp(0, 2)).unwrap();

    let layout = RawLayout {
        width: u32::MAX,
        height: u32::MAX,
        frames: u32::MAX,
        sample_type: SampleType::Uint16,
        byte_order: Endianness::Little,
    };
    let err = DecodedVolume::from_raw_file(&path, &layout).unwrap_err();
    assert!(matches!(err, ConvertError::PixelCountMismatch(_, 2)));
}

#[test]
fn raw_floating_layouts_are_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("frame.raw");
    fs::write(&path, f32_payload(&[1.0; 6])).unwrap();

    let layout = RawLayout {
        width: 3,
        height: 2,
        frames: 1,
        sample_type: SampleType::Float32,
        byte_order: Endianness::Little,
    };
    let err = DecodedVolume::from_raw_file(&path, &layout).unwrap_err();
    assert!(matches!(
        err,
        ConvertError::UnsupportedDataFormat(what) if what.contains("floating")
    ));
}
