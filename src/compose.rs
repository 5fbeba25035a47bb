//! Series assembly.
//!
//! [`compose_series`] is the single decision point that merges the three
//! attribute sources into an emission plan: values derived from the
//! header are the fallback, fields present in the external metadata
//! override them, and computed values (slice positions, ordering keys,
//! bit depth, effective rescale) are never overridable. The writer
//! consumes the plan mechanically, one DICOM object per record.
use crate::meta::{Metadata, PatientData};
use crate::model::InterfileHeader;
use crate::volume::{DecodedVolume, Rescale};

/// Default direction cosines: axial orientation, rows along x, columns
/// along y. Keeps position-based slice sorting well defined when the
/// metadata supplies no orientation.
pub const DEFAULT_ORIENTATION: [f64; 6] = [1., 0., 0., 0., 1., 0.];

/// Pixel sample shape of the emitted objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitDepth {
    /// DICOM `BitsAllocated`.
    pub allocated: u16,
    /// DICOM `BitsStored`.
    pub stored: u16,
    /// DICOM `HighBit`.
    pub high_bit: u16,
    /// DICOM `PixelRepresentation`: 0 unsigned, 1 two's complement.
    pub representation: u16,
}

/// Attributes shared by every object of the emitted series.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesAttrs {
    /// Effective modality code.
    pub modality: String,
    /// Pixel spacing in mm, x then y.
    pub pixel_spacing: [f64; 2],
    /// Effective slice thickness in mm.
    pub slice_thickness: f64,
    /// Scanner manufacturer, when supplied.
    pub manufacturer: Option<String>,
    /// Study time override; the writer stamps the run time when absent.
    pub study_time: Option<String>,
    /// Series time, when supplied.
    pub series_time: Option<String>,
    /// Acquisition time, when supplied.
    pub acquisition_time: Option<String>,
    /// Accession number, when supplied.
    pub accession_number: Option<String>,
    /// Study description, when supplied.
    pub study_description: Option<String>,
    /// Series description, when supplied.
    pub series_description: Option<String>,
    /// Photometric interpretation of the samples.
    pub photometric_interpretation: String,
    /// Display window center, when supplied.
    pub window_center: Option<f64>,
    /// Display window width, when supplied.
    pub window_width: Option<f64>,
    /// Direction cosines of rows and columns.
    pub orientation: [f64; 6],
    /// Patient demographics.
    pub patient: PatientData,
    /// PET series attributes; present exactly when the effective
    /// modality is `PT`.
    pub pet: Option<PetAttrs>,
}

/// PET-specific series attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct PetAttrs {
    /// Pixel value units.
    pub units: String,
    /// Source of the reconstruction counts, when supplied.
    pub counts_source: Option<String>,
    /// Series type codes, when supplied.
    pub series_type: Option<String>,
    /// Decay correction label, when supplied.
    pub decay_correction: Option<String>,
    /// Reconstruction method description, when supplied.
    pub reconstruction_method: Option<String>,
}

/// One emitted DICOM object.
#[derive(Debug, Clone, PartialEq)]
pub struct SliceRecord {
    /// `InstanceNumber`, absent in extended mode.
    pub instance_number: Option<u32>,
    /// `ImageIndex`, assigned for PT output only.
    pub image_index: Option<u32>,
    /// `ImagePositionPatient`, absent in extended mode.
    pub position: Option<[f64; 3]>,
    /// `NumberOfFrames` for whole-volume records.
    pub number_of_frames: Option<u32>,
    /// Encoded pixel bytes, row-major, little endian.
    pub pixel_data: Vec<u8>,
}

/// The complete emission plan for one conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesPlan {
    /// Merged series attributes.
    pub attrs: SeriesAttrs,
    /// Pixel sample shape.
    pub bits: BitDepth,
    /// Effective stored-to-physical transform to record.
    pub rescale: Rescale,
    /// Whether the whole volume goes into a single object.
    pub extended: bool,
    /// Extent of the slice axis.
    pub number_of_slices: u16,
    /// DICOM `Columns` of every plane.
    pub columns: u16,
    /// DICOM `Rows` of every plane.
    pub rows: u16,
    /// Records in emission order.
    pub slices: Vec<SliceRecord>,
}

/// Merge the header, the decoded volume and the external metadata into
/// an ordered emission plan.
///
/// In per-slice mode every plane of the volume becomes one record with
/// a derived `ImagePositionPatient` and a 1-based `InstanceNumber`; in
/// extended mode a single record wraps the whole volume with no
/// positional attributes. Records are ordered by ascending slice index
/// and must be written in that order.
pub fn compose_series(
    header: &InterfileHeader,
    volume: &DecodedVolume,
    meta: &Metadata,
    extended: bool,
) -> SeriesPlan {
    let modality = meta
        .modality
        .clone()
        .unwrap_or_else(|| header.modality.as_str().to_owned());
    let is_pet = modality == "PT";

    let pet = if is_pet {
        let series = meta.pet_series.clone().unwrap_or_default();
        Some(PetAttrs {
            units: series
                .units
                .unwrap_or_else(|| header.quantification_units.clone()),
            counts_source: series.counts_source,
            series_type: series.series_type,
            decay_correction: series.decay_correction,
            reconstruction_method: series.reconstruction_method,
        })
    } else {
        None
    };

    let attrs = SeriesAttrs {
        modality,
        pixel_spacing: header.pixel_spacing,
        slice_thickness: meta.slice_thickness.unwrap_or(header.slice_thickness),
        manufacturer: meta.manufacturer.clone(),
        study_time: meta.study_time.clone(),
        series_time: meta.series_time.clone(),
        acquisition_time: meta.acquisition_time.clone(),
        accession_number: meta.accession_number.clone(),
        study_description: meta.study_description.clone(),
        series_description: meta.series_description.clone(),
        photometric_interpretation: meta
            .photometric_interpretation
            .clone()
            .unwrap_or_else(|| "MONOCHROME2".to_owned()),
        window_center: meta.window_center,
        window_width: meta.window_width,
        orientation: meta.image_orientation_patient.unwrap_or(DEFAULT_ORIENTATION),
        patient: meta.patient.clone(),
        pet,
    };

    let rescale = if header.sample_type.is_float() {
        volume.rescale
    } else {
        Rescale {
            slope: header.rescale_slope,
            intercept: header.rescale_offset,
        }
    };

    // keyed on the slope the decode computed, not the declared transform:
    // integer payloads keep their declared width and sign
    let bits = if volume.rescale.slope != 1. {
        BitDepth {
            allocated: 16,
            stored: 16,
            high_bit: 15,
            representation: 0,
        }
    } else {
        let width = 8 * header.bytes_per_pixel as u16;
        BitDepth {
            allocated: width,
            stored: width,
            high_bit: width - 1,
            representation: header.sample_type.is_signed() as u16,
        }
    };

    let (depth, height, width) = volume.data.dim();
    let slices = if extended {
        vec![SliceRecord {
            instance_number: None,
            image_index: None,
            position: None,
            number_of_frames: Some(depth as u32),
            pixel_data: volume.data.volume_bytes(),
        }]
    } else {
        let center = meta.patient_center;
        (0..depth)
            .map(|i| SliceRecord {
                instance_number: Some(i as u32 + 1),
                image_index: attrs.pet.as_ref().map(|_| i as u32 + 1),
                position: Some([
                    -attrs.pixel_spacing[0] * center[0],
                    -attrs.pixel_spacing[1] * center[1],
                    attrs.slice_thickness * (i as f64 - center[2]),
                ]),
                number_of_frames: None,
                pixel_data: volume.data.slice_bytes(i),
            })
            .collect()
    };

    SeriesPlan {
        attrs,
        bits,
        rescale,
        extended,
        number_of_slices: depth as u16,
        columns: height as u16,
        rows: width as u16,
        slices,
    }
}
