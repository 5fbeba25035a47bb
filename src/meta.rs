//! External JSON metadata documents.
//!
//! Alongside the header, a conversion can take a JSON file with the
//! acquisition context that an Interfile header cannot carry: patient
//! demographics, series timing, orientation, windowing and the PET
//! series description. Every field is optional; whatever is present
//! overrides the value derived from the header, and anything the schema
//! does not know is skipped with a warning.
use crate::error::{ConvertError, Result};
use serde::Deserialize;
use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;
use tracing::warn;

/// Top-level keys this schema understands. Anything else in the
/// document is reported and skipped.
const KNOWN_KEYS: &[&str] = &[
    "Modality",
    "Manufacturer",
    "StudyTime",
    "SeriesTime",
    "AcquisitionTime",
    "AccessionNumber",
    "StudyDescription",
    "SeriesDescription",
    "SliceThickness",
    "ImageOrientationPatient",
    "PhotometricInterpretation",
    "WindowCenter",
    "WindowWidth",
    "patient",
    "patientCenter",
    "petSeries",
];

/// Externally supplied acquisition metadata.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct Metadata {
    /// Modality override for the emitted objects.
    pub modality: Option<String>,
    /// Scanner manufacturer.
    pub manufacturer: Option<String>,
    /// Study time (`HHMMSS.FFFFFF`).
    pub study_time: Option<String>,
    /// Series time.
    pub series_time: Option<String>,
    /// Acquisition time.
    pub acquisition_time: Option<String>,
    /// Accession number issued by the information system.
    pub accession_number: Option<String>,
    /// Study description.
    pub study_description: Option<String>,
    /// Series description.
    pub series_description: Option<String>,
    /// Slice thickness override in mm.
    pub slice_thickness: Option<f64>,
    /// Direction cosines of the first row and first column.
    pub image_orientation_patient: Option<[f64; 6]>,
    /// Photometric interpretation override.
    pub photometric_interpretation: Option<String>,
    /// Display window center.
    pub window_center: Option<f64>,
    /// Display window width.
    pub window_width: Option<f64>,
    /// Patient demographics.
    #[serde(rename = "patient")]
    pub patient: PatientData,
    /// Patient center offset, in pixels, against which slice positions
    /// are derived. Zero when absent.
    #[serde(rename = "patientCenter")]
    pub patient_center: [f64; 3],
    /// PET series description, only consulted for PT output.
    #[serde(rename = "petSeries")]
    pub pet_series: Option<PetSeries>,
}

/// Patient identity fields, emitted verbatim.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct PatientData {
    /// Patient name, in DICOM `family^given` convention.
    pub patient_name: Option<String>,
    /// Primary identifier of the patient.
    #[serde(rename = "PatientID")]
    pub patient_id: Option<String>,
    /// Birth date (`YYYYMMDD`).
    pub patient_birth_date: Option<String>,
    /// Sex code (`M`, `F` or `O`).
    pub patient_sex: Option<String>,
    /// Age string (`nnnY`).
    pub patient_age: Option<String>,
    /// Weight in kilograms.
    pub patient_weight: Option<String>,
}

/// PET series attributes.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct PetSeries {
    /// Pixel value units (overrides the header's quantification units).
    pub units: Option<String>,
    /// Source of the counts used for reconstruction.
    pub counts_source: Option<String>,
    /// Series type codes.
    pub series_type: Option<String>,
    /// Decay correction applied.
    pub decay_correction: Option<String>,
    /// Reconstruction method description.
    pub reconstruction_method: Option<String>,
}

impl Metadata {
    /// Read a metadata document from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Metadata> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => ConvertError::FileNotFound(path.to_owned()),
            _ => ConvertError::Io(e),
        })?;
        Metadata::from_reader(BufReader::new(file))
    }

    /// Read a metadata document from a JSON stream.
    pub fn from_reader<R: Read>(source: R) -> Result<Metadata> {
        let doc: serde_json::Value = serde_json::from_reader(source)?;
        if let Some(fields) = doc.as_object() {
            for key in fields.keys() {
                if !KNOWN_KEYS.contains(&key.as_str()) {
                    warn!("ignoring unrecognized metadata key `{}`", key);
                }
            }
        }
        serde_json::from_value(doc).map_err(From::from)
    }
}
