//! DICOM file emission.
//!
//! Consumes a [`SeriesPlan`] and writes explicit VR little endian files
//! through `dicom-object`. In per-slice mode the output path names a
//! directory that receives one file per record, `<basename>_<i>.dcm`,
//! counted from zero; in extended mode the output path names the single
//! emitted file. All objects of one run share a freshly generated set
//! of identifiers and the same study timestamp.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use dicom_core::value::DataSetSequence;
use dicom_core::{DataElement, PrimitiveValue, Tag, VR};
use dicom_dictionary_std::{tags, uids};
use dicom_object::{FileMetaTableBuilder, InMemDicomObject};
use tracing::info;

use crate::compose::{SeriesPlan, SliceRecord};
use crate::error::Result;
use crate::settings::Settings;
use crate::util::{fmt_ds, rand_uid};
use crate::volume::DecodedVolume;

const IMPLEMENTATION_VERSION_NAME: &str = "J-PET_V0";

/// Identifiers and timestamps shared by every object of one run.
struct RunIdentity {
    sop_instance_uid: String,
    sop_class_uid: String,
    study_instance_uid: String,
    series_instance_uid: String,
    frame_of_reference_uid: String,
    study_date: String,
    study_time: String,
}

impl RunIdentity {
    fn generate(settings: &Settings) -> RunIdentity {
        let now = Local::now();
        RunIdentity {
            sop_instance_uid: rand_uid(&settings.uid_root),
            sop_class_uid: rand_uid(&settings.uid_root),
            study_instance_uid: rand_uid(&settings.uid_root),
            series_instance_uid: rand_uid(&settings.uid_root),
            frame_of_reference_uid: rand_uid(&settings.uid_root),
            study_date: now.format("%Y%m%d").to_string(),
            study_time: now.format("%H%M%S%.6f").to_string(),
        }
    }
}

/// Write every record of the plan, in order.
///
/// Returns the paths of the written files. In per-slice mode the output
/// directory is created if missing and its final component becomes the
/// file basename; in extended mode the file is saved exactly at
/// `output`.
pub fn write_series<P>(plan: &SeriesPlan, output: P, settings: &Settings) -> Result<Vec<PathBuf>>
where
    P: AsRef<Path>,
{
    let output = output.as_ref();
    let run = RunIdentity::generate(settings);
    let mut written = Vec::with_capacity(plan.slices.len());

    if plan.extended {
        for record in &plan.slices {
            save_object(slice_object(plan, record, &run), &run, output)?;
            written.push(output.to_owned());
        }
    } else {
        fs::create_dir_all(output)?;
        let base_name = output
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        for (i, record) in plan.slices.iter().enumerate() {
            let path = output.join(format!("{}_{}.dcm", base_name, i));
            save_object(slice_object(plan, record, &run), &run, &path)?;
            written.push(path);
        }
    }

    info!(
        "wrote {} DICOM file(s) under {}",
        written.len(),
        output.display()
    );
    Ok(written)
}

/// Write one raw-import volume as a secondary capture object.
///
/// Single-frame volumes become a plain secondary capture image;
/// multi-frame volumes carry `NumberOfFrames`. The plane extents map
/// to `Columns` and `Rows` in array axis order.
pub fn write_secondary_capture<P>(
    volume: &DecodedVolume,
    output: P,
    settings: &Settings,
) -> Result<PathBuf>
where
    P: AsRef<Path>,
{
    let output = output.as_ref();
    let now = Local::now();
    let sop_instance_uid = rand_uid(&settings.uid_root);
    let (frames, width, height) = volume.data.dim();
    let bits = 8 * volume.data.sample_type().size_of() as u16;

    let mut obj = InMemDicomObject::new_empty();
    put_str(&mut obj, tags::SOP_CLASS_UID, VR::UI, uids::SECONDARY_CAPTURE_IMAGE_STORAGE);
    put_str(&mut obj, tags::SOP_INSTANCE_UID, VR::UI, &sop_instance_uid);
    put_str(&mut obj, tags::MODALITY, VR::CS, "WSD");
    put_str(&mut obj, tags::CONTENT_DATE, VR::DA, &now.format("%Y%m%d").to_string());
    put_str(&mut obj, tags::CONTENT_TIME, VR::TM, &now.format("%H%M%S%.6f").to_string());
    put_str(
        &mut obj,
        tags::SECONDARY_CAPTURE_DEVICE_MANUFACTURER,
        VR::LO,
        "NCBJ",
    );
    put_str(&mut obj, tags::STUDY_INSTANCE_UID, VR::UI, &rand_uid(&settings.uid_root));
    put_str(&mut obj, tags::SERIES_INSTANCE_UID, VR::UI, &rand_uid(&settings.uid_root));
    put_u16(&mut obj, tags::SAMPLES_PER_PIXEL, 1);
    put_str(&mut obj, tags::PHOTOMETRIC_INTERPRETATION, VR::CS, "MONOCHROME2");
    if frames > 1 {
        put_str(&mut obj, tags::NUMBER_OF_FRAMES, VR::IS, &frames.to_string());
    }
    put_u16(&mut obj, tags::COLUMNS, width as u16);
    put_u16(&mut obj, tags::ROWS, height as u16);
    put_u16(&mut obj, tags::BITS_ALLOCATED, bits);
    put_u16(&mut obj, tags::BITS_STORED, bits);
    put_u16(&mut obj, tags::HIGH_BIT, bits - 1);
    put_u16(
        &mut obj,
        tags::PIXEL_REPRESENTATION,
        volume.data.sample_type().is_signed() as u16,
    );
    put_pixel_data(&mut obj, bits, volume.data.volume_bytes());

    let file = obj.with_meta(
        FileMetaTableBuilder::new()
            .transfer_syntax(uids::EXPLICIT_VR_LITTLE_ENDIAN)
            .media_storage_sop_class_uid(uids::SECONDARY_CAPTURE_IMAGE_STORAGE)
            .media_storage_sop_instance_uid(sop_instance_uid)
            .implementation_class_uid(dicom_object::IMPLEMENTATION_CLASS_UID)
            .implementation_version_name(IMPLEMENTATION_VERSION_NAME),
    )?;
    file.write_to_file(output)?;
    info!("wrote secondary capture file {}", output.display());
    Ok(output.to_owned())
}

/// Build the full dataset of one record.
fn slice_object(plan: &SeriesPlan, record: &SliceRecord, run: &RunIdentity) -> InMemDicomObject {
    let attrs = &plan.attrs;
    let mut obj = InMemDicomObject::new_empty();

    put_str(&mut obj, tags::SOP_INSTANCE_UID, VR::UI, &run.sop_instance_uid);
    put_str(&mut obj, tags::SOP_CLASS_UID, VR::UI, &run.sop_class_uid);
    put_str(&mut obj, tags::STUDY_INSTANCE_UID, VR::UI, &run.study_instance_uid);
    put_str(&mut obj, tags::SERIES_INSTANCE_UID, VR::UI, &run.series_instance_uid);
    put_str(&mut obj, tags::FRAME_OF_REFERENCE_UID, VR::UI, &run.frame_of_reference_uid);
    put_str(&mut obj, tags::STUDY_DATE, VR::DA, &run.study_date);
    put_str(
        &mut obj,
        tags::STUDY_TIME,
        VR::TM,
        attrs.study_time.as_deref().unwrap_or(&run.study_time),
    );

    put_str(&mut obj, tags::MODALITY, VR::CS, &attrs.modality);
    put_opt(&mut obj, tags::MANUFACTURER, VR::LO, &attrs.manufacturer);
    put_opt(&mut obj, tags::SERIES_TIME, VR::TM, &attrs.series_time);
    put_opt(&mut obj, tags::ACQUISITION_TIME, VR::TM, &attrs.acquisition_time);
    put_opt(&mut obj, tags::ACCESSION_NUMBER, VR::SH, &attrs.accession_number);
    put_opt(&mut obj, tags::STUDY_DESCRIPTION, VR::LO, &attrs.study_description);
    put_opt(&mut obj, tags::SERIES_DESCRIPTION, VR::LO, &attrs.series_description);

    let patient = &attrs.patient;
    put_opt(&mut obj, tags::PATIENT_NAME, VR::PN, &patient.patient_name);
    put_opt(&mut obj, tags::PATIENT_ID, VR::LO, &patient.patient_id);
    put_opt(&mut obj, tags::PATIENT_BIRTH_DATE, VR::DA, &patient.patient_birth_date);
    put_opt(&mut obj, tags::PATIENT_SEX, VR::CS, &patient.patient_sex);
    put_opt(&mut obj, tags::PATIENT_AGE, VR::AS, &patient.patient_age);
    put_opt(&mut obj, tags::PATIENT_WEIGHT, VR::DS, &patient.patient_weight);

    if let Some(n) = record.instance_number {
        put_str(&mut obj, tags::INSTANCE_NUMBER, VR::IS, &n.to_string());
    }
    if let Some(position) = record.position {
        put_multi_ds(&mut obj, tags::IMAGE_POSITION_PATIENT, &position);
    }
    put_multi_ds(&mut obj, tags::IMAGE_ORIENTATION_PATIENT, &attrs.orientation);

    put_u16(&mut obj, tags::SAMPLES_PER_PIXEL, 1);
    put_str(
        &mut obj,
        tags::PHOTOMETRIC_INTERPRETATION,
        VR::CS,
        &attrs.photometric_interpretation,
    );
    put_u16(&mut obj, tags::ROWS, plan.rows);
    put_u16(&mut obj, tags::COLUMNS, plan.columns);
    put_multi_ds(&mut obj, tags::PIXEL_SPACING, &attrs.pixel_spacing);
    put_ds(&mut obj, tags::SLICE_THICKNESS, attrs.slice_thickness);
    put_u16(&mut obj, tags::BITS_ALLOCATED, plan.bits.allocated);
    put_u16(&mut obj, tags::BITS_STORED, plan.bits.stored);
    put_u16(&mut obj, tags::HIGH_BIT, plan.bits.high_bit);
    put_u16(&mut obj, tags::PIXEL_REPRESENTATION, plan.bits.representation);
    put_ds(&mut obj, tags::RESCALE_INTERCEPT, plan.rescale.intercept);
    put_ds(&mut obj, tags::RESCALE_SLOPE, plan.rescale.slope);
    if let Some(center) = attrs.window_center {
        put_ds(&mut obj, tags::WINDOW_CENTER, center);
    }
    if let Some(width) = attrs.window_width {
        put_ds(&mut obj, tags::WINDOW_WIDTH, width);
    }

    if let Some(frames) = record.number_of_frames {
        put_str(&mut obj, tags::NUMBER_OF_FRAMES, VR::IS, &frames.to_string());
    }
    if !plan.extended {
        put_u16(&mut obj, tags::NUMBER_OF_SLICES, plan.number_of_slices);
    }
    if let Some(index) = record.image_index {
        put_u16(&mut obj, tags::IMAGE_INDEX, index as u16);
    }

    if let Some(pet) = &attrs.pet {
        put_str(&mut obj, tags::UNITS, VR::CS, &pet.units);
        put_opt(&mut obj, tags::COUNTS_SOURCE, VR::CS, &pet.counts_source);
        put_opt(&mut obj, tags::SERIES_TYPE, VR::CS, &pet.series_type);
        put_opt(&mut obj, tags::DECAY_CORRECTION, VR::CS, &pet.decay_correction);
        put_opt(
            &mut obj,
            tags::RECONSTRUCTION_METHOD,
            VR::LO,
            &pet.reconstruction_method,
        );
        put_empty_seq(&mut obj, tags::RADIOPHARMACEUTICAL_INFORMATION_SEQUENCE);
        put_empty_seq(&mut obj, tags::PATIENT_ORIENTATION_CODE_SEQUENCE);
        put_empty_seq(&mut obj, tags::PATIENT_GANTRY_RELATIONSHIP_CODE_SEQUENCE);
    }

    put_pixel_data(&mut obj, plan.bits.allocated, record.pixel_data.clone());
    obj
}

fn save_object(obj: InMemDicomObject, run: &RunIdentity, path: &Path) -> Result<()> {
    let file = obj.with_meta(
        FileMetaTableBuilder::new()
            .transfer_syntax(uids::EXPLICIT_VR_LITTLE_ENDIAN)
            .media_storage_sop_class_uid(run.sop_class_uid.clone())
            .media_storage_sop_instance_uid(run.sop_instance_uid.clone())
            .implementation_class_uid(dicom_object::IMPLEMENTATION_CLASS_UID)
            .implementation_version_name(IMPLEMENTATION_VERSION_NAME),
    )?;
    file.write_to_file(path)?;
    Ok(())
}

fn put_str(obj: &mut InMemDicomObject, tag: Tag, vr: VR, value: &str) {
    let _ = obj.put(DataElement::new(tag, vr, PrimitiveValue::from(value)));
}

fn put_opt(obj: &mut InMemDicomObject, tag: Tag, vr: VR, value: &Option<String>) {
    if let Some(value) = value {
        put_str(obj, tag, vr, value);
    }
}

fn put_u16(obj: &mut InMemDicomObject, tag: Tag, value: u16) {
    let _ = obj.put(DataElement::new(tag, VR::US, PrimitiveValue::from(value)));
}

fn put_ds(obj: &mut InMemDicomObject, tag: Tag, value: f64) {
    let _ = obj.put(DataElement::new(tag, VR::DS, PrimitiveValue::from(fmt_ds(value))));
}

fn put_multi_ds(obj: &mut InMemDicomObject, tag: Tag, values: &[f64]) {
    let formatted = PrimitiveValue::Strs(values.iter().map(|v| fmt_ds(*v)).collect());
    let _ = obj.put(DataElement::new(tag, VR::DS, formatted));
}

fn put_empty_seq(obj: &mut InMemDicomObject, tag: Tag) {
    let _ = obj.put(DataElement::new(tag, VR::SQ, DataSetSequence::empty()));
}

fn put_pixel_data(obj: &mut InMemDicomObject, bits_allocated: u16, bytes: Vec<u8>) {
    let vr = if bits_allocated == 8 { VR::OB } else { VR::OW };
    let _ = obj.put(DataElement::new(tags::PIXEL_DATA, vr, PrimitiveValue::from(bytes)));
}
