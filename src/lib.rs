//! Conversion of CASToR Interfile images to DICOM.
//!
//! The pipeline reads an Interfile header into a tolerant key/value map
//! ([`header`]), validates it into a typed model ([`model`]), decodes
//! the binary payload it names ([`volume`]), merges external JSON
//! metadata into an emission plan ([`compose`]) and writes one DICOM
//! file per slice, or one file for the whole volume, through
//! `dicom-object` ([`writer`]). [`convert`] runs the whole chain for
//! one input.
#![deny(missing_debug_implementations)]
#![warn(missing_docs, unused_extern_crates, trivial_casts, unused_results)]

pub mod compose;
pub mod error;
pub mod header;
pub mod meta;
pub mod model;
pub mod settings;
pub mod typedef;
pub mod volume;
pub mod writer;
mod util;

pub use crate::compose::{compose_series, SeriesPlan};
pub use crate::error::{ConvertError, Result};
pub use crate::header::RawHeader;
pub use crate::meta::Metadata;
pub use crate::model::InterfileHeader;
pub use crate::settings::Settings;
pub use crate::typedef::{Modality, SampleType};
pub use crate::volume::{DecodedVolume, RawLayout, VolumeData};
pub use crate::writer::{write_secondary_capture, write_series};

use std::path::{Path, PathBuf};

/// Convert one Interfile image to DICOM.
///
/// Reads and validates the header at `header_path`, decodes the payload
/// file it names, merges `meta` and writes the resulting series under
/// `output` (a directory basename in per-slice mode, the target file
/// itself in extended mode). Returns the written paths in slice order.
pub fn convert<P, Q>(
    header_path: P,
    meta: &Metadata,
    output: Q,
    extended: bool,
    settings: &Settings,
) -> Result<Vec<PathBuf>>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let header = InterfileHeader::from_file(header_path, settings)?;
    let volume = DecodedVolume::from_interfile(&header)?;
    let plan = compose_series(&header, &volume, meta, extended);
    write_series(&plan, output, settings)
}
