//! A CLI tool for converting CASToR Interfile images to DICOM.
//!
//! Each input header is read, validated and decoded, and its volume is
//! written as one DICOM file per slice under the chosen directory, or
//! as a single whole-volume file with `--extended`. A JSON metadata
//! file can supply the patient and series attributes an Interfile
//! header cannot carry. Failures are reported per input; the remaining
//! inputs are still converted.
use std::path::{Path, PathBuf};

use clap::Parser;
use interfile2dicom::{convert, Metadata, Settings};
use tracing::{error, info, Level};

/// Convert CASToR Interfile images to DICOM series
#[derive(Debug, Parser)]
#[command(version)]
struct App {
    /// Interfile header(s) to convert
    #[arg(short = 'i', long = "input-file", required = true, num_args = 1..)]
    input_files: Vec<PathBuf>,

    /// JSON file with patient and series metadata
    #[arg(short = 'm', long = "meta-file")]
    meta_file: Option<PathBuf>,

    /// Output name(s), one per input
    /// (default is to derive the name from the input file)
    #[arg(short = 'o', long = "output-file", num_args = 1..)]
    output_files: Vec<PathBuf>,

    /// Directory that receives the output
    #[arg(short = 'd', long = "directory", default_value = ".")]
    directory: PathBuf,

    /// Write the whole volume into a single file
    #[arg(long = "extended", overrides_with = "no_extended")]
    extended: bool,

    /// Write one file per slice (default)
    #[arg(long = "no-extended", overrides_with = "extended")]
    no_extended: bool,

    /// Print more information about the conversion
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,
}

fn report<E: 'static>(err: &E)
where
    E: std::error::Error,
{
    eprintln!("[ERROR] {}", err);
    if let Some(source) = err.source() {
        eprintln!();
        eprintln!("Caused by:");
        for (i, e) in std::iter::successors(Some(source), |e| e.source()).enumerate() {
            eprintln!("   {}: {}", i, e);
        }
    }
}

/// Output name for an input header: the file name with its `.hdr`
/// suffix removed, plus `.dcm` in extended mode.
fn derived_output_name(input: &Path, extended: bool) -> PathBuf {
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = name.strip_suffix(".hdr").unwrap_or(&name);
    if extended {
        PathBuf::from(format!("{}.dcm", stem))
    } else {
        PathBuf::from(stem)
    }
}

fn main() {
    let App {
        input_files,
        meta_file,
        output_files,
        directory,
        extended,
        no_extended,
        verbose,
    } = App::parse();

    tracing::subscriber::set_global_default(
        tracing_subscriber::FmtSubscriber::builder()
            .with_max_level(if verbose { Level::DEBUG } else { Level::INFO })
            .finish(),
    )
    .unwrap_or_else(|e| {
        eprintln!("Could not set up global logging subscriber: {}", e);
    });

    let extended = extended && !no_extended;

    if !output_files.is_empty() && output_files.len() != input_files.len() {
        error!(
            "{} output name(s) given for {} input file(s)",
            output_files.len(),
            input_files.len()
        );
        std::process::exit(-1);
    }

    let meta = match &meta_file {
        Some(path) => Metadata::from_file(path).unwrap_or_else(|e| {
            report(&e);
            std::process::exit(-1);
        }),
        None => Metadata::default(),
    };

    let settings = Settings::default();
    let mut failures = 0;
    for (i, input) in input_files.iter().enumerate() {
        let name = output_files
            .get(i)
            .cloned()
            .unwrap_or_else(|| derived_output_name(input, extended));
        let output = directory.join(name);
        match convert(input, &meta, &output, extended, &settings) {
            Ok(written) => {
                info!(
                    "converted {} into {} DICOM file(s)",
                    input.display(),
                    written.len()
                );
            }
            Err(e) => {
                eprintln!("Failed to convert {}:", input.display());
                report(&e);
                failures += 1;
            }
        }
    }

    if failures > 0 {
        error!("{} of {} conversions failed", failures, input_files.len());
        std::process::exit(-2);
    }
}
