//! A CLI tool for wrapping raw binary images in DICOM secondary
//! capture files.
//!
//! The image geometry is not read from any header; width, height and
//! frame count are given on the command line together with the sample
//! encoding. `--test2d` and `--test3d` write built-in gradient images
//! instead, which is handy for checking a viewer setup.
use std::path::PathBuf;

use byteordered::Endianness;
use clap::{Parser, ValueEnum};
use interfile2dicom::volume::Rescale;
use interfile2dicom::{
    write_secondary_capture, DecodedVolume, RawLayout, SampleType, Settings, VolumeData,
};
use ndarray::Array3;
use tracing::{error, Level};

/// Wrap a raw binary image in a DICOM secondary capture file
#[derive(Debug, Parser)]
#[command(version)]
struct App {
    /// Raw binary image to convert
    #[arg(required_unless_present_any = ["test2d", "test3d"])]
    input: Option<PathBuf>,

    /// Path of the DICOM file to write
    #[arg(required_unless_present_any = ["test2d", "test3d"])]
    output: Option<PathBuf>,

    /// Image width in pixels
    #[arg(required_unless_present_any = ["test2d", "test3d"])]
    width: Option<u32>,

    /// Image height in pixels
    #[arg(required_unless_present_any = ["test2d", "test3d"])]
    height: Option<u32>,

    /// Number of frames in the file
    #[arg(required_unless_present_any = ["test2d", "test3d"])]
    frames: Option<u32>,

    /// Bytes per pixel
    #[arg(short = 'b', long = "bytes-per-pixel", default_value = "2")]
    bytes_per_pixel: u32,

    /// Treat the samples as signed integers
    #[arg(long = "signed")]
    signed: bool,

    /// Byte order of the samples
    #[arg(long = "byte-order", value_enum, default_value = "system")]
    byte_order: ByteOrderArg,

    /// Write a built-in 2D gradient image to `pretty2d.dcm`
    #[arg(long = "test2d")]
    test2d: bool,

    /// Write a built-in 3D gradient image to `pretty3d.dcm`
    #[arg(long = "test3d")]
    test3d: bool,

    /// Print more information about the conversion
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ByteOrderArg {
    /// Least significant byte first
    Little,
    /// Most significant byte first
    Big,
    /// Whatever this machine uses
    System,
}

impl ByteOrderArg {
    fn resolve(self) -> Endianness {
        match self {
            ByteOrderArg::Little => Endianness::Little,
            ByteOrderArg::Big => Endianness::Big,
            ByteOrderArg::System => Endianness::native(),
        }
    }
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

/// A tiling of a 16x16 gradient plane, 64x64 pixels per frame.
fn gradient_volume(frames: usize) -> DecodedVolume {
    let mut samples = Vec::with_capacity(frames * 64 * 64);
    for _ in 0..frames {
        for row in 0..64u16 {
            for col in 0..64 {
                samples.push(((row % 16) + (col % 16)) * 16);
            }
        }
    }
    DecodedVolume {
        data: VolumeData::U16(
            Array3::from_shape_vec((frames, 64, 64), samples)
                .expect("Inconsistent gradient shape"),
        ),
        rescale: Rescale::identity(),
        byte_order: Endianness::native(),
    }
}

fn main() {
    let App {
        input,
        output,
        width,
        height,
        frames,
        bytes_per_pixel,
        signed,
        byte_order,
        test2d,
        test3d,
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

    let settings = Settings::default();

    if test2d || test3d {
        let (volume, path) = if test2d {
            (gradient_volume(1), PathBuf::from("pretty2d.dcm"))
        } else {
            (gradient_volume(4), PathBuf::from("pretty3d.dcm"))
        };
        if let Err(e) = write_secondary_capture(&volume, &path, &settings) {
            report(&e);
            std::process::exit(-2);
        }
        return;
    }

    let (input, output, width, height, frames) = match (input, output, width, height, frames) {
        (Some(i), Some(o), Some(w), Some(h), Some(f)) => (i, o, w, h, f),
        _ => {
            error!("an input, an output and the three image extents are required");
            std::process::exit(-1);
        }
    };

    let format = if signed {
        "signed integer"
    } else {
        "unsigned integer"
    };
    let sample_type = SampleType::from_format(format, bytes_per_pixel).unwrap_or_else(|e| {
        report(&e);
        std::process::exit(-1);
    });
    let layout = RawLayout {
        width,
        height,
        frames,
        sample_type,
        byte_order: byte_order.resolve(),
    };

    let volume = DecodedVolume::from_raw_file(&input, &layout).unwrap_or_else(|e| {
        report(&e);
        std::process::exit(-1);
    });
    if let Err(e) = write_secondary_capture(&volume, &output, &settings) {
        report(&e);
        std::process::exit(-2);
    }
}

#[cfg(test)]
mod tests {
    use super::{gradient_volume, App, ByteOrderArg};
    use byteordered::Endianness;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        App::command().debug_assert();
    }

    #[test]
    fn gradient_tiles_a_sixteen_step_ramp() {
        let volume = gradient_volume(4);
        assert_eq!(volume.data.dim(), (4, 64, 64));
        let samples = match &volume.data {
            interfile2dicom::VolumeData::U16(a) => a,
            other => panic!("unexpected storage: {:?}", other),
        };
        assert_eq!(samples[[0, 0, 0]], 0);
        assert_eq!(samples[[0, 5, 7]], 192);
        // the pattern repeats every 16 pixels
        assert_eq!(samples[[0, 20, 3]], 112);
        assert_eq!(samples[[3, 15, 15]], 480);
    }

    #[test]
    fn byte_order_argument_resolves() {
        assert_eq!(ByteOrderArg::Little.resolve(), Endianness::Little);
        assert_eq!(ByteOrderArg::Big.resolve(), Endianness::Big);
        assert_eq!(ByteOrderArg::System.resolve(), Endianness::native());
    }
}
