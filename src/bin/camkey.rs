//! Colour-key calibration tool.
//!
//! Reads raw packed-4:2:2 frames from stdin or from an ffmpeg child
//! process, estimates the backdrop's key range over a capture
//! rectangle, cuts a template out of the last frame read, and writes
//! the mask (and optionally the colour plane) to disk.  A short read
//! from the source is fatal, never retried.

extern crate clap;
extern crate shadowbrot;

use clap::{App, Arg, ArgMatches};
use std::io::{self, Read};
use std::path::Path;
use std::process::{self, ChildStdout, Command, Stdio};
use std::str::FromStr;

use shadowbrot::errors::Error;
use shadowbrot::export;
use shadowbrot::keying::ColorKeyRange;
use shadowbrot::template::Template;
use shadowbrot::video::{Frame, Rect};

fn parse_pair<T: FromStr>(s: &str, separator: char) -> Option<(T, T)> {
    match s.find(separator) {
        None => None,
        Some(index) => match (T::from_str(&s[..index]), T::from_str(&s[index + 1..])) {
            (Ok(l), Ok(r)) => Some((l, r)),
            _ => None,
        },
    }
}

fn validate_pair<T: FromStr>(s: &str, separator: char, err: &str) -> Result<(), String> {
    match parse_pair::<T>(s, separator) {
        Some(_) => Ok(()),
        None => Err(err.to_string()),
    }
}

fn validate_range<T: FromStr + Ord>(
    s: &str,
    low: T,
    high: T,
    isnotanumber_err: &str,
    isnotinrange_err: &str,
) -> Result<(), String> {
    match T::from_str(s) {
        Ok(i) => {
            if i >= low && i <= high {
                Ok(())
            } else {
                Err(isnotinrange_err.to_string())
            }
        }
        Err(_) => Err(isnotanumber_err.to_string()),
    }
}

const SIZE: &str = "size";
const ORIGIN: &str = "origin";
const EXTENT: &str = "extent";
const TOLERANCE: &str = "tolerance";
const TEMPLATE_SIZE: &str = "template-size";
const FRAMES: &str = "frames";
const DEVICE: &str = "device";
const SYNTHETIC: &str = "synthetic";
const MASK: &str = "mask";
const PREVIEW: &str = "preview";

fn args<'a>() -> ArgMatches<'a> {
    App::new("camkey")
        .version("0.1.0")
        .about("Colour-key calibration and template capture")
        .arg(
            Arg::with_name(MASK)
                .required(true)
                .long(MASK)
                .short("m")
                .takes_value(true)
                .help("Output graymap for the captured mask"),
        )
        .arg(
            Arg::with_name(PREVIEW)
                .required(false)
                .long(PREVIEW)
                .short("p")
                .takes_value(true)
                .help("Optional output pixmap for the captured colours"),
        )
        .arg(
            Arg::with_name(SIZE)
                .required(false)
                .long(SIZE)
                .short("s")
                .takes_value(true)
                .default_value("640x480")
                .validator(|s| match parse_pair::<usize>(&s, 'x') {
                    Some((w, _)) if w % 2 == 0 => Ok(()),
                    Some(_) => Err("Video width must be even; chroma comes in pairs".to_string()),
                    None => Err("Could not parse video size".to_string()),
                })
                .help("Video frame size"),
        )
        .arg(
            Arg::with_name(ORIGIN)
                .required(false)
                .long(ORIGIN)
                .takes_value(true)
                .default_value("0,0")
                .validator(|s| validate_pair::<usize>(&s, ',', "Could not parse capture origin"))
                .help("Top-left corner of the capture rectangle"),
        )
        .arg(
            Arg::with_name(EXTENT)
                .required(false)
                .long(EXTENT)
                .takes_value(true)
                .validator(|s| validate_pair::<usize>(&s, 'x', "Could not parse capture extent"))
                .help("Size of the capture rectangle (default: the rest of the frame)"),
        )
        .arg(
            Arg::with_name(TOLERANCE)
                .required(false)
                .long(TOLERANCE)
                .takes_value(true)
                .default_value("20")
                .validator(|s| {
                    validate_range(
                        &s,
                        0,
                        128,
                        "Could not parse tolerance",
                        "Tolerance must be between 0 and 128",
                    )
                })
                .help("Margin added to the observed channel intervals"),
        )
        .arg(
            Arg::with_name(TEMPLATE_SIZE)
                .required(false)
                .long(TEMPLATE_SIZE)
                .takes_value(true)
                .default_value("1024")
                .validator(|s| {
                    validate_range(
                        &s,
                        2,
                        4096,
                        "Could not parse template size",
                        "Template size must be between 2 and 4096",
                    )
                })
                .help("Template resolution to resample onto"),
        )
        .arg(
            Arg::with_name(FRAMES)
                .required(false)
                .long(FRAMES)
                .short("n")
                .takes_value(true)
                .default_value("1")
                .validator(|s| {
                    validate_range(
                        &s,
                        1,
                        1000,
                        "Could not parse frame count",
                        "Frame count must be between 1 and 1000",
                    )
                })
                .help("Frames to read before capturing; the camera needs a moment to settle"),
        )
        .arg(
            Arg::with_name(DEVICE)
                .required(false)
                .long(DEVICE)
                .short("d")
                .takes_value(true)
                .help("Video device to decode via ffmpeg (default: raw frames on stdin)"),
        )
        .arg(
            Arg::with_name(SYNTHETIC)
                .required(false)
                .long(SYNTHETIC)
                .conflicts_with(DEVICE)
                .help("Use the built-in test pattern instead of a video source"),
        )
        .get_matches()
}

fn spawn_decoder(device: &str, width: usize, height: usize) -> Result<ChildStdout, Error> {
    eprintln!("opening {} via ffmpeg", device);
    let child = Command::new("ffmpeg")
        .arg("-loglevel")
        .arg("quiet")
        .arg("-i")
        .arg(device)
        .arg("-f")
        .arg("rawvideo")
        .arg("-pix_fmt")
        .arg("yuyv422")
        .arg("-s")
        .arg(format!("{}x{}", width, height))
        .arg("-")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .spawn()?;
    child
        .stdout
        .ok_or_else(|| Error::Io(io::Error::new(io::ErrorKind::Other, "decoder has no stdout")))
}

fn run(matches: &ArgMatches) -> Result<(), Error> {
    let (width, height): (usize, usize) =
        parse_pair(matches.value_of(SIZE).unwrap(), 'x').expect("Error parsing video size");
    let (left, top) =
        parse_pair(matches.value_of(ORIGIN).unwrap(), ',').expect("Error parsing capture origin");
    let (region_width, region_height) = match matches.value_of(EXTENT) {
        Some(extent) => parse_pair(extent, 'x').expect("Error parsing capture extent"),
        None => (
            width.saturating_sub(left),
            height.saturating_sub(top),
        ),
    };
    let region = Rect {
        left,
        top,
        width: region_width,
        height: region_height,
    };
    let tolerance = u8::from_str(matches.value_of(TOLERANCE).unwrap())
        .expect("Error parsing tolerance");
    let template_size = usize::from_str(matches.value_of(TEMPLATE_SIZE).unwrap())
        .expect("Error parsing template size");
    let frames = usize::from_str(matches.value_of(FRAMES).unwrap())
        .expect("Error parsing frame count");

    let frame = if matches.is_present(SYNTHETIC) {
        eprintln!("using the built-in test pattern");
        Frame::test_pattern(width, height)
    } else {
        let mut source: Box<Read> = match matches.value_of(DEVICE) {
            Some(device) => Box::new(spawn_decoder(device, width, height)?),
            None => Box::new(io::stdin()),
        };
        let mut frame = Frame::read_from(&mut source, width, height)?;
        for _ in 1..frames {
            frame = Frame::read_from(&mut source, width, height)?;
        }
        frame
    };

    let range = ColorKeyRange::estimate(&frame, region, tolerance)?;
    eprintln!("key range: {}", range);

    let template = Template::capture(&frame, region, &range, template_size)?;
    export::write_mask_pgm(Path::new(matches.value_of(MASK).unwrap()), &template)?;
    if let Some(preview) = matches.value_of(PREVIEW) {
        export::write_color_ppm(Path::new(preview), &template)?;
    }
    Ok(())
}

fn main() {
    let matches = args();
    if let Err(e) = run(&matches) {
        eprintln!("camkey: {}", e);
        process::exit(1);
    }
}
