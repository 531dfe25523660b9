extern crate clap;
extern crate num;
extern crate num_cpus;
extern crate shadowbrot;

use clap::{App, Arg, ArgMatches};
use num::Complex;
use std::path::Path;
use std::process;
use std::str::FromStr;
use std::time::{Duration, Instant};

use shadowbrot::errors::Error;
use shadowbrot::export;
use shadowbrot::fractal::{Evaluator, MapFamily, Palette, RenderSettings};
use shadowbrot::template::Template;
use shadowbrot::video::Rgb;

/// Given a string and a separator, returns the two values separated by
/// the separator.
fn parse_pair<T: FromStr>(s: &str, separator: char) -> Option<(T, T)> {
    match s.find(separator) {
        None => None,
        Some(index) => match (T::from_str(&s[..index]), T::from_str(&s[index + 1..])) {
            (Ok(l), Ok(r)) => Some((l, r)),
            _ => None,
        },
    }
}

/// A specific implementation of parse_pair using a comma and expecting
/// floating point numbers.
fn parse_complex(s: &str) -> Option<Complex<f64>> {
    match parse_pair(s, ',') {
        Some((re, im)) => Some(Complex { re, im }),
        None => None,
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

const TEMPLATES: &str = "templates";
const OUTPUT: &str = "output";
const SIZE: &str = "size";
const TEMPLATE_SIZE: &str = "template-size";
const CURSOR: &str = "cursor";
const SCALE: &str = "scale";
const PALETTE: &str = "palette";
const FUNCTION: &str = "function";
const INVERT: &str = "invert";
const REVERSE: &str = "reverse";
const ITERATIONS: &str = "iterations";
const BUDGET: &str = "budget";
const THREADS: &str = "threads";

fn args<'a>() -> ArgMatches<'a> {
    let max_threads = num_cpus::get();

    App::new("shadowbrot")
        .version("0.1.0")
        .about("Template-keyed escape-time renderer")
        .arg(
            Arg::with_name(TEMPLATES)
                .required(true)
                .multiple(true)
                .min_values(2)
                .max_values(2)
                .help("Two template seed images (raw graymap)"),
        )
        .arg(
            Arg::with_name(OUTPUT)
                .required(true)
                .long(OUTPUT)
                .short("o")
                .takes_value(true)
                .help("Output PPM file"),
        )
        .arg(
            Arg::with_name(SIZE)
                .required(false)
                .long(SIZE)
                .short("s")
                .takes_value(true)
                .default_value("1920x1080")
                .validator(|s| validate_pair::<usize>(&s, 'x', "Could not parse frame size"))
                .help("Size of the rendered frame"),
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
                .help("Template resolution the seed files must match"),
        )
        .arg(
            Arg::with_name(CURSOR)
                .required(false)
                .long(CURSOR)
                .short("x")
                .takes_value(true)
                .allow_hyphen_values(true)
                .default_value("-0.4,0.1")
                .validator(|s| validate_pair::<f64>(&s, ',', "Could not parse cursor point"))
                .help("Cursor point feeding the map coefficients"),
        )
        .arg(
            Arg::with_name(SCALE)
                .required(false)
                .long(SCALE)
                .takes_value(true)
                .default_value("0.005")
                .validator(|s| match f64::from_str(&s) {
                    Ok(v) if v > 0.0 => Ok(()),
                    Ok(_) => Err("Scale must be positive".to_string()),
                    Err(_) => Err("Could not parse scale".to_string()),
                })
                .help("Scale from pixel offsets to the complex seed"),
        )
        .arg(
            Arg::with_name(PALETTE)
                .required(false)
                .long(PALETTE)
                .short("c")
                .takes_value(true)
                .default_value("0")
                .validator(|s| {
                    validate_range(
                        &s,
                        0,
                        4,
                        "Could not parse palette index",
                        "Palette index must be between 0 and 4",
                    )
                })
                .help("Colour mode 0-4"),
        )
        .arg(
            Arg::with_name(FUNCTION)
                .required(false)
                .long(FUNCTION)
                .short("f")
                .takes_value(true)
                .default_value("0")
                .validator(|s| {
                    validate_range(
                        &s,
                        0,
                        4,
                        "Could not parse function index",
                        "Function index must be between 0 and 4",
                    )
                })
                .help("Map preset 0-4"),
        )
        .arg(
            Arg::with_name(INVERT)
                .required(false)
                .long(INVERT)
                .short("i")
                .help("Complement every output channel"),
        )
        .arg(
            Arg::with_name(REVERSE)
                .required(false)
                .long(REVERSE)
                .short("r")
                .help("Stop orbits on foreground cells instead of background ones"),
        )
        .arg(
            Arg::with_name(ITERATIONS)
                .required(false)
                .long(ITERATIONS)
                .short("n")
                .takes_value(true)
                .default_value("25")
                .validator(|s| {
                    validate_range(
                        &s,
                        1,
                        500,
                        "Could not parse iteration count",
                        "Iteration count must be between 1 and 500",
                    )
                })
                .help("Iteration ceiling per pixel"),
        )
        .arg(
            Arg::with_name(BUDGET)
                .required(false)
                .long(BUDGET)
                .takes_value(true)
                .default_value("5000")
                .validator(|s| {
                    validate_range(
                        &s,
                        1,
                        600_000,
                        "Could not parse frame budget",
                        "Frame budget must be between 1 and 600000 milliseconds",
                    )
                })
                .help("Wall-clock frame budget in milliseconds"),
        )
        .arg(
            Arg::with_name(THREADS)
                .required(false)
                .long(THREADS)
                .short("t")
                .takes_value(true)
                .default_value("1")
                .validator(move |s| {
                    validate_range(
                        &s,
                        1,
                        max_threads,
                        "Could not parse thread count",
                        &format!("Thread count must be between 1 and {}", max_threads),
                    )
                })
                .help("Number of scanline bands to render in parallel"),
        )
        .get_matches()
}

fn load_pair(paths: &[&str], size: usize) -> Result<[Template; 2], Error> {
    Ok([
        Template::load(Path::new(paths[0]), size)?,
        Template::load(Path::new(paths[1]), size)?,
    ])
}

fn main() {
    let matches = args();
    let (width, height) = parse_pair(matches.value_of(SIZE).unwrap(), 'x')
        .expect("Error parsing frame size");
    let template_size = usize::from_str(matches.value_of(TEMPLATE_SIZE).unwrap())
        .expect("Error parsing template size");
    let cursor = parse_complex(matches.value_of(CURSOR).unwrap())
        .expect("Error parsing cursor point");
    let scale = f64::from_str(matches.value_of(SCALE).unwrap()).expect("Error parsing scale");
    let palette = usize::from_str(matches.value_of(PALETTE).unwrap())
        .ok()
        .and_then(Palette::from_index)
        .expect("Error parsing palette index");
    let family = usize::from_str(matches.value_of(FUNCTION).unwrap())
        .ok()
        .and_then(MapFamily::from_index)
        .expect("Error parsing function index");
    let iterations = usize::from_str(matches.value_of(ITERATIONS).unwrap())
        .expect("Error parsing iteration count");
    let budget = u64::from_str(matches.value_of(BUDGET).unwrap())
        .expect("Error parsing frame budget");
    let threads = usize::from_str(matches.value_of(THREADS).unwrap())
        .expect("Error parsing thread count");

    let paths: Vec<&str> = matches.values_of(TEMPLATES).unwrap().collect();
    let templates = match load_pair(&paths, template_size) {
        Ok(templates) => templates,
        Err(e) => {
            eprintln!("template load failed: {}", e);
            process::exit(1);
        }
    };

    let evaluator = Evaluator::new(width, height, iterations, Duration::from_millis(budget));
    let settings = RenderSettings {
        scale,
        palette,
        family,
        invert: matches.is_present(INVERT),
        reverse: matches.is_present(REVERSE),
    };

    let mut pixels = vec![Rgb::BLACK; width * height];
    let frame_start = Instant::now();
    let rows = if threads > 1 {
        evaluator.render_banded(&templates, &settings, cursor, &mut pixels, threads)
    } else {
        evaluator.render(&templates, &settings, cursor, &mut pixels)
    };
    eprintln!(
        "frame time: {} ms, {} of {} scanline pairs",
        frame_start.elapsed().as_millis(),
        rows,
        (height + 1) / 2
    );

    if let Err(e) = export::write_ppm(
        Path::new(matches.value_of(OUTPUT).unwrap()),
        &pixels,
        width,
        height,
    ) {
        eprintln!("snapshot failed: {}", e);
        process::exit(1);
    }
}
