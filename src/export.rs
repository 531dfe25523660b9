//! Snapshot output.
//!
//! Everything leaves the program as a binary PNM dump: the rendered
//! frame as a pixmap, a template's mask as a graymap, and a template's
//! captured colours as a pixmap.  Exported masks round-trip through the
//! seed loader.

use std::fs::File;
use std::io;
use std::path::Path;

use image::pnm::{PNMEncoder, PNMSubtype, SampleEncoding};
use image::ColorType;

use errors::Error;
use template::Template;
use video::Rgb;

/// Write a rendered pixel buffer as a binary PPM.
pub fn write_ppm(path: &Path, pixels: &[Rgb], width: usize, height: usize) -> Result<(), Error> {
    let mut flat = Vec::with_capacity(pixels.len() * 3);
    for pixel in pixels {
        flat.push(pixel.r);
        flat.push(pixel.g);
        flat.push(pixel.b);
    }
    let output = File::create(path)?;
    let mut encoder =
        PNMEncoder::new(output).with_subtype(PNMSubtype::Pixmap(SampleEncoding::Binary));
    encoder
        .encode(&flat[..], width as u32, height as u32, ColorType::RGB(8))
        .map_err(io::Error::from)?;
    Ok(())
}

/// Write a template's mask as a binary PGM, foreground as 255.
pub fn write_mask_pgm(path: &Path, template: &Template) -> Result<(), Error> {
    let output = File::create(path)?;
    let mut encoder =
        PNMEncoder::new(output).with_subtype(PNMSubtype::Graymap(SampleEncoding::Binary));
    let bytes = template.mask_bytes();
    let side = template.size() as u32;
    encoder
        .encode(&bytes[..], side, side, ColorType::Gray(8))
        .map_err(io::Error::from)?;
    Ok(())
}

/// Write a template's colour plane as a binary PPM, a preview of what
/// the gradient palette will blend from.
pub fn write_color_ppm(path: &Path, template: &Template) -> Result<(), Error> {
    let output = File::create(path)?;
    let mut encoder =
        PNMEncoder::new(output).with_subtype(PNMSubtype::Pixmap(SampleEncoding::Binary));
    let bytes = template.color_bytes();
    let side = template.size() as u32;
    encoder
        .encode(&bytes[..], side, side, ColorType::RGB(8))
        .map_err(io::Error::from)?;
    Ok(())
}
