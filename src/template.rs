// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Templates: the bitmaps that gate the iteration loop.
//!
//! A template is a square grid of cells, each holding a boolean
//! foreground flag and the RGB colour that was under that cell when the
//! template was last built.  Two templates tile the complex plane in a
//! checkerboard, and the renderer consults whichever one a point's tile
//! parity selects to decide when a pixel's iteration should stop.
//!
//! Templates come from two places.  At startup they are seeded from
//! simple graymap files, where a byte above a luminance threshold counts
//! as foreground.  At runtime they are rebuilt wholesale from a live
//! video frame, classifying each resampled pixel against a previously
//! estimated colour-key range.  Either way a template is replaced as a
//! unit; the renderer never sees one half-built.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use itertools::iproduct;

use errors::Error;
use keying::ColorKeyRange;
use video::{yuv_to_rgb, Frame, Rect, Rgb};

/// Seed bytes strictly above this luminance count as foreground.
pub const FOREGROUND_THRESHOLD: u8 = 80;

/// One square mask-plus-colour bitmap.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Template {
    size: usize,
    mask: Vec<bool>,
    color: Vec<Rgb>,
}

impl Template {
    /// An all-background, all-black template, the state before any seed
    /// file or capture has filled it in.
    pub fn blank(size: usize) -> Template {
        Template {
            size,
            mask: vec![false; size * size],
            color: vec![Rgb::BLACK; size * size],
        }
    }

    /// Load a seed bitmap from a file.  See [`Template::from_seed`].
    pub fn load(path: &Path, size: usize) -> Result<Template, Error> {
        let file = File::open(path)?;
        Template::from_seed(&mut BufReader::new(file), size)
    }

    /// Parse a seed bitmap: three whitespace-separated header lines
    /// (magic, `width height`, maximum value), any of which may be
    /// preceded by `#` comment lines, followed by `size * size` raw
    /// single-channel bytes.  The declared dimensions must match the
    /// configured template resolution exactly.
    ///
    /// The gray value doubles as the colour sample, so gradient
    /// colourization has something to blend before the first live
    /// capture replaces the template.
    pub fn from_seed<R: BufRead>(source: &mut R, size: usize) -> Result<Template, Error> {
        let mut fields = 0;
        let mut dimensions = None;
        while fields < 3 {
            let mut line = String::new();
            if source.read_line(&mut line)? == 0 {
                return Err(Error::TemplateLoad {
                    reason: "header ended early".to_string(),
                });
            }
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            fields += 1;
            if fields == 2 {
                let mut parts = line.split_whitespace();
                let width = parts.next().and_then(|v| v.parse::<usize>().ok());
                let height = parts.next().and_then(|v| v.parse::<usize>().ok());
                dimensions = match (width, height) {
                    (Some(w), Some(h)) => Some((w, h)),
                    _ => {
                        return Err(Error::TemplateLoad {
                            reason: format!("unreadable dimension line {:?}", line),
                        });
                    }
                };
            }
        }

        match dimensions {
            Some((w, h)) if (w, h) == (size, size) => {}
            Some((w, h)) => {
                return Err(Error::TemplateLoad {
                    reason: format!("seed is {}x{}, expected {}x{}", w, h, size, size),
                });
            }
            None => {
                return Err(Error::TemplateLoad {
                    reason: "header carried no dimensions".to_string(),
                });
            }
        }

        let mut raw = vec![0u8; size * size];
        source.read_exact(&mut raw).map_err(|_| Error::TemplateLoad {
            reason: "pixel block truncated".to_string(),
        })?;

        Ok(Template {
            size,
            mask: raw.iter().map(|&v| v > FOREGROUND_THRESHOLD).collect(),
            color: raw.iter().map(|&v| Rgb { r: v, g: v, b: v }).collect(),
        })
    }

    /// Build a template live from a video frame.
    ///
    /// The capture rectangle is resampled onto the template grid with
    /// nearest-neighbour addressing, each sample is classified as
    /// foreground exactly when all three of its channels sit strictly
    /// inside the key range, and the RGB conversion of the sample is
    /// recorded for every cell whether or not it classified as
    /// foreground.  Repeated calls with the same inputs produce
    /// bit-identical templates.
    pub fn capture(
        frame: &Frame,
        region: Rect,
        range: &ColorKeyRange,
        size: usize,
    ) -> Result<Template, Error> {
        region.validate(frame)?;
        let mut template = Template::blank(size);
        for (ty, tx) in iproduct!(0..size, 0..size) {
            let sx = region.left + tx * region.width / size;
            let sy = region.top + ty * region.height / size;
            let yuv = frame.yuv_at(sx, sy);
            let cell = ty * size + tx;
            template.mask[cell] = range.contains(yuv);
            template.color[cell] = yuv_to_rgb(yuv);
        }
        Ok(template)
    }

    /// Cells per side.
    pub fn size(&self) -> usize {
        self.size
    }

    /// The foreground flag at a cell.
    pub fn foreground(&self, x: usize, y: usize) -> bool {
        self.mask[y * self.size + x]
    }

    /// The colour sample at a cell.
    pub fn sample(&self, x: usize, y: usize) -> Rgb {
        self.color[y * self.size + x]
    }

    /// The mask flattened to one 0/255 byte per cell, ready for graymap
    /// export.  Exported masks reload as the same mask, since 255 clears
    /// the foreground threshold and 0 does not.
    pub fn mask_bytes(&self) -> Vec<u8> {
        self.mask.iter().map(|&fg| if fg { 255 } else { 0 }).collect()
    }

    /// The colour plane flattened to RGB triples, for pixmap export.
    pub fn color_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.color.len() * 3);
        for sample in &self.color {
            bytes.push(sample.r);
            bytes.push(sample.g);
            bytes.push(sample.b);
        }
        bytes
    }
}
