// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The escape-time evaluation engine.
//!
//! Every pixel seeds a point on the complex plane and the rational map
//! `z = (a*z^2 + c) / (b*z^2 + d)` is applied to it over and over.  What
//! makes the images interesting is the stopping rule: before each
//! application the current value is projected back into a tiled template
//! space, and the bitmap cell it lands on decides whether the loop ends
//! there.  The number of steps survived picks the pixel's colour.
//!
//! The plane is tiled with the two templates in a checkerboard, selected
//! by the parity of the tile index sum, so a captured silhouette repeats
//! across the whole image interleaved with its partner.  The first two
//! iterations never exit; without that warm-up every seed would escape
//! on its own cell and the image would collapse into the template
//! itself.
//!
//! The map has poles, and a point that rides through one comes out
//! non-finite.  That is not an error.  A non-finite value can no longer
//! land on any template cell, so the probe is skipped and the point just
//! runs out its full iteration budget.
//!
//! A frame also has a wall-clock budget.  The clock is snapshotted once
//! at entry and checked before every scanline pair; when the budget is
//! gone the render returns immediately and whatever rows were not
//! reached simply keep the contents the caller's buffer already had.
//! Callers reuse one buffer across frames, so a slow frame shows stale
//! rows rather than a hole.

extern crate crossbeam;

use std::time::{Duration, Instant};

use num::{clamp, Complex};

use template::Template;
use video::Rgb;

/// Iteration ceiling per pixel.
pub const MAX_ITERATIONS: usize = 25;

/// Wall-clock budget for one frame.
pub const FRAME_BUDGET: Duration = Duration::from_millis(5000);

/// Iterations that run before the early-exit rule arms.
const WARM_UP: usize = 2;

/// The fixed second coefficient the `Basin` and `Mirror` presets lean
/// on.  The cursor supplies the other one.
pub const ANCHOR: Complex<f64> = Complex {
    re: -0.625,
    im: -0.4,
};

/// The four coefficients of the iterated map.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct MapParams {
    /// Numerator coefficient on `z^2`.
    pub a: Complex<f64>,
    /// Denominator coefficient on `z^2`.
    pub b: Complex<f64>,
    /// Numerator constant.
    pub c: Complex<f64>,
    /// Denominator constant.
    pub d: Complex<f64>,
}

/// Named presets deriving the coefficient tuple from the cursor point.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MapFamily {
    /// `(z^2 + c1) / z^2`, a pole pinned at the origin.
    Pole,
    /// `(z^2 - c1) / (z^2 - c2)`, the pole wanders with the anchor.
    Basin,
    /// `(z^2 + c1) / (c1 * z^2)`, blobs and dust.
    Dust,
    /// `z^2 + c1`, the classic quadratic.
    Classic,
    /// `c1 / (z^2 + c2)`, the quadratic turned inside out.
    Mirror,
}

impl MapFamily {
    /// Preset by cycling index, the order the interactive controls step
    /// through.
    pub fn from_index(index: usize) -> Option<MapFamily> {
        match index {
            0 => Some(MapFamily::Pole),
            1 => Some(MapFamily::Basin),
            2 => Some(MapFamily::Dust),
            3 => Some(MapFamily::Classic),
            4 => Some(MapFamily::Mirror),
            _ => None,
        }
    }

    /// Derive the coefficient tuple from the cursor point.  Recomputed
    /// every frame; nothing here persists.
    pub fn params(self, cursor: Complex<f64>) -> MapParams {
        let one = Complex::new(1.0, 0.0);
        let zero = Complex::new(0.0, 0.0);
        match self {
            MapFamily::Pole => MapParams {
                a: one,
                b: one,
                c: cursor,
                d: zero,
            },
            MapFamily::Basin => MapParams {
                a: one,
                b: one,
                c: -cursor,
                d: -ANCHOR,
            },
            MapFamily::Dust => MapParams {
                a: one,
                b: cursor,
                c: cursor,
                d: zero,
            },
            MapFamily::Classic => MapParams {
                a: one,
                b: zero,
                c: cursor,
                d: one,
            },
            MapFamily::Mirror => MapParams {
                a: zero,
                b: one,
                c: cursor,
                d: ANCHOR,
            },
        }
    }
}

/// The colour mappings the interactive controls cycle through.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Palette {
    /// White with phased RGB bands cut into it.
    Banded,
    /// Alternating red/green two-tone.
    Duotone,
    /// Two-tone with a blue accent on the even counts.
    BlueAccent,
    /// Plain luminance ramp.
    Grayscale,
    /// Blend from the template's captured colour to its complement.
    Gradient,
}

impl Palette {
    /// Palette by cycling index.
    pub fn from_index(index: usize) -> Option<Palette> {
        match index {
            0 => Some(Palette::Banded),
            1 => Some(Palette::Duotone),
            2 => Some(Palette::BlueAccent),
            3 => Some(Palette::Grayscale),
            4 => Some(Palette::Gradient),
            _ => None,
        }
    }
}

/// Per-frame render knobs.  The caller rebuilds this from its input
/// state every frame and passes it in; the evaluator holds no mutable
/// settings of its own.
#[derive(Copy, Clone, Debug)]
pub struct RenderSettings {
    /// Scale from pixel offsets to the complex seed.
    pub scale: f64,
    /// Which colour mapping to apply.
    pub palette: Palette,
    /// Which map preset to derive coefficients from.
    pub family: MapFamily,
    /// Complement every output channel.
    pub invert: bool,
    /// Flip the early-exit rule: stop on foreground cells instead of
    /// background ones.
    pub reverse: bool,
}

/// Project a point into template space: scale, floor, wrap.  Returns
/// which template the tile checkerboard selects plus the cell inside
/// it, or `None` when the point is non-finite and lands nowhere.
fn probe(size: usize, z: Complex<f64>) -> Option<(usize, usize, usize)> {
    if !z.re.is_finite() || !z.im.is_finite() {
        return None;
    }
    let span = size as i64;
    let tx = (size as f64 * (0.5 + 0.25 * z.re)).floor() as i64;
    let ty = (size as f64 * (0.5 + 0.25 * z.im)).floor() as i64;
    let which = (tx.div_euclid(span) + ty.div_euclid(span)).rem_euclid(2) as usize;
    Some((
        which,
        tx.rem_euclid(span) as usize,
        ty.rem_euclid(span) as usize,
    ))
}

/// Iterate one seed to its stopping count.
///
/// Returns the count together with the colour sample of the last
/// template cell the trajectory was seen on, which is what the gradient
/// palette blends from.  The count is the iteration at which the exit
/// rule fired, or `limit` when it never did.
pub fn escape(
    templates: &[Template; 2],
    params: MapParams,
    reverse: bool,
    z0: Complex<f64>,
    limit: usize,
) -> (usize, Rgb) {
    let size = templates[0].size();
    let mut z = z0;
    let mut sample = Rgb::BLACK;
    for n in 0..limit {
        if let Some((which, tx, ty)) = probe(size, z) {
            sample = templates[which].sample(tx, ty);
            if n >= WARM_UP {
                let hit = templates[which].foreground(tx, ty);
                if (reverse && hit) || (!reverse && !hit) {
                    return (n, sample);
                }
            }
        }
        let zz = z * z;
        z = (params.a * zz + params.c) / (params.b * zz + params.d);
    }
    (limit, sample)
}

/// Map a stopping count to a colour.  Pure: the same inputs always give
/// the same RGB.
pub fn shade(n: usize, limit: usize, palette: Palette, invert: bool, sample: Rgb) -> Rgb {
    let v = clamp(10 * n, 0, 255) as u8;
    let (r, g, b) = match palette {
        Palette::Banded => {
            let (mut r, mut g, mut b) = (255u8, 255u8, 255u8);
            if n % 6 < 3 {
                r = v;
            }
            if (n + 2) % 6 < 3 {
                g = v;
            }
            if (n + 4) % 6 < 3 {
                b = v;
            }
            (r, g, b)
        }
        Palette::Duotone => {
            if n % 2 == 1 {
                (v, 255, 255)
            } else {
                (255, v, 255)
            }
        }
        Palette::BlueAccent => {
            if n % 2 == 1 {
                (v, v, 255)
            } else {
                (255, 255, v)
            }
        }
        Palette::Grayscale => (v, v, v),
        Palette::Gradient => {
            let t = n as f64 / limit as f64;
            let blend = |s: u8| (f64::from(s) * (1.0 - t) + f64::from(255 - s) * t).round() as u8;
            (blend(sample.r), blend(sample.g), blend(sample.b))
        }
    };
    let colour = Rgb { r, g, b };
    if invert {
        colour.complement()
    } else {
        colour
    }
}

/// The frame renderer.  Construction injects every sizing constant;
/// rendering is then a pure function of the templates, the settings,
/// the cursor, and the buffer handed in.
#[derive(Debug)]
pub struct Evaluator {
    width: usize,
    height: usize,
    limit: usize,
    budget: Duration,
}

impl Evaluator {
    /// An evaluator for `width` by `height` frames with an explicit
    /// iteration ceiling (must be nonzero) and wall-clock budget.
    pub fn new(width: usize, height: usize, limit: usize, budget: Duration) -> Evaluator {
        Evaluator {
            width,
            height,
            limit,
            budget,
        }
    }

    /// An evaluator with the reference iteration ceiling and budget.
    pub fn with_defaults(width: usize, height: usize) -> Evaluator {
        Evaluator::new(width, height, MAX_ITERATIONS, FRAME_BUDGET)
    }

    fn pixel_colour(
        &self,
        templates: &[Template; 2],
        settings: &RenderSettings,
        params: MapParams,
        x: usize,
        y: usize,
    ) -> Rgb {
        let z0 = Complex::new(
            settings.scale * (x as f64 - (self.width / 2) as f64),
            settings.scale * (y as f64 - (self.height / 2) as f64),
        );
        let (n, sample) = escape(templates, params, settings.reverse, z0, self.limit);
        shade(n, self.limit, settings.palette, settings.invert, sample)
    }

    /// Render one frame into `pixels`, exploiting point symmetry: only
    /// the top half (plus the centre row when the height is odd) is
    /// computed, and each colour is written to both the pixel and its
    /// 180-degree twin.  Returns how many scanline pairs were finished
    /// before the budget ran out; untouched rows keep whatever the
    /// buffer held before the call.
    pub fn render(
        &self,
        templates: &[Template; 2],
        settings: &RenderSettings,
        cursor: Complex<f64>,
        pixels: &mut [Rgb],
    ) -> usize {
        assert_eq!(pixels.len(), self.width * self.height);
        assert_eq!(templates[0].size(), templates[1].size());
        let start = Instant::now();
        let params = settings.family.params(cursor);
        let rows = (self.height + 1) / 2;
        for y in 0..rows {
            if start.elapsed() >= self.budget {
                return y;
            }
            for x in 0..self.width {
                let colour = self.pixel_colour(templates, settings, params, x, y);
                pixels[y * self.width + x] = colour;
                pixels[(self.height - 1 - y) * self.width + (self.width - 1 - x)] = colour;
            }
        }
        rows
    }

    /// Render with the top-half scanlines split into per-thread bands.
    ///
    /// Each band renders into its own disjoint slice of a staging area,
    /// so no locking is needed; the mirror writes happen after the
    /// threads join.  All bands share the single clock snapshot taken at
    /// entry.  A finished frame is pixel-for-pixel identical to what
    /// [`Evaluator::render`] produces, and a budget-cut frame still
    /// never tears a row.
    pub fn render_banded(
        &self,
        templates: &[Template; 2],
        settings: &RenderSettings,
        cursor: Complex<f64>,
        pixels: &mut [Rgb],
        threads: usize,
    ) -> usize {
        assert!(threads > 0);
        assert_eq!(pixels.len(), self.width * self.height);
        assert_eq!(templates[0].size(), templates[1].size());
        let start = Instant::now();
        let params = settings.family.params(cursor);
        let rows = (self.height + 1) / 2;
        let band = rows / threads + 1;
        let width = self.width;

        let mut staging = vec![Rgb::BLACK; rows * width];
        let done: Vec<usize> = crossbeam::scope(|spawner| {
            let handles: Vec<_> = staging
                .chunks_mut(band * width)
                .enumerate()
                .map(|(index, chunk)| {
                    spawner.spawn(move |_| {
                        let mut completed = 0;
                        for (offset, row) in chunk.chunks_mut(width).enumerate() {
                            if start.elapsed() >= self.budget {
                                break;
                            }
                            let y = index * band + offset;
                            for (x, cell) in row.iter_mut().enumerate() {
                                *cell = self.pixel_colour(templates, settings, params, x, y);
                            }
                            completed += 1;
                        }
                        completed
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().unwrap())
                .collect()
        })
        .unwrap();

        let mut total = 0;
        for (index, completed) in done.iter().enumerate() {
            for offset in 0..*completed {
                let y = index * band + offset;
                for x in 0..width {
                    let colour = staging[y * width + x];
                    pixels[y * width + x] = colour;
                    pixels[(self.height - 1 - y) * width + (width - 1 - x)] = colour;
                }
            }
            total += *completed;
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded(size: usize, pixels: &[u8]) -> Template {
        let mut data = format!("P5\n{} {}\n255\n", size, size).into_bytes();
        data.extend_from_slice(pixels);
        let mut source = &data[..];
        Template::from_seed(&mut source, size).unwrap()
    }

    /// Template pair with a single foreground cell at (1,1) of the
    /// first template.  With a 2x2 template, the origin projects onto
    /// exactly that cell.
    fn one_hot_pair() -> [Template; 2] {
        [seeded(2, &[0, 0, 0, 255]), seeded(2, &[0, 0, 0, 0])]
    }

    fn blank_pair() -> [Template; 2] {
        [Template::blank(2), Template::blank(2)]
    }

    /// A map that collapses every trajectory to the constant `k` after
    /// the first application, which makes stopping counts exact.
    fn constant_map(k: Complex<f64>) -> MapParams {
        let zero = Complex::new(0.0, 0.0);
        MapParams {
            a: zero,
            b: zero,
            c: k,
            d: Complex::new(1.0, 0.0),
        }
    }

    #[test]
    fn warm_up_holds_the_exit_until_the_third_probe() {
        let pair = one_hot_pair();
        // Constant zero lands on the foreground cell from step 1 on,
        // but steps 0 and 1 are warm-up, so the exit fires at 2.
        let params = constant_map(Complex::new(0.0, 0.0));
        let (n, sample) = escape(&pair, params, true, Complex::new(-1.0, -1.0), 25);
        assert_eq!(n, 2);
        assert_eq!(
            sample,
            Rgb {
                r: 255,
                g: 255,
                b: 255
            }
        );
        // Even a seed that starts on the foreground cell must wait.
        let (n, _) = escape(&pair, params, true, Complex::new(0.1, 0.1), 25);
        assert_eq!(n, 2);
    }

    #[test]
    fn no_match_exhausts_the_budget() {
        let pair = one_hot_pair();
        // Constant (-1,-1) lands on a background cell forever.
        let params = constant_map(Complex::new(-1.0, -1.0));
        let (n, _) = escape(&pair, params, true, Complex::new(0.5, 0.5), 25);
        assert_eq!(n, 25);
    }

    #[test]
    fn pole_poisons_the_seed_into_exhaustion() {
        // z = z^2 / z^2 sends the origin through 0/0 and everything
        // else to 1.  The poisoned point can never match a cell, so it
        // runs the full budget even though every cell is background and
        // the exit rule would otherwise fire immediately after warm-up.
        let pair = blank_pair();
        let params = MapFamily::Pole.params(Complex::new(0.0, 0.0));
        let (n, _) = escape(&pair, params, false, Complex::new(0.0, 0.0), 25);
        assert_eq!(n, 25);
        let (n, _) = escape(&pair, params, false, Complex::new(1.0, 0.0), 25);
        assert_eq!(n, 2);
    }

    #[test]
    fn stopping_counts_stay_bounded() {
        let pair = one_hot_pair();
        let params = MapFamily::Basin.params(Complex::new(0.3, -0.2));
        for i in 0..9 {
            for j in 0..9 {
                let z0 = Complex::new(0.5 * (i as f64 - 4.0), 0.5 * (j as f64 - 4.0));
                let (n, _) = escape(&pair, params, false, z0, 25);
                assert!(n <= 25);
            }
        }
    }

    fn busy_pair() -> [Template; 2] {
        let first: Vec<u8> = (0..16).map(|i| (i * 37 + 11) % 251).map(|v| v as u8).collect();
        let second: Vec<u8> = (0..16).map(|i| (i * 101 + 3) % 251).map(|v| v as u8).collect();
        [seeded(4, &first), seeded(4, &second)]
    }

    fn busy_settings() -> RenderSettings {
        RenderSettings {
            scale: 0.4,
            palette: Palette::Banded,
            family: MapFamily::Pole,
            invert: false,
            reverse: false,
        }
    }

    #[test]
    fn rendered_frames_are_point_symmetric() {
        let pair = busy_pair();
        let settings = busy_settings();
        let cursor = Complex::new(0.3, -0.2);
        let (width, height) = (9, 7);
        let evaluator = Evaluator::new(width, height, 25, Duration::from_secs(60));
        let mut pixels = vec![Rgb::BLACK; width * height];
        let rows = evaluator.render(&pair, &settings, cursor, &mut pixels);
        assert_eq!(rows, 4);
        for y in 0..height {
            for x in 0..width {
                assert_eq!(
                    pixels[y * width + x],
                    pixels[(height - 1 - y) * width + (width - 1 - x)],
                    "asymmetry at {},{}",
                    x,
                    y
                );
            }
        }
    }

    #[test]
    fn banded_render_matches_the_serial_one() {
        let pair = busy_pair();
        let settings = busy_settings();
        let cursor = Complex::new(-0.1, 0.25);
        let (width, height) = (16, 12);
        let evaluator = Evaluator::new(width, height, 25, Duration::from_secs(60));
        let mut serial = vec![Rgb::BLACK; width * height];
        let mut banded = vec![Rgb::BLACK; width * height];
        assert_eq!(evaluator.render(&pair, &settings, cursor, &mut serial), 6);
        assert_eq!(
            evaluator.render_banded(&pair, &settings, cursor, &mut banded, 3),
            6
        );
        assert_eq!(serial, banded);
    }

    #[test]
    fn spent_budget_leaves_the_buffer_alone() {
        let pair = busy_pair();
        let settings = busy_settings();
        let cursor = Complex::new(0.3, -0.2);
        let (width, height) = (8, 6);
        let evaluator = Evaluator::new(width, height, 25, Duration::from_millis(0));
        let sentinel = Rgb { r: 1, g: 2, b: 3 };
        let mut pixels = vec![sentinel; width * height];
        assert_eq!(evaluator.render(&pair, &settings, cursor, &mut pixels), 0);
        assert!(pixels.iter().all(|&p| p == sentinel));
        assert_eq!(
            evaluator.render_banded(&pair, &settings, cursor, &mut pixels, 2),
            0
        );
        assert!(pixels.iter().all(|&p| p == sentinel));
    }

    #[test]
    fn shading_is_deterministic() {
        let sample = Rgb { r: 40, g: 90, b: 200 };
        for palette in &[
            Palette::Banded,
            Palette::Duotone,
            Palette::BlueAccent,
            Palette::Grayscale,
            Palette::Gradient,
        ] {
            for n in 0..26 {
                assert_eq!(
                    shade(n, 25, *palette, false, sample),
                    shade(n, 25, *palette, false, sample)
                );
            }
        }
    }

    #[test]
    fn gradient_runs_from_sample_to_complement() {
        let sample = Rgb { r: 40, g: 90, b: 200 };
        assert_eq!(shade(0, 25, Palette::Gradient, false, sample), sample);
        assert_eq!(
            shade(25, 25, Palette::Gradient, false, sample),
            sample.complement()
        );
    }

    #[test]
    fn invert_complements_every_palette() {
        let sample = Rgb { r: 40, g: 90, b: 200 };
        assert_eq!(
            shade(7, 25, Palette::Grayscale, true, sample),
            shade(7, 25, Palette::Grayscale, false, sample).complement()
        );
        assert_eq!(
            shade(3, 25, Palette::Banded, true, sample),
            shade(3, 25, Palette::Banded, false, sample).complement()
        );
    }
}
