#![deny(missing_docs)]
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Shadowbrot, a template-keyed escape-time renderer
//!
//! An ordinary escape-time fractal asks how quickly an iterated point
//! runs off to infinity.  This one asks something stranger: it iterates
//! the rational map `z = (a*z^2 + c) / (b*z^2 + d)` and stops when the
//! point's shadow, projected back onto a pair of bitmaps tiled across
//! the plane in a checkerboard, lands on the wrong kind of cell.  The
//! bitmaps are silhouettes cut out of a live camera feed with a colour
//! key, so whoever is standing in front of the camera is, quite
//! literally, shaping where every orbit is allowed to stop.  The number
//! of steps a pixel survives picks its colour.
//!
//! The crate is two engines and the plumbing between them.  The
//! calibration engine ([`keying`] and [`template`]) looks at a raw
//! video frame, works out what the backdrop's colour range is by
//! sampling the rim of a capture rectangle, and resamples that
//! rectangle into a fixed-resolution mask plus a colour plane.  The
//! evaluation engine ([`fractal`]) takes the two templates and renders
//! a frame under a wall-clock budget, computing only the top half of
//! the image and mirroring it through the centre.  The engines never
//! call each other; a [`template::Template`] is the only thing that
//! passes between them.
//!
//! Display loops, printers, and the camera decoder itself live outside
//! the crate.  The `shadowbrot` binary renders a single frame from seed
//! bitmaps and writes a PPM; the `camkey` binary drives the calibration
//! engine against a raw video stream.

extern crate crossbeam;
extern crate failure;
extern crate image;
extern crate itertools;
extern crate num;
extern crate num_cpus;
extern crate rand;

pub mod errors;
pub mod export;
pub mod fractal;
pub mod keying;
pub mod template;
pub mod video;

pub use errors::Error;
pub use fractal::{Evaluator, MapFamily, Palette, RenderSettings};
pub use keying::ColorKeyRange;
pub use template::Template;
pub use video::{Frame, Rect, Rgb};
