//! Adaptive colour-key estimation.
//!
//! The operator stands inside the capture rectangle, so the rectangle's
//! interior is assumed to be subject and its rim is assumed to be
//! backdrop.  The estimator therefore samples the boundary ring of the
//! rectangle: every pixel of the first and last few rows, and only a
//! short run at the left and right edges of the rows in between.  The
//! per-channel extremes of those samples, widened by a tolerance margin,
//! become the key range that later classifies template pixels.

use std::fmt;

use errors::Error;
use video::{Frame, Rect};

/// Margin added to both ends of each observed channel interval.  Wide
/// enough to swallow sensor noise on a consumer webcam.
pub const DEFAULT_TOLERANCE: u8 = 20;

/// Thickness of the boundary ring, in pixels.
const EDGE: usize = 4;

/// A per-channel value interval in the video's luma/chroma space.  The
/// bounds carried here are already tolerance-expanded and clamped to
/// [0,255]; membership is tested strictly on both ends.  Derived fresh
/// from a calibration frame and never persisted.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ColorKeyRange {
    min: [u8; 3],
    max: [u8; 3],
}

impl ColorKeyRange {
    /// Scan the boundary ring of `region` in `frame` and derive the key
    /// range.  Pure: same frame, same region, same tolerance, same range.
    ///
    /// A zero-area region is rejected with `InvalidRegion` and a region
    /// that leaves the frame with `RegionOutOfBounds`, both before any
    /// pixel is read.
    pub fn estimate(frame: &Frame, region: Rect, tolerance: u8) -> Result<ColorKeyRange, Error> {
        region.validate(frame)?;

        let mut min = [255u8; 3];
        let mut max = [0u8; 3];
        {
            let mut admit = |x: usize, y: usize| {
                let yuv = frame.yuv_at(region.left + x, region.top + y);
                for channel in 0..3 {
                    if yuv[channel] < min[channel] {
                        min[channel] = yuv[channel];
                    }
                    if yuv[channel] > max[channel] {
                        max[channel] = yuv[channel];
                    }
                }
            };
            for y in 0..region.height {
                if y < EDGE || y + EDGE >= region.height {
                    for x in 0..region.width {
                        admit(x, y);
                    }
                } else {
                    // Interior row: left edge run, then jump straight to
                    // the right edge.
                    for x in 0..EDGE.min(region.width) {
                        admit(x, y);
                    }
                    for x in region.width.saturating_sub(EDGE)..region.width {
                        admit(x, y);
                    }
                }
            }
        }

        Ok(ColorKeyRange {
            min: [
                min[0].saturating_sub(tolerance),
                min[1].saturating_sub(tolerance),
                min[2].saturating_sub(tolerance),
            ],
            max: [
                max[0].saturating_add(tolerance),
                max[1].saturating_add(tolerance),
                max[2].saturating_add(tolerance),
            ],
        })
    }

    /// Whether a sample sits strictly inside the range on all three
    /// channels.  A value exactly on a bound is outside.
    pub fn contains(&self, yuv: [u8; 3]) -> bool {
        (0..3).all(|channel| self.min[channel] < yuv[channel] && yuv[channel] < self.max[channel])
    }
}

impl fmt::Display for ColorKeyRange {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "y {}..{} u {}..{} v {}..{}",
            self.min[0], self.max[0], self.min[1], self.max[1], self.min[2], self.max[2]
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use video::frame_from;

    const BACKDROP: [u8; 3] = [100, 90, 60];
    const SUBJECT: [u8; 3] = [200, 140, 180];

    /// Backdrop everywhere except a subject block well inside the ring.
    fn staged_frame(width: usize, height: usize) -> Frame {
        frame_from(width, height, |x, y| {
            let inside = x >= width / 3 && x < width - width / 3 && y >= height / 3
                && y < height - height / 3;
            if inside {
                SUBJECT
            } else {
                BACKDROP
            }
        })
    }

    #[test]
    fn ring_samples_never_see_the_subject() {
        let frame = staged_frame(32, 24);
        let region = Rect {
            left: 0,
            top: 0,
            width: 32,
            height: 24,
        };
        // With no tolerance the bounds are the raw extremes, and with a
        // uniform backdrop those collapse to the backdrop colour itself.
        let range = ColorKeyRange::estimate(&frame, region, 0).unwrap();
        assert_eq!(
            range,
            ColorKeyRange {
                min: BACKDROP,
                max: BACKDROP,
            }
        );
    }

    #[test]
    fn tolerance_expands_and_clamps() {
        let frame = frame_from(16, 16, |_, _| [4, 250, 128]);
        let region = Rect {
            left: 0,
            top: 0,
            width: 16,
            height: 16,
        };
        let range = ColorKeyRange::estimate(&frame, region, DEFAULT_TOLERANCE).unwrap();
        assert_eq!(range.min, [0, 230, 108]);
        assert_eq!(range.max, [24, 255, 148]);
    }

    #[test]
    fn membership_is_strict_on_both_ends() {
        let frame = frame_from(16, 16, |_, _| [100, 100, 100]);
        let region = Rect {
            left: 0,
            top: 0,
            width: 16,
            height: 16,
        };
        let range = ColorKeyRange::estimate(&frame, region, 10).unwrap();
        assert!(range.contains([100, 100, 100]));
        assert!(!range.contains([90, 100, 100]));
        assert!(!range.contains([100, 110, 100]));
    }

    #[test]
    fn degenerate_region_is_rejected() {
        let frame = staged_frame(16, 16);
        let region = Rect {
            left: 2,
            top: 2,
            width: 0,
            height: 5,
        };
        match ColorKeyRange::estimate(&frame, region, 20) {
            Err(Error::InvalidRegion { width: 0, height: 5 }) => {}
            other => panic!("expected InvalidRegion, got {:?}", other),
        }
    }

    #[test]
    fn runaway_region_is_rejected() {
        let frame = staged_frame(16, 16);
        let region = Rect {
            left: 10,
            top: 0,
            width: 10,
            height: 8,
        };
        match ColorKeyRange::estimate(&frame, region, 20) {
            Err(Error::RegionOutOfBounds { .. }) => {}
            other => panic!("expected RegionOutOfBounds, got {:?}", other),
        }
    }
}
