//! Raw video frames and the colours inside them.
//!
//! Frames arrive from an external decoder as a packed 4:2:2 byte stream,
//! two bytes per pixel: every pixel carries its own luma sample and each
//! horizontal pair of pixels shares one chroma pair (the YUYV layout).
//! A frame is therefore exactly `width * height * 2` bytes, and a read
//! that comes up short means the decoder has died, which we treat as the
//! end of the session rather than something to retry.

use std::io::Read;

use num::clamp;
use rand::distributions::{Distribution, Uniform};
use rand::prelude::*;

use errors::Error;

/// An 8-bit RGB colour sample.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Rgb {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl Rgb {
    /// Solid black, the colour every fresh buffer starts from.
    pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };

    /// The channel-wise complement of this colour.
    pub fn complement(self) -> Rgb {
        Rgb {
            r: 255 - self.r,
            g: 255 - self.g,
            b: 255 - self.b,
        }
    }
}

/// A rectangle in frame pixel coordinates.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Rect {
    /// Leftmost column, inclusive.
    pub left: usize,
    /// Topmost row, inclusive.
    pub top: usize,
    /// Width in pixels.
    pub width: usize,
    /// Height in pixels.
    pub height: usize,
}

impl Rect {
    pub(crate) fn validate(&self, frame: &Frame) -> Result<(), Error> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::InvalidRegion {
                width: self.width,
                height: self.height,
            });
        }
        if self.left + self.width > frame.width() || self.top + self.height > frame.height() {
            return Err(Error::RegionOutOfBounds {
                left: self.left,
                top: self.top,
                width: self.width,
                height: self.height,
                frame_width: frame.width(),
                frame_height: frame.height(),
            });
        }
        Ok(())
    }
}

/// One raw video frame in the packed two-bytes-per-pixel layout.
///
/// Width should be even, since chroma is shared across horizontal pixel
/// pairs.
#[derive(Clone, Debug)]
pub struct Frame {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl Frame {
    /// Wrap an already-read byte buffer as a frame.  The buffer must hold
    /// exactly `width * height * 2` bytes.
    pub fn new(width: usize, height: usize, data: Vec<u8>) -> Frame {
        assert_eq!(data.len(), width * height * 2);
        Frame {
            width,
            height,
            data,
        }
    }

    /// Frame width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Frame height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Blocking read of one whole frame from a byte source.
    ///
    /// Loops until the frame buffer is full.  A source that returns
    /// end-of-stream before that yields `StreamTerminated` carrying how
    /// far it got, and the caller must tear the session down rather than
    /// retry.
    pub fn read_from<R: Read>(source: &mut R, width: usize, height: usize) -> Result<Frame, Error> {
        let wanted = width * height * 2;
        let mut data = vec![0u8; wanted];
        let mut got = 0;
        while got < wanted {
            let count = source.read(&mut data[got..])?;
            if count == 0 {
                return Err(Error::StreamTerminated { got, wanted });
            }
            got += count;
        }
        Ok(Frame {
            width,
            height,
            data,
        })
    }

    /// The three channel values (luma, then the two chroma channels) at a
    /// pixel.  Chroma comes from the pixel's horizontal pair.
    pub fn yuv_at(&self, x: usize, y: usize) -> [u8; 3] {
        let index = (y * self.width + x) * 2;
        let pair = ((y * self.width + x) & !1) * 2;
        [self.data[index], self.data[pair + 1], self.data[pair + 3]]
    }

    /// A camera stand-in for running without hardware: a flat background
    /// colour with a little sensor-style noise on it, and a centred
    /// subject block in a clearly different colour.  The noise amplitude
    /// is small enough that the default key tolerance swallows it.
    pub fn test_pattern(width: usize, height: usize) -> Frame {
        const BACKGROUND: [i32; 3] = [100, 90, 60];
        const SUBJECT: [i32; 3] = [180, 128, 160];
        let jitter = Uniform::new_inclusive(-6i32, 6);
        let mut rng = rand::thread_rng();
        let mut data = vec![0u8; width * height * 2];
        for y in 0..height {
            for x in 0..width {
                let inside = x >= width / 4
                    && x < width - width / 4
                    && y >= height / 4
                    && y < height - height / 4;
                let base = if inside { SUBJECT } else { BACKGROUND };
                let index = (y * width + x) * 2;
                data[index] = clamp(base[0] + jitter.sample(&mut rng), 0, 255) as u8;
                if x % 2 == 0 && x + 1 < width {
                    data[index + 1] = clamp(base[1] + jitter.sample(&mut rng), 0, 255) as u8;
                    data[index + 3] = clamp(base[2] + jitter.sample(&mut rng), 0, 255) as u8;
                }
            }
        }
        Frame {
            width,
            height,
            data,
        }
    }
}

/// Convert one luma/chroma sample to RGB with the limited-range BT.601
/// transform, clamping each channel to [0,255].
pub fn yuv_to_rgb(yuv: [u8; 3]) -> Rgb {
    let c = i32::from(yuv[0]) - 16;
    let d = i32::from(yuv[1]) - 128;
    let e = i32::from(yuv[2]) - 128;
    let r = clamp((298 * c + 409 * e + 128) >> 8, 0, 255);
    let g = clamp((298 * c - 100 * d - 208 * e + 128) >> 8, 0, 255);
    let b = clamp((298 * c + 516 * d + 128) >> 8, 0, 255);
    Rgb {
        r: r as u8,
        g: g as u8,
        b: b as u8,
    }
}

/// Test helper: build a frame from a per-pixel channel function, packing
/// chroma from the even pixel of each pair the way a real camera would.
#[cfg(test)]
pub(crate) fn frame_from<F>(width: usize, height: usize, sample: F) -> Frame
where
    F: Fn(usize, usize) -> [u8; 3],
{
    let mut data = vec![0u8; width * height * 2];
    for y in 0..height {
        for x in 0..width {
            let yuv = sample(x, y);
            let index = (y * width + x) * 2;
            data[index] = yuv[0];
            if x % 2 == 0 && x + 1 < width {
                data[index + 1] = yuv[1];
                data[index + 3] = yuv[2];
            }
        }
    }
    Frame::new(width, height, data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversion_hits_the_reference_points() {
        assert_eq!(yuv_to_rgb([16, 128, 128]), Rgb { r: 0, g: 0, b: 0 });
        assert_eq!(
            yuv_to_rgb([235, 128, 128]),
            Rgb {
                r: 255,
                g: 255,
                b: 255
            }
        );
        // Full-saturation red from the BT.601 tables.
        assert_eq!(yuv_to_rgb([81, 90, 240]), Rgb { r: 255, g: 0, b: 0 });
    }

    #[test]
    fn short_read_is_stream_termination() {
        let mut source = &[0u8; 10][..];
        let result = Frame::read_from(&mut source, 4, 4);
        match result {
            Err(Error::StreamTerminated { got, wanted }) => {
                assert_eq!(got, 10);
                assert_eq!(wanted, 32);
            }
            other => panic!("expected StreamTerminated, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn exact_read_fills_the_frame() {
        let bytes: Vec<u8> = (0..32).collect();
        let mut source = &bytes[..];
        let frame = Frame::read_from(&mut source, 4, 4).unwrap();
        assert_eq!(frame.width(), 4);
        assert_eq!(frame.height(), 4);
        // Pixel 1 shares chroma with pixel 0.
        assert_eq!(frame.yuv_at(0, 0), [0, 1, 3]);
        assert_eq!(frame.yuv_at(1, 0), [2, 1, 3]);
        assert_eq!(frame.yuv_at(2, 0), [4, 5, 7]);
    }
}
