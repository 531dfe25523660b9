//! Everything that can go wrong while calibrating or rendering.
//!
//! All of these are fatal to the operation that raised them.  Nothing in
//! this crate retries; a caller that wants to recover does so itself, with
//! fresh inputs.  Note that a degenerate value coming out of the iterated
//! map (an infinity, a NaN) is *not* an error.  The map has poles, poles
//! are part of the aesthetic, and the renderer has a defined fallback for
//! them.

use std::io;

use failure::Fail;

/// The crate-wide error type.
#[derive(Debug, Fail)]
pub enum Error {
    /// The sample rectangle has no area, so neither key estimation nor
    /// template capture can say anything meaningful about it.
    #[fail(display = "sample region is degenerate ({}x{} pixels)", width, height)]
    InvalidRegion {
        /// Width of the rejected rectangle.
        width: usize,
        /// Height of the rejected rectangle.
        height: usize,
    },

    /// The sample rectangle pokes outside the video frame.  Rejected up
    /// front rather than letting a pixel read run off the end of the
    /// buffer.
    #[fail(
        display = "region {},{} ({}x{}) exceeds the {}x{} frame",
        left, top, width, height, frame_width, frame_height
    )]
    RegionOutOfBounds {
        /// Left edge of the rejected rectangle.
        left: usize,
        /// Top edge of the rejected rectangle.
        top: usize,
        /// Width of the rejected rectangle.
        width: usize,
        /// Height of the rejected rectangle.
        height: usize,
        /// Width of the frame it was measured against.
        frame_width: usize,
        /// Height of the frame it was measured against.
        frame_height: usize,
    },

    /// The video source delivered fewer bytes than a whole frame.  The
    /// upstream decoder has gone away; the session is over.
    #[fail(display = "video stream terminated: read {} of {} bytes", got, wanted)]
    StreamTerminated {
        /// Bytes actually read before the stream dried up.
        got: usize,
        /// Bytes a full frame would have needed.
        wanted: usize,
    },

    /// A template seed file was missing a header field, truncated, or the
    /// wrong size for the configured template resolution.
    #[fail(display = "template seed rejected: {}", reason)]
    TemplateLoad {
        /// What exactly was wrong with the file.
        reason: String,
    },

    /// An underlying I/O failure while reading seeds or writing snapshots.
    #[fail(display = "i/o error: {}", _0)]
    Io(#[fail(cause)] io::Error),
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}
