//! Reading raw frames from headerless planar streams.
//!
//! A stream is a plain concatenation of frames, each frame being the luma
//! plane followed by the two chroma planes, row-major, with no padding and
//! no framing metadata. Geometry comes from the configuration.

use std::fs::File;
use std::io::{self, BufReader, ErrorKind, Read};
use std::path::Path;

use tracing::debug;

use crate::error::{Error, Result};
use crate::picture::{Picture, PlaneKind};

/// Result of attempting to read one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// All three planes were filled.
    Complete,
    /// The stream was exhausted exactly at a frame boundary.
    EndOfStream,
    /// The stream ended partway through a frame.
    ShortRead,
}

impl ReadOutcome {
    /// Whether a full frame is now in the picture.
    #[must_use]
    pub fn is_complete(self) -> bool {
        self == Self::Complete
    }
}

/// Pulls frames from a byte stream into a caller-owned [`Picture`].
#[derive(Debug)]
pub struct FrameReader<R> {
    inner: R,
    frames_read: u64,
    bytes_read: u64,
}

impl<R: Read> FrameReader<R> {
    /// Wrap a byte stream.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            frames_read: 0,
            bytes_read: 0,
        }
    }

    /// Overwrite `picture` with the next frame.
    ///
    /// Planes are filled in luma, U, V order. Anything short of a full frame
    /// is reported as [`ReadOutcome::EndOfStream`] or
    /// [`ReadOutcome::ShortRead`]; in that case the picture contents are
    /// unspecified and must not be evaluated.
    ///
    /// # Errors
    ///
    /// Only genuine I/O failures are errors. Interrupted reads are retried.
    pub fn read_frame(&mut self, picture: &mut Picture) -> Result<ReadOutcome> {
        for (kind, plane) in PlaneKind::ALL.into_iter().zip(picture.planes_mut()) {
            let wanted = plane.sample_count();
            let got = fill(&mut self.inner, plane.samples_mut())?;
            self.bytes_read += got as u64;

            if got < wanted {
                let outcome = if kind == PlaneKind::Luma && got == 0 {
                    ReadOutcome::EndOfStream
                } else {
                    ReadOutcome::ShortRead
                };
                debug!(
                    plane = kind.label(),
                    wanted,
                    got,
                    frame = self.frames_read,
                    ?outcome,
                    "stream ended"
                );
                return Ok(outcome);
            }
        }

        self.frames_read += 1;
        Ok(ReadOutcome::Complete)
    }

    /// Complete frames read so far.
    #[must_use]
    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }

    /// Total bytes consumed, including any trailing partial frame.
    #[must_use]
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Unwrap the underlying stream.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

/// Open a stream file for reading.
///
/// # Errors
///
/// Returns [`Error::StreamOpen`] naming the path if the file can't be opened.
pub fn open_stream(path: impl AsRef<Path>) -> Result<FrameReader<BufReader<File>>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| Error::StreamOpen {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), "opened stream");
    Ok(FrameReader::new(BufReader::new(file)))
}

/// Read until `buf` is full or the stream ends. Returns bytes read.
fn fill(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Write};

    use super::*;
    use crate::picture::PixelFormat;

    fn picture_4x4() -> Picture {
        Picture::allocate(PixelFormat::Yuv420, 4, 4).unwrap()
    }

    /// Reader that yields at most `chunk` bytes per call and is interrupted
    /// before every successful read.
    struct Trickle {
        data: Cursor<Vec<u8>>,
        chunk: usize,
        interrupt: bool,
    }

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.interrupt = !self.interrupt;
            if self.interrupt {
                return Err(io::Error::from(ErrorKind::Interrupted));
            }
            let n = buf.len().min(self.chunk);
            self.data.read(&mut buf[..n])
        }
    }

    #[test]
    fn test_reads_planes_in_order() {
        // 16 luma + 4 U + 4 V bytes.
        let frame: Vec<u8> = (0..24).collect();
        let mut reader = FrameReader::new(Cursor::new(frame));
        let mut pic = picture_4x4();

        assert_eq!(reader.read_frame(&mut pic).unwrap(), ReadOutcome::Complete);
        assert_eq!(pic.plane(PlaneKind::Luma).samples(), &(0..16).collect::<Vec<u8>>()[..]);
        assert_eq!(pic.plane(PlaneKind::ChromaU).samples(), &[16, 17, 18, 19]);
        assert_eq!(pic.plane(PlaneKind::ChromaV).samples(), &[20, 21, 22, 23]);
        assert_eq!(reader.frames_read(), 1);
        assert_eq!(reader.bytes_read(), 24);

        assert_eq!(reader.read_frame(&mut pic).unwrap(), ReadOutcome::EndOfStream);
        assert_eq!(reader.frames_read(), 1);
    }

    #[test]
    fn test_single_column_frames_are_luma_only() {
        let mut reader = FrameReader::new(Cursor::new(vec![7u8, 8, 9, 10, 11, 12]));
        let mut pic = Picture::allocate(PixelFormat::Yuv420, 1, 3).unwrap();

        assert_eq!(reader.read_frame(&mut pic).unwrap(), ReadOutcome::Complete);
        assert_eq!(pic.plane(PlaneKind::Luma).samples(), &[7, 8, 9]);
        assert_eq!(reader.read_frame(&mut pic).unwrap(), ReadOutcome::Complete);
        assert_eq!(pic.plane(PlaneKind::Luma).samples(), &[10, 11, 12]);
        assert_eq!(reader.read_frame(&mut pic).unwrap(), ReadOutcome::EndOfStream);
        assert_eq!(reader.bytes_read(), 6);
    }

    #[test]
    fn test_empty_stream() {
        let mut reader = FrameReader::new(Cursor::new(Vec::new()));
        let mut pic = picture_4x4();
        assert_eq!(reader.read_frame(&mut pic).unwrap(), ReadOutcome::EndOfStream);
    }

    #[test]
    fn test_partial_luma_is_short_read() {
        let mut reader = FrameReader::new(Cursor::new(vec![1u8; 10]));
        let mut pic = picture_4x4();
        assert_eq!(reader.read_frame(&mut pic).unwrap(), ReadOutcome::ShortRead);
        assert_eq!(reader.frames_read(), 0);
    }

    #[test]
    fn test_missing_chroma_is_short_read() {
        // Full luma, full U, V missing entirely.
        let mut reader = FrameReader::new(Cursor::new(vec![1u8; 20]));
        let mut pic = picture_4x4();
        let outcome = reader.read_frame(&mut pic).unwrap();
        assert_eq!(outcome, ReadOutcome::ShortRead);
        assert!(!outcome.is_complete());
    }

    #[test]
    fn test_second_frame_partial() {
        let mut reader = FrameReader::new(Cursor::new(vec![9u8; 24 + 23]));
        let mut pic = picture_4x4();
        assert!(reader.read_frame(&mut pic).unwrap().is_complete());
        assert_eq!(reader.read_frame(&mut pic).unwrap(), ReadOutcome::ShortRead);
        assert_eq!(reader.bytes_read(), 47);
    }

    #[test]
    fn test_small_chunks_and_interrupts() {
        let trickle = Trickle {
            data: Cursor::new((0..48).collect()),
            chunk: 5,
            interrupt: false,
        };
        let mut reader = FrameReader::new(trickle);
        let mut pic = picture_4x4();

        assert!(reader.read_frame(&mut pic).unwrap().is_complete());
        assert!(reader.read_frame(&mut pic).unwrap().is_complete());
        assert_eq!(pic.plane(PlaneKind::ChromaV).samples(), &[44, 45, 46, 47]);
        assert_eq!(reader.read_frame(&mut pic).unwrap(), ReadOutcome::EndOfStream);
    }

    #[test]
    fn test_open_stream() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[0u8; 24]).unwrap();
        file.flush().unwrap();

        let mut reader = open_stream(file.path()).unwrap();
        let mut pic = picture_4x4();
        assert!(reader.read_frame(&mut pic).unwrap().is_complete());
    }

    #[test]
    fn test_open_missing_stream() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.yuv");
        match open_stream(&missing) {
            Err(Error::StreamOpen { path, .. }) => assert_eq!(path, missing),
            other => panic!("expected StreamOpen, got {other:?}"),
        }
    }
}
