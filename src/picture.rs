//! Plane and picture buffers for raw planar video.
//!
//! A [`Picture`] owns exactly three [`Plane`]s (luma, then the two chroma
//! planes) laid out for one [`PixelFormat`]. Pictures are allocated once per
//! stream and overwritten in place by the frame reader, so nothing here
//! allocates after construction.

use std::fmt;

use imgref::{ImgRef, ImgVec};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

/// Supported raw pixel layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PixelFormat {
    /// 8-bit 4:2:0 planar. Chroma planes are `⌊w/2⌋ × ⌊h/2⌋`, which is empty
    /// when either luma dimension is 1.
    #[serde(rename = "yuv420p")]
    Yuv420,
}

impl PixelFormat {
    /// Resolve the numeric format code used on the command line.
    ///
    /// Only `1` (4:2:0 planar) is recognized. Code `2` historically named
    /// 4:2:2 but was never laid out, so it is rejected like any other.
    pub fn from_code(code: i64) -> Result<Self> {
        match code {
            1 => Ok(Self::Yuv420),
            other => Err(Error::UnsupportedFormat(other)),
        }
    }

    /// Numeric code for this format.
    #[must_use]
    pub fn code(self) -> i64 {
        match self {
            Self::Yuv420 => 1,
        }
    }

    /// Plane dimensions `(width, height)` in [`PlaneKind::ALL`] order.
    #[must_use]
    pub fn plane_dimensions(self, width: usize, height: usize) -> [(usize, usize); 3] {
        match self {
            Self::Yuv420 => {
                // Odd luma dimensions drop the last chroma column/row.
                let chroma = (width / 2, height / 2);
                [(width, height), chroma, chroma]
            }
        }
    }

    /// Bytes occupied by one frame of this format on disk.
    #[must_use]
    pub fn frame_size(self, width: usize, height: usize) -> usize {
        self.plane_dimensions(width, height)
            .iter()
            .map(|(w, h)| w * h)
            .sum()
    }

    /// Reject geometry this format can't lay out.
    pub(crate) fn validate(self, width: usize, height: usize) -> Result<()> {
        let invalid = |reason| Error::InvalidDimensions {
            width,
            height,
            reason,
        };
        if width == 0 || height == 0 {
            return Err(invalid("luma plane must not be empty"));
        }
        width
            .checked_mul(height)
            .and_then(|luma| luma.checked_mul(2))
            .ok_or_else(|| invalid("frame size overflows"))?;
        Ok(())
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Yuv420 => write!(f, "yuv420p"),
        }
    }
}

/// Position of a plane within a picture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlaneKind {
    /// Y.
    Luma,
    /// U / Cb.
    ChromaU,
    /// V / Cr.
    ChromaV,
}

impl PlaneKind {
    /// Storage and evaluation order.
    pub const ALL: [Self; 3] = [Self::Luma, Self::ChromaU, Self::ChromaV];

    /// Short label used in reports.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Luma => "Y",
            Self::ChromaU => "U",
            Self::ChromaV => "V",
        }
    }

    /// Index into [`Picture::planes`].
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Self::Luma => 0,
            Self::ChromaU => 1,
            Self::ChromaV => 2,
        }
    }
}

/// A tightly packed 8-bit sample grid.
#[derive(Debug, Clone)]
pub struct Plane {
    image: ImgVec<u8>,
}

impl Plane {
    /// Allocate a zero-filled plane. Stride equals width, or 1 for a
    /// zero-width plane.
    #[must_use]
    pub fn zeroed(width: usize, height: usize) -> Self {
        Self {
            image: ImgVec::new_stride(vec![0; width * height], width, height, width.max(1)),
        }
    }

    /// Width in samples.
    #[must_use]
    pub fn width(&self) -> usize {
        self.image.width()
    }

    /// Height in samples.
    #[must_use]
    pub fn height(&self) -> usize {
        self.image.height()
    }

    /// Row stride in bytes.
    #[must_use]
    pub fn stride(&self) -> usize {
        self.image.stride()
    }

    /// Number of samples, `width * height`.
    #[must_use]
    pub fn sample_count(&self) -> usize {
        self.width() * self.height()
    }

    /// Whether the plane holds no samples.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sample_count() == 0
    }

    /// Borrow the plane as an image view for metric functions.
    #[must_use]
    pub fn as_img(&self) -> ImgRef<'_, u8> {
        self.image.as_ref()
    }

    /// Raw samples in row-major order.
    #[must_use]
    pub fn samples(&self) -> &[u8] {
        self.image.buf()
    }

    /// Mutable raw samples, overwritten by the frame reader.
    pub fn samples_mut(&mut self) -> &mut [u8] {
        self.image.buf_mut()
    }
}

/// One decoded frame: luma plus two chroma planes.
#[derive(Debug, Clone)]
pub struct Picture {
    format: PixelFormat,
    width: usize,
    height: usize,
    planes: [Plane; 3],
    total_samples: usize,
}

impl Picture {
    /// Allocate a zeroed picture for the given format and luma geometry.
    ///
    /// Fails without allocating anything if the geometry is unusable.
    pub fn allocate(format: PixelFormat, width: usize, height: usize) -> Result<Self> {
        format.validate(width, height)?;

        let planes = format
            .plane_dimensions(width, height)
            .map(|(w, h)| Plane::zeroed(w, h));
        let total_samples: usize = planes.iter().map(Plane::sample_count).sum();

        debug!(%format, width, height, total_samples, "allocated picture");

        Ok(Self {
            format,
            width,
            height,
            planes,
            total_samples,
        })
    }

    /// Pixel layout.
    #[must_use]
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Luma width.
    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Luma height.
    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Planes in [`PlaneKind::ALL`] order.
    #[must_use]
    pub fn planes(&self) -> &[Plane; 3] {
        &self.planes
    }

    /// Mutable planes in [`PlaneKind::ALL`] order.
    pub fn planes_mut(&mut self) -> &mut [Plane; 3] {
        &mut self.planes
    }

    /// A single plane.
    #[must_use]
    pub fn plane(&self, kind: PlaneKind) -> &Plane {
        &self.planes[kind.index()]
    }

    /// Sum of the three planes' sample counts. This is the weighting
    /// denominator for per-frame scores and the frame size on disk.
    #[must_use]
    pub fn total_sample_count(&self) -> usize {
        self.total_samples
    }

    /// Whether `other` has the same format and geometry.
    #[must_use]
    pub fn same_layout(&self, other: &Self) -> bool {
        self.format == other.format && self.width == other.width && self.height == other.height
    }
}
