//! Full-reference quality metrics over 8-bit sample planes.
//!
//! Every metric is a pure function of two equally sized [`ImgRef<u8>`]
//! views (which carry width, height and stride):
//!
//! | Metric | Identical planes | Direction |
//! |--------|------------------|-----------|
//! | `psnr` | `+inf` dB | higher is better |
//! | `ssim` | `1.0` | higher is better |
//! | `ms_ssim` | `1.0` | higher is better |
//! | `mse` | `0.0` | lower is better |
//!
//! [`MetricKind`] is the closed catalogue of these functions and is what the
//! registry and reports refer to.

pub mod ssim;

use std::fmt;
use std::str::FromStr;

use imgref::ImgRef;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{Error, Result};

pub use ssim::{ms_ssim, ssim};

/// Peak sample value for 8-bit content.
pub const PEAK: f64 = 255.0;

/// Signature shared by all metric functions.
pub type MetricFn = fn(ImgRef<'_, u8>, ImgRef<'_, u8>) -> f64;

/// The metrics that can be selected for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    /// Peak signal-to-noise ratio in dB.
    Psnr,
    /// Structural similarity.
    Ssim,
    /// Multi-scale structural similarity.
    MsSsim,
    /// Mean squared error.
    Mse,
}

impl MetricKind {
    /// Catalogue in declaration order. Reports follow this order.
    pub const ALL: [Self; 4] = [Self::Psnr, Self::Ssim, Self::MsSsim, Self::Mse];

    /// Name used for selection and reporting.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Psnr => "psnr",
            Self::Ssim => "ssim",
            Self::MsSsim => "ms_ssim",
            Self::Mse => "mse",
        }
    }

    /// The pure function implementing this metric.
    #[must_use]
    pub fn function(self) -> MetricFn {
        match self {
            Self::Psnr => psnr,
            Self::Ssim => ssim,
            Self::MsSsim => ms_ssim,
            Self::Mse => mse,
        }
    }

    /// Evaluate this metric on one plane pair.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] if the views differ in size.
    pub fn compute(self, reference: ImgRef<'_, u8>, test: ImgRef<'_, u8>) -> Result<f64> {
        let expected = (reference.width(), reference.height());
        let actual = (test.width(), test.height());
        if expected != actual {
            return Err(Error::DimensionMismatch { expected, actual });
        }
        Ok((self.function())(reference, test))
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A metric name that is not in the catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown metric: {0}")]
pub struct UnknownMetric(pub String);

impl FromStr for MetricKind {
    type Err = UnknownMetric;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| UnknownMetric(s.to_string()))
    }
}

/// Mean squared error between two planes.
///
/// Returns `0.0` for identical planes.
#[must_use]
pub fn mse(reference: ImgRef<'_, u8>, test: ImgRef<'_, u8>) -> f64 {
    let sum: u64 = reference
        .rows()
        .zip(test.rows())
        .flat_map(|(r, t)| r.iter().zip(t))
        .map(|(&r, &t)| {
            let diff = u64::from(r.abs_diff(t));
            diff * diff
        })
        .sum();

    sum as f64 / (reference.width() * reference.height()) as f64
}

/// Peak signal-to-noise ratio between two planes, in dB.
///
/// Returns `f64::INFINITY` if the planes are identical.
#[must_use]
pub fn psnr(reference: ImgRef<'_, u8>, test: ImgRef<'_, u8>) -> f64 {
    let mse = mse(reference, test);

    if mse == 0.0 {
        f64::INFINITY
    } else {
        10.0 * (PEAK * PEAK / mse).log10()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use imgref::{Img, ImgVec};

    fn flat(value: u8, width: usize, height: usize) -> ImgVec<u8> {
        ImgVec::new(vec![value; width * height], width, height)
    }

    #[test]
    fn test_names_round_trip() {
        for kind in MetricKind::ALL {
            assert_eq!(kind.name().parse::<MetricKind>().unwrap(), kind);
        }
        assert_eq!(
            "vmaf".parse::<MetricKind>(),
            Err(UnknownMetric("vmaf".to_string()))
        );
        // Names match exactly, not by substring.
        assert!("SSIM".parse::<MetricKind>().is_err());
        assert!("ms".parse::<MetricKind>().is_err());
    }

    #[test]
    fn test_mse_identical() {
        let img = flat(77, 16, 16);
        assert_eq!(mse(img.as_ref(), img.as_ref()), 0.0);
    }

    #[test]
    fn test_mse_known_value() {
        let reference = ImgVec::new(vec![0u8, 0, 0, 0], 2, 2);
        let test = ImgVec::new(vec![2u8, 0, 4, 0], 2, 2);
        // (4 + 16) / 4
        assert_eq!(mse(reference.as_ref(), test.as_ref()), 5.0);
    }

    #[test]
    fn test_mse_honours_stride() {
        // 2x2 visible area inside a stride-3 buffer; padding column differs.
        let reference = Img::new_stride(vec![1u8, 1, 200, 1, 1, 200], 2, 2, 3);
        let test = Img::new_stride(vec![1u8, 1, 0, 1, 3, 0], 2, 2, 3);
        assert_eq!(mse(reference.as_ref(), test.as_ref()), 1.0);
    }

    #[test]
    fn test_psnr_identical() {
        let img = flat(128, 32, 32);
        assert!(psnr(img.as_ref(), img.as_ref()).is_infinite());
    }

    #[test]
    fn test_psnr_different() {
        let reference = flat(100, 32, 32);
        let test = flat(110, 32, 32);
        let value = psnr(reference.as_ref(), test.as_ref());
        // 10 * log10(255^2 / 100) ≈ 28.13
        assert!((value - 28.1308).abs() < 1e-3, "{value}");
    }

    #[test]
    fn test_compute_rejects_mismatch() {
        let a = flat(0, 4, 4);
        let b = flat(0, 4, 2);
        let result = MetricKind::Mse.compute(a.as_ref(), b.as_ref());
        assert!(matches!(result, Err(Error::DimensionMismatch { .. })));
    }

    #[test]
    fn test_identity_sentinels() {
        let img = ImgVec::new((0..64u8).collect(), 8, 8);
        let img = img.as_ref();
        assert_eq!(MetricKind::Mse.compute(img, img).unwrap(), 0.0);
        assert_eq!(MetricKind::Psnr.compute(img, img).unwrap(), f64::INFINITY);
        assert_eq!(MetricKind::Ssim.compute(img, img).unwrap(), 1.0);
        assert_eq!(MetricKind::MsSsim.compute(img, img).unwrap(), 1.0);
    }
}
