//! Structural Similarity Index (SSIM) and its multi-scale variant.
//!
//! Local statistics are gathered with an 11x11 Gaussian window (sigma 1.5)
//! applied as a separable blur. Samples outside the plane are clamped to the
//! nearest edge, so the SSIM map has one entry per sample and planes smaller
//! than the window (tiny chroma planes) are still measurable.
//!
//! Typical interpretation:
//! - > 0.98: Nearly indistinguishable
//! - 0.95-0.98: High quality
//! - 0.90-0.95: Good quality
//! - < 0.90: Noticeable artifacts

use imgref::{ImgRef, ImgVec};

use super::PEAK;

const WINDOW: usize = 11;
const SIGMA: f64 = 1.5;
const K1: f64 = 0.01;
const K2: f64 = 0.03;
const C1: f64 = (K1 * PEAK) * (K1 * PEAK);
const C2: f64 = (K2 * PEAK) * (K2 * PEAK);

/// Short side at which single-scale SSIM starts pre-downsampling.
const SSIM_TARGET_SIZE: f64 = 256.0;

/// Maximum number of dyadic scales evaluated by MS-SSIM.
pub const MS_SSIM_MAX_SCALES: usize = 5;

/// Mean SSIM over the plane.
///
/// Planes whose short side is large are first box-downsampled by
/// `round(min(w, h) / 256)`, which keeps the window size meaningful
/// relative to typical viewing distance. Returns exactly `1.0` for
/// identical planes.
#[must_use]
pub fn ssim(reference: ImgRef<'_, u8>, test: ImgRef<'_, u8>) -> f64 {
    let mut a = to_f64(reference);
    let mut b = to_f64(test);

    let factor = prescale_factor(a.width(), a.height());
    if factor > 1 {
        a = box_downsample(&a, factor);
        b = box_downsample(&b, factor);
    }

    SsimStats::compute(&a, &b).ssim
}

/// Multi-scale SSIM.
///
/// Evaluates up to [`MS_SSIM_MAX_SCALES`] dyadic scales, fewer if the plane
/// cannot be halved that often. Contrast-structure terms are used for all
/// but the coarsest scale, which contributes full SSIM. Returns exactly
/// `1.0` for identical planes.
#[must_use]
pub fn ms_ssim(reference: ImgRef<'_, u8>, test: ImgRef<'_, u8>) -> f64 {
    let mut a = to_f64(reference);
    let mut b = to_f64(test);

    let weights = scale_weights(scale_count(a.width(), a.height()));
    let last = weights.len() - 1;

    let mut product = 1.0;
    for (scale, &weight) in weights.iter().enumerate() {
        let stats = SsimStats::compute(&a, &b);
        if scale < last {
            // A negative cs would make the fractional power NaN.
            product *= stats.cs.max(0.0).powf(weight);
            a = box_downsample(&a, 2);
            b = box_downsample(&b, 2);
        } else {
            product *= stats.ssim.max(0.0).powf(weight);
        }
    }

    product
}

/// Mean SSIM and mean contrast-structure term over one scale.
#[derive(Debug, Clone, Copy)]
struct SsimStats {
    ssim: f64,
    cs: f64,
}

impl SsimStats {
    fn compute(a: &ImgVec<f64>, b: &ImgVec<f64>) -> Self {
        let kernel = gaussian_kernel();

        let mu_a = blur(a, &kernel);
        let mu_b = blur(b, &kernel);
        let aa = blur(&combine(a, a), &kernel);
        let bb = blur(&combine(b, b), &kernel);
        let ab = blur(&combine(a, b), &kernel);

        let mut ssim_sum = 0.0;
        let mut cs_sum = 0.0;

        let stats = mu_a
            .buf()
            .iter()
            .zip(mu_b.buf())
            .zip(aa.buf().iter().zip(bb.buf()).zip(ab.buf()));
        for ((&ma, &mb), ((&ea, &eb), &eab)) in stats {
            let var_a = ea - ma * ma;
            let var_b = eb - mb * mb;
            let covar = eab - ma * mb;

            let luminance = (2.0 * ma * mb + C1) / (ma * ma + mb * mb + C1);
            let cs = (2.0 * covar + C2) / (var_a + var_b + C2);

            ssim_sum += luminance * cs;
            cs_sum += cs;
        }

        let n = (a.width() * a.height()) as f64;
        Self {
            ssim: ssim_sum / n,
            cs: cs_sum / n,
        }
    }
}

fn to_f64(img: ImgRef<'_, u8>) -> ImgVec<f64> {
    let data = img
        .rows()
        .flat_map(|row| row.iter().map(|&v| f64::from(v)))
        .collect();
    ImgVec::new(data, img.width(), img.height())
}

/// Element-wise product of two equally sized fields.
fn combine(a: &ImgVec<f64>, b: &ImgVec<f64>) -> ImgVec<f64> {
    let data = a.buf().iter().zip(b.buf()).map(|(x, y)| x * y).collect();
    ImgVec::new(data, a.width(), a.height())
}

fn gaussian_kernel() -> [f64; WINDOW] {
    let center = (WINDOW / 2) as f64;
    let mut kernel = [0.0; WINDOW];
    for (i, k) in kernel.iter_mut().enumerate() {
        let d = i as f64 - center;
        *k = (-(d * d) / (2.0 * SIGMA * SIGMA)).exp();
    }
    let sum: f64 = kernel.iter().sum();
    for k in &mut kernel {
        *k /= sum;
    }
    kernel
}

/// Separable blur with edge clamping. Fields are tightly packed.
fn blur(src: &ImgVec<f64>, kernel: &[f64; WINDOW]) -> ImgVec<f64> {
    let (width, height) = (src.width(), src.height());
    let radius = WINDOW / 2;
    let buf = src.buf();

    let mut horizontal = vec![0.0; width * height];
    for (src_row, dst_row) in buf
        .chunks_exact(width)
        .zip(horizontal.chunks_exact_mut(width))
    {
        for (x, dst) in dst_row.iter_mut().enumerate() {
            *dst = kernel
                .iter()
                .enumerate()
                .map(|(k, w)| w * src_row[(x + k).saturating_sub(radius).min(width - 1)])
                .sum();
        }
    }

    let mut out = vec![0.0; width * height];
    for (y, dst_row) in out.chunks_exact_mut(width).enumerate() {
        for (k, w) in kernel.iter().enumerate() {
            let sy = (y + k).saturating_sub(radius).min(height - 1);
            let src_row = &horizontal[sy * width..(sy + 1) * width];
            for (dst, s) in dst_row.iter_mut().zip(src_row) {
                *dst += w * s;
            }
        }
    }

    ImgVec::new(out, width, height)
}

/// Average `factor x factor` blocks. Trailing partial blocks are dropped.
fn box_downsample(src: &ImgVec<f64>, factor: usize) -> ImgVec<f64> {
    let width = src.width() / factor;
    let height = src.height() / factor;
    let stride = src.width();
    let buf = src.buf();
    let area = (factor * factor) as f64;

    let mut out = Vec::with_capacity(width * height);
    for y in 0..height {
        for x in 0..width {
            let mut sum = 0.0;
            for dy in 0..factor {
                let row = (y * factor + dy) * stride + x * factor;
                sum += buf[row..row + factor].iter().sum::<f64>();
            }
            out.push(sum / area);
        }
    }

    ImgVec::new(out, width, height)
}

fn prescale_factor(width: usize, height: usize) -> usize {
    let factor = (width.min(height) as f64 / SSIM_TARGET_SIZE).round();
    (factor as usize).max(1)
}

/// Number of scales such that the coarsest is still at least 1x1.
fn scale_count(width: usize, height: usize) -> usize {
    let short = width.min(height);
    let halvings = (usize::BITS - short.leading_zeros()) as usize;
    halvings.clamp(1, MS_SSIM_MAX_SCALES)
}

fn scale_weights(scales: usize) -> &'static [f64] {
    // Wang, Simoncelli & Bovik (2003); fewer scales fold the remainder
    // into the coarsest weight.
    match scales {
        5 => &[0.0448, 0.2856, 0.3001, 0.2363, 0.1333],
        4 => &[0.0448, 0.2856, 0.3001, 0.3695],
        3 => &[0.0448, 0.2856, 0.6696],
        2 => &[0.3304, 0.6696],
        _ => &[1.0],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: usize, height: usize) -> ImgVec<u8> {
        let data = (0..width * height)
            .map(|i| ((i % width) * 7 + (i / width) * 3) as u8)
            .collect();
        ImgVec::new(data, width, height)
    }

    fn noisy(img: &ImgVec<u8>, amplitude: u8) -> ImgVec<u8> {
        let data = img
            .buf()
            .iter()
            .enumerate()
            .map(|(i, &v)| {
                if i % 3 == 0 {
                    v.saturating_add(amplitude)
                } else {
                    v.saturating_sub(amplitude)
                }
            })
            .collect();
        ImgVec::new(data, img.width(), img.height())
    }

    #[test]
    fn test_kernel_normalized() {
        let kernel = gaussian_kernel();
        let sum: f64 = kernel.iter().sum();
        assert!((sum - 1.0).abs() < 1e-12);
        assert_eq!(kernel[0], kernel[WINDOW - 1]);
        assert!(kernel[WINDOW / 2] > kernel[0]);
    }

    #[test]
    fn test_identical_ssim_is_one() {
        let img = gradient(64, 48);
        assert_eq!(ssim(img.as_ref(), img.as_ref()), 1.0);
    }

    #[test]
    fn test_tiny_plane_is_measurable() {
        // 2x2 chroma plane of a 4x4 frame, far smaller than the window.
        let a = ImgVec::new(vec![0u8; 4], 2, 2);
        assert_eq!(ssim(a.as_ref(), a.as_ref()), 1.0);
        assert_eq!(ms_ssim(a.as_ref(), a.as_ref()), 1.0);

        let b = ImgVec::new(vec![0u8, 255, 255, 0], 2, 2);
        let value = ssim(a.as_ref(), b.as_ref());
        assert!(value.is_finite() && value < 1.0);
    }

    #[test]
    fn test_distortion_lowers_ssim() {
        let img = gradient(64, 64);
        let light = noisy(&img, 4);
        let heavy = noisy(&img, 40);

        let light_score = ssim(img.as_ref(), light.as_ref());
        let heavy_score = ssim(img.as_ref(), heavy.as_ref());
        assert!(light_score < 1.0);
        assert!(heavy_score < light_score);
    }

    #[test]
    fn test_ms_ssim_identical_and_distorted() {
        let img = gradient(128, 96);
        assert_eq!(ms_ssim(img.as_ref(), img.as_ref()), 1.0);

        let distorted = noisy(&img, 20);
        let value = ms_ssim(img.as_ref(), distorted.as_ref());
        assert!(value > 0.0 && value < 1.0, "{value}");
    }

    #[test]
    fn test_scale_count() {
        assert_eq!(scale_count(1, 1), 1);
        assert_eq!(scale_count(2, 3), 2);
        assert_eq!(scale_count(4, 100), 3);
        assert_eq!(scale_count(15, 15), 4);
        assert_eq!(scale_count(16, 16), 5);
        assert_eq!(scale_count(1920, 1080), 5);
        for scales in 1..=MS_SSIM_MAX_SCALES {
            let sum: f64 = scale_weights(scales).iter().sum();
            assert!((sum - 1.0).abs() < 1e-3, "{scales}: {sum}");
        }
    }

    #[test]
    fn test_prescale_factor() {
        assert_eq!(prescale_factor(176, 144), 1);
        assert_eq!(prescale_factor(1920, 1080), 4);
        assert_eq!(prescale_factor(1280, 720), 3);
    }

    #[test]
    fn test_box_downsample() {
        let src = ImgVec::new(vec![0.0, 2.0, 4.0, 4.0, 6.0, 8.0, 1.0, 1.0, 9.0], 3, 3);
        let out = box_downsample(&src, 2);
        assert_eq!((out.width(), out.height()), (1, 1));
        assert_eq!(out.buf()[0], 3.0);
    }
}
