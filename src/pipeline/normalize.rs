//! Image normalisation: force a rasterised page to black text on white.
//!
//! The transform is fixed and runs in four steps:
//!
//! ```text
//! RGB ──▶ grayscale ──▶ invert ──▶ autocontrast(1%) ──▶ threshold(>200) ──▶ RGB
//! ```
//!
//! The invert step undoes a white-on-black scan; autocontrast removes the
//! washed-out grays scanners leave behind; the threshold snaps everything to
//! pure black or pure white. Whether the invert step runs for a given page
//! is decided by [`PolarityPolicy::needs_inversion`].
//!
//! Every function here is pure: it returns a new buffer and never touches
//! its input.

use crate::config::PolarityPolicy;
use crate::pipeline::render::RasterImage;
use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};
use tracing::debug;

/// Share of pixels clipped from each end of the histogram, in percent.
pub const AUTOCONTRAST_CUTOFF_PERCENT: u64 = 1;

/// Gray levels strictly above this become white; the rest become black.
pub const WHITE_THRESHOLD: u8 = 200;

/// A bilevel page ready for PDF embedding.
#[derive(Debug, Clone)]
pub struct NormalizedImage {
    /// 1-indexed page number in the source PDF.
    pub page: u32,
    /// Every pixel is `[0, 0, 0]` or `[255, 255, 255]`.
    pub image: RgbImage,
    /// Whether the invert step ran for this page.
    pub inverted: bool,
}

/// Run the full transform on one rasterised page.
pub fn normalize(raster: &RasterImage, policy: PolarityPolicy) -> NormalizedImage {
    let gray = to_grayscale(&raster.image);
    let mean = mean_luma(&gray);
    let inverted = policy.needs_inversion(mean);
    debug!(
        "Page {}: mean luma {:.1}, inverting: {}",
        raster.page, mean, inverted
    );

    NormalizedImage {
        page: raster.page,
        image: normalize_gray(gray, inverted),
        inverted,
    }
}

/// Run the full transform, always inverting.
pub fn normalize_image(img: &DynamicImage) -> RgbImage {
    normalize_gray(to_grayscale(img), true)
}

fn normalize_gray(gray: GrayImage, invert_first: bool) -> RgbImage {
    let gray = if invert_first { invert(&gray) } else { gray };
    let stretched = autocontrast(&gray, AUTOCONTRAST_CUTOFF_PERCENT);
    let bilevel = threshold(&stretched, WHITE_THRESHOLD);
    to_rgb(&bilevel)
}

/// Step 1: single-channel luminance with ITU-R 601-2 weights
/// (`L = R*299/1000 + G*587/1000 + B*114/1000`), in 16-bit fixed point.
///
/// Alpha is dropped.
pub fn to_grayscale(img: &DynamicImage) -> GrayImage {
    let rgb = img.to_rgb8();
    GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
        let Rgb([r, g, b]) = *rgb.get_pixel(x, y);
        Luma([luma_601(r, g, b)])
    })
}

fn luma_601(r: u8, g: u8, b: u8) -> u8 {
    let l = (r as u32 * 19595 + g as u32 * 38470 + b as u32 * 7471 + 0x8000) >> 16;
    l as u8
}

/// Step 2: `255 - v` per pixel.
pub fn invert(gray: &GrayImage) -> GrayImage {
    let mut out = gray.clone();
    for p in out.pixels_mut() {
        p.0[0] = 255 - p.0[0];
    }
    out
}

/// Step 3: clip `cutoff_percent` of pixels from each end of the histogram
/// and stretch what remains to 0–255.
///
/// The clip count is `floor(pixels * cutoff / 100)` per side. When the
/// surviving range collapses to a single level the image is returned
/// unchanged.
pub fn autocontrast(gray: &GrayImage, cutoff_percent: u64) -> GrayImage {
    let lut = autocontrast_lut(&histogram(gray), cutoff_percent);
    let mut out = gray.clone();
    for p in out.pixels_mut() {
        p.0[0] = lut[p.0[0] as usize];
    }
    out
}

fn histogram(gray: &GrayImage) -> [u64; 256] {
    let mut hist = [0u64; 256];
    for p in gray.pixels() {
        hist[p.0[0] as usize] += 1;
    }
    hist
}

fn autocontrast_lut(hist: &[u64; 256], cutoff_percent: u64) -> [u8; 256] {
    let mut h = *hist;
    let total: u64 = h.iter().sum();
    let cut = total * cutoff_percent / 100;

    trim(h.iter_mut(), cut);
    trim(h.iter_mut().rev(), cut);

    let lo = h.iter().position(|&c| c > 0);
    let hi = h.iter().rposition(|&c| c > 0);

    let mut lut = [0u8; 256];
    match (lo, hi) {
        (Some(lo), Some(hi)) if hi > lo => {
            let scale = 255.0 / (hi - lo) as f64;
            let offset = -(lo as f64) * scale;
            for (v, slot) in lut.iter_mut().enumerate() {
                let mapped = (v as f64 * scale + offset) as i64;
                *slot = mapped.clamp(0, 255) as u8;
            }
        }
        _ => {
            for (v, slot) in lut.iter_mut().enumerate() {
                *slot = v as u8;
            }
        }
    }
    lut
}

/// Remove `cut` pixels from the histogram, walking bins in iterator order.
fn trim<'a>(bins: impl Iterator<Item = &'a mut u64>, mut cut: u64) {
    for bin in bins {
        if cut == 0 {
            break;
        }
        let take = cut.min(*bin);
        *bin -= take;
        cut -= take;
    }
}

/// Step 4: `v > level` → 255, else 0.
pub fn threshold(gray: &GrayImage, level: u8) -> GrayImage {
    let mut out = gray.clone();
    for p in out.pixels_mut() {
        p.0[0] = if p.0[0] > level { 255 } else { 0 };
    }
    out
}

/// Re-express a grayscale image in three channels for PDF embedding.
pub fn to_rgb(gray: &GrayImage) -> RgbImage {
    RgbImage::from_fn(gray.width(), gray.height(), |x, y| {
        let Luma([v]) = *gray.get_pixel(x, y);
        Rgb([v, v, v])
    })
}

/// Mean gray level; 0 for an empty image.
pub fn mean_luma(gray: &GrayImage) -> f64 {
    let n = gray.width() as u64 * gray.height() as u64;
    if n == 0 {
        return 0.0;
    }
    let sum: u64 = gray.pixels().map(|p| p.0[0] as u64).sum();
    sum as f64 / n as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    /// White page with a black 20x10 "text" block in the middle.
    fn clean_scan() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(100, 100, |x, y| {
            if (40..60).contains(&x) && (45..55).contains(&y) {
                Rgb([0, 0, 0])
            } else {
                Rgb([255, 255, 255])
            }
        }))
    }

    /// Dark-gray page with light-gray text, as a bad scan of an inverted page.
    fn inverted_scan() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(100, 100, |x, y| {
            if (40..60).contains(&x) && (45..55).contains(&y) {
                Rgb([180, 180, 180])
            } else {
                Rgb([30, 30, 30])
            }
        }))
    }

    fn is_bilevel(img: &RgbImage) -> bool {
        img.pixels()
            .all(|p| p.0 == [0, 0, 0] || p.0 == [255, 255, 255])
    }

    fn white_share(img: &RgbImage) -> f64 {
        let white = img.pixels().filter(|p| p.0 == [255, 255, 255]).count();
        white as f64 / (img.width() * img.height()) as f64
    }

    #[test]
    fn grayscale_is_single_channel() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(2, 2, Rgb([255, 255, 255])));
        let gray = to_grayscale(&img);
        assert_eq!(gray.get_pixel(0, 0).0, [255]);
    }

    #[test]
    fn grayscale_uses_601_weights() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_fn(3, 1, |x, _| {
            [Rgb([255, 0, 0]), Rgb([0, 255, 0]), Rgb([0, 0, 255])][x as usize]
        }));
        assert_eq!(to_grayscale(&img).as_raw(), &vec![76, 150, 29]);
    }

    #[test]
    fn grayscale_keeps_gray_levels() {
        let gray = GrayImage::from_fn(256, 1, |x, _| Luma([x as u8]));
        assert_eq!(to_grayscale(&DynamicImage::ImageLuma8(gray.clone())), gray);
    }

    #[test]
    fn red_marks_turn_black() {
        // 4 black, 1 red, 5 white: no clipping at 10 pixels, so the
        // inverted red (179) sits below the threshold.
        let img = DynamicImage::ImageRgb8(RgbImage::from_fn(10, 1, |x, _| match x {
            0..=3 => Rgb([0, 0, 0]),
            4 => Rgb([255, 0, 0]),
            _ => Rgb([255, 255, 255]),
        }));
        let out = normalize_image(&img);
        assert_eq!(out.get_pixel(4, 0).0, [0, 0, 0]);
        assert_eq!(out.get_pixel(0, 0).0, [255, 255, 255]);
        assert_eq!(out.get_pixel(9, 0).0, [0, 0, 0]);
    }

    #[test]
    fn invert_flips_levels() {
        let gray = GrayImage::from_fn(3, 1, |x, _| Luma([[0, 100, 255][x as usize]]));
        let out = invert(&gray);
        assert_eq!(out.as_raw(), &vec![255, 155, 0]);
        // input untouched
        assert_eq!(gray.as_raw(), &vec![0, 100, 255]);
    }

    #[test]
    fn autocontrast_stretches_to_full_range() {
        // 50..=101, no clipping: scale 5, offset -250
        let gray = GrayImage::from_fn(52, 1, |x, _| Luma([50 + x as u8]));
        let out = autocontrast(&gray, 0);
        assert_eq!(out.get_pixel(0, 0).0, [0]);
        assert_eq!(out.get_pixel(51, 0).0, [255]);
        assert_eq!(out.get_pixel(25, 0).0, [125]);
    }

    #[test]
    fn autocontrast_clips_outliers() {
        // 10_000 pixels at 100..=149 (200 each), plus 50 at 0 and 50 at 255.
        let mut gray = GrayImage::from_fn(100, 101, |x, _| Luma([100 + (x % 50) as u8]));
        for x in 0..50 {
            gray.put_pixel(x, 100, Luma([0]));
        }
        for x in 50..100 {
            gray.put_pixel(x, 100, Luma([255]));
        }
        let out = autocontrast(&gray, 1);
        // 101 pixels clipped per side swallow the outliers, so the stretch
        // runs from 100 to 149 instead of 0 to 255.
        assert_eq!(out.get_pixel(0, 0).0, [0]);
        assert_eq!(out.get_pixel(49, 0).0, [255]);
        assert!(out.get_pixel(25, 0).0[0] > 100);
        assert_eq!(out.get_pixel(0, 100).0, [0]);
        assert_eq!(out.get_pixel(99, 100).0, [255]);
    }

    #[test]
    fn autocontrast_flat_image_is_identity() {
        let gray = GrayImage::from_pixel(10, 10, Luma([77]));
        assert_eq!(autocontrast(&gray, 1), gray);
    }

    #[test]
    fn threshold_boundary() {
        let gray = GrayImage::from_fn(3, 1, |x, _| Luma([[200, 201, 0][x as usize]]));
        assert_eq!(threshold(&gray, WHITE_THRESHOLD).as_raw(), &vec![0, 255, 0]);
    }

    #[test]
    fn threshold_idempotent_on_bilevel() {
        let once = threshold(&to_grayscale(&clean_scan()), WHITE_THRESHOLD);
        let twice = threshold(&once, WHITE_THRESHOLD);
        assert_eq!(once, twice);
    }

    #[test]
    fn inverted_scan_becomes_black_on_white() {
        let out = normalize_image(&inverted_scan());
        assert!(is_bilevel(&out));
        assert!(white_share(&out) > 0.9, "share = {}", white_share(&out));
        // the text block is black
        assert_eq!(out.get_pixel(50, 50).0, [0, 0, 0]);
        assert_eq!(out.get_pixel(5, 5).0, [255, 255, 255]);
    }

    #[test]
    fn clean_scan_comes_out_white_on_black() {
        let out = normalize_image(&clean_scan());
        assert!(is_bilevel(&out));
        assert!(white_share(&out) < 0.1);
    }

    #[test]
    fn applying_twice_restores_clean_bilevel_scan() {
        let original = clean_scan();
        let once = normalize_image(&original);
        let twice = normalize_image(&DynamicImage::ImageRgb8(once));
        assert_eq!(twice, original.to_rgb8());
    }

    #[test]
    fn deterministic() {
        let img = inverted_scan();
        assert_eq!(normalize_image(&img), normalize_image(&img));
    }

    #[test]
    fn auto_policy_skips_light_pages() {
        let raster = RasterImage {
            page: 4,
            image: clean_scan(),
        };
        let out = normalize(&raster, PolarityPolicy::Auto);
        assert_eq!(out.page, 4);
        assert!(!out.inverted);
        assert!(white_share(&out.image) > 0.9);

        let out = normalize(&raster, PolarityPolicy::Always);
        assert!(out.inverted);
        assert!(white_share(&out.image) < 0.1);
    }

    #[test]
    fn auto_policy_inverts_dark_pages() {
        let raster = RasterImage {
            page: 1,
            image: inverted_scan(),
        };
        let out = normalize(&raster, PolarityPolicy::Auto);
        assert!(out.inverted);
        assert!(white_share(&out.image) > 0.9);
    }

    #[test]
    fn mean_luma_of_empty_image() {
        assert_eq!(mean_luma(&GrayImage::new(0, 0)), 0.0);
        assert_eq!(mean_luma(&GrayImage::from_pixel(2, 2, Luma([10]))), 10.0);
    }
}
