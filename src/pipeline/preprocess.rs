//! Page image clean-up ahead of OCR.
//!
//! Camera-scanned statements arrive tilted, low-contrast and soft. Tesseract
//! does markedly better on an upright, high-contrast, sharp grayscale image
//! with a short side of at least 1200 px, so every OCR page goes through:
//!
//! 1. deskew (optional): rotate by the minimum-area-rectangle angle of the dark pixels
//! 2. grayscale
//! 3. contrast ×2.0 around the mean luminance
//! 4. sharpness ×1.5 against a 3×3 smoothing kernel
//! 5. Lanczos upscale when the short side is under 1200 px
//!
//! All steps are pure functions over `image` buffers; the geometry and the
//! 3×3 filter come from `imageproc`.

use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, Luma};
use imageproc::filter::filter3x3;
use imageproc::geometric_transformations::{rotate_about_center, Interpolation};
use imageproc::geometry::{convex_hull, min_area_rect};
use imageproc::point::Point;
use tracing::debug;

pub const CONTRAST_FACTOR: f32 = 2.0;
pub const SHARPNESS_FACTOR: f32 = 1.5;
pub const MIN_SHORT_SIDE: u32 = 1200;

/// Luminance below which a pixel counts as ink for skew estimation.
const DARK_THRESHOLD: u8 = 128;
/// Fewer dark pixels than this and the page is left as it is.
const MIN_DARK_PIXELS: usize = 100;
/// Smaller corrections only blur the page.
const MIN_SKEW_DEGREES: f64 = 0.5;

/// Run the full clean-up chain on one rendered page.
pub fn preprocess(image: &DynamicImage, deskew: bool) -> DynamicImage {
    let mut gray = image.to_luma8();

    if deskew {
        if let Some(angle) = estimate_skew(&gray) {
            debug!("Deskewing page by {:.2}°", angle);
            gray = straighten(&gray, angle);
        }
    }

    let gray = adjust_contrast(&gray, CONTRAST_FACTOR);
    let gray = adjust_sharpness(&gray, SHARPNESS_FACTOR);
    DynamicImage::ImageLuma8(upscale_to_min_side(gray, MIN_SHORT_SIDE))
}

// ── Deskew ──────────────────────────────────────────────────────────────────

/// Skew of the ink on a page in degrees, normalised to (-45, 45].
///
/// Returns `None` when there is too little ink to judge or the page is
/// already within half a degree of upright.
pub fn estimate_skew(gray: &GrayImage) -> Option<f64> {
    let (dark, extremes) = row_extremes(gray);
    if dark < MIN_DARK_PIXELS {
        return None;
    }
    let hull = convex_hull(extremes);
    if hull.len() < 3 {
        return None;
    }
    let angle = rect_edge_angle(&min_area_rect(&hull));
    if angle.abs() < MIN_SKEW_DEGREES {
        None
    } else {
        Some(angle)
    }
}

/// Count dark pixels and keep, per row, only the leftmost and rightmost.
/// Interior points never lie on the convex hull.
fn row_extremes(gray: &GrayImage) -> (usize, Vec<Point<i32>>) {
    let mut count = 0usize;
    let mut points = Vec::new();
    for (y, row) in gray.enumerate_rows() {
        let mut first = None;
        let mut last = None;
        for (x, _, pixel) in row {
            if pixel[0] < DARK_THRESHOLD {
                count += 1;
                first.get_or_insert(x);
                last = Some(x);
            }
        }
        if let (Some(f), Some(l)) = (first, last) {
            points.push(Point::new(f as i32, y as i32));
            if l != f {
                points.push(Point::new(l as i32, y as i32));
            }
        }
    }
    (count, points)
}

/// Angle of the longer side of `rect`, folded into (-45, 45].
/// Corners are integer so the longer side carries less rounding error.
fn rect_edge_angle(rect: &[Point<i32>; 4]) -> f64 {
    let edge = |a: Point<i32>, b: Point<i32>| ((b.x - a.x) as f64, (b.y - a.y) as f64);
    let first = edge(rect[0], rect[1]);
    let second = edge(rect[1], rect[2]);
    let (dx, dy) = if first.0.hypot(first.1) >= second.0.hypot(second.1) {
        first
    } else {
        second
    };
    normalize_angle(dy.atan2(dx).to_degrees())
}

/// Fold a rectangle edge angle into (-45, 45]. Edges at θ and θ+90° describe
/// the same rectangle.
fn normalize_angle(degrees: f64) -> f64 {
    let mut a = degrees % 90.0;
    if a > 45.0 {
        a -= 90.0;
    } else if a <= -45.0 {
        a += 90.0;
    }
    a
}

/// Undo a skew of `degrees` (clockwise positive, as returned by
/// [`estimate_skew`]). Same dimensions; uncovered corners are filled white.
pub fn straighten(gray: &GrayImage, degrees: f64) -> GrayImage {
    rotate_about_center(
        gray,
        (-degrees).to_radians() as f32,
        Interpolation::Bilinear,
        Luma([255]),
    )
}

// ── Enhancement ─────────────────────────────────────────────────────────────

/// 3×3 smoothing weights. Integer so flat regions sum back exactly.
const SMOOTH_KERNEL: [i32; 9] = [1, 1, 1, 1, 5, 1, 1, 1, 1];
const SMOOTH_KERNEL_SUM: f32 = 13.0;

fn clamp_u8(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

/// Stretch each pixel away from the rounded mean luminance by `factor`.
pub fn adjust_contrast(gray: &GrayImage, factor: f32) -> GrayImage {
    let n = gray.len();
    if n == 0 {
        return gray.clone();
    }
    let sum: u64 = gray.as_raw().iter().map(|&v| v as u64).sum();
    let mean = (sum as f64 / n as f64 + 0.5).floor() as f32;

    let mut out = gray.clone();
    for p in out.pixels_mut() {
        p[0] = clamp_u8(mean + factor * (p[0] as f32 - mean));
    }
    out
}

/// Blend each pixel against its 3×3 smoothed value (centre weight 5, others 1).
/// Border pixels have no full neighbourhood and pass through.
pub fn adjust_sharpness(gray: &GrayImage, factor: f32) -> GrayImage {
    let (w, h) = gray.dimensions();
    let mut out = gray.clone();
    if w < 3 || h < 3 {
        return out;
    }

    let weighted = filter3x3::<Luma<u8>, i32, i16>(gray, &SMOOTH_KERNEL);
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let centre = gray.get_pixel(x, y)[0] as f32;
            let smooth = weighted.get_pixel(x, y)[0] as f32 / SMOOTH_KERNEL_SUM;
            out.put_pixel(x, y, Luma([clamp_u8(smooth + factor * (centre - smooth))]));
        }
    }
    out
}

/// Lanczos upscale so the short side reaches `min_side`; larger images pass through.
pub fn upscale_to_min_side(gray: GrayImage, min_side: u32) -> GrayImage {
    let (w, h) = gray.dimensions();
    let short = w.min(h);
    if short == 0 || short >= min_side {
        return gray;
    }
    let scale = min_side as f64 / short as f64;
    let nw = (w as f64 * scale).round() as u32;
    let nh = (h as f64 * scale).round() as u32;
    debug!("Upscaling {}x{} → {}x{}", w, h, nw, nh);
    imageops::resize(&gray, nw, nh, FilterType::Lanczos3)
}
