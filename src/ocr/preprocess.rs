use image::imageops::{self, FilterType};
use image::{GrayImage, Luma, RgbaImage};

/// Contrast factor applied before recognition.
pub const CONTRAST_FACTOR: f32 = 2.0;
/// Sharpness factor applied before recognition.
pub const SHARPNESS_FACTOR: f32 = 2.0;
/// Upscale factor applied last.
pub const UPSCALE: u32 = 3;

/// Prepares a captured region for Tesseract.
///
/// Grayscale, then contrast and sharpness boosted around their neutral point,
/// then upscaled with Lanczos3 so small HUD digits become legible.
pub fn enhance_for_ocr(img: &RgbaImage) -> GrayImage {
    let gray = imageops::grayscale(img);
    let contrasted = enhance_contrast(&gray, CONTRAST_FACTOR);
    let sharpened = enhance_sharpness(&contrasted, SHARPNESS_FACTOR);
    let (w, h) = sharpened.dimensions();
    imageops::resize(&sharpened, w * UPSCALE, h * UPSCALE, FilterType::Lanczos3)
}

/// Scales each pixel's distance from the mean intensity by `factor`.
///
/// A factor of 1.0 returns the input; 0.0 returns a flat mean-gray image.
pub fn enhance_contrast(img: &GrayImage, factor: f32) -> GrayImage {
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 {
        return img.clone();
    }
    let sum: u64 = img.pixels().map(|p| p[0] as u64).sum();
    let mean = (sum as f32 / (w as u64 * h as u64) as f32).round();

    GrayImage::from_fn(w, h, |x, y| {
        let v = img.get_pixel(x, y)[0] as f32;
        Luma([blend(mean, v, factor)])
    })
}

/// Blends between a 3x3 smoothed copy and the original by `factor`.
///
/// Factors above 1.0 push pixels away from their smoothed neighbourhood.
/// Border pixels are left untouched.
pub fn enhance_sharpness(img: &GrayImage, factor: f32) -> GrayImage {
    let (w, h) = img.dimensions();
    if w < 3 || h < 3 {
        return img.clone();
    }

    let mut out = img.clone();
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            // 3x3 smoothing kernel with centre weight 5, total 13
            let mut acc = 0u32;
            for dy in 0..3 {
                for dx in 0..3 {
                    let weight = if dx == 1 && dy == 1 { 5 } else { 1 };
                    acc += weight * img.get_pixel(x + dx - 1, y + dy - 1)[0] as u32;
                }
            }
            let smooth = acc as f32 / 13.0;
            let original = img.get_pixel(x, y)[0] as f32;
            out.put_pixel(x, y, Luma([blend(smooth, original, factor)]));
        }
    }
    out
}

fn blend(base: f32, target: f32, factor: f32) -> u8 {
    (base + (target - base) * factor).round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_enhance_for_ocr_upscales() {
        let img = RgbaImage::from_pixel(20, 8, Rgba([120, 120, 120, 255]));
        let out = enhance_for_ocr(&img);
        assert_eq!(out.dimensions(), (60, 24));
    }

    #[test]
    fn test_contrast_spreads_around_mean() {
        let mut img = GrayImage::new(2, 1);
        img.put_pixel(0, 0, Luma([100]));
        img.put_pixel(1, 0, Luma([140]));

        let out = enhance_contrast(&img, 2.0);
        assert_eq!(out.get_pixel(0, 0)[0], 80);
        assert_eq!(out.get_pixel(1, 0)[0], 160);
    }

    #[test]
    fn test_contrast_clamps() {
        let mut img = GrayImage::new(2, 1);
        img.put_pixel(0, 0, Luma([0]));
        img.put_pixel(1, 0, Luma([255]));

        let out = enhance_contrast(&img, 2.0);
        assert_eq!(out.get_pixel(0, 0)[0], 0);
        assert_eq!(out.get_pixel(1, 0)[0], 255);
    }

    #[test]
    fn test_sharpness_keeps_flat_regions() {
        let img = GrayImage::from_pixel(5, 5, Luma([90]));
        assert_eq!(enhance_sharpness(&img, 2.0), img);
    }

    #[test]
    fn test_sharpness_boosts_isolated_pixel() {
        let mut img = GrayImage::from_pixel(3, 3, Luma([100]));
        img.put_pixel(1, 1, Luma([200]));

        let out = enhance_sharpness(&img, 2.0);
        // smooth = (8*100 + 5*200) / 13 ≈ 138.46, pushed to ≈ 261.5 and clamped
        assert_eq!(out.get_pixel(1, 1)[0], 255);
        assert_eq!(out.get_pixel(0, 0)[0], 100);
    }

    #[test]
    fn test_empty_image_passes_through() {
        let img = GrayImage::new(0, 0);
        assert_eq!(enhance_contrast(&img, 2.0).dimensions(), (0, 0));
    }
}
