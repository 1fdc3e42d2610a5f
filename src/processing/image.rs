use crate::models::Rotation;
use crate::utils::{AdaptiveParams, ScanError};
use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, Luma, RgbImage};
use imageproc::contrast::threshold;

/// ImageProcessor holds the pixel-level transforms used to prepare card photos for OCR.
///
/// Every transform takes its input buffer by value and hands back a new buffer, so a
/// preprocessing chain reads as a sequence of ownership transfers. None of them fail on
/// a buffer with non-zero dimensions.
pub struct ImageProcessor;

const MID_INTENSITY: u8 = 128;

impl ImageProcessor {
    /// Decode raw image bytes into an RGB buffer, rejecting empty images.
    pub fn decode(image_bytes: &[u8]) -> Result<RgbImage, ScanError> {
        let image = image::load_from_memory(image_bytes)
            .map_err(|e| ScanError::UnusableImage(format!("Failed to load image: {}", e)))?;
        Self::from_dynamic(image)
    }

    pub fn from_dynamic(image: DynamicImage) -> Result<RgbImage, ScanError> {
        let rgb = image.to_rgb8();
        let (width, height) = rgb.dimensions();
        if width == 0 || height == 0 {
            return Err(ScanError::UnusableImage(format!(
                "Degenerate image dimensions: {}x{}",
                width, height
            )));
        }
        Ok(rgb)
    }

    /// Luminance conversion with the 0.299/0.587/0.114 weights, rounded to nearest.
    pub fn grayscale(image: RgbImage) -> GrayImage {
        let (width, height) = image.dimensions();
        GrayImage::from_fn(width, height, |x, y| {
            let [r, g, b] = image.get_pixel(x, y).0;
            let luma = 0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32;
            Luma([luma.round().min(255.0) as u8])
        })
    }

    /// Upscale so the short side reaches `target_min_dim`, keeping the long side
    /// within `max_long_side`. Never downscales.
    pub fn rescale(image: GrayImage, target_min_dim: u32, max_long_side: u32) -> GrayImage {
        let (width, height) = image.dimensions();
        let min_dim = width.min(height);
        let max_dim = width.max(height);
        if min_dim == 0 || min_dim >= target_min_dim {
            return image;
        }

        let scale = (target_min_dim as f64 / min_dim as f64)
            .min(max_long_side as f64 / max_dim as f64);
        if scale <= 1.0 {
            return image;
        }
        let new_width = ((width as f64 * scale).round() as u32).clamp(1, max_long_side);
        let new_height = ((height as f64 * scale).round() as u32).clamp(1, max_long_side);
        imageops::resize(&image, new_width, new_height, FilterType::CatmullRom)
    }

    pub fn rotate(image: GrayImage, rotation: Rotation) -> GrayImage {
        match rotation {
            Rotation::Deg0 => image,
            Rotation::Deg90 => imageops::rotate90(&image),
            Rotation::Deg180 => imageops::rotate180(&image),
            Rotation::Deg270 => imageops::rotate270(&image),
        }
    }

    /// Percentile contrast stretch (2nd..98th) followed by a symmetric S-curve.
    pub fn contrast_stretch(image: GrayImage) -> GrayImage {
        let hist = Self::histogram(&image);
        let total: u64 = hist.iter().sum();
        let low_cut = total as f64 * 0.02;
        let high_cut = total as f64 * 0.98;

        let mut low = 0usize;
        let mut high = 255usize;
        let mut cumulative = 0u64;
        for (level, count) in hist.iter().enumerate() {
            cumulative += count;
            if (cumulative as f64) < low_cut {
                low = level;
            }
            if (cumulative as f64) < high_cut {
                high = level;
            }
        }

        let range = if high > low { (high - low) as f32 } else { 1.0 };
        let mut lut = [0u8; 256];
        for (value, slot) in lut.iter_mut().enumerate() {
            let val = ((value as f32 - low as f32) / range).clamp(0.0, 1.0);
            let curved = if val < 0.5 {
                2.0 * val * val
            } else {
                1.0 - 2.0 * (1.0 - val) * (1.0 - val)
            };
            *slot = (curved * 255.0).round().clamp(0.0, 255.0) as u8;
        }

        Self::map_levels(image, &lut)
    }

    /// Global threshold maximizing between-class variance.
    pub fn otsu_level(image: &GrayImage) -> u8 {
        let hist = Self::histogram(image);
        let total: u64 = hist.iter().sum();
        let sum: f64 = hist
            .iter()
            .enumerate()
            .map(|(level, count)| level as f64 * *count as f64)
            .sum();

        let mut sum_b = 0.0f64;
        let mut weight_b = 0u64;
        let mut max_variance = 0.0f64;
        let mut level = MID_INTENSITY;

        for (t, count) in hist.iter().enumerate() {
            weight_b += count;
            if weight_b == 0 {
                continue;
            }
            let weight_f = total - weight_b;
            if weight_f == 0 {
                break;
            }

            sum_b += t as f64 * *count as f64;
            let mean_b = sum_b / weight_b as f64;
            let mean_f = (sum - sum_b) / weight_f as f64;
            let variance = weight_b as f64 * weight_f as f64 * (mean_b - mean_f).powi(2);

            if variance > max_variance {
                max_variance = variance;
                level = t as u8;
            }
        }

        level
    }

    pub fn otsu_threshold(image: GrayImage) -> GrayImage {
        let level = Self::otsu_level(&image);
        threshold(&image, level)
    }

    /// Local mean binarization backed by a summed-area table.
    /// A pixel turns white when it exceeds the mean of its window minus `params.c`.
    pub fn adaptive_threshold(image: GrayImage, params: AdaptiveParams) -> GrayImage {
        let (width, height) = image.dimensions();
        let w = width as usize;
        let h = height as usize;
        let stride = w + 1;

        // integral[(y + 1) * stride + (x + 1)] = sum of pixels in [0..=x] x [0..=y]
        let mut integral = vec![0u64; stride * (h + 1)];
        for y in 0..h {
            let mut row_sum = 0u64;
            for x in 0..w {
                row_sum += image.get_pixel(x as u32, y as u32)[0] as u64;
                integral[(y + 1) * stride + x + 1] = integral[y * stride + x + 1] + row_sum;
            }
        }

        let half = (params.block_size / 2) as usize;
        let c = params.c as f64;

        GrayImage::from_fn(width, height, |x, y| {
            let (x, y) = (x as usize, y as usize);
            let x1 = x.saturating_sub(half);
            let y1 = y.saturating_sub(half);
            let x2 = (x + half).min(w - 1);
            let y2 = (y + half).min(h - 1);

            let area = ((x2 - x1 + 1) * (y2 - y1 + 1)) as f64;
            let sum = integral[(y2 + 1) * stride + x2 + 1] + integral[y1 * stride + x1]
                - integral[y1 * stride + x2 + 1]
                - integral[(y2 + 1) * stride + x1];
            let mean = sum as f64 / area;

            let value = image.get_pixel(x as u32, y as u32)[0] as f64;
            Luma([if value > mean - c { 255 } else { 0 }])
        })
    }

    /// Fraction of pixels below mid intensity.
    pub fn dark_ratio(image: &GrayImage) -> f32 {
        let total = image.width() as u64 * image.height() as u64;
        if total == 0 {
            return 0.0;
        }
        let dark = image.pixels().filter(|p| p[0] < MID_INTENSITY).count() as u64;
        dark as f32 / total as f32
    }

    pub fn is_mostly_dark(image: &GrayImage, limit: f32) -> bool {
        Self::dark_ratio(image) > limit
    }

    pub fn invert(mut image: GrayImage) -> GrayImage {
        imageops::invert(&mut image);
        image
    }

    /// Flip light-on-dark output so text ends up dark on a light background.
    pub fn correct_polarity(image: GrayImage, limit: f32) -> GrayImage {
        if Self::is_mostly_dark(&image, limit) {
            Self::invert(image)
        } else {
            image
        }
    }

    fn histogram(image: &GrayImage) -> [u64; 256] {
        let mut hist = [0u64; 256];
        for pixel in image.pixels() {
            hist[pixel[0] as usize] += 1;
        }
        hist
    }

    fn map_levels(mut image: GrayImage, lut: &[u8; 256]) -> GrayImage {
        for pixel in image.pixels_mut() {
            pixel[0] = lut[pixel[0] as usize];
        }
        image
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn is_binary(image: &GrayImage) -> bool {
        image.pixels().all(|p| p[0] == 0 || p[0] == 255)
    }

    fn gradient(width: u32, height: u32) -> GrayImage {
        GrayImage::from_fn(width, height, |x, y| Luma([((x * 7 + y * 13) % 256) as u8]))
    }

    #[test]
    fn test_grayscale_weights() {
        let mut rgb = RgbImage::new(3, 1);
        rgb.put_pixel(0, 0, Rgb([255, 0, 0]));
        rgb.put_pixel(1, 0, Rgb([0, 255, 0]));
        rgb.put_pixel(2, 0, Rgb([255, 255, 255]));
        let gray = ImageProcessor::grayscale(rgb);
        assert_eq!(gray.get_pixel(0, 0)[0], 76);
        assert_eq!(gray.get_pixel(1, 0)[0], 150);
        assert_eq!(gray.get_pixel(2, 0)[0], 255);
    }

    #[test]
    fn test_rescale_reaches_target_and_never_downscales() {
        let small = GrayImage::new(200, 100);
        let scaled = ImageProcessor::rescale(small, 1400, 6000);
        assert_eq!(scaled.dimensions(), (2800, 1400));

        let large = GrayImage::new(2000, 1500);
        let untouched = ImageProcessor::rescale(large, 1400, 6000);
        assert_eq!(untouched.dimensions(), (2000, 1500));
    }

    #[test]
    fn test_rescale_bounds_long_thin_strips() {
        let strip = GrayImage::from_pixel(1, 20000, Luma([200]));
        let unchanged = ImageProcessor::rescale(strip, 1400, 6000);
        assert_eq!(unchanged.dimensions(), (1, 20000));

        let narrow = GrayImage::from_pixel(10, 1000, Luma([200]));
        let (width, height) = ImageProcessor::rescale(narrow, 1400, 6000).dimensions();
        assert_eq!((width, height), (60, 6000));
    }

    #[test]
    fn test_rotation_round_trips() {
        let image = gradient(7, 4);

        let quarter = ImageProcessor::rotate(image.clone(), Rotation::Deg90);
        assert_eq!(quarter.dimensions(), (4, 7));
        let back = ImageProcessor::rotate(quarter, Rotation::Deg270);
        assert_eq!(back, image);

        let mut spun = image.clone();
        for _ in 0..4 {
            spun = ImageProcessor::rotate(spun, Rotation::Deg90);
        }
        assert_eq!(spun, image);

        let half = ImageProcessor::rotate(image.clone(), Rotation::Deg180);
        assert_eq!(half.dimensions(), image.dimensions());
        assert_eq!(half.get_pixel(0, 0), image.get_pixel(6, 3));
    }

    #[test]
    fn test_adaptive_threshold_is_binary() {
        let params = AdaptiveParams { block_size: 31, c: 12 };
        let one = GrayImage::from_pixel(1, 1, Luma([90]));
        assert!(is_binary(&ImageProcessor::adaptive_threshold(one, params)));

        let flat = GrayImage::from_pixel(40, 25, Luma([200]));
        let flat_out = ImageProcessor::adaptive_threshold(flat, params);
        assert!(is_binary(&flat_out));
        assert!(flat_out.pixels().all(|p| p[0] == 255));

        let noisy = ImageProcessor::adaptive_threshold(
            gradient(64, 33),
            AdaptiveParams { block_size: 15, c: 8 },
        );
        assert!(is_binary(&noisy));
    }

    #[test]
    fn test_adaptive_threshold_survives_uneven_lighting() {
        // Dark strokes on a background that brightens from left to right
        let image = GrayImage::from_fn(120, 40, |x, y| {
            let background = 90 + (x as u32 * 150 / 120) as u8;
            if y >= 18 && y < 22 && x % 20 < 10 {
                Luma([background.saturating_sub(70)])
            } else {
                Luma([background])
            }
        });
        let params = AdaptiveParams { block_size: 15, c: 8 };
        let out = ImageProcessor::adaptive_threshold(image, params);
        assert_eq!(out.get_pixel(5, 20)[0], 0);
        assert_eq!(out.get_pixel(105, 20)[0], 0);
        assert_eq!(out.get_pixel(5, 5)[0], 255);
        assert_eq!(out.get_pixel(105, 5)[0], 255);
    }

    #[test]
    fn test_otsu_recovers_valley_of_bimodal_histogram() {
        // Counts fall linearly towards the middle: 255, 253, ..., 1, 1, ..., 255
        let mut pixels = Vec::new();
        for level in 0u32..256 {
            let count = (2 * level as i32 - 255).unsigned_abs();
            pixels.extend(std::iter::repeat(level as u8).take(count as usize));
        }
        let width = 256;
        let height = (pixels.len() / width) as u32;
        let image = GrayImage::from_raw(width as u32, height, pixels).unwrap();

        let level = ImageProcessor::otsu_level(&image);
        assert!((level as i32 - 127).abs() <= 2, "otsu level {}", level);

        let binary = ImageProcessor::otsu_threshold(image);
        assert!(is_binary(&binary));
    }

    #[test]
    fn test_otsu_on_single_color_does_not_panic() {
        let flat = GrayImage::from_pixel(3, 3, Luma([42]));
        assert_eq!(ImageProcessor::otsu_level(&flat), MID_INTENSITY);
        let binary = ImageProcessor::otsu_threshold(flat);
        assert!(binary.pixels().all(|p| p[0] == 0));
    }

    #[test]
    fn test_contrast_stretch_spreads_range() {
        let image = GrayImage::from_fn(100, 1, |x, _| Luma([100 + (x as u8 / 2)]));
        let stretched = ImageProcessor::contrast_stretch(image);
        let min = stretched.pixels().map(|p| p[0]).min().unwrap();
        let max = stretched.pixels().map(|p| p[0]).max().unwrap();
        assert!(min <= 5, "min {}", min);
        assert!(max >= 250, "max {}", max);

        let flat = ImageProcessor::contrast_stretch(GrayImage::from_pixel(1, 1, Luma([200])));
        assert_eq!(flat.dimensions(), (1, 1));
    }

    #[test]
    fn test_polarity_correction() {
        let dark = GrayImage::from_fn(10, 10, |x, _| Luma([if x < 8 { 0 } else { 255 }]));
        assert!(ImageProcessor::is_mostly_dark(&dark, 0.6));
        let fixed = ImageProcessor::correct_polarity(dark, 0.6);
        assert!((ImageProcessor::dark_ratio(&fixed) - 0.2).abs() < 1e-6);

        let light = GrayImage::from_pixel(4, 4, Luma([255]));
        let kept = ImageProcessor::correct_polarity(light.clone(), 0.6);
        assert_eq!(kept, light);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let err = ImageProcessor::decode(b"definitely not an image").unwrap_err();
        assert!(matches!(err, ScanError::UnusableImage(_)));
    }
}
