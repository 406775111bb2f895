//! Histogram-based global thresholding (Otsu's method).

use super::region::{PIXEL_BLACK, PIXEL_WHITE};

/// Compute the Otsu threshold over the central region of the image. The
/// outer 20% margin on each side is excluded so vignetting and border
/// artifacts don't skew the split; the resulting level is applied to every
/// pixel regardless.
pub(crate) fn otsu_threshold(image: &[u8], width: usize, height: usize) -> u8 {
    let margin_x = width / 5;
    let margin_y = height / 5;

    let mut histogram = [0u32; 256];
    for y in margin_y..height - margin_y {
        let row = &image[y * width + margin_x..(y + 1) * width - margin_x];
        for &px in row {
            histogram[px as usize] += 1;
        }
    }

    let num_pixels: u64 = histogram.iter().map(|&c| c as u64).sum();
    let sum: u64 = histogram
        .iter()
        .enumerate()
        .map(|(i, &c)| i as u64 * c as u64)
        .sum();

    // Maximize between-class variance. The comparison is >=, so among tied
    // splits the highest level wins.
    let mut sum_b = 0u64;
    let mut q1 = 0u64;
    let mut max_variance = 0.0f64;
    let mut threshold = 0u8;

    for (i, &count) in histogram.iter().enumerate() {
        q1 += count as u64;
        if q1 == 0 {
            continue;
        }
        let q2 = num_pixels - q1;
        if q2 == 0 {
            break;
        }
        sum_b += i as u64 * count as u64;

        let m1 = sum_b as f64 / q1 as f64;
        let m2 = (sum - sum_b) as f64 / q2 as f64;
        let d = m1 - m2;
        let variance = d * d * q1 as f64 * q2 as f64;
        if variance >= max_variance {
            threshold = i as u8;
            max_variance = variance;
        }
    }

    threshold
}

/// Binarize the full image into the label buffer: 1 for black, 0 for white.
/// `inverted` flips the comparison so a light-on-dark symbol reads as a
/// normal one on the second pass.
pub(crate) fn binarize(image: &[u8], pixels: &mut [u8], width: usize, height: usize, inverted: bool) {
    let t = otsu_threshold(image, width, height);
    for (dst, &src) in pixels.iter_mut().zip(image.iter()) {
        let black = if inverted { src > t } else { src <= t };
        *dst = if black { PIXEL_BLACK } else { PIXEL_WHITE };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bimodal_split() {
        // Dark half at 40, light half at 200: the threshold must land
        // between the modes and classify each side accordingly.
        let mut image = vec![40u8; 16 * 8];
        image.extend(vec![200u8; 16 * 8]);
        let t = otsu_threshold(&image, 16, 16);
        assert!((40..200).contains(&t), "threshold {}", t);

        let mut pixels = vec![0u8; 16 * 16];
        binarize(&image, &mut pixels, 16, 16, false);
        assert_eq!(pixels[0], PIXEL_BLACK);
        assert_eq!(pixels[16 * 16 - 1], PIXEL_WHITE);
    }

    #[test]
    fn test_margin_excluded_from_histogram() {
        // A 20x20 image whose outer 20% band is saturated white; only the
        // central bimodal block should drive the threshold.
        let mut image = vec![255u8; 20 * 20];
        for y in 4..16 {
            for x in 4..16 {
                image[y * 20 + x] = if x < 10 { 10 } else { 90 };
            }
        }
        let t = otsu_threshold(&image, 20, 20);
        assert!((10..90).contains(&t), "threshold {}", t);
    }

    #[test]
    fn test_idempotent_on_labels() {
        // Thresholding an already-binarized buffer: Otsu on a {0,1} image
        // splits exactly between the labels, and the inverted comparison
        // maps label 1 back to black and 0 back to white.
        let mut image = vec![120u8; 32 * 32];
        for (i, px) in image.iter_mut().enumerate() {
            if i % 3 == 0 {
                *px = 30;
            }
        }
        let mut labels = vec![0u8; 32 * 32];
        binarize(&image, &mut labels, 32, 32, false);

        let t = otsu_threshold(&labels, 32, 32);
        assert_eq!(t, 0);
        let mut relabeled = vec![0u8; 32 * 32];
        binarize(&labels, &mut relabeled, 32, 32, true);
        assert_eq!(labels, relabeled);
    }

    #[test]
    fn test_inverted_flips_classes() {
        let mut image = vec![40u8; 16 * 8];
        image.extend(vec![200u8; 16 * 8]);
        let mut normal = vec![0u8; 16 * 16];
        let mut inverted = vec![0u8; 16 * 16];
        binarize(&image, &mut normal, 16, 16, false);
        binarize(&image, &mut inverted, 16, 16, true);
        for (a, b) in normal.iter().zip(inverted.iter()) {
            assert_ne!(a, b);
        }
    }
}
