use image::{GrayImage, Luma, RgbImage};
use imageproc::contrast::{otsu_level, threshold, ThresholdType};
use imageproc::distance_transform::Norm;
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;
use imageproc::morphology::dilate;
use imageproc::region_labelling::{connected_components, Connectivity};
use std::collections::HashSet;

/// Convert image to grayscale
pub fn to_grayscale(img: &RgbImage) -> GrayImage {
    image::imageops::grayscale(img)
}

/// Apply Gaussian blur to reduce noise
pub fn apply_blur(img: &GrayImage, sigma: f32) -> GrayImage {
    gaussian_blur_f32(img, sigma)
}

/// Detect edges using Canny edge detector
pub fn detect_edges(img: &GrayImage, low_threshold: f32, high_threshold: f32) -> GrayImage {
    canny(img, low_threshold, high_threshold)
}

/// Thicken edges so that single-pixel breaks in an outline close up
pub fn close_gaps(edges: &GrayImage, radius: u8) -> GrayImage {
    if radius == 0 {
        return edges.clone();
    }
    dilate(edges, Norm::LInf, radius)
}

/// Gaussian sigma matching a square smoothing window of `block_size` pixels
pub fn block_sigma(block_size: u32) -> f32 {
    0.3 * ((block_size as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

/// Local-adaptive binarization, ink as foreground.
///
/// A pixel is foreground (255) when it is no brighter than its
/// Gaussian-weighted neighbourhood mean minus `offset`.
pub fn adaptive_threshold_inv(img: &GrayImage, block_size: u32, offset: i16) -> GrayImage {
    let local_mean = gaussian_blur_f32(img, block_sigma(block_size));

    GrayImage::from_fn(img.width(), img.height(), |x, y| {
        let value = img.get_pixel(x, y)[0] as i16;
        let limit = local_mean.get_pixel(x, y)[0] as i16 - offset;
        if value <= limit { Luma([255]) } else { Luma([0]) }
    })
}

/// Global binarization at the Otsu level, ink as foreground.
///
/// Pixels at or below the level that best separates the two intensity
/// classes become foreground (255).
pub fn otsu_threshold_inv(img: &GrayImage) -> GrayImage {
    threshold(img, otsu_level(img), ThresholdType::BinaryInverted)
}

/// Remove every foreground region that touches the image border.
///
/// Used for cards whose rectified view still carries a band of photo
/// background; once binarized that band is a closed frame around the card.
pub fn clear_border(binary: &GrayImage) -> GrayImage {
    let (width, height) = binary.dimensions();
    if width == 0 || height == 0 {
        return binary.clone();
    }

    let labeled = connected_components(binary, Connectivity::Eight, Luma([0]));

    let mut touching = HashSet::new();
    for x in 0..width {
        touching.insert(labeled.get_pixel(x, 0)[0]);
        touching.insert(labeled.get_pixel(x, height - 1)[0]);
    }
    for y in 0..height {
        touching.insert(labeled.get_pixel(0, y)[0]);
        touching.insert(labeled.get_pixel(width - 1, y)[0]);
    }
    touching.remove(&0);

    let mut cleared = binary.clone();
    for (x, y, label) in labeled.enumerate_pixels() {
        if touching.contains(&label[0]) {
            cleared.put_pixel(x, y, Luma([0]));
        }
    }
    cleared
}
