use image::GrayImage;
use imageproc::contours::{find_contours, BorderType};

use crate::models::Contour;

/// Trace the outermost borders of the foreground (non-zero) regions.
///
/// Borders nested inside another region's hole are skipped, so a ring and
/// whatever it encloses yield one contour. Order is unspecified and an
/// empty result is valid.
pub fn find_external_contours(binary: &GrayImage) -> Vec<Contour> {
    find_contours::<i32>(binary)
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .filter(|c| !c.points.is_empty())
        .map(|c| Contour::new(c.points))
        .collect()
}
