use image::{GrayImage, Luma};
use imageproc::geometric_transformations::{warp_into, Interpolation, Projection};
use imageproc::point::Point;
use tracing::debug;

use crate::config::RectifyConfig;
use crate::detection::{contours, geometry, preprocessing};
use crate::error::{Result, SheetError};
use crate::models::RawImage;

/// Top-down view of one card
#[derive(Debug, Clone)]
pub struct RectifiedCard {
    pub image: GrayImage,
    /// Sampled source corners: top-left, top-right, bottom-right, bottom-left
    pub corners: [Point<f32>; 4],
}

impl RectifiedCard {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Finds the card outline in a photo and undoes its perspective
#[derive(Debug, Clone, Default)]
pub struct CardRectifier {
    pub config: RectifyConfig,
}

impl CardRectifier {
    pub fn new(config: RectifyConfig) -> Self {
        Self { config }
    }

    pub fn rectify(&self, img: &RawImage) -> Result<RectifiedCard> {
        let gray = preprocessing::to_grayscale(img);
        let corners = self.locate_card(&gray)?;
        warp_card(&gray, corners)
    }

    /// Corners of the largest contour that simplifies to a quadrilateral,
    /// moved inwards by `outline_inset` so they sit on the card itself
    pub fn locate_card(&self, gray: &GrayImage) -> Result<[Point<f32>; 4]> {
        let blurred = preprocessing::apply_blur(gray, self.config.blur_sigma);
        let edges = preprocessing::detect_edges(&blurred, self.config.canny_low, self.config.canny_high);
        let edges = preprocessing::close_gaps(&edges, self.config.edge_dilation);

        let mut outlines: Vec<_> = contours::find_external_contours(&edges)
            .into_iter()
            .map(|c| (c.area(), c))
            .collect();
        outlines.sort_by(|a, b| b.0.total_cmp(&a.0));
        debug!(contours = outlines.len(), "Searching for card outline");

        for (area, contour) in &outlines {
            let epsilon = self.config.approx_tolerance * contour.perimeter();
            let polygon = geometry::approximate_closed_polygon(&contour.points, epsilon);
            if polygon.len() == 4 {
                debug!(area, ?polygon, "Card outline found");
                let corners = [0, 1, 2, 3].map(|i| Point::new(polygon[i].x as f32, polygon[i].y as f32));
                let ordered = geometry::order_corners(corners);
                return geometry::inset_quad(ordered, self.config.outline_inset).ok_or(SheetError::CardNotFound);
            }
        }

        Err(SheetError::CardNotFound)
    }
}

/// Output size for a quadrilateral: the longer of each pair of opposite
/// edges, floored, never below one pixel
pub fn rectified_size(corners: &[Point<f32>; 4]) -> (u32, u32) {
    let [tl, tr, br, bl] = *corners;

    let bottom = geometry::distance(br, bl) as u32;
    let top = geometry::distance(tr, tl) as u32;
    let right = geometry::distance(tr, br) as u32;
    let left = geometry::distance(tl, bl) as u32;

    (bottom.max(top).max(1), right.max(left).max(1))
}

/// Resample `gray` so the ordered `corners` land on the corners of an
/// axis-aligned rectangle
pub fn warp_card(gray: &GrayImage, corners: [Point<f32>; 4]) -> Result<RectifiedCard> {
    let (width, height) = rectified_size(&corners);
    if width < 2 || height < 2 {
        return Err(SheetError::CardNotFound);
    }
    let right = (width - 1) as f32;
    let bottom = (height - 1) as f32;

    let source = corners.map(|p| (p.x, p.y));
    let target = [(0.0, 0.0), (right, 0.0), (right, bottom), (0.0, bottom)];

    // Collinear corners leave no unique homography
    let projection = Projection::from_control_points(source, target).ok_or(SheetError::CardNotFound)?;

    let mut image = GrayImage::new(width, height);
    warp_into(gray, &projection, Interpolation::Bilinear, Luma([0]), &mut image);
    debug!(width, height, "Card rectified");

    Ok(RectifiedCard { image, corners })
}
