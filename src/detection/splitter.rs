use image::imageops;
use tracing::debug;

use crate::config::SplitConfig;
use crate::detection::{contours, preprocessing};
use crate::models::RawImage;

/// Decides whether a photo holds one card or two stacked cards
#[derive(Debug, Clone, Default)]
pub struct SheetSplitter {
    pub config: SplitConfig,
}

impl SheetSplitter {
    pub fn new(config: SplitConfig) -> Self {
        Self { config }
    }

    /// Split a tall photo into its top and bottom cards when both halves
    /// look like a card; otherwise return the whole image as the only card.
    pub fn split(&self, img: &RawImage) -> Vec<RawImage> {
        let (width, height) = img.dimensions();
        if (height as f32) < width as f32 * self.config.min_height_ratio {
            return vec![img.clone()];
        }

        let midpoint = height / 2;
        let top = imageops::crop_imm(img, 0, 0, width, midpoint).to_image();
        let bottom = imageops::crop_imm(img, 0, midpoint, width, height - midpoint).to_image();

        let top_bubbles = self.count_bubbles(&top);
        let bottom_bubbles = self.count_bubbles(&bottom);
        debug!(top_bubbles, bottom_bubbles, "Bubble density per half");

        if top_bubbles > self.config.min_bubbles && bottom_bubbles > self.config.min_bubbles {
            vec![top, bottom]
        } else {
            vec![img.clone()]
        }
    }

    /// Number of bubble-shaped contours under local-adaptive binarization
    pub fn count_bubbles(&self, region: &RawImage) -> usize {
        let gray = preprocessing::to_grayscale(region);
        let binary = preprocessing::adaptive_threshold_inv(
            &gray,
            self.config.adaptive_block_size,
            self.config.adaptive_offset,
        );

        contours::find_external_contours(&binary)
            .iter()
            .filter(|c| self.config.bubble.admits(&c.bounding_box()))
            .count()
    }
}
