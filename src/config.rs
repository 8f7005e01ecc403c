use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

use crate::error::SheetError;
use crate::models::BoundingBox;

/// Size and shape window a bounding box must fall in to count as a bubble.
/// Side limits are exclusive, aspect limits inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct BubbleWindow {
    pub min_side: u32,
    pub max_side: u32,
    pub min_aspect: f32,
    pub max_aspect: f32,
}

impl BubbleWindow {
    pub fn admits(&self, bbox: &BoundingBox) -> bool {
        let aspect = bbox.aspect_ratio();
        self.min_side < bbox.width
            && bbox.width < self.max_side
            && self.min_side < bbox.height
            && bbox.height < self.max_side
            && aspect >= self.min_aspect
            && aspect <= self.max_aspect
    }

    fn validate(&self, name: &str) -> Result<(), SheetError> {
        if self.min_side >= self.max_side || self.min_aspect > self.max_aspect || self.min_aspect <= 0.0 {
            return Err(SheetError::InvalidConfig(format!("{} bubble window is empty", name)));
        }
        Ok(())
    }
}

/// Two-cards-per-photo detection
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    /// Split is only considered when height >= width * ratio
    pub min_height_ratio: f32,
    pub bubble: BubbleWindow,
    /// A half holds a card when its bubble count exceeds this
    pub min_bubbles: usize,
    /// Adaptive threshold neighbourhood (odd, pixels)
    pub adaptive_block_size: u32,
    /// Subtracted from the local mean before comparing
    pub adaptive_offset: i16,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            min_height_ratio: 1.2,
            bubble: BubbleWindow {
                min_side: 10,
                max_side: 40,
                min_aspect: 0.7,
                max_aspect: 1.3,
            },
            min_bubbles: 20,
            adaptive_block_size: 11,
            adaptive_offset: 2,
        }
    }
}

/// Card outline search and perspective correction
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RectifyConfig {
    pub blur_sigma: f32,
    pub canny_low: f32,
    pub canny_high: f32,
    /// Radius used to close pinholes in the edge map (0 disables)
    pub edge_dilation: u8,
    /// Polygon approximation tolerance as a fraction of the perimeter
    pub approx_tolerance: f64,
    /// Pixels the located corners are pulled inwards. The traced outline
    /// runs along the outside of the edge band: one Canny pixel on the
    /// background side plus the dilation radius.
    pub outline_inset: f32,
}

impl Default for RectifyConfig {
    fn default() -> Self {
        Self {
            blur_sigma: 1.1,
            canny_low: 75.0,
            canny_high: 200.0,
            edge_dilation: 1,
            approx_tolerance: 0.02,
            outline_inset: 2.0,
        }
    }
}

/// Answer grid layout assumed by the decoder: the bottom-most
/// `rows * choices_per_row` bubbles, grouped row by row.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GridLayout {
    pub rows: usize,
    pub choices_per_row: usize,
    pub bubble: BubbleWindow,
    /// A bubble counts as marked only above this many foreground pixels
    pub fill_threshold: u32,
    /// Drop foreground touching the card edge before looking for bubbles.
    /// Off by default: a bubble cut by the card edge would vanish and shift
    /// every row of the trailing window.
    pub clear_border: bool,
}

impl GridLayout {
    pub fn answer_bubbles(&self) -> usize {
        self.rows * self.choices_per_row
    }
}

impl Default for GridLayout {
    fn default() -> Self {
        Self {
            rows: 10,
            choices_per_row: 5,
            bubble: BubbleWindow {
                min_side: 20,
                max_side: 40,
                min_aspect: 0.8,
                max_aspect: 1.2,
            },
            fill_threshold: 200,
            clear_border: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub split: SplitConfig,
    pub rectify: RectifyConfig,
    pub grid: GridLayout,
}

impl PipelineConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), SheetError> {
        self.split.bubble.validate("split")?;
        self.grid.bubble.validate("grid")?;

        if self.split.min_height_ratio <= 0.0 {
            return Err(SheetError::InvalidConfig("min_height_ratio must be positive".into()));
        }
        if self.split.adaptive_block_size < 3 || self.split.adaptive_block_size % 2 == 0 {
            return Err(SheetError::InvalidConfig(
                "adaptive_block_size must be odd and at least 3".into(),
            ));
        }
        if self.rectify.approx_tolerance <= 0.0 {
            return Err(SheetError::InvalidConfig("approx_tolerance must be positive".into()));
        }
        if !self.rectify.outline_inset.is_finite() || self.rectify.outline_inset < 0.0 {
            return Err(SheetError::InvalidConfig("outline_inset must not be negative".into()));
        }
        if self.rectify.canny_low > self.rectify.canny_high {
            return Err(SheetError::InvalidConfig("canny_low exceeds canny_high".into()));
        }
        if self.grid.rows == 0 || self.grid.choices_per_row == 0 {
            return Err(SheetError::InvalidConfig("grid needs at least one row and one choice".into()));
        }
        if self.grid.choices_per_row > 26 {
            return Err(SheetError::InvalidConfig("at most 26 choices per row are supported".into()));
        }
        Ok(())
    }
}
