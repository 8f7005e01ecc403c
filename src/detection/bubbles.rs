use image::{GrayImage, Luma};
use imageproc::drawing::draw_polygon_mut;
use imageproc::point::Point;
use tracing::debug;

use crate::config::GridLayout;
use crate::detection::{contours, preprocessing};
use crate::models::{Answer, AnswerEntry, BubbleCandidate, QuestionRow, SheetResult};

/// Reads the marked choice of every question row on a rectified card
#[derive(Debug, Clone, Default)]
pub struct BubbleGridDecoder {
    pub layout: GridLayout,
}

impl BubbleGridDecoder {
    pub fn new(layout: GridLayout) -> Self {
        Self { layout }
    }

    pub fn decode(&self, rectified: &GrayImage) -> SheetResult {
        let binary = self.binarize(rectified);
        let rows = self.question_rows(&binary);

        let sheet = SheetResult::from_entries(rows.iter().map(|row| AnswerEntry {
            question: row.number,
            answer: self.marked_choice(&binary, row),
        }));
        debug!(questions = sheet.answers.len(), "Answer grid decoded");
        sheet
    }

    /// Ink as foreground at the global Otsu level
    pub fn binarize(&self, rectified: &GrayImage) -> GrayImage {
        let binary = preprocessing::otsu_threshold_inv(rectified);
        if self.layout.clear_border {
            preprocessing::clear_border(&binary)
        } else {
            binary
        }
    }

    /// Contours of the binarized card shaped like a single bubble
    pub fn bubble_candidates(&self, binary: &GrayImage) -> Vec<BubbleCandidate> {
        contours::find_external_contours(binary)
            .into_iter()
            .map(BubbleCandidate::new)
            .filter(|c| self.layout.bubble.admits(&c.bbox))
            .collect()
    }

    /// Group the bottom-most bubbles into rows, top to bottom, each row
    /// ordered left to right and numbered from 1
    pub fn question_rows(&self, binary: &GrayImage) -> Vec<QuestionRow> {
        let mut candidates = self.bubble_candidates(binary);
        candidates.sort_by_key(|c| c.bbox.y);

        let start = candidates.len().saturating_sub(self.layout.answer_bubbles());
        debug!(
            candidates = candidates.len(),
            answer_bubbles = candidates.len() - start,
            "Bubble candidates found"
        );

        candidates[start..]
            .chunks(self.layout.choices_per_row)
            .zip(1u32..)
            .map(|(chunk, number)| {
                let mut bubbles = chunk.to_vec();
                bubbles.sort_by_key(|c| c.bbox.x);
                QuestionRow { number, bubbles }
            })
            .collect()
    }

    /// The left-most bubble with the strictly highest fill above the
    /// threshold, or no selection
    pub fn marked_choice(&self, binary: &GrayImage, row: &QuestionRow) -> Answer {
        let (_, best_index) = row
            .bubbles
            .iter()
            .enumerate()
            .fold((0u32, None), |(best_score, best_index), (i, bubble)| {
                let score = fill_score(binary, bubble);
                if score > best_score && score > self.layout.fill_threshold {
                    (score, Some(i))
                } else {
                    (best_score, best_index)
                }
            });

        best_index.map_or(Answer::NoSelection, Answer::from_index)
    }
}

/// Foreground pixels of `binary` inside the bubble's outline
pub fn fill_score(binary: &GrayImage, bubble: &BubbleCandidate) -> u32 {
    let mask = contour_mask(bubble);
    let (ox, oy) = (bubble.bbox.x, bubble.bbox.y);

    mask.enumerate_pixels()
        .filter(|(_, _, m)| m[0] != 0)
        .filter(|(x, y, _)| {
            let (bx, by) = (ox + x, oy + y);
            bx < binary.width() && by < binary.height() && binary.get_pixel(bx, by)[0] != 0
        })
        .count() as u32
}

/// Filled outline of a bubble, in coordinates local to its bounding box
fn contour_mask(bubble: &BubbleCandidate) -> GrayImage {
    let bbox = bubble.bbox;
    let mut mask = GrayImage::new(bbox.width, bbox.height);

    let mut outline: Vec<Point<i32>> = bubble
        .contour
        .points
        .iter()
        .map(|p| Point::new(p.x - bbox.x as i32, p.y - bbox.y as i32))
        .collect();
    outline.dedup();
    while outline.len() > 1 && outline.first() == outline.last() {
        outline.pop();
    }

    if outline.len() >= 3 {
        draw_polygon_mut(&mut mask, &outline, Luma([255]));
    }
    for p in &outline {
        if p.x >= 0 && p.y >= 0 && (p.x as u32) < bbox.width && (p.y as u32) < bbox.height {
            mask.put_pixel(p.x as u32, p.y as u32, Luma([255]));
        }
    }
    mask
}
