use std::collections::BTreeMap;
use std::fmt;

use imageproc::geometry::{arc_length, contour_area};
use imageproc::point::Point;
use serde::{Serialize, Serializer};

use crate::error::ErrorKind;

/// Decoded 3-channel input image
pub type RawImage = image::RgbImage;

/// Identity fields emitted until roster matching exists
pub const PLACEHOLDER_STUDENT_ID: &str = "01";
pub const PLACEHOLDER_EXAM_VERSION: &str = "A";

/// Wire value for a row without a mark
pub const NO_SELECTION: &str = "N/A";

/// Axis-aligned box in pixel coordinates, inclusive of both edges
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn aspect_ratio(&self) -> f32 {
        if self.height == 0 {
            return 0.0;
        }
        self.width as f32 / self.height as f32
    }
}

/// Traced outer boundary of one foreground region
#[derive(Debug, Clone)]
pub struct Contour {
    pub points: Vec<Point<i32>>,
}

impl Contour {
    pub fn new(points: Vec<Point<i32>>) -> Self {
        Self { points }
    }

    pub fn bounding_box(&self) -> BoundingBox {
        let Some(first) = self.points.first() else {
            return BoundingBox { x: 0, y: 0, width: 0, height: 0 };
        };

        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for p in &self.points[1..] {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }

        BoundingBox {
            x: min_x.max(0) as u32,
            y: min_y.max(0) as u32,
            width: (max_x - min_x + 1) as u32,
            height: (max_y - min_y + 1) as u32,
        }
    }

    /// Enclosed polygon area (shoelace over the boundary points)
    pub fn area(&self) -> f64 {
        contour_area(&self.points)
    }

    /// Closed boundary length
    pub fn perimeter(&self) -> f64 {
        arc_length(&self.points, true)
    }
}

/// A contour sized and shaped like a single answer bubble
#[derive(Debug, Clone)]
pub struct BubbleCandidate {
    pub contour: Contour,
    pub bbox: BoundingBox,
}

impl BubbleCandidate {
    pub fn new(contour: Contour) -> Self {
        let bbox = contour.bounding_box();
        Self { contour, bbox }
    }

    pub fn centroid(&self) -> (f32, f32) {
        (
            self.bbox.x as f32 + self.bbox.width as f32 / 2.0,
            self.bbox.y as f32 + self.bbox.height as f32 / 2.0,
        )
    }
}

/// The choice bubbles of one question, ordered left to right
#[derive(Debug, Clone)]
pub struct QuestionRow {
    pub number: u32,
    pub bubbles: Vec<BubbleCandidate>,
}

/// The decoded value of one question
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    Choice(char),
    NoSelection,
}

impl Answer {
    /// Maps a left-to-right bubble index to its letter (0 → 'A')
    pub fn from_index(index: usize) -> Self {
        match u8::try_from(index) {
            Ok(i) if i < 26 => Answer::Choice((b'A' + i) as char),
            _ => Answer::NoSelection,
        }
    }

    pub fn letter(&self) -> Option<char> {
        match self {
            Answer::Choice(c) => Some(*c),
            Answer::NoSelection => None,
        }
    }
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Answer::Choice(c) => write!(f, "{}", c),
            Answer::NoSelection => f.write_str(NO_SELECTION),
        }
    }
}

impl Serialize for Answer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnswerEntry {
    pub question: u32,
    pub answer: Answer,
}

/// Decoded answers of one physical card
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetResult {
    pub student_id: String,
    pub exam_version: String,
    pub answers: BTreeMap<u32, Answer>,
}

impl SheetResult {
    pub fn from_entries(entries: impl IntoIterator<Item = AnswerEntry>) -> Self {
        Self {
            student_id: PLACEHOLDER_STUDENT_ID.to_string(),
            exam_version: PLACEHOLDER_EXAM_VERSION.to_string(),
            answers: entries.into_iter().map(|e| (e.question, e.answer)).collect(),
        }
    }

    /// Entries in question order
    pub fn entries(&self) -> impl Iterator<Item = AnswerEntry> + '_ {
        self.answers
            .iter()
            .map(|(&question, &answer)| AnswerEntry { question, answer })
    }

    pub fn answer(&self, question: u32) -> Option<Answer> {
        self.answers.get(&question).copied()
    }
}

/// Why a card or an image produced no answers
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Failure {
    pub kind: ErrorKind,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CardOutcome {
    Decoded(SheetResult),
    Failed(Failure),
}

/// One record per (input image, detected card), or per image when the image
/// never reached splitting
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingOutcome {
    pub filename: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card_index: Option<usize>,
    #[serde(flatten)]
    pub outcome: CardOutcome,
}

impl ProcessingOutcome {
    pub fn sheet(&self) -> Option<&SheetResult> {
        match &self.outcome {
            CardOutcome::Decoded(sheet) => Some(sheet),
            CardOutcome::Failed(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&Failure> {
        match &self.outcome {
            CardOutcome::Decoded(_) => None,
            CardOutcome::Failed(failure) => Some(failure),
        }
    }
}

/// One uploaded answer-sheet file
#[derive(Debug, Clone)]
pub struct SheetUpload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl SheetUpload {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            bytes,
        }
    }
}
