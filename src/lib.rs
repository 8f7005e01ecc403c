pub mod config;
pub mod detection;
pub mod error;
pub mod grading;
pub mod models;
pub mod pipeline;

pub use config::{BubbleWindow, GridLayout, PipelineConfig, RectifyConfig, SplitConfig};
pub use detection::{BubbleGridDecoder, CardRectifier, RectifiedCard, SheetSplitter};
pub use error::{ErrorKind, SheetError};
pub use models::{
    Answer, AnswerEntry, BoundingBox, BubbleCandidate, CardOutcome, Contour, Failure,
    ProcessingOutcome, QuestionRow, RawImage, SheetResult, SheetUpload,
};
pub use pipeline::{DebugConfig, SheetPipeline};
