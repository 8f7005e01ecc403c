mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from bubblecard for tests
pub use bubblecard::{
    Answer, BubbleGridDecoder, CardOutcome, CardRectifier, ErrorKind, ProcessingOutcome,
    SheetPipeline, SheetSplitter, SheetUpload,
};
