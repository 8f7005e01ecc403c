pub mod preprocessing;
pub mod contours;
pub mod geometry;
pub mod splitter;
pub mod rectifier;
pub mod bubbles;

pub use bubbles::BubbleGridDecoder;
pub use rectifier::{CardRectifier, RectifiedCard};
pub use splitter::SheetSplitter;
