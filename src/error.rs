use serde::Serialize;

/// Errors raised by the sheet-processing stages
#[derive(Debug, thiserror::Error)]
pub enum SheetError {
    /// No four-sided card outline was found (or it could not be rectified)
    #[error("could not find the answer card outline in the image")]
    CardNotFound,

    /// The uploaded bytes are not a readable image
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    /// Any other per-image fault
    #[error("critical failure while processing image: {0}")]
    Unexpected(String),

    /// A pipeline policy is unusable
    #[error("invalid pipeline configuration: {0}")]
    InvalidConfig(String),
}

impl SheetError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SheetError::CardNotFound => ErrorKind::CardNotFound,
            SheetError::Decode(_) => ErrorKind::DecodeFailure,
            SheetError::Unexpected(_) | SheetError::InvalidConfig(_) => ErrorKind::UnexpectedFailure,
        }
    }
}

/// Failure category reported alongside each failed outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    CardNotFound,
    DecodeFailure,
    UnexpectedFailure,
}

pub type Result<T, E = SheetError> = std::result::Result<T, E>;
