//! Error types for metadata crawling.

use thiserror::Error;

/// Errors that can occur while crawling a metadata service.
///
/// Below the top level these are never propagated: they are stored as
/// [`MetadataNode::Failure`](crate::MetadataNode::Failure) at the position
/// where they happened.
#[derive(Debug, Error)]
pub enum MetadataError {
    /// The metadata service answered 404.
    #[error("not found")]
    NotFound,

    /// The request could not be built or sent, or timed out.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The response body could not be read.
    #[error("reading body failed: {0}")]
    Body(#[source] reqwest::Error),

    /// JSON deserialization error.
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Response exceeds maximum allowed size.
    #[error("response too large: {0} bytes exceeds limit of {1} bytes")]
    TooLarge(usize, usize),

    /// Directory nesting went past the configured depth.
    #[error("directory depth exceeds limit of {0}")]
    DepthExceeded(usize),
}

/// Coarse classification of a [`MetadataError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Upstream returned not-found.
    NotFound,
    /// Request construction or network failure.
    Transport,
    /// Body read or decode failure.
    Parse,
    /// A configured size or depth limit was hit.
    Limit,
}

impl MetadataError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            MetadataError::NotFound => ErrorKind::NotFound,
            MetadataError::Request(_) => ErrorKind::Transport,
            MetadataError::Body(_) | MetadataError::Json(_) | MetadataError::Io(_) => {
                ErrorKind::Parse
            }
            MetadataError::TooLarge(..) | MetadataError::DepthExceeded(_) => ErrorKind::Limit,
        }
    }

    /// Returns `true` for [`MetadataError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, MetadataError::NotFound)
    }
}
