use thiserror::Error;

/// Failures crossing the board service boundary.
///
/// An empty snapshot or an empty standings table is not an error and has no
/// variant here.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FeedError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("parse error: {0}")]
    Parse(String),
}

impl FeedError {
    pub fn is_transport(&self) -> bool {
        matches!(self, FeedError::Transport(_))
    }
}

impl From<reqwest::Error> for FeedError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            FeedError::Parse(e.to_string())
        } else {
            FeedError::Transport(e.to_string())
        }
    }
}

impl From<serde_json::Error> for FeedError {
    fn from(e: serde_json::Error) -> Self {
        FeedError::Parse(e.to_string())
    }
}
