use std::fmt;

// Shared data definitions live in the interfaces crate.
pub use interfaces::defs::{BatchKind, CandidateItem, RunMode, WatchRest};
pub use interfaces::defs::{ChatMessage, ChatOptions, ChatRequest, ChatResponse};

#[derive(Debug, thiserror::Error)]
pub enum CaptionerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Database connection failed: {0}")]
    StoreConnect(#[source] sqlx::Error),

    #[error("Database query failed: {0}")]
    StoreQuery(#[source] sqlx::Error),

    #[error("Database write failed: {0}")]
    StoreWrite(#[source] sqlx::Error),

    #[error("HTTP error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    RemoteStatus { status: u16, body: String },

    #[error("Failed to decode image: {0}")]
    ImageDecode(#[source] image::ImageError),

    #[error("Failed to encode JPEG: {0}")]
    ImageEncode(#[source] image::ImageError),

    #[error("Failed to decode response: {0}")]
    ResponseDecode(#[from] serde_json::Error),

    #[error("Model {model} returned an incomplete response")]
    IncompleteResponse { model: String },
}

impl CaptionerError {
    /// Errors that end the whole run rather than a single item.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            CaptionerError::Config(_)
                | CaptionerError::InvalidUrl(_)
                | CaptionerError::StoreConnect(_)
                | CaptionerError::StoreQuery(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, CaptionerError>;

/// The per-item pipeline step an error happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Download,
    Convert,
    Infer,
    Persist,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Download => "download",
            Stage::Convert => "convert",
            Stage::Infer => "infer",
            Stage::Persist => "persist",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("{stage} failed: {source}")]
pub struct StageFailure {
    pub stage: Stage,
    #[source]
    pub source: CaptionerError,
}

impl StageFailure {
    pub fn new(stage: Stage, source: CaptionerError) -> Self {
        Self { stage, source }
    }
}

/// Skipped items broken down by the stage that failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageCounts {
    pub download: usize,
    pub convert: usize,
    pub infer: usize,
    pub persist: usize,
}

impl StageCounts {
    pub fn record(&mut self, stage: Stage) {
        match stage {
            Stage::Download => self.download += 1,
            Stage::Convert => self.convert += 1,
            Stage::Infer => self.infer += 1,
            Stage::Persist => self.persist += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.download + self.convert + self.infer + self.persist
    }
}

impl fmt::Display for StageCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "download={} convert={} infer={} persist={}",
            self.download, self.convert, self.infer, self.persist
        )
    }
}
