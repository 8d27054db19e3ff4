use std::time::Duration;

use serde::{Deserialize, Serialize};

/// One image asset in the photo store. Only the identifier is ever read.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CandidateItem {
    pub id: String,
}

impl CandidateItem {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

impl From<&str> for CandidateItem {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Which candidate query to run against the store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BatchKind {
    /// Images still missing a description.
    Undescribed,
    /// Most recent images regardless of description, used as a benchmark sample.
    BenchmarkSample,
}

impl BatchKind {
    pub const UNDESCRIBED_LIMIT: usize = 100;
    pub const BENCHMARK_SAMPLE_LIMIT: usize = 5;

    pub fn limit(self) -> usize {
        match self {
            BatchKind::Undescribed => Self::UNDESCRIBED_LIMIT,
            BatchKind::BenchmarkSample => Self::BENCHMARK_SAMPLE_LIMIT,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunMode {
    /// Sweep until nothing is left, then exit.
    Normal,
    /// Sweep, then sleep and poll again forever.
    Watch,
    /// Compare several models on a fixed sample without writing anything.
    Benchmark,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WatchRest {
    pub wait_at_least: Duration,
}

// Wire records for the chat endpoint of the inference server.

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
    pub options: ChatOptions,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ChatOptions {
    pub num_predict: u32,
    pub temperature: f64,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ChatResponse {
    pub message: ChatResponseMessage,
    #[serde(default)]
    pub done: bool,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ChatResponseMessage {
    #[serde(default)]
    pub content: String,
}

// Object style note:
// Everything in this module is plain data shared between the captioner crate
// and its tests. Behaviour (HTTP, SQL, codecs) lives with the implementations.
