use crate::types::{BatchKind, CandidateItem, Result};
use async_trait::async_trait;
use std::time::Duration;

/// Source of raw thumbnail bytes for an asset.
#[async_trait]
pub trait ThumbnailSource: Send + Sync {
    async fn fetch(&self, item: &CandidateItem) -> Result<Vec<u8>>;
}

/// Vision model that turns an image into a description.
#[async_trait]
pub trait CaptionModel: Send + Sync {
    /// `image_base64` is a standard-alphabet base64 JPEG.
    async fn infer(&self, image_base64: &str, model: &str) -> Result<String>;
}

/// The relational store holding assets and their descriptions.
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Up to `kind.limit()` candidates, newest first, leaving out the ids in
    /// `exclude`. An empty vec means nothing qualifies.
    async fn next_batch(&self, kind: BatchKind, exclude: &[String]) -> Result<Vec<CandidateItem>>;

    /// Overwrites the description of one asset.
    async fn write_description(&self, item: &CandidateItem, description: &str) -> Result<()>;
}

/// Suspends the watch loop between polls.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
