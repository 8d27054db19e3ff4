use crate::normalizer::ensure_jpeg;
use crate::traits::{CaptionModel, ThumbnailSource};
use crate::types::{CandidateItem, Stage, StageFailure};
use std::sync::Arc;

/// A thumbnail ready to send to a model.
#[derive(Debug, Clone)]
pub struct PreparedImage {
    pub base64: String,
    pub jpeg_len: usize,
}

/// The per-item capability shared by the enrichment loop and the benchmark:
/// download a thumbnail, normalize it, and ask a model to describe it.
#[derive(Clone)]
pub struct CaptionPipeline {
    thumbnails: Arc<dyn ThumbnailSource>,
    model: Arc<dyn CaptionModel>,
}

impl CaptionPipeline {
    pub fn new(thumbnails: Arc<dyn ThumbnailSource>, model: Arc<dyn CaptionModel>) -> Self {
        Self { thumbnails, model }
    }

    pub async fn prepare(&self, item: &CandidateItem) -> Result<PreparedImage, StageFailure> {
        let raw = self
            .thumbnails
            .fetch(item)
            .await
            .map_err(|e| StageFailure::new(Stage::Download, e))?;

        let jpeg = ensure_jpeg(raw).map_err(|e| StageFailure::new(Stage::Convert, e))?;

        Ok(PreparedImage {
            base64: jpeg.to_base64(),
            jpeg_len: jpeg.bytes.len(),
        })
    }

    pub async fn describe(&self, image: &PreparedImage, model: &str) -> Result<String, StageFailure> {
        self.model
            .infer(&image.base64, model)
            .await
            .map_err(|e| StageFailure::new(Stage::Infer, e))
    }
}
