#![allow(dead_code)]

// In-memory collaborators for exercising the loop and the benchmark
// without a database, photo server or GPU.

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use photo_captioner::{
    AssetStore, BatchKind, CaptionModel, CaptionPipeline, CaptionerError, CandidateItem, Result, Sleeper,
    ThumbnailSource,
};
use std::collections::{HashMap, HashSet, VecDeque};
use std::io::Cursor;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

pub fn items(ids: &[&str]) -> Vec<CandidateItem> {
    ids.iter().map(|id| CandidateItem::new(*id)).collect()
}

pub fn sample_image(format: ImageFormat) -> Vec<u8> {
    let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 8, Rgb([200, 120, 40])));
    let mut cursor = Cursor::new(Vec::new());
    image.write_to(&mut cursor, format).unwrap();
    cursor.into_inner()
}

/// Store that answers `next_batch` from a script of batches, then with empty batches.
#[derive(Default)]
pub struct ScriptedStore {
    batches: Mutex<VecDeque<Vec<CandidateItem>>>,
    queries: Mutex<Vec<BatchKind>>,
    writes: Mutex<Vec<(String, String)>>,
    failing_writes: Mutex<HashSet<String>>,
    query_error: Mutex<Option<String>>,
}

impl ScriptedStore {
    pub fn new(batches: Vec<Vec<CandidateItem>>) -> Self {
        Self {
            batches: Mutex::new(batches.into()),
            ..Default::default()
        }
    }

    pub fn fail_writes_for(self, id: &str) -> Self {
        self.failing_writes.lock().unwrap().insert(id.to_string());
        self
    }

    pub fn fail_queries(self, message: &str) -> Self {
        *self.query_error.lock().unwrap() = Some(message.to_string());
        self
    }

    pub fn queries(&self) -> Vec<BatchKind> {
        self.queries.lock().unwrap().clone()
    }

    pub fn writes(&self) -> Vec<(String, String)> {
        self.writes.lock().unwrap().clone()
    }
}

#[async_trait]
impl AssetStore for ScriptedStore {
    async fn next_batch(&self, kind: BatchKind, exclude: &[String]) -> Result<Vec<CandidateItem>> {
        self.queries.lock().unwrap().push(kind);
        if let Some(message) = self.query_error.lock().unwrap().clone() {
            return Err(CaptionerError::StoreQuery(sqlx::Error::Protocol(message)));
        }
        let mut batch = self.batches.lock().unwrap().pop_front().unwrap_or_default();
        batch.retain(|item| !exclude.contains(&item.id));
        batch.truncate(kind.limit());
        Ok(batch)
    }

    async fn write_description(&self, item: &CandidateItem, description: &str) -> Result<()> {
        if self.failing_writes.lock().unwrap().contains(&item.id) {
            return Err(CaptionerError::StoreWrite(sqlx::Error::PoolTimedOut));
        }
        self.writes
            .lock()
            .unwrap()
            .push((item.id.clone(), description.to_string()));
        Ok(())
    }
}

/// Store that behaves like the real query: every undescribed id, newest
/// first, minus the excluded ids, cut to the batch limit. Writes describe.
pub struct BacklogStore {
    undescribed: Mutex<Vec<String>>,
    queries: Mutex<usize>,
}

impl BacklogStore {
    pub fn new(newest_first: Vec<String>) -> Self {
        Self {
            undescribed: Mutex::new(newest_first),
            queries: Mutex::new(0),
        }
    }

    pub fn remaining(&self) -> Vec<String> {
        self.undescribed.lock().unwrap().clone()
    }

    pub fn queries(&self) -> usize {
        *self.queries.lock().unwrap()
    }
}

#[async_trait]
impl AssetStore for BacklogStore {
    async fn next_batch(&self, kind: BatchKind, exclude: &[String]) -> Result<Vec<CandidateItem>> {
        *self.queries.lock().unwrap() += 1;
        Ok(self
            .undescribed
            .lock()
            .unwrap()
            .iter()
            .filter(|id| !exclude.contains(id))
            .take(kind.limit())
            .map(|id| CandidateItem::new(id.clone()))
            .collect())
    }

    async fn write_description(&self, item: &CandidateItem, _description: &str) -> Result<()> {
        self.undescribed.lock().unwrap().retain(|id| id != &item.id);
        Ok(())
    }
}

/// Thumbnail source with a fixed answer per id; unknown ids get a 404.
#[derive(Default)]
pub struct FakeThumbnails {
    images: HashMap<String, Vec<u8>>,
    fetched: Mutex<Vec<String>>,
}

impl FakeThumbnails {
    pub fn with(mut self, id: &str, bytes: Vec<u8>) -> Self {
        self.images.insert(id.to_string(), bytes);
        self
    }

    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

#[async_trait]
impl ThumbnailSource for FakeThumbnails {
    async fn fetch(&self, item: &CandidateItem) -> Result<Vec<u8>> {
        self.fetched.lock().unwrap().push(item.id.clone());
        self.images
            .get(&item.id)
            .cloned()
            .ok_or(CaptionerError::RemoteStatus {
                status: 404,
                body: "Not Found".to_string(),
            })
    }
}

/// Model that answers with a fixed caption, except for models told to fail.
pub struct FakeModel {
    caption: String,
    failing_models: HashSet<String>,
    calls: Mutex<Vec<(String, String)>>,
}

impl FakeModel {
    pub fn answering(caption: &str) -> Self {
        Self {
            caption: caption.to_string(),
            failing_models: HashSet::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_for(mut self, model: &str) -> Self {
        self.failing_models.insert(model.to_string());
        self
    }

    /// (model, base64 image) per call, in order.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CaptionModel for FakeModel {
    async fn infer(&self, image_base64: &str, model: &str) -> Result<String> {
        self.calls
            .lock()
            .unwrap()
            .push((model.to_string(), image_base64.to_string()));
        if self.failing_models.contains(model) {
            return Err(CaptionerError::RemoteStatus {
                status: 500,
                body: "model not loaded".to_string(),
            });
        }
        Ok(self.caption.clone())
    }
}

/// Records requested durations and returns immediately.
#[derive(Default)]
pub struct RecordingSleeper {
    sleeps: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
    }
}

pub fn pipeline(thumbnails: &Arc<FakeThumbnails>, model: &Arc<FakeModel>) -> CaptionPipeline {
    CaptionPipeline::new(thumbnails.clone(), model.clone())
}
