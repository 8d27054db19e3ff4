use crate::config::CaptionerConfig;
use crate::pipeline::CaptionPipeline;
use crate::traits::{AssetStore, Sleeper};
use crate::types::{BatchKind, CandidateItem, Result, RunMode, Stage, StageCounts, StageFailure, WatchRest};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The part of the configuration the loop cares about.
#[derive(Debug, Clone)]
pub struct EnrichmentSettings {
    pub model: String,
    pub watch: Option<WatchRest>,
    pub verbose: bool,
}

impl From<&CaptionerConfig> for EnrichmentSettings {
    fn from(config: &CaptionerConfig) -> Self {
        let watch = match config.mode {
            RunMode::Watch => Some(WatchRest {
                wait_at_least: config.watch_interval,
            }),
            RunMode::Normal | RunMode::Benchmark => None,
        };

        Self {
            model: config.model.clone(),
            watch,
            verbose: config.verbose,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Query the store and work through whatever comes back.
    Polling,
    /// Watch mode only: nothing left, wait for the interval.
    Sleeping,
    /// One-shot sweep is done.
    Finished,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub processed: usize,
    pub skipped: StageCounts,
}

/// Polls the store for undescribed images and captions them one at a time.
pub struct EnrichmentLoop {
    store: Arc<dyn AssetStore>,
    pipeline: CaptionPipeline,
    sleeper: Arc<dyn Sleeper>,
    settings: EnrichmentSettings,
    state: LoopState,
    // Successful writes since start, or since the last "caught up" in watch mode.
    total_processed: usize,
    skipped: StageCounts,
    // Items that failed since the last poll cycle began; excluded from later
    // queries so a permanently broken asset cannot stall a sweep.
    failed: HashSet<String>,
}

impl EnrichmentLoop {
    pub fn new(
        store: Arc<dyn AssetStore>,
        pipeline: CaptionPipeline,
        sleeper: Arc<dyn Sleeper>,
        settings: EnrichmentSettings,
    ) -> Self {
        Self {
            store,
            pipeline,
            sleeper,
            settings,
            state: LoopState::Polling,
            total_processed: 0,
            skipped: StageCounts::default(),
            failed: HashSet::new(),
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn total_processed(&self) -> usize {
        self.total_processed
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            processed: self.total_processed,
            skipped: self.skipped,
        }
    }

    /// Drives the state machine until the sweep finishes. In watch mode this
    /// only returns on a fatal store error.
    pub async fn run(&mut self) -> Result<RunSummary> {
        info!("Using model: {}", self.settings.model);
        while self.step().await? != LoopState::Finished {}
        Ok(self.summary())
    }

    /// Performs one transition and returns the new state.
    pub async fn step(&mut self) -> Result<LoopState> {
        match self.state {
            LoopState::Polling => self.poll().await?,
            LoopState::Sleeping => {
                if let Some(rest) = &self.settings.watch {
                    let wait = rest.wait_at_least;
                    info!("Sleeping for {}... (Ctrl+C to stop)", humantime::format_duration(wait));
                    self.sleeper.sleep(wait).await;
                }
                // Give earlier failures another chance on the next cycle.
                self.failed.clear();
                self.state = LoopState::Polling;
            }
            LoopState::Finished => {}
        }
        Ok(self.state)
    }

    async fn poll(&mut self) -> Result<()> {
        info!("Scanning for images (batch of {})...", BatchKind::Undescribed.limit());
        // Excluded before the limit applies, so failures never fill a batch.
        let exclude: Vec<String> = self.failed.iter().cloned().collect();
        let batch = self.store.next_batch(BatchKind::Undescribed, &exclude).await?;

        if batch.is_empty() {
            self.on_caught_up();
            return Ok(());
        }

        for (index, item) in batch.iter().enumerate() {
            info!("[{}|Total:{}] Processing {}", index + 1, self.total_processed, item.id);
            match self.process_item(item).await {
                Ok(description) => {
                    self.total_processed += 1;
                    if self.settings.verbose {
                        info!("Done! ({} chars)\nDescription: {}", description.chars().count(), description);
                    } else {
                        info!("Done! ({} chars)", description.chars().count());
                    }
                }
                Err(failure) => {
                    warn!("[SKIP] {} {} error: {}", item.id, failure.stage, failure.source);
                    self.skipped.record(failure.stage);
                    self.failed.insert(item.id.clone());
                }
            }
        }
        Ok(())
    }

    fn on_caught_up(&mut self) {
        if self.settings.watch.is_some() {
            if self.total_processed > 0 {
                info!(
                    "All caught up! Processed {} images (skipped: {}).",
                    self.total_processed, self.skipped
                );
                self.total_processed = 0;
                self.skipped = StageCounts::default();
            }
            if !self.failed.is_empty() {
                info!("{} failed images will be retried after the next sleep", self.failed.len());
            }
            self.state = LoopState::Sleeping;
            return;
        }

        if self.total_processed == 0 && self.failed.is_empty() {
            info!("No images found to process.");
        } else if self.total_processed == 0 {
            warn!("No images processed; all {} remaining candidates failed.", self.failed.len());
        } else {
            info!("All done! Processed {} images in total.", self.total_processed);
        }
        if self.skipped.total() > 0 {
            warn!("Skipped {} images ({})", self.skipped.total(), self.skipped);
        }
        self.state = LoopState::Finished;
    }

    /// Download, normalize, caption and store one item. Nothing here is fatal.
    async fn process_item(&self, item: &CandidateItem) -> std::result::Result<String, StageFailure> {
        let image = self.pipeline.prepare(item).await?;
        debug!("Sending {} ({} bytes JPEG) to {}", item.id, image.jpeg_len, self.settings.model);

        let description = self.pipeline.describe(&image, &self.settings.model).await?;

        self.store
            .write_description(item, &description)
            .await
            .map_err(|e| StageFailure::new(Stage::Persist, e))?;

        Ok(description)
    }
}
