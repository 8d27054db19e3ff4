use crate::pipeline::CaptionPipeline;
use crate::traits::AssetStore;
use crate::types::{BatchKind, Result, Stage, StageFailure};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BenchmarkOutcome {
    Described(String),
    Failed { stage: Stage, error: String },
}

impl From<StageFailure> for BenchmarkOutcome {
    fn from(failure: StageFailure) -> Self {
        BenchmarkOutcome::Failed {
            stage: failure.stage,
            error: failure.source.to_string(),
        }
    }
}

/// One (item, model) cell of the benchmark matrix.
#[derive(Debug, Clone)]
pub struct BenchmarkEntry {
    pub item_id: String,
    pub model: String,
    /// Wall-clock time of the inference call; zero when the item never got that far.
    pub elapsed: Duration,
    pub outcome: BenchmarkOutcome,
}

impl BenchmarkEntry {
    pub fn succeeded(&self) -> bool {
        matches!(self.outcome, BenchmarkOutcome::Described(_))
    }
}

#[derive(Debug, Clone, Default)]
pub struct BenchmarkReport {
    pub entries: Vec<BenchmarkEntry>,
}

impl BenchmarkReport {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn for_model<'a>(&'a self, model: &'a str) -> impl Iterator<Item = &'a BenchmarkEntry> + 'a {
        self.entries.iter().filter(move |entry| entry.model == model)
    }

    /// Mean inference time over the successful calls of one model.
    pub fn average_for(&self, model: &str) -> Option<Duration> {
        let timings: Vec<Duration> = self
            .for_model(model)
            .filter(|entry| entry.succeeded())
            .map(|entry| entry.elapsed)
            .collect();
        if timings.is_empty() {
            return None;
        }
        Some(timings.iter().sum::<Duration>() / timings.len() as u32)
    }
}

/// Runs every model against the newest few images without writing anything back.
pub struct BenchmarkRunner {
    store: Arc<dyn AssetStore>,
    pipeline: CaptionPipeline,
    models: Vec<String>,
}

impl BenchmarkRunner {
    pub fn new(store: Arc<dyn AssetStore>, pipeline: CaptionPipeline, models: Vec<String>) -> Self {
        Self {
            store,
            pipeline,
            models,
        }
    }

    pub async fn run(&self) -> Result<BenchmarkReport> {
        info!("--- BENCHMARK MODE ---");
        let items = self.store.next_batch(BatchKind::BenchmarkSample, &[]).await?;
        let mut report = BenchmarkReport::default();

        for (index, item) in items.iter().enumerate() {
            info!("[{}/{}] Image ID: {}", index + 1, items.len(), item.id);

            // Download and convert once per item; every model sees the same bytes.
            let image = match self.pipeline.prepare(item).await {
                Ok(image) => image,
                Err(failure) => {
                    warn!("Error preparing {}: {}", item.id, failure);
                    let outcome = BenchmarkOutcome::from(failure);
                    for model in &self.models {
                        report.entries.push(BenchmarkEntry {
                            item_id: item.id.clone(),
                            model: model.clone(),
                            elapsed: Duration::ZERO,
                            outcome: outcome.clone(),
                        });
                    }
                    continue;
                }
            };

            for model in &self.models {
                let started = Instant::now();
                let result = self.pipeline.describe(&image, model).await;
                let elapsed = started.elapsed();

                let outcome = match result {
                    Ok(description) => {
                        info!("  {} DONE in {:.2}s", model, elapsed.as_secs_f64());
                        info!("    -> Description: {}", description);
                        BenchmarkOutcome::Described(description)
                    }
                    Err(failure) => {
                        warn!("  {} FAILED ({})", model, failure.source);
                        BenchmarkOutcome::from(failure)
                    }
                };

                report.entries.push(BenchmarkEntry {
                    item_id: item.id.clone(),
                    model: model.clone(),
                    elapsed,
                    outcome,
                });
            }
        }

        for model in &self.models {
            let succeeded = report.for_model(model).filter(|entry| entry.succeeded()).count();
            let attempted = report.for_model(model).count();
            match report.average_for(model) {
                Some(average) => info!(
                    "{}: {}/{} succeeded, average {:.2}s",
                    model,
                    succeeded,
                    attempted,
                    average.as_secs_f64()
                ),
                None => info!("{}: {}/{} succeeded", model, succeeded, attempted),
            }
        }
        info!("--- BENCHMARK COMPLETE ---");

        Ok(report)
    }
}
