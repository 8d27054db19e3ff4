pub mod types;
pub mod config;
pub mod traits;
pub mod normalizer;
pub mod fetcher;
pub mod inference;
pub mod asset_store;
pub mod pipeline;
pub mod enrichment;
pub mod benchmark;

pub use types::*;
pub use config::{CaptionerConfig, Cli};
pub use traits::{AssetStore, CaptionModel, Sleeper, ThumbnailSource, TokioSleeper};
pub use normalizer::{ensure_jpeg, ImageBlob};
pub use fetcher::ThumbnailFetcher;
pub use inference::OllamaClient;
pub use asset_store::PgAssetStore;
pub use pipeline::{CaptionPipeline, PreparedImage};
pub use enrichment::{EnrichmentLoop, EnrichmentSettings, LoopState, RunSummary};
pub use benchmark::{BenchmarkEntry, BenchmarkOutcome, BenchmarkReport, BenchmarkRunner};
