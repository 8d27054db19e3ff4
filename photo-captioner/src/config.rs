use crate::types::{CaptionerError, Result, RunMode};
use clap::Parser;
use std::time::Duration;
use url::Url;

pub const DEFAULT_BENCHMARK_MODELS: [&str; 3] =
    ["qwen3-vl:latest", "moondream:latest", "minicpm-v:latest"];

/// Command line flags. Every flag falls back to an environment variable,
/// and `.env` is loaded into the environment before parsing.
#[derive(Debug, Parser)]
#[command(
    name = "photo-captioner",
    about = "Generate searchable descriptions for photo library images",
    args_override_self = true
)]
pub struct Cli {
    /// Photo store host or IP
    #[arg(long, env = "IMMICH_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Photo store HTTP port
    #[arg(long, env = "IMMICH_PORT", default_value_t = 2283)]
    pub port: u16,

    /// Photo store API key
    #[arg(long, env = "IMMICH_API_KEY", default_value = "", hide_env_values = true)]
    pub key: String,

    /// Inference server URL
    #[arg(long, env = "OLLAMA_HOST", default_value = "http://localhost:11434")]
    pub ollama: String,

    /// Model used for captioning
    #[arg(long, env = "OLLAMA_MODEL", default_value = "minicpm-v:latest")]
    pub model: String,

    /// Poll interval in watch mode (e.g. 1m, 1h, 90s)
    #[arg(long, env = "WATCH_INTERVAL", default_value = "1m")]
    pub interval: String,

    /// Keep polling for new images instead of exiting when done
    #[arg(long)]
    pub watch: bool,

    /// Compare models on the five newest images without saving anything
    #[arg(long, conflicts_with = "watch")]
    pub benchmark: bool,

    /// Model to include in the benchmark (repeatable, replaces the default list)
    #[arg(long = "benchmark-model")]
    pub benchmark_models: Vec<String>,

    /// Log the full generated description
    #[arg(long)]
    pub verbose: bool,

    #[arg(long, env = "DB_USER", default_value = "postgres")]
    pub db_user: String,

    #[arg(long, env = "DB_PASS", default_value = "postgres", hide_env_values = true)]
    pub db_pass: String,

    #[arg(long, env = "DB_NAME", default_value = "immich")]
    pub db_name: String,

    #[arg(long, env = "DB_PORT", default_value_t = 5432)]
    pub db_port: u16,

    /// Database host; defaults to the photo store host
    #[arg(long, env = "DB_HOST")]
    pub db_host: Option<String>,

    /// Full connection string, overrides the DB_* settings
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: Option<String>,
}

/// Resolved settings, built once at startup and handed to each component.
#[derive(Debug, Clone)]
pub struct CaptionerConfig {
    pub store_base_url: String,
    pub api_key: String,
    pub database_url: String,
    pub ollama_url: String,
    pub model: String,
    pub mode: RunMode,
    pub watch_interval: Duration,
    pub benchmark_models: Vec<String>,
    pub verbose: bool,
}

impl CaptionerConfig {
    pub fn from_cli(cli: Cli) -> Result<Self> {
        let watch_interval = parse_interval(&cli.interval)?;

        let store_base_url = format!("http://{}:{}", cli.host, cli.port);
        Url::parse(&store_base_url)?;

        let ollama_url = cli.ollama.trim_end_matches('/').to_string();
        let parsed = Url::parse(&ollama_url)?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(CaptionerError::Config(format!(
                "inference URL must be http or https, got {}",
                ollama_url
            )));
        }

        if cli.model.trim().is_empty() {
            return Err(CaptionerError::Config("model name must not be empty".to_string()));
        }

        let database_url = match cli.database_url {
            Some(url) => url,
            None => {
                let db_host = cli.db_host.as_deref().unwrap_or(&cli.host);
                compose_database_url(db_host, cli.db_port, &cli.db_user, &cli.db_pass, &cli.db_name)?
            }
        };

        let mode = if cli.benchmark {
            RunMode::Benchmark
        } else if cli.watch {
            RunMode::Watch
        } else {
            RunMode::Normal
        };

        let benchmark_models = if cli.benchmark_models.is_empty() {
            DEFAULT_BENCHMARK_MODELS.iter().map(|m| m.to_string()).collect()
        } else {
            cli.benchmark_models
        };

        Ok(Self {
            store_base_url,
            api_key: cli.key,
            database_url,
            ollama_url,
            model: cli.model,
            mode,
            watch_interval,
            benchmark_models,
            verbose: cli.verbose,
        })
    }

    /// Connection string with the password masked, safe to log.
    pub fn redacted_database_url(&self) -> String {
        match Url::parse(&self.database_url) {
            Ok(mut url) if url.password().is_some() => {
                let _ = url.set_password(Some("***"));
                url.to_string()
            }
            Ok(url) => url.to_string(),
            Err(_) => "<unparseable database url>".to_string(),
        }
    }
}

// Credentials go through `Url` so reserved characters are percent-encoded.
fn compose_database_url(host: &str, port: u16, user: &str, password: &str, name: &str) -> Result<String> {
    let mut url = Url::parse(&format!("postgres://{}:{}", host, port))?;
    url.set_username(user)
        .map_err(|_| CaptionerError::Config(format!("cannot set database user on {}", url)))?;
    url.set_password(Some(password))
        .map_err(|_| CaptionerError::Config(format!("cannot set database password on {}", url)))?;
    url.set_path(&format!("/{}", name));
    Ok(url.to_string())
}

fn parse_interval(raw: &str) -> Result<Duration> {
    let interval = humantime::parse_duration(raw.trim())
        .map_err(|e| CaptionerError::Config(format!("invalid interval '{}': {}", raw, e)))?;
    if interval.is_zero() {
        return Err(CaptionerError::Config("interval must be greater than zero".to_string()));
    }
    Ok(interval)
}
