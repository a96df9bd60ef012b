use std::path::PathBuf;
use std::time::Duration;

use ::config::builder::{ConfigBuilder, DefaultState};
use ::config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::error::Result;
use crate::geocode::ARCGIS_URL;
use crate::retry::RetryPolicy;

const CONFIG_FILE: &str = "concrete_map";
const ENV_PREFIX: &str = "CONCRETE";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub pdf_url: String,
    pub pdf_file: PathBuf,
    pub download_timeout_secs: u64,
    pub geocoder_url: String,
    pub geocode_timeout_secs: u64,
    pub geocode_attempts: u32,
    pub geocode_retry_delay_ms: u64,
    pub concurrency: usize,
    /// Zero disables the overall deadline.
    pub run_deadline_secs: u64,
    pub output_html: PathBuf,
    pub output_geojson: Option<PathBuf>,
    pub db_path: PathBuf,
    pub use_cache: bool,
}

impl Settings {
    /// Defaults, then `concrete_map.toml` if present, then `CONCRETE_*`
    /// environment variables.
    pub fn load() -> Result<Self> {
        let settings = defaults()?
            .add_source(File::with_name(CONFIG_FILE).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.geocode_attempts,
            Duration::from_millis(self.geocode_retry_delay_ms),
        )
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }

    pub fn geocode_timeout(&self) -> Duration {
        Duration::from_secs(self.geocode_timeout_secs)
    }

    pub fn run_deadline(&self) -> Option<Duration> {
        (self.run_deadline_secs > 0).then(|| Duration::from_secs(self.run_deadline_secs))
    }
}

fn defaults() -> std::result::Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("pdf_url", "https://www.nyc.gov/html/dot/downloads/pdf/concretesch.pdf")?
        .set_default("pdf_file", "concretesch.pdf")?
        .set_default("download_timeout_secs", 30)?
        .set_default("geocoder_url", ARCGIS_URL)?
        .set_default("geocode_timeout_secs", 10)?
        .set_default("geocode_attempts", 3)?
        .set_default("geocode_retry_delay_ms", 1000)?
        .set_default("concurrency", 1)?
        .set_default("run_deadline_secs", 1800)?
        .set_default("output_html", "NYC_concrete_repairs_latest.html")?
        .set_default("db_path", "data/concrete_map.sqlite")?
        .set_default("use_cache", true)
}
