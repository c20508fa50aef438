//! Layered configuration for thumbs.
//!
//! Sources, lowest precedence first:
//!
//! 1. [`Config::default()`]
//! 2. `thumbs/config.toml` in the platform configuration directory
//! 3. an explicit configuration file (TOML, YAML or JSON, by extension)
//! 4. `THUMBS_*` environment variables
//! 5. command-line [`Overrides`]

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const ENV_PREFIX: &str = "THUMBS_";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Explicit engine executable; searched for on `PATH` when unset.
    pub engine: Option<PathBuf>,
    /// Maximum number of engine processes running at once.
    pub concurrency: usize,
    /// Per-invocation time limit, in seconds.
    pub timeout: u64,
    /// Extra attempts for invocations that failed in a retryable way.
    pub retries: u32,
    /// Delay before the first retry, in milliseconds; doubles every attempt.
    pub retry_backoff: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            engine: None,
            concurrency: std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1),
            timeout: 300,
            retries: 2,
            retry_backoff: 250,
        }
    }
}

/// Values given on the command line. Unset fields leave lower layers alone.
#[derive(Clone, Debug, Default, Serialize)]
pub struct Overrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engine: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retries: Option<u32>,
}

impl Config {
    /// Loads every layer and validates the result.
    pub fn load(file: Option<&Path>, overrides: Overrides) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(platform) = platform_file()
            && platform.is_file()
        {
            tracing::debug!(path = %platform.display(), "Loading platform configuration file");
            figment = figment.merge(Toml::file(platform));
        }
        if let Some(file) = file {
            figment = merge_file(figment, file)?;
        }
        let figment = figment.merge(Env::prefixed(ENV_PREFIX)).merge(Serialized::defaults(overrides));
        Self::from_figment(&figment)
    }

    pub fn from_figment(figment: &Figment) -> Result<Self> {
        let config: Self = figment.extract().map_err(|e| exn::Exn::from(ErrorKind::Load(e.to_string())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            exn::bail!(ErrorKind::Invalid("concurrency must be at least 1".to_string()));
        }
        if self.timeout == 0 {
            exn::bail!(ErrorKind::Invalid("timeout must be at least 1 second".to_string()));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff)
    }
}

fn platform_file() -> Option<PathBuf> {
    ProjectDirs::from("", "", "thumbs").map(|dirs| dirs.config_dir().join("config.toml"))
}

fn merge_file(figment: Figment, file: &Path) -> Result<Figment> {
    if !file.is_file() {
        exn::bail!(ErrorKind::Load(format!("file not found: {}", file.display())));
    }
    let extension = file.extension().and_then(|e| e.to_str()).map(str::to_lowercase);
    Ok(match extension.as_deref() {
        Some("toml") => figment.merge(Toml::file(file)),
        Some("yaml" | "yml") => figment.merge(Yaml::file(file)),
        Some("json") => figment.merge(Json::file(file)),
        _ => exn::bail!(ErrorKind::UnsupportedFile(file.to_path_buf())),
    })
}
