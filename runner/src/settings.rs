use crate::provider::{ApiKey, DEFAULT_API_KEY_HEADER};
use anyhow::{bail, Context, Result};
use std::path::PathBuf;

/// Runner settings read from `LIVEPOLL_*` environment variables.
#[derive(Debug, Clone)]
pub struct RunnerSettings {
    /// Live feed endpoint (`LIVEPOLL_PROVIDER_URL`, required)
    pub provider_url: String,
    pub api_key: Option<ApiKey>,
    /// Optional engine config file (`LIVEPOLL_CONFIG`)
    pub config_path: Option<PathBuf>,
    /// Start in background mode (`LIVEPOLL_BACKGROUND`)
    pub backgrounded: bool,
}

impl RunnerSettings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let provider_url = read("LIVEPOLL_PROVIDER_URL").context("LIVEPOLL_PROVIDER_URL not set")?;
        if !provider_url.starts_with("http://") && !provider_url.starts_with("https://") {
            bail!("LIVEPOLL_PROVIDER_URL must be an http(s) URL, got '{}'", provider_url);
        }

        let api_key = read("LIVEPOLL_API_KEY").map(|value| ApiKey {
            header: read("LIVEPOLL_API_KEY_HEADER")
                .unwrap_or_else(|| DEFAULT_API_KEY_HEADER.to_string()),
            value,
        });

        let backgrounded = match read("LIVEPOLL_BACKGROUND") {
            Some(v) => parse_flag(&v).context("LIVEPOLL_BACKGROUND must be a boolean")?,
            None => false,
        };

        Ok(Self {
            provider_url,
            api_key,
            config_path: read("LIVEPOLL_CONFIG").map(PathBuf::from),
            backgrounded,
        })
    }
}

fn parse_flag(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("invalid flag '{}'", other),
    }
}
