// src/config.rs

use crate::driver::WaitPolicy;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, time::Duration};

pub const DEFAULT_BASE_URL: &str = "https://psreports.losrios.edu";

/// Runtime settings, read from an optional YAML file. Missing keys fall back
/// to the defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Upper bound for each "wait for element".
    pub wait_timeout_secs: u64,
    pub poll_interval_ms: u64,
    /// Portal root the sample automations build their page URLs from.
    pub base_url: String,
    pub user_agent: String,
    /// Tracing filter used when `RUST_LOG` is unset.
    pub log_filter: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            wait_timeout_secs: 10,
            poll_interval_ms: 250,
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: concat!("psquery/", env!("CARGO_PKG_VERSION")).to_string(),
            log_filter: None,
        }
    }
}

impl Config {
    pub fn from_yaml(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).context("parsing config YAML")
    }

    /// Defaults when `path` is `None`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            None => Ok(Self::default()),
            Some(p) => {
                let text = fs::read_to_string(p)
                    .with_context(|| format!("reading config {}", p.display()))?;
                Self::from_yaml(&text).with_context(|| format!("in {}", p.display()))
            }
        }
    }

    pub fn wait_policy(&self) -> WaitPolicy {
        WaitPolicy::new(
            Duration::from_secs(self.wait_timeout_secs),
            Duration::from_millis(self.poll_interval_ms),
        )
    }
}
