//! # config: read Config from environment variables
//!
//! | Variable               | Default                     | Meaning                              |
//! |------------------------|-----------------------------|--------------------------------------|
//! | `UMBRA_API_URL`        | `http://localhost:8080/api` | Backend REST base URL                |
//! | `UMBRA_TRADER`         | *(unset)*                   | Logged-in trader; unset = logged out |
//! | `TRADE_POLL_MS`        | `2500`                      | Trade view poll interval             |
//! | `LEND_POLL_MS`         | `3000`                      | Lend view poll interval              |
//! | `REQUEST_TIMEOUT_MS`   | `5000`                      | Per-request HTTP timeout             |
//! | `RENDER_INTERVAL_SECS` | `5`                         | Headless runner render cadence       |

use std::time::Duration;

use anyhow::{bail, Context};
use reqwest::Url;

/// Everything the dashboard needs to start.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the backend REST API (ends in `/api`)
    pub api_url:          Url,
    /// Trader identity; `None` renders the logged-out state
    pub trader:           Option<String>,
    pub trade_poll:       Duration,
    pub lend_poll:        Duration,
    pub request_timeout:  Duration,
    pub render_interval:  Duration,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key → value source. `from_env` uses the process
    /// environment; tests pass a map.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw_url = lookup("UMBRA_API_URL")
            .unwrap_or_else(|| "http://localhost:8080/api".to_string());
        let api_url = Url::parse(&raw_url)
            .with_context(|| format!("UMBRA_API_URL is not a valid URL: '{raw_url}'"))?;
        if api_url.cannot_be_a_base() {
            bail!("UMBRA_API_URL must be a base URL (http/https), got '{raw_url}'");
        }

        let trader = lookup("UMBRA_TRADER")
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());

        Ok(Self {
            api_url,
            trader,
            trade_poll:      millis(&lookup, "TRADE_POLL_MS", 2_500)?,
            lend_poll:       millis(&lookup, "LEND_POLL_MS", 3_000)?,
            request_timeout: millis(&lookup, "REQUEST_TIMEOUT_MS", 5_000)?,
            render_interval: Duration::from_secs(positive(&lookup, "RENDER_INTERVAL_SECS", 5)?),
        })
    }
}

fn millis<F>(lookup: &F, key: &str, default: u64) -> anyhow::Result<Duration>
where
    F: Fn(&str) -> Option<String>,
{
    positive(lookup, key, default).map(Duration::from_millis)
}

fn positive<F>(lookup: &F, key: &str, default: u64) -> anyhow::Result<u64>
where
    F: Fn(&str) -> Option<String>,
{
    let value = match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .with_context(|| format!("{key} must be a number, got '{raw}'"))?,
        None => default,
    };
    if value == 0 {
        bail!("{key} must be greater than zero");
    }
    Ok(value)
}
