//! Configuration loading from `.env` files.

use std::{env, path::PathBuf};

use anyhow::{Context, Result};

/// Runtime settings derived from environment variables.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Base URL of the Campus Connect API, e.g. `http://127.0.0.1:8080`.
    pub api_base: String,
    /// Root directory for durable client state (session files).
    pub state_root: PathBuf,
    /// Payment gateway key id used to open checkout for paid events.
    pub checkout_key_id: Option<String>,
    /// ISO currency code for checkout amounts.
    pub currency: String,
    /// Seconds to wait for the checkout callback before giving up.
    pub checkout_timeout_secs: u64,
    /// Per-request HTTP timeout in seconds (covers payment verification).
    pub http_timeout_secs: u64,
}

impl Settings {
    /// Load settings from the specified `.env` file.
    pub fn from_env(path: &str) -> Result<Self> {
        dotenvy::from_filename(path).context("reading env file")?;
        let api_base = env::var("API_BASE")?;
        let state_root = PathBuf::from(env::var("STATE_ROOT")?);
        let checkout_key_id = env::var("CHECKOUT_KEY_ID").ok().filter(|s| !s.is_empty());
        let currency = env::var("CURRENCY")
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "INR".into());
        let checkout_timeout_secs = parse_secs(env::var("CHECKOUT_TIMEOUT_SECS").ok(), 180);
        let http_timeout_secs = parse_secs(env::var("HTTP_TIMEOUT_SECS").ok(), 30);
        Ok(Self {
            api_base,
            state_root,
            checkout_key_id,
            currency,
            checkout_timeout_secs,
            http_timeout_secs,
        })
    }
}

/// Serializes tests that touch process environment variables.
#[cfg(test)]
pub(crate) static ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());

/// Parse an optional seconds value, falling back to `default` when the
/// variable is missing, empty, or not a number.
fn parse_secs(value: Option<String>, default: u64) -> u64 {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}
