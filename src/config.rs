//! Configuration loader and application settings.

use crate::errors::{AppError, Result};
use std::time::Duration;

/// Quiescence window before a settled amount turns into a quote request.
pub const DEFAULT_QUOTE_DEBOUNCE_MS: u64 = 500;

/// Address used to price quotes before a wallet is connected.
pub const DEFAULT_FALLBACK_ADDRESS: &str =
    "bc1p5cyxnuxmeuwuvkwfem96lqzszd02n6xdcjrs20cac6yqjjwudpxqkedrcr";

pub const DEFAULT_EXPLORER_TX_URL: &str = "https://mempool.space/tx/";

pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Consolidated application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Base URL of the proxy in front of the aggregator and explorer backends.
    pub api_url: String,
    /// Quiescence window applied to amount changes.
    pub quote_debounce: Duration,
    /// Address sent with quote requests when no wallet is connected.
    pub fallback_address: String,
    /// Prefix for transaction links shown after a successful swap.
    pub explorer_tx_url: String,
    /// Transport timeout for the HTTP client.
    pub http_timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_url: String::new(),
            quote_debounce: Duration::from_millis(DEFAULT_QUOTE_DEBOUNCE_MS),
            fallback_address: DEFAULT_FALLBACK_ADDRESS.to_string(),
            explorer_tx_url: DEFAULT_EXPLORER_TX_URL.to_string(),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self> {
        let api_url = std::env::var("SWAP_API_URL")
            .map_err(|_| AppError::Config("Set SWAP_API_URL to the swap proxy base URL".into()))?;
        let debounce_ms = parse_env_u64("QUOTE_DEBOUNCE_MS", DEFAULT_QUOTE_DEBOUNCE_MS)?;
        let timeout_secs = parse_env_u64("HTTP_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT_SECS)?;
        let fallback_address = std::env::var("QUOTE_FALLBACK_ADDRESS")
            .unwrap_or_else(|_| DEFAULT_FALLBACK_ADDRESS.into());
        let explorer_tx_url =
            std::env::var("EXPLORER_TX_URL").unwrap_or_else(|_| DEFAULT_EXPLORER_TX_URL.into());

        Ok(Self {
            api_url,
            quote_debounce: Duration::from_millis(debounce_ms),
            fallback_address,
            explorer_tx_url,
            http_timeout: Duration::from_secs(timeout_secs),
        })
    }

    /// Link to a transaction on the configured block explorer.
    pub fn explorer_tx_url(&self, txid: &str) -> String {
        if self.explorer_tx_url.ends_with('/') {
            format!("{}{}", self.explorer_tx_url, txid)
        } else {
            format!("{}/{}", self.explorer_tx_url, txid)
        }
    }
}

fn parse_env_u64(key: &str, default: u64) -> Result<u64> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::Config(format!("{key} must be a non-negative integer, got {raw:?}"))),
        Err(_) => Ok(default),
    }
}
