//! Collaborator boundary: the remote operations the swap core consumes.
//!
//! Implementations normalize whatever the backend sends into the fixed types
//! in [`crate::models`] (see [`wire`]); nothing `serde_json::Value`-shaped
//! crosses into the quote fetcher or the swap state machine.

use crate::errors::Result;
use crate::models::{
    Asset, ConfirmRequest, ConfirmResponse, MarketInfo, PsbtRequest, PsbtResponse, Quote,
    QuoteRequest,
};
use async_trait::async_trait;
use bigdecimal::BigDecimal;

pub mod http;
pub mod wire;

pub use http::HttpSwapApi;

/// Aggregator operations driving a swap.
#[async_trait]
pub trait SwapApi: Send + Sync {
    async fn fetch_quote(&self, request: &QuoteRequest) -> Result<Quote>;

    async fn get_psbt(&self, request: &PsbtRequest) -> Result<PsbtResponse>;

    async fn confirm_psbt(&self, request: &ConfirmRequest) -> Result<ConfirmResponse>;
}

/// Asset discovery.
#[async_trait]
pub trait AssetCatalog: Send + Sync {
    async fn search_assets(&self, query: &str) -> Result<Vec<Asset>>;

    async fn list_popular_assets(&self) -> Result<Vec<Asset>>;
}

/// Live prices used for USD valuation.
#[async_trait]
pub trait PriceFeed: Send + Sync {
    async fn btc_usd_price(&self) -> Result<BigDecimal>;

    /// Market snapshot for a Rune; `None` when the backend has no data for it.
    async fn rune_market_info(&self, rune_name: &str) -> Result<Option<MarketInfo>>;
}
