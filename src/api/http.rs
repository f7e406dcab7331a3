//! JSON client for the swap proxy that fronts the aggregator and explorer APIs.

use super::{AssetCatalog, PriceFeed, SwapApi, wire};
use crate::config::AppConfig;
use crate::errors::{AppError, Result};
use crate::models::{
    Asset, ConfirmRequest, ConfirmResponse, MarketInfo, PsbtRequest, PsbtResponse, Quote,
    QuoteRequest,
};
use async_trait::async_trait;
use bigdecimal::BigDecimal;
use reqwest::{Client, Response, StatusCode};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use url::Url;

#[derive(Debug, Clone)]
pub struct HttpSwapApi {
    client: Client,
    base: Url,
}

impl HttpSwapApi {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let mut base = Url::parse(&config.api_url)?;
        // Url::join drops the last path segment unless the base ends with '/'
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let client = Client::builder().timeout(config.http_timeout).build()?;
        Ok(Self { client, base })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base.join(path)?)
    }

    async fn post_json<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Value> {
        let url = self.endpoint(path)?;
        debug!(%url, "[API] POST");
        let response = self.client.post(url).json(body).send().await?;
        read_json(response).await
    }

    async fn get_json(&self, url: Url) -> Result<Value> {
        debug!(%url, "[API] GET");
        let response = self.client.get(url).send().await?;
        read_json(response).await
    }
}

/// Decode a proxy response, turning error statuses and embedded error
/// payloads into `AppError::Remote`.
async fn read_json(response: Response) -> Result<Value> {
    let status = response.status();
    let text = response.text().await?;
    let value: Value = if text.trim().is_empty() {
        Value::Null
    } else {
        match serde_json::from_str(&text) {
            Ok(v) => v,
            Err(e) if status.is_success() => return Err(e.into()),
            Err(_) => Value::String(text.clone()),
        }
    };

    if !status.is_success() {
        wire::check_error_payload(&value)?;
        let message = value
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| value.as_str().map(str::to_string))
            .unwrap_or_else(|| status_message(status));
        return Err(AppError::Remote {
            message,
            code: value
                .get("code")
                .and_then(Value::as_str)
                .map(str::to_string),
        });
    }
    wire::check_error_payload(&value)?;
    Ok(value)
}

fn status_message(status: StatusCode) -> String {
    format!(
        "Request failed with status {} {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or("")
    )
    .trim_end()
    .to_string()
}

#[async_trait]
impl SwapApi for HttpSwapApi {
    async fn fetch_quote(&self, request: &QuoteRequest) -> Result<Quote> {
        let value = self.post_json("quote", request).await?;
        wire::parse_quote(&value, request)
    }

    async fn get_psbt(&self, request: &PsbtRequest) -> Result<PsbtResponse> {
        let value = self.post_json("psbt/create", request).await?;
        wire::parse_psbt_response(&value)
    }

    async fn confirm_psbt(&self, request: &ConfirmRequest) -> Result<ConfirmResponse> {
        let value = self.post_json("psbt/confirm", request).await?;
        wire::parse_confirm_response(&value)
    }
}

#[async_trait]
impl AssetCatalog for HttpSwapApi {
    async fn search_assets(&self, query: &str) -> Result<Vec<Asset>> {
        let mut url = self.endpoint("runes/search")?;
        url.query_pairs_mut().append_pair("query", query);
        let value = self.get_json(url).await?;
        wire::parse_assets(&value)
    }

    async fn list_popular_assets(&self) -> Result<Vec<Asset>> {
        let value = self.get_json(self.endpoint("runes/popular")?).await?;
        wire::parse_assets(&value)
    }
}

#[async_trait]
impl PriceFeed for HttpSwapApi {
    async fn btc_usd_price(&self) -> Result<BigDecimal> {
        let value = self.get_json(self.endpoint("price/btc")?).await?;
        wire::parse_btc_price(&value)
    }

    async fn rune_market_info(&self, rune_name: &str) -> Result<Option<MarketInfo>> {
        let mut url = self.endpoint("runes/")?;
        url.path_segments_mut()
            .map_err(|_| AppError::Config("SWAP_API_URL cannot be a base URL".into()))?
            .pop_if_empty()
            .push(rune_name)
            .push("market");
        let value = self.get_json(url).await?;
        wire::parse_market_info(&value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_for(base: &str) -> HttpSwapApi {
        let config = AppConfig {
            api_url: base.into(),
            ..AppConfig::default()
        };
        HttpSwapApi::new(&config).unwrap()
    }

    #[test]
    fn endpoints_keep_base_path() {
        let api = client_for("https://swap.example.org/api");
        assert_eq!(
            api.endpoint("psbt/create").unwrap().as_str(),
            "https://swap.example.org/api/psbt/create"
        );
        let api = client_for("https://swap.example.org/api/");
        assert_eq!(
            api.endpoint("quote").unwrap().as_str(),
            "https://swap.example.org/api/quote"
        );
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let config = AppConfig {
            api_url: "not a url".into(),
            ..AppConfig::default()
        };
        assert!(matches!(
            HttpSwapApi::new(&config),
            Err(AppError::UrlParse(_))
        ));
    }

    #[test]
    fn status_message_names_the_status() {
        assert_eq!(
            status_message(StatusCode::BAD_GATEWAY),
            "Request failed with status 502 Bad Gateway"
        );
    }
}
