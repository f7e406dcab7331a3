//! Mock collaborators shared by the unit tests.

use crate::api::{AssetCatalog, PriceFeed, SwapApi};
use crate::errors::{AppError, Result};
use crate::models::{
    Asset, ConfirmRequest, ConfirmResponse, MarketInfo, Order, OrderSide, PsbtRequest,
    PsbtResponse, Quote, QuoteRequest,
};
use crate::wallet::{SignedPsbt, Wallet, WalletAccount};
use async_trait::async_trait;
use bigdecimal::BigDecimal;
use serde_json::Map;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Mutex;
use std::time::Duration;

pub const DOG: &str = "DOG•GO•TO•THE•MOON";

pub fn bd(s: &str) -> BigDecimal {
    BigDecimal::from_str(s).unwrap()
}

pub fn popular_assets() -> Vec<Asset> {
    vec![
        Asset::rune("840000:3", DOG),
        Asset::rune("840000:41", "PUPS•WORLD•PEACE"),
    ]
}

/// Quote at 100,000 units per BTC.
pub fn sample_quote(amount: &str, sell: bool) -> Quote {
    let input = bd(amount);
    let (formatted, price) = if sell {
        (input.clone(), &input / BigDecimal::from(100_000))
    } else {
        (&input * BigDecimal::from(100_000), input.clone())
    };
    Quote {
        rune_name: DOG.into(),
        input_amount: input,
        sell,
        total_formatted_amount: Some(formatted),
        total_price: Some(price),
        selected_orders: vec![Order {
            id: "order-1".into(),
            market: Some("MagicEden".into()),
            side: if sell { OrderSide::Sell } else { OrderSide::Buy },
            price: Some(0.00001),
            formatted_amount: Some(100.0),
            extra: Map::new(),
        }],
    }
}

type Failure = Option<(String, Option<String>)>;

fn raise(failure: &Failure) -> Result<()> {
    match failure {
        Some((message, code)) => Err(AppError::Remote {
            message: message.clone(),
            code: code.clone(),
        }),
        None => Ok(()),
    }
}

pub struct MockSwapApi {
    quote_calls: Mutex<Vec<QuoteRequest>>,
    quote_delays: Mutex<HashMap<String, Duration>>,
    quote_failure: Mutex<Failure>,
    psbt_calls: Mutex<Vec<PsbtRequest>>,
    psbt_response: Mutex<PsbtResponse>,
    psbt_failure: Mutex<Failure>,
    confirm_calls: Mutex<Vec<ConfirmRequest>>,
    confirm_response: Mutex<ConfirmResponse>,
    confirm_failure: Mutex<Failure>,
    assets: Vec<Asset>,
}

impl Default for MockSwapApi {
    fn default() -> Self {
        Self {
            quote_calls: Mutex::default(),
            quote_delays: Mutex::default(),
            quote_failure: Mutex::default(),
            psbt_calls: Mutex::default(),
            psbt_response: Mutex::new(PsbtResponse {
                psbt: Some("main-psbt".into()),
                swap_id: Some("swap-1".into()),
                rbf_protected: None,
            }),
            psbt_failure: Mutex::default(),
            confirm_calls: Mutex::default(),
            confirm_response: Mutex::new(ConfirmResponse {
                txid: Some("txid-1".into()),
                rbf_funds_txid: None,
            }),
            confirm_failure: Mutex::default(),
            assets: popular_assets(),
        }
    }
}

impl MockSwapApi {
    pub fn quote_calls(&self) -> Vec<QuoteRequest> {
        self.quote_calls.lock().unwrap().clone()
    }

    pub fn psbt_calls(&self) -> Vec<PsbtRequest> {
        self.psbt_calls.lock().unwrap().clone()
    }

    pub fn confirm_calls(&self) -> Vec<ConfirmRequest> {
        self.confirm_calls.lock().unwrap().clone()
    }

    /// Delay quote responses for one requested amount.
    pub fn set_quote_delay(&self, amount: &str, delay: Duration) {
        self.quote_delays
            .lock()
            .unwrap()
            .insert(amount.to_string(), delay);
    }

    pub fn fail_quotes_with(&self, message: &str) {
        *self.quote_failure.lock().unwrap() = Some((message.into(), None));
    }

    pub fn set_psbt_response(&self, response: PsbtResponse) {
        *self.psbt_response.lock().unwrap() = response;
    }

    pub fn fail_psbt_with(&self, message: &str) {
        *self.psbt_failure.lock().unwrap() = Some((message.into(), None));
    }

    pub fn set_confirm_response(&self, response: ConfirmResponse) {
        *self.confirm_response.lock().unwrap() = response;
    }

    pub fn fail_confirm_with(&self, message: &str) {
        *self.confirm_failure.lock().unwrap() = Some((message.into(), None));
    }
}

#[async_trait]
impl SwapApi for MockSwapApi {
    async fn fetch_quote(&self, request: &QuoteRequest) -> Result<Quote> {
        self.quote_calls.lock().unwrap().push(request.clone());
        let delay = self
            .quote_delays
            .lock()
            .unwrap()
            .get(&request.amount)
            .copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        raise(&self.quote_failure.lock().unwrap())?;
        Ok(sample_quote(&request.amount, request.sell))
    }

    async fn get_psbt(&self, request: &PsbtRequest) -> Result<PsbtResponse> {
        self.psbt_calls.lock().unwrap().push(request.clone());
        raise(&self.psbt_failure.lock().unwrap())?;
        Ok(self.psbt_response.lock().unwrap().clone())
    }

    async fn confirm_psbt(&self, request: &ConfirmRequest) -> Result<ConfirmResponse> {
        self.confirm_calls.lock().unwrap().push(request.clone());
        raise(&self.confirm_failure.lock().unwrap())?;
        Ok(self.confirm_response.lock().unwrap().clone())
    }
}

#[async_trait]
impl AssetCatalog for MockSwapApi {
    async fn search_assets(&self, query: &str) -> Result<Vec<Asset>> {
        let needle = query.to_lowercase();
        Ok(self
            .assets
            .iter()
            .filter(|a| a.name.to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }

    async fn list_popular_assets(&self) -> Result<Vec<Asset>> {
        Ok(self.assets.clone())
    }
}

pub struct MockWallet {
    connected: Mutex<bool>,
    account: Mutex<WalletAccount>,
    responses: Mutex<HashMap<String, std::result::Result<Option<String>, String>>>,
    sign_calls: Mutex<Vec<String>>,
}

impl MockWallet {
    pub fn connected() -> Self {
        Self {
            connected: Mutex::new(true),
            account: Mutex::new(WalletAccount {
                address: Some("bc1pordinalsaddress".into()),
                public_key: Some("ordinals-pubkey".into()),
                payment_address: Some("bc1qpaymentaddress".into()),
                payment_public_key: Some("payment-pubkey".into()),
            }),
            responses: Mutex::default(),
            sign_calls: Mutex::default(),
        }
    }

    pub fn disconnected() -> Self {
        Self {
            connected: Mutex::new(false),
            account: Mutex::default(),
            responses: Mutex::default(),
            sign_calls: Mutex::default(),
        }
    }

    /// Override the wallet's answer for one PSBT. `Ok(None)` returns without
    /// a signed payload; `Err` fails with the message.
    pub fn respond_to(&self, psbt: &str, response: std::result::Result<Option<String>, String>) {
        self.responses
            .lock()
            .unwrap()
            .insert(psbt.to_string(), response);
    }

    pub fn sign_calls(&self) -> Vec<String> {
        self.sign_calls.lock().unwrap().clone()
    }

    pub fn set_connected(&self, connected: bool) {
        *self.connected.lock().unwrap() = connected;
    }

    pub fn set_address(&self, address: &str) {
        self.account.lock().unwrap().address = Some(address.into());
    }

    pub fn set_payment_public_key(&self, key: Option<String>) {
        self.account.lock().unwrap().payment_public_key = key;
    }
}

#[async_trait]
impl Wallet for MockWallet {
    fn is_connected(&self) -> bool {
        *self.connected.lock().unwrap()
    }

    fn account(&self) -> WalletAccount {
        self.account.lock().unwrap().clone()
    }

    async fn sign_psbt(&self, psbt_base64: &str) -> Result<SignedPsbt> {
        self.sign_calls.lock().unwrap().push(psbt_base64.to_string());
        let response = self.responses.lock().unwrap().get(psbt_base64).cloned();
        match response {
            Some(Ok(signed)) => Ok(SignedPsbt {
                signed_psbt_base64: signed,
            }),
            Some(Err(message)) => Err(AppError::remote(message)),
            None => Ok(SignedPsbt {
                signed_psbt_base64: Some(format!("signed:{psbt_base64}")),
            }),
        }
    }
}

#[derive(Default)]
pub struct MockPriceFeed {
    btc_usd: Mutex<Option<BigDecimal>>,
    market: Mutex<HashMap<String, MarketInfo>>,
}

impl MockPriceFeed {
    pub fn with_btc_price(price: &str) -> Self {
        let feed = Self::default();
        *feed.btc_usd.lock().unwrap() = Some(bd(price));
        feed
    }

    pub fn set_market_price(&self, rune: &str, price_in_usd: &str) {
        self.market.lock().unwrap().insert(
            rune.to_string(),
            MarketInfo {
                price_in_usd: bd(price_in_usd),
                price_in_sats: None,
                market_cap_in_usd: None,
            },
        );
    }

    pub fn clear_btc_price(&self) {
        *self.btc_usd.lock().unwrap() = None;
    }
}

#[async_trait]
impl PriceFeed for MockPriceFeed {
    async fn btc_usd_price(&self) -> Result<BigDecimal> {
        self.btc_usd
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| AppError::remote("price unavailable"))
    }

    async fn rune_market_info(&self, rune_name: &str) -> Result<Option<MarketInfo>> {
        Ok(self.market.lock().unwrap().get(rune_name).cloned())
    }
}
