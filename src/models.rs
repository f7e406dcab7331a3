//! Shared data structures used throughout the application.

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const BTC_ASSET_ID: &str = "BTC";

/// Tradeable asset: BTC or a single Rune.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub id: String,
    pub name: String,
    #[serde(default, rename = "isBTC")]
    pub is_btc: bool,
}

impl Asset {
    /// The distinguished BTC asset.
    pub fn btc() -> Self {
        Self {
            id: BTC_ASSET_ID.to_string(),
            name: BTC_ASSET_ID.to_string(),
            is_btc: true,
        }
    }

    pub fn rune(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            is_btc: false,
        }
    }
}

/// Direction of a swap relative to BTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapDirection {
    /// BTC in, Rune out.
    Buy,
    /// Rune in, BTC out.
    Sell,
}

impl SwapDirection {
    pub fn from_sell_flag(sell: bool) -> Self {
        if sell { Self::Sell } else { Self::Buy }
    }

    pub fn is_sell(self) -> bool {
        matches!(self, Self::Sell)
    }
}

/// Market snapshot for a Rune.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketInfo {
    pub price_in_usd: BigDecimal,
    pub price_in_sats: Option<BigDecimal>,
    pub market_cap_in_usd: Option<BigDecimal>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

/// One liquidity leg of a quote, normalized from the aggregator's wire shape.
///
/// Known numeric fields are real numbers; everything else the aggregator sent
/// is carried in `extra` so it can be echoed back verbatim.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market: Option<String>,
    pub side: OrderSide,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formatted_amount: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Price quote returned by the aggregator. Never mutated once received.
#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub rune_name: String,
    /// Amount the quote was requested for, in units of the input asset.
    pub input_amount: BigDecimal,
    pub sell: bool,
    /// Total Rune amount involved, in display units.
    pub total_formatted_amount: Option<BigDecimal>,
    /// Total BTC involved.
    pub total_price: Option<BigDecimal>,
    pub selected_orders: Vec<Order>,
}

impl Quote {
    pub fn direction(&self) -> SwapDirection {
        SwapDirection::from_sell_flag(self.sell)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    pub amount: String,
    pub asset_name: String,
    pub address: String,
    pub sell: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PsbtRequest {
    pub orders: Vec<Order>,
    pub address: String,
    pub public_key: String,
    pub payment_address: String,
    pub payment_public_key: String,
    pub asset_name: String,
    pub sell: bool,
}

/// Auxiliary PSBT offered for replace-by-fee protection.
#[derive(Debug, Clone, PartialEq)]
pub struct RbfPsbt {
    pub base64: String,
}

/// PSBT creation result. Required fields stay optional here so that their
/// absence is reported by the swap driver as a protocol violation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PsbtResponse {
    pub psbt: Option<String>,
    pub swap_id: Option<String>,
    pub rbf_protected: Option<RbfPsbt>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmRequest {
    pub orders: Vec<Order>,
    pub address: String,
    pub public_key: String,
    pub payment_address: String,
    pub payment_public_key: String,
    pub signed_psbt: String,
    pub swap_id: String,
    pub asset_name: String,
    pub sell: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signed_rbf_psbt: Option<String>,
    pub rbf_protection: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConfirmResponse {
    pub txid: Option<String>,
    /// Funding transaction id reported when the swap went through RBF protection.
    pub rbf_funds_txid: Option<String>,
}

impl ConfirmResponse {
    pub fn transaction_id(&self) -> Option<&str> {
        fn present(id: &Option<String>) -> Option<&str> {
            id.as_deref().filter(|id| !id.is_empty())
        }
        present(&self.txid).or_else(|| present(&self.rbf_funds_txid))
    }
}
