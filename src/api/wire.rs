//! Normalization of aggregator JSON into the crate's fixed types.
//!
//! The backend is loose about key spelling (camelCase vs snake_case, a few
//! historical aliases) and about numbers (often sent as strings). Everything
//! is resolved here; a payload that cannot be mapped is `AppError::Malformed`.

use crate::errors::{AppError, Result};
use crate::models::{
    Asset, ConfirmResponse, MarketInfo, Order, OrderSide, PsbtResponse, Quote, QuoteRequest,
    RbfPsbt,
};
use bigdecimal::BigDecimal;
use num_traits::Signed;
use serde_json::{Map, Value};
use std::str::FromStr;

const ORDER_ID_KEYS: &[&str] = &["id", "orderId", "order_id"];
const ORDER_FORMATTED_AMOUNT_KEYS: &[&str] = &["formattedAmount", "formatted_amount"];

/// Order fields that are numeric even when the backend sends them as strings.
const ORDER_NUMERIC_KEYS: &[&str] = &[
    "amount",
    "fromTokenAmount",
    "slippage",
    "feeRate",
    "formattedUnitPrice",
    "tokenAmount",
];

/// Raise an embedded `{ "error": ... }` payload as a remote error.
pub fn check_error_payload(value: &Value) -> Result<()> {
    let Some(obj) = value.as_object() else {
        return Ok(());
    };
    let message = match obj.get("error") {
        Some(Value::String(msg)) => Some(msg.clone()),
        Some(Value::Object(inner)) => inner
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    };
    match message {
        Some(message) => {
            let code = field(value, &["code", "errorCode", "error_code"]).and_then(as_string);
            Err(AppError::Remote { message, code })
        }
        None => Ok(()),
    }
}

/// Map a quote payload, attaching the request context it answers.
pub fn parse_quote(value: &Value, request: &QuoteRequest) -> Result<Quote> {
    let body = unwrap_data(value);
    if !body.is_object() {
        return Err(AppError::Malformed("quote is not an object".into()));
    }
    let input_amount = BigDecimal::from_str(request.amount.trim())
        .map_err(|_| AppError::Malformed(format!("invalid quote amount {:?}", request.amount)))?;

    let total_formatted_amount =
        field(body, &["totalFormattedAmount", "total_formatted_amount"]).and_then(as_decimal);
    let total_price = field(body, &["totalPrice", "total_price"]).and_then(as_decimal);

    if request.sell && total_price.is_none() {
        return Err(AppError::Malformed("sell quote is missing totalPrice".into()));
    }
    if !request.sell && total_formatted_amount.is_none() {
        return Err(AppError::Malformed(
            "buy quote is missing totalFormattedAmount".into(),
        ));
    }

    let orders = field(body, &["selectedOrders", "selected_orders", "orders"])
        .and_then(Value::as_array)
        .ok_or_else(|| AppError::Malformed("quote has no order list".into()))?;
    let selected_orders = orders
        .iter()
        .map(normalize_order)
        .collect::<Result<Vec<_>>>()?;

    Ok(Quote {
        rune_name: request.asset_name.clone(),
        input_amount,
        sell: request.sell,
        total_formatted_amount,
        total_price,
        selected_orders,
    })
}

/// Normalize one order: numeric strings become numbers, `side` is upper-cased.
pub fn normalize_order(value: &Value) -> Result<Order> {
    let obj = value
        .as_object()
        .ok_or_else(|| AppError::Malformed("order is not an object".into()))?;

    let id = field(value, ORDER_ID_KEYS)
        .and_then(as_string)
        .ok_or_else(|| AppError::Malformed("order is missing an id".into()))?;
    let side = match field(value, &["side"]).and_then(Value::as_str) {
        Some(raw) => match raw.trim().to_ascii_uppercase().as_str() {
            "BUY" => OrderSide::Buy,
            "SELL" => OrderSide::Sell,
            other => {
                return Err(AppError::Malformed(format!(
                    "order {id} has unknown side {other:?}"
                )));
            }
        },
        None => return Err(AppError::Malformed(format!("order {id} is missing a side"))),
    };
    let market = field(value, &["market"]).and_then(as_string);
    let price = field(value, &["price"]).and_then(as_f64);
    let formatted_amount = field(value, ORDER_FORMATTED_AMOUNT_KEYS).and_then(as_f64);

    let consumed = |key: &str| {
        ORDER_ID_KEYS.contains(&key)
            || ORDER_FORMATTED_AMOUNT_KEYS.contains(&key)
            || matches!(key, "side" | "market" | "price")
    };
    let extra: Map<String, Value> = obj
        .iter()
        .filter(|(key, _)| !consumed(key.as_str()))
        .map(|(key, v)| {
            let v = if ORDER_NUMERIC_KEYS.contains(&key.as_str()) {
                coerce_number(v)
            } else {
                v.clone()
            };
            (key.clone(), v)
        })
        .collect();

    Ok(Order {
        id,
        market,
        side,
        price,
        formatted_amount,
        extra,
    })
}

pub fn parse_psbt_response(value: &Value) -> Result<PsbtResponse> {
    let body = unwrap_data(value);
    if !body.is_object() {
        return Err(AppError::Malformed("PSBT response is not an object".into()));
    }
    let rbf_protected = match field(body, &["rbfProtected", "rbf_protected"]) {
        Some(Value::String(b64)) if !b64.is_empty() => Some(RbfPsbt {
            base64: b64.clone(),
        }),
        Some(obj @ Value::Object(_)) => field(obj, &["base64", "psbt"])
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(|b64| RbfPsbt {
                base64: b64.to_string(),
            }),
        _ => None,
    };
    Ok(PsbtResponse {
        psbt: non_empty_str(body, &["psbt", "psbtBase64", "psbt_base64"]),
        swap_id: field(body, &["swapId", "swap_id"]).and_then(as_string),
        rbf_protected,
    })
}

pub fn parse_confirm_response(value: &Value) -> Result<ConfirmResponse> {
    let body = unwrap_data(value);
    if !body.is_object() {
        return Err(AppError::Malformed(
            "confirmation response is not an object".into(),
        ));
    }
    let rbf_funds_txid = field(body, &["rbfProtection", "rbf_protection"]).and_then(|rbf| {
        non_empty_str(
            rbf,
            &[
                "fundsPreparationTxId",
                "fundsPreparationTxid",
                "funds_preparation_txid",
            ],
        )
    });
    Ok(ConfirmResponse {
        txid: non_empty_str(body, &["txid", "txId", "tx_id"]),
        rbf_funds_txid,
    })
}

/// Asset lists arrive either bare or wrapped under a collection key.
pub fn parse_assets(value: &Value) -> Result<Vec<Asset>> {
    let items = match value {
        Value::Array(items) => items,
        _ => field(unwrap_data(value), &["runes", "assets", "results"])
            .or_else(|| Some(unwrap_data(value)))
            .and_then(Value::as_array)
            .ok_or_else(|| AppError::Malformed("asset list is not an array".into()))?,
    };
    let assets = items
        .iter()
        .filter_map(|item| {
            let id = field(item, &["id", "runeId", "rune_id"]).and_then(as_string)?;
            let name = field(item, &["name", "spacedName", "spaced_name", "rune"])
                .and_then(as_string)?;
            let is_btc = field(item, &["isBTC", "is_btc"])
                .and_then(Value::as_bool)
                .unwrap_or(false);
            Some(Asset { id, name, is_btc })
        })
        .collect();
    Ok(assets)
}

pub fn parse_market_info(value: &Value) -> Result<Option<MarketInfo>> {
    let body = unwrap_data(value);
    if body.is_null() {
        return Ok(None);
    }
    if !body.is_object() {
        return Err(AppError::Malformed("market info is not an object".into()));
    }
    let Some(price_in_usd) = field(body, &["price_in_usd", "priceInUsd"]).and_then(as_decimal)
    else {
        return Ok(None);
    };
    Ok(Some(MarketInfo {
        price_in_usd,
        price_in_sats: field(body, &["price_in_sats", "priceInSats"]).and_then(as_decimal),
        market_cap_in_usd: field(body, &["market_cap_in_usd", "marketCapInUsd"])
            .and_then(as_decimal),
    }))
}

pub fn parse_btc_price(value: &Value) -> Result<BigDecimal> {
    let body = unwrap_data(value);
    let price = as_decimal(body)
        .or_else(|| field(body, &["price", "usd", "USD"]).and_then(as_decimal))
        .ok_or_else(|| AppError::Malformed("BTC price is missing".into()))?;
    if !price.is_positive() {
        return Err(AppError::Malformed(format!("BTC price {price} is not positive")));
    }
    Ok(price)
}

// ---------- helper functions ----------

fn unwrap_data(value: &Value) -> &Value {
    match value.get("data") {
        Some(inner) if inner.is_object() || inner.is_array() => inner,
        _ => value,
    }
}

fn field<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    let obj = value.as_object()?;
    keys.iter()
        .filter_map(|k| obj.get(*k))
        .find(|v| !v.is_null())
}

fn non_empty_str(value: &Value, keys: &[&str]) -> Option<String> {
    field(value, keys)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn as_decimal(value: &Value) -> Option<BigDecimal> {
    match value {
        Value::Number(n) => BigDecimal::from_str(&n.to_string()).ok(),
        Value::String(s) => BigDecimal::from_str(s.trim()).ok(),
        _ => None,
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

fn coerce_number(value: &Value) -> Value {
    match value {
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or_else(|| value.clone()),
        other => other.clone(),
    }
}
