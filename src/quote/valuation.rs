//! Values derived from a quote and live prices.
//!
//! Everything here is pure: callers recompute on every quote or price update.

use crate::models::{Asset, MarketInfo, Quote, SwapDirection};
use crate::utils::format_usd;
use bigdecimal::BigDecimal;
use num_traits::{Signed, Zero};

/// A USD valuation. `is_estimate` marks values implied from the active quote
/// rather than read from a market price.
#[derive(Debug, Clone, PartialEq)]
pub struct UsdValuation {
    pub value: BigDecimal,
    pub is_estimate: bool,
}

/// Amount the user receives: Rune total for a buy, BTC total for a sell.
pub fn output_amount(quote: &Quote, direction: SwapDirection) -> Option<BigDecimal> {
    match direction {
        SwapDirection::Buy => quote.total_formatted_amount.clone(),
        SwapDirection::Sell => quote.total_price.clone(),
    }
}

/// BTC and Rune amounts involved in a quote, in that order.
fn involved_amounts(quote: &Quote) -> Option<(BigDecimal, BigDecimal)> {
    let (btc, rune) = match quote.direction() {
        SwapDirection::Buy => (
            quote.input_amount.clone(),
            quote.total_formatted_amount.clone()?,
        ),
        SwapDirection::Sell => (quote.total_price.clone()?, quote.input_amount.clone()),
    };
    Some((btc, rune))
}

/// BTC paid per Rune unit as implied by the quote.
pub fn implied_btc_per_rune(quote: &Quote) -> Option<BigDecimal> {
    let (btc, rune) = involved_amounts(quote)?;
    if btc.is_zero() || rune.is_zero() {
        return None;
    }
    Some(btc / rune)
}

/// USD price of one Rune unit as implied by the quote.
pub fn exchange_rate(quote: &Quote, btc_usd_price: Option<&BigDecimal>) -> Option<BigDecimal> {
    let btc_usd = btc_usd_price.filter(|p| p.is_positive())?;
    let (btc, rune) = involved_amounts(quote)?;
    if btc.is_zero() || rune.is_zero() {
        return None;
    }
    Some((btc * btc_usd) / rune)
}

pub fn exchange_rate_label(
    quote: &Quote,
    btc_usd_price: Option<&BigDecimal>,
    rune_name: &str,
) -> Option<String> {
    let rate = exchange_rate(quote, btc_usd_price)?;
    Some(format!("1 {} ≈ {}", rune_name, format_usd(&rate)))
}

/// USD value of `amount` of `asset`.
///
/// BTC is priced directly. A Rune uses its market price when known and
/// otherwise the BTC-per-Rune rate implied by the active quote; that last path
/// assumes the quote is representative for either side of the pair and is
/// flagged as an estimate.
pub fn usd_value(
    amount: &BigDecimal,
    asset: &Asset,
    market_info: Option<&MarketInfo>,
    quote: Option<&Quote>,
    btc_usd_price: Option<&BigDecimal>,
) -> Option<UsdValuation> {
    if !amount.is_positive() {
        return None;
    }
    let btc_usd = btc_usd_price.filter(|p| p.is_positive());

    if asset.is_btc {
        return positive(amount * btc_usd?, false);
    }

    if let Some(info) = market_info.filter(|m| m.price_in_usd.is_positive()) {
        return positive(amount * &info.price_in_usd, false);
    }

    let btc_per_rune = implied_btc_per_rune(quote?)?;
    positive(amount * btc_per_rune * btc_usd?, true)
}

fn positive(value: BigDecimal, is_estimate: bool) -> Option<UsdValuation> {
    value
        .is_positive()
        .then_some(UsdValuation { value, is_estimate })
}
