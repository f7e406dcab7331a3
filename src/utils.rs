//! Miscellaneous helper utilities.

use bigdecimal::BigDecimal;
use num_traits::{Signed, ToPrimitive};
use std::str::FromStr;
use tracing_subscriber::{EnvFilter, fmt};

/// Initialize `tracing` subscriber with env-based filter.
///
/// If `RUST_LOG` is not set, defaults to `info` level.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();
}

/// Parse a user-entered amount. Blank or unparseable input yields `None`.
pub fn parse_amount(raw: &str) -> Option<BigDecimal> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    BigDecimal::from_str(trimmed).ok()
}

/// Format a USD value for display.
///
/// Values of one dollar or more get two decimals and thousands separators;
/// smaller values keep about four significant digits so sub-cent Rune prices
/// stay readable.
pub fn format_usd(value: &BigDecimal) -> String {
    let v = value.abs().to_f64().unwrap_or(0.0);
    let sign = if value.is_negative() { "-" } else { "" };
    if v >= 1.0 {
        return format!("{sign}${}", group_thousands(&format!("{v:.2}")));
    }
    if v == 0.0 {
        return "$0.00".to_string();
    }
    let decimals = ((-v.log10().floor()) as usize + 3).clamp(2, 10);
    let raw = format!("{v:.decimals$}");
    let trimmed = raw.trim_end_matches('0');
    let (_, frac) = trimmed.split_once('.').unwrap_or((trimmed, ""));
    if frac.len() < 2 {
        format!("{sign}${v:.2}")
    } else {
        format!("{sign}${trimmed}")
    }
}

fn group_thousands(fixed: &str) -> String {
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed, ""));
    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if frac_part.is_empty() {
        grouped
    } else {
        format!("{grouped}.{frac_part}")
    }
}
