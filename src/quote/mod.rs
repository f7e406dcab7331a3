//! Quote fetching and the values derived from a quote.

pub mod fetcher;
pub mod valuation;

pub use fetcher::{DebouncedQuoteFetcher, QuoteInput, QuoteOutcome, QuoteUpdate};
pub use valuation::{
    UsdValuation, exchange_rate, exchange_rate_label, implied_btc_per_rune, output_amount,
    usd_value,
};
