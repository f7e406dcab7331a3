use anyhow::{Result, bail};
use rune_swap::{
    SwapOrchestrator,
    api::HttpSwapApi,
    config::AppConfig,
    quote::{QuoteOutcome, UsdValuation},
    utils,
    wallet::DisconnectedWallet,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    utils::init_logging();

    // Configuration
    let config = AppConfig::load()?;
    let amount = std::env::var("SWAP_AMOUNT").unwrap_or_else(|_| "0.001".into());
    let wanted_rune = std::env::var("SWAP_RUNE").ok();

    tracing::info!(api = %config.api_url, %amount, "[INIT] rune-swap preview starting");

    let api = Arc::new(HttpSwapApi::new(&config)?);
    let mut swap = SwapOrchestrator::new(
        config,
        api.clone(),
        api.clone(),
        api,
        Arc::new(DisconnectedWallet),
    );

    swap.load_popular_assets().await?;
    if let Some(query) = wanted_rune {
        let found = swap.search_assets(&query).await?;
        let Some(rune) = found.into_iter().find(|a| !a.is_btc) else {
            bail!("no rune matches {query:?}");
        };
        swap.select_output(rune);
    }
    let Some(rune) = swap.pair().rune().map(|a| a.name.clone()) else {
        bail!("no rune available to quote");
    };
    tracing::info!(%rune, "[INIT] pair selected");

    swap.refresh_prices().await;
    swap.set_amount(&amount);
    while let Some(outcome) = swap.next_quote_event().await {
        if let QuoteOutcome::Failed(message) = outcome {
            tracing::warn!(%message, "[QUOTE] no quote");
        }
    }

    let Some(output) = swap.derived_output_amount() else {
        tracing::info!(step = %swap.current_step(), "[QUOTE] nothing to preview");
        return Ok(());
    };
    let usd = |v: Option<UsdValuation>| match v {
        Some(v) if v.is_estimate => format!("~{}", utils::format_usd(&v.value)),
        Some(v) => utils::format_usd(&v.value),
        None => "-".to_string(),
    };
    tracing::info!(
        %rune,
        input = %amount,
        output = %output,
        rate = swap.exchange_rate_label().as_deref().unwrap_or("-"),
        input_usd = %usd(swap.input_usd_value()),
        output_usd = %usd(swap.output_usd_value()),
        "[QUOTE] preview"
    );
    tracing::info!(action = swap.action_label(), "[INIT] connect a wallet to swap");
    Ok(())
}
