//! Composition root wiring user input, quote fetching and the swap protocol.
//!
//! The orchestrator owns the asset pair and the entered amount. Amount
//! changes go to the debounced fetcher; settled fetcher outcomes are applied
//! to the swap state machine as quote events. Any change to the pair or to the
//! wallet identity cancels pending quotes and resets the swap session.

use crate::api::{AssetCatalog, PriceFeed, SwapApi};
use crate::config::AppConfig;
use crate::errors::Result;
use crate::models::{Asset, MarketInfo, Quote};
use crate::pair::{AssetPair, PairChange};
use crate::quote::{
    DebouncedQuoteFetcher, QuoteInput, QuoteOutcome, UsdValuation, exchange_rate_label,
    output_amount, usd_value,
};
use crate::swap::{
    ActionContext, FailureKind, SwapEvent, SwapFailure, SwapOutcome, SwapRequest, SwapSession,
    SwapStateMachine, SwapStep,
};
use crate::utils::parse_amount;
use crate::wallet::Wallet;
use bigdecimal::BigDecimal;
use num_traits::Signed;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What a wallet change is detected against.
#[derive(Debug, Clone, PartialEq, Eq)]
struct WalletFingerprint {
    connected: bool,
    address: Option<String>,
}

impl WalletFingerprint {
    fn of(wallet: &dyn Wallet) -> Self {
        let connected = wallet.is_connected();
        Self {
            connected,
            address: connected.then(|| wallet.account().address).flatten(),
        }
    }
}

pub struct SwapOrchestrator {
    config: AppConfig,
    wallet: Arc<dyn Wallet>,
    catalog: Arc<dyn AssetCatalog>,
    prices: Arc<dyn PriceFeed>,
    pair: AssetPair,
    input_amount: Option<BigDecimal>,
    available_assets: Vec<Asset>,
    btc_usd_price: Option<BigDecimal>,
    market_info: Option<MarketInfo>,
    fetcher: DebouncedQuoteFetcher,
    machine: SwapStateMachine,
    wallet_seen: WalletFingerprint,
}

impl SwapOrchestrator {
    pub fn new(
        config: AppConfig,
        api: Arc<dyn SwapApi>,
        catalog: Arc<dyn AssetCatalog>,
        prices: Arc<dyn PriceFeed>,
        wallet: Arc<dyn Wallet>,
    ) -> Self {
        let fetcher = DebouncedQuoteFetcher::new(Arc::clone(&api), config.quote_debounce);
        let machine = SwapStateMachine::new(api, Arc::clone(&wallet));
        let wallet_seen = WalletFingerprint::of(wallet.as_ref());
        Self {
            config,
            wallet,
            catalog,
            prices,
            pair: AssetPair::new_default(&[]),
            input_amount: None,
            available_assets: Vec::new(),
            btc_usd_price: None,
            market_info: None,
            fetcher,
            machine,
            wallet_seen,
        }
    }

    // ---------------------------------------------------------------------
    // Commands
    // ---------------------------------------------------------------------

    pub fn select_input(&mut self, asset: Asset) -> PairChange {
        let before = self.rune_name();
        let change = self.pair.select_input(asset, &self.available_assets);
        self.after_pair_change(change, before);
        change
    }

    pub fn select_output(&mut self, asset: Asset) -> PairChange {
        let before = self.rune_name();
        let change = self.pair.select_output(asset, &self.available_assets);
        self.after_pair_change(change, before);
        change
    }

    fn after_pair_change(&mut self, change: PairChange, rune_before: Option<String>) {
        if change == PairChange::Rejected {
            debug!("[SWAP] pair selection rejected, asset already on the other side");
            return;
        }
        if self.rune_name() != rune_before {
            self.market_info = None;
        }
        self.fetcher.cancel();
        self.machine.reset();
        self.input_amount = None;
        info!(
            input = ?self.pair.input().map(|a| &a.name),
            output = ?self.pair.output().map(|a| &a.name),
            "[SWAP] pair changed"
        );
    }

    /// Swap the two sides. The last quoted output amount becomes the new
    /// input amount and a quote for it is scheduled.
    pub fn reverse(&mut self) {
        let carried = self.derived_output_amount();
        self.pair.reverse();
        self.fetcher.cancel();
        self.machine.reset();
        self.input_amount = carried;
        info!(
            sell = self.pair.is_sell(),
            amount = ?self.input_amount.as_ref().map(|a| a.to_string()),
            "[SWAP] direction reversed"
        );
        self.schedule_quote();
    }

    /// Record a user-entered amount and schedule a debounced quote. A quote
    /// fetched for a different amount is dropped at once.
    pub fn set_amount(&mut self, raw: &str) {
        self.input_amount = parse_amount(raw);
        if self.quote().is_some() && !self.quote_matches_amount() {
            debug!("[QUOTE] amount changed, dropping quote for the previous amount");
            self.machine.dispatch(SwapEvent::QuoteCleared);
        }
        self.schedule_quote();
    }

    /// Run the swap against the current quote. With an expired quote this
    /// fetches a fresh one instead.
    pub async fn submit_swap(&mut self) -> SwapOutcome {
        self.apply_pending_quotes();
        if self.machine.session().quote_expired {
            info!("[SWAP] quote expired, fetching a new one instead of swapping");
            self.refetch_quote();
            return SwapOutcome::QuoteExpired;
        }
        if !self.machine.session().is_swapping && self.quote_matches_amount() {
            // quotes scheduled before submission must not land after it
            self.fetcher.cancel();
        }
        let request = SwapRequest {
            amount: self.input_amount.clone(),
            rune_name: self.rune_name(),
            sell: self.pair.is_sell(),
        };
        self.machine.execute(&request).await
    }

    /// Fetch a quote for the current input immediately.
    pub fn refetch_quote(&mut self) {
        if self.machine.session().is_swapping {
            warn!("[QUOTE] refetch ignored while a swap is in flight");
            return;
        }
        self.machine.dispatch(SwapEvent::FetchQuoteStart);
        let input = self.quote_input();
        self.fetcher.fetch_now(input);
    }

    /// Back to a fresh session: pending quotes dropped, amount cleared.
    pub fn reset(&mut self) {
        self.fetcher.cancel();
        self.machine.reset();
        self.input_amount = None;
    }

    /// Detect a wallet connection or address change. On change the session is
    /// reset and the current amount re-quoted for the new address.
    pub fn sync_wallet(&mut self) -> bool {
        let seen = WalletFingerprint::of(self.wallet.as_ref());
        if seen == self.wallet_seen {
            return false;
        }
        info!(
            connected = seen.connected,
            address = ?seen.address,
            "[WALLET] wallet changed, resetting swap"
        );
        self.wallet_seen = seen;
        self.fetcher.cancel();
        self.machine.reset();
        self.schedule_quote();
        true
    }

    pub async fn load_popular_assets(&mut self) -> Result<()> {
        let assets = self.catalog.list_popular_assets().await?;
        info!(count = assets.len(), "[API] popular assets loaded");
        self.available_assets = assets;
        if self.pair.rune().is_none() {
            self.pair = AssetPair::new_default(&self.available_assets);
        }
        Ok(())
    }

    /// Search Runes by name. A blank query lists the popular ones.
    pub async fn search_assets(&self, query: &str) -> Result<Vec<Asset>> {
        let query = query.trim();
        if query.is_empty() {
            return self.catalog.list_popular_assets().await;
        }
        self.catalog.search_assets(query).await
    }

    /// Refresh BTC/USD and the selected Rune's market data. A failed lookup
    /// keeps the previous value.
    pub async fn refresh_prices(&mut self) {
        let prices = Arc::clone(&self.prices);
        let rune = self.rune_name();
        let market = async {
            match &rune {
                Some(name) => prices.rune_market_info(name).await,
                None => Ok(None),
            }
        };
        let (btc, market) = futures::join!(prices.btc_usd_price(), market);

        match btc {
            Ok(price) => self.btc_usd_price = Some(price),
            Err(e) => warn!(error = %e, "[API] BTC price unavailable"),
        }
        match market {
            Ok(info) => self.market_info = info,
            Err(e) => warn!(rune = ?rune, error = %e, "[API] market info unavailable"),
        }
    }

    // ---------------------------------------------------------------------
    // Quote plumbing
    // ---------------------------------------------------------------------

    fn quote_input(&self) -> QuoteInput {
        QuoteInput {
            amount: self.input_amount.clone(),
            rune_name: self.rune_name(),
            sell: self.pair.is_sell(),
            address: self.session_address(),
        }
    }

    /// Connected wallet address, else the configured fallback.
    fn session_address(&self) -> String {
        if self.wallet.is_connected() {
            if let Some(address) = self.wallet.account().address.filter(|a| !a.is_empty()) {
                return address;
            }
        }
        self.config.fallback_address.clone()
    }

    fn schedule_quote(&mut self) {
        let input = self.quote_input();
        self.fetcher.on_input_change(input);
    }

    fn apply_outcome(&mut self, outcome: &QuoteOutcome) {
        let event = match outcome {
            QuoteOutcome::Started => SwapEvent::FetchQuoteStart,
            QuoteOutcome::Cleared => SwapEvent::QuoteCleared,
            QuoteOutcome::Ready(quote) => SwapEvent::FetchQuoteSuccess(Arc::clone(quote)),
            QuoteOutcome::Failed(message) => SwapEvent::FetchQuoteError(message.clone()),
        };
        self.machine.dispatch(event);
    }

    /// Wait for the next update of the current quote schedule and apply it.
    /// `None` once the schedule has nothing left to report.
    pub async fn next_quote_event(&mut self) -> Option<QuoteOutcome> {
        let outcome = self.fetcher.next_update().await?;
        self.apply_outcome(&outcome);
        Some(outcome)
    }

    /// Apply every quote update until the current schedule is done.
    pub async fn settle_quote(&mut self) {
        while self.next_quote_event().await.is_some() {}
    }

    /// Apply updates that already arrived, without waiting.
    pub fn apply_pending_quotes(&mut self) -> usize {
        let mut applied = 0;
        while let Some(outcome) = self.fetcher.try_next_update() {
            self.apply_outcome(&outcome);
            applied += 1;
        }
        applied
    }

    // ---------------------------------------------------------------------
    // Produced surface
    // ---------------------------------------------------------------------

    pub fn session(&self) -> &SwapSession {
        self.machine.session()
    }

    pub fn current_step(&self) -> SwapStep {
        self.session().step
    }

    pub fn is_swapping(&self) -> bool {
        self.session().is_swapping
    }

    pub fn quote(&self) -> Option<&Quote> {
        self.session().quote.as_deref()
    }

    pub fn quote_expired(&self) -> bool {
        self.session().quote_expired
    }

    pub fn error(&self) -> Option<&SwapFailure> {
        self.session().error.as_ref()
    }

    pub fn quote_error(&self) -> Option<&str> {
        self.error()
            .filter(|e| e.kind == FailureKind::Quote)
            .map(|e| e.message.as_str())
    }

    pub fn pair(&self) -> &AssetPair {
        &self.pair
    }

    pub fn input_amount(&self) -> Option<&BigDecimal> {
        self.input_amount.as_ref()
    }

    pub fn available_assets(&self) -> &[Asset] {
        &self.available_assets
    }

    pub fn btc_usd_price(&self) -> Option<&BigDecimal> {
        self.btc_usd_price.as_ref()
    }

    pub fn derived_output_amount(&self) -> Option<BigDecimal> {
        output_amount(self.quote()?, self.pair.direction())
    }

    pub fn exchange_rate_label(&self) -> Option<String> {
        let quote = self.quote()?;
        let rune = self.rune_name().unwrap_or_else(|| quote.rune_name.clone());
        exchange_rate_label(quote, self.btc_usd_price.as_ref(), &rune)
    }

    pub fn input_usd_value(&self) -> Option<UsdValuation> {
        let amount = self.input_amount.as_ref()?;
        self.value_of(amount, self.pair.input()?)
    }

    pub fn output_usd_value(&self) -> Option<UsdValuation> {
        let amount = self.derived_output_amount()?;
        self.value_of(&amount, self.pair.output()?)
    }

    fn value_of(&self, amount: &BigDecimal, asset: &Asset) -> Option<UsdValuation> {
        usd_value(
            amount,
            asset,
            self.market_info.as_ref(),
            self.quote(),
            self.btc_usd_price.as_ref(),
        )
    }

    fn action_context(&self) -> ActionContext {
        ActionContext {
            wallet_connected: self.wallet.is_connected(),
            has_amount: self.input_amount.as_ref().is_some_and(|a| a.is_positive()),
            has_rune: self.pair.rune().is_some(),
        }
    }

    pub fn action_label(&self) -> &'static str {
        self.session().action_label(&self.action_context())
    }

    pub fn is_action_disabled(&self) -> bool {
        self.session().is_action_disabled(&self.action_context())
    }

    /// Explorer link for the confirmed transaction.
    pub fn explorer_link(&self) -> Option<String> {
        let session = self.session();
        if session.step != SwapStep::Success {
            return None;
        }
        session
            .tx_id
            .as_deref()
            .map(|txid| self.config.explorer_tx_url(txid))
    }

    fn quote_matches_amount(&self) -> bool {
        self.quote()
            .is_some_and(|q| Some(&q.input_amount) == self.input_amount.as_ref())
    }

    fn rune_name(&self) -> Option<String> {
        self.pair.rune().map(|a| a.name.clone())
    }
}
