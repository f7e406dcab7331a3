//! Debounced quote fetching.
//!
//! Every schedule bumps a generation counter. A fetch runs on its own task
//! after the quiescence window and reports back through a channel tagged with
//! its generation; only updates carrying the latest generation are handed to
//! the caller, whatever order they arrive in.

use crate::api::SwapApi;
use crate::models::{Quote, QuoteRequest};
use bigdecimal::BigDecimal;
use num_traits::Signed;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Snapshot of everything a quote request depends on.
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteInput {
    pub amount: Option<BigDecimal>,
    /// Name of the non-BTC side, once resolved.
    pub rune_name: Option<String>,
    pub sell: bool,
    /// Connected wallet address, or the configured fallback.
    pub address: String,
}

impl QuoteInput {
    fn to_request(&self) -> Option<QuoteRequest> {
        let amount = self.amount.as_ref().filter(|a| a.is_positive())?;
        let rune = self.rune_name.as_ref().filter(|r| !r.is_empty())?;
        Some(QuoteRequest {
            amount: amount.to_string(),
            asset_name: rune.clone(),
            address: self.address.clone(),
            sell: self.sell,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum QuoteOutcome {
    /// The window elapsed and the remote fetch is in flight.
    Started,
    /// Input is not quotable; quote and derived values must be cleared.
    Cleared,
    Ready(Arc<Quote>),
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct QuoteUpdate {
    pub generation: u64,
    pub outcome: QuoteOutcome,
}

pub struct DebouncedQuoteFetcher {
    api: Arc<dyn SwapApi>,
    window: Duration,
    generation: u64,
    pending: Option<JoinHandle<()>>,
    tx: mpsc::UnboundedSender<QuoteUpdate>,
    rx: mpsc::UnboundedReceiver<QuoteUpdate>,
}

impl DebouncedQuoteFetcher {
    pub fn new(api: Arc<dyn SwapApi>, window: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            api,
            window,
            generation: 0,
            pending: None,
            tx,
            rx,
        }
    }

    /// Latest issued generation.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Schedule a fetch once the input has been stable for the window.
    pub fn on_input_change(&mut self, input: QuoteInput) -> u64 {
        self.schedule(input, self.window)
    }

    /// Schedule a fetch without waiting for the window.
    pub fn fetch_now(&mut self, input: QuoteInput) -> u64 {
        self.schedule(input, Duration::ZERO)
    }

    /// Invalidate any pending or in-flight fetch.
    pub fn cancel(&mut self) {
        self.abort_pending();
        self.generation += 1;
        debug!(generation = self.generation, "[QUOTE] pending fetch cancelled");
    }

    fn schedule(&mut self, input: QuoteInput, delay: Duration) -> u64 {
        self.abort_pending();
        self.generation += 1;
        let generation = self.generation;

        let Some(request) = input.to_request() else {
            debug!(generation, "[QUOTE] input not quotable, clearing");
            let _ = self.tx.send(QuoteUpdate {
                generation,
                outcome: QuoteOutcome::Cleared,
            });
            return generation;
        };

        let api = Arc::clone(&self.api);
        let tx = self.tx.clone();
        self.pending = Some(tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            let _ = tx.send(QuoteUpdate {
                generation,
                outcome: QuoteOutcome::Started,
            });
            info!(
                generation,
                amount = %request.amount,
                rune = %request.asset_name,
                sell = request.sell,
                "[QUOTE] fetching"
            );
            let outcome = match api.fetch_quote(&request).await {
                Ok(quote) => QuoteOutcome::Ready(Arc::new(quote)),
                Err(e) => {
                    warn!(generation, error = %e, "[QUOTE] fetch failed");
                    QuoteOutcome::Failed(e.to_string())
                }
            };
            let _ = tx.send(QuoteUpdate {
                generation,
                outcome,
            });
        }));
        generation
    }

    fn abort_pending(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }

    /// Pass an update through only if it belongs to the latest schedule.
    pub fn accept(&self, update: QuoteUpdate) -> Option<QuoteOutcome> {
        if update.generation == self.generation {
            Some(update.outcome)
        } else {
            debug!(
                stale = update.generation,
                current = self.generation,
                "[QUOTE] discarding superseded update"
            );
            None
        }
    }

    /// Next update of the current schedule. Returns `None` once the current
    /// schedule has nothing further to report.
    pub async fn next_update(&mut self) -> Option<QuoteOutcome> {
        loop {
            if let Some(outcome) = self.try_next_update() {
                return Some(outcome);
            }
            let handle = self.pending.as_mut()?;
            tokio::select! {
                Some(update) = self.rx.recv() => {
                    if let Some(outcome) = self.accept(update) {
                        return Some(outcome);
                    }
                }
                _ = handle => {
                    self.pending = None;
                }
            }
        }
    }

    /// Non-blocking variant of [`Self::next_update`].
    pub fn try_next_update(&mut self) -> Option<QuoteOutcome> {
        while let Ok(update) = self.rx.try_recv() {
            if let Some(outcome) = self.accept(update) {
                return Some(outcome);
            }
        }
        None
    }

    /// Sender for injecting updates, used to exercise ordering.
    #[cfg(test)]
    pub(crate) fn sender(&self) -> mpsc::UnboundedSender<QuoteUpdate> {
        self.tx.clone()
    }
}

impl Drop for DebouncedQuoteFetcher {
    fn drop(&mut self) {
        self.abort_pending();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockSwapApi, sample_quote};
    use std::str::FromStr;

    fn input(amount: &str) -> QuoteInput {
        QuoteInput {
            amount: BigDecimal::from_str(amount).ok(),
            rune_name: Some("DOG•GO•TO•THE•MOON".into()),
            sell: false,
            address: "bc1pfallback".into(),
        }
    }

    async fn settle(fetcher: &mut DebouncedQuoteFetcher) -> Vec<QuoteOutcome> {
        let mut seen = Vec::new();
        while let Some(outcome) = fetcher.next_update().await {
            seen.push(outcome);
        }
        seen
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_changes_produce_one_fetch_with_final_amount() {
        let api = Arc::new(MockSwapApi::default());
        let mut fetcher = DebouncedQuoteFetcher::new(api.clone(), Duration::from_millis(500));

        fetcher.on_input_change(input("0.1"));
        tokio::time::advance(Duration::from_millis(200)).await;
        fetcher.on_input_change(input("0.2"));
        tokio::time::advance(Duration::from_millis(200)).await;
        fetcher.on_input_change(input("0.3"));

        let outcomes = settle(&mut fetcher).await;
        assert_eq!(outcomes.first(), Some(&QuoteOutcome::Started));
        assert!(matches!(outcomes.last(), Some(QuoteOutcome::Ready(_))));

        let calls = api.quote_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].amount, "0.3");
        assert_eq!(calls[0].address, "bc1pfallback");
        assert!(!calls[0].sell);
    }

    #[tokio::test(start_paused = true)]
    async fn nothing_is_fetched_before_the_window_elapses() {
        let api = Arc::new(MockSwapApi::default());
        let mut fetcher = DebouncedQuoteFetcher::new(api.clone(), Duration::from_millis(500));
        fetcher.on_input_change(input("0.1"));
        tokio::time::advance(Duration::from_millis(499)).await;
        assert!(fetcher.try_next_update().is_none());
        assert!(api.quote_calls().is_empty());
    }

    #[tokio::test]
    async fn invalid_input_clears_without_remote_call() {
        let api = Arc::new(MockSwapApi::default());
        let mut fetcher = DebouncedQuoteFetcher::new(api.clone(), Duration::from_millis(500));

        fetcher.on_input_change(input("0"));
        assert_eq!(settle(&mut fetcher).await, vec![QuoteOutcome::Cleared]);

        let mut unresolved = input("1");
        unresolved.rune_name = None;
        fetcher.on_input_change(unresolved);
        assert_eq!(settle(&mut fetcher).await, vec![QuoteOutcome::Cleared]);

        assert!(api.quote_calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn slower_superseded_fetch_never_wins() {
        let api = Arc::new(MockSwapApi::default());
        api.set_quote_delay("1", Duration::from_secs(5));
        let mut fetcher = DebouncedQuoteFetcher::new(api.clone(), Duration::from_millis(500));

        fetcher.on_input_change(input("1"));
        assert_eq!(fetcher.next_update().await, Some(QuoteOutcome::Started));
        fetcher.on_input_change(input("2"));

        let outcomes = settle(&mut fetcher).await;
        let Some(QuoteOutcome::Ready(quote)) = outcomes.last() else {
            panic!("expected a quote, got {outcomes:?}");
        };
        assert_eq!(quote.input_amount, BigDecimal::from(2));
    }

    #[tokio::test]
    async fn out_of_order_updates_are_filtered_by_generation() {
        let api = Arc::new(MockSwapApi::default());
        let mut fetcher = DebouncedQuoteFetcher::new(api, Duration::from_millis(500));
        let tx = fetcher.sender();
        fetcher.cancel();
        fetcher.cancel();
        let current = fetcher.generation();

        let newer = Arc::new(sample_quote("0.002", false));
        let older = Arc::new(sample_quote("0.001", false));
        tx.send(QuoteUpdate {
            generation: current,
            outcome: QuoteOutcome::Ready(newer.clone()),
        })
        .unwrap();
        // the earlier schedule completes last
        tx.send(QuoteUpdate {
            generation: current - 1,
            outcome: QuoteOutcome::Ready(older),
        })
        .unwrap();

        assert_eq!(fetcher.try_next_update(), Some(QuoteOutcome::Ready(newer)));
        assert_eq!(fetcher.try_next_update(), None);
    }

    #[tokio::test]
    async fn fetch_failure_reports_message() {
        let api = Arc::new(MockSwapApi::default());
        api.fail_quotes_with("Insufficient liquidity");
        let mut fetcher = DebouncedQuoteFetcher::new(api, Duration::from_millis(1));
        fetcher.fetch_now(input("0.5"));
        let outcomes = settle(&mut fetcher).await;
        assert_eq!(
            outcomes,
            vec![
                QuoteOutcome::Started,
                QuoteOutcome::Failed("Insufficient liquidity".into())
            ]
        );
    }
}
