//! Drives the create -> sign -> confirm protocol for one swap attempt.

use super::failure::{FailureKind, SwapFailure, classify};
use super::session::{SwapEvent, SwapSession, SwapStep, transition};
use crate::api::SwapApi;
use crate::models::{ConfirmRequest, PsbtRequest, Quote};
use crate::wallet::{SigningIdentity, Wallet};
use bigdecimal::BigDecimal;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Pair-dependent inputs of a swap attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapRequest {
    /// Amount currently entered; the quote must have been fetched for it.
    pub amount: Option<BigDecimal>,
    pub rune_name: Option<String>,
    /// True when the input side is not BTC.
    pub sell: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SwapOutcome {
    Completed { swap_id: String, tx_id: String },
    /// The backend expired the quote; a fresh quote is needed.
    QuoteExpired,
    Failed(SwapFailure),
    /// A swap was already in flight or has just completed.
    Rejected,
}

/// Everything validated up front for one attempt.
struct SwapPlan {
    identity: SigningIdentity,
    quote: Arc<Quote>,
    rune_name: String,
    sell: bool,
}

pub struct SwapStateMachine {
    session: SwapSession,
    api: Arc<dyn SwapApi>,
    wallet: Arc<dyn Wallet>,
}

impl SwapStateMachine {
    pub fn new(api: Arc<dyn SwapApi>, wallet: Arc<dyn Wallet>) -> Self {
        Self {
            session: SwapSession::default(),
            api,
            wallet,
        }
    }

    pub fn session(&self) -> &SwapSession {
        &self.session
    }

    pub fn dispatch(&mut self, event: SwapEvent) {
        let current = std::mem::take(&mut self.session);
        self.session = transition(current, event);
        debug!(step = %self.session.step, swapping = self.session.is_swapping, "[SWAP] state");
    }

    pub fn reset(&mut self) {
        self.dispatch(SwapEvent::Reset);
    }

    /// Run one swap attempt against the session's current quote.
    ///
    /// Failures never escape: they are recorded on the session and summarized
    /// in the returned outcome.
    pub async fn execute(&mut self, request: &SwapRequest) -> SwapOutcome {
        if self.session.is_swapping {
            warn!(step = %self.session.step, "[SWAP] attempt rejected, swap already in flight");
            return SwapOutcome::Rejected;
        }
        if self.session.step == SwapStep::Success {
            warn!("[SWAP] attempt rejected, swap already completed for this quote");
            return SwapOutcome::Rejected;
        }

        let plan = match self.preflight(request) {
            Ok(plan) => plan,
            Err(failure) => {
                warn!(reason = %failure, "[SWAP] preconditions not met");
                self.dispatch(SwapEvent::SwapError(failure.clone()));
                return SwapOutcome::Failed(failure);
            }
        };

        info!(
            rune = %plan.rune_name,
            sell = plan.sell,
            orders = plan.quote.selected_orders.len(),
            "[SWAP] starting"
        );
        self.dispatch(SwapEvent::SwapStart);

        match self.run_protocol(&plan).await {
            Ok((swap_id, tx_id)) => {
                info!(%swap_id, txid = %tx_id, "[SWAP] confirmed");
                self.dispatch(SwapEvent::SwapSuccess {
                    tx_id: tx_id.clone(),
                });
                SwapOutcome::Completed { swap_id, tx_id }
            }
            Err(failure) if failure.kind == FailureKind::QuoteExpired => {
                warn!(reason = %failure, "[SWAP] quote expired");
                self.dispatch(SwapEvent::QuoteExpired(failure.message));
                SwapOutcome::QuoteExpired
            }
            Err(failure) => {
                match failure.kind {
                    FailureKind::Cancelled => info!(reason = %failure, "[SWAP] cancelled by user"),
                    _ => error!(kind = ?failure.kind, reason = %failure, "[SWAP] failed"),
                }
                self.dispatch(SwapEvent::SwapError(failure.clone()));
                SwapOutcome::Failed(failure)
            }
        }
    }

    fn preflight(&self, request: &SwapRequest) -> Result<SwapPlan, SwapFailure> {
        if !self.wallet.is_connected() {
            return Err(SwapFailure::precondition("Wallet not connected"));
        }
        let identity = self.wallet.account().signing_identity().ok_or_else(|| {
            SwapFailure::precondition("Wallet address or public key information is missing")
        })?;
        let quote = self.session.quote.clone().ok_or_else(|| {
            SwapFailure::precondition("No quote available, enter an amount to get a quote")
        })?;
        if request.amount.as_ref() != Some(&quote.input_amount) {
            return Err(SwapFailure::precondition(
                "Quote does not match the entered amount, wait for a new quote",
            ));
        }
        let rune_name = request
            .rune_name
            .clone()
            .filter(|r| !r.is_empty())
            .ok_or_else(|| SwapFailure::precondition("No rune selected"))?;
        Ok(SwapPlan {
            identity,
            quote,
            rune_name,
            sell: request.sell,
        })
    }

    /// The quote backing the plan must still be the session's live quote.
    fn ensure_quote_current(&self, plan: &SwapPlan) -> Result<(), SwapFailure> {
        let current = self
            .session
            .quote
            .as_ref()
            .is_some_and(|q| Arc::ptr_eq(q, &plan.quote));
        if self.session.quote_expired || !current {
            return Err(SwapFailure::new(
                FailureKind::QuoteExpired,
                "Quote is no longer current",
            ));
        }
        Ok(())
    }

    async fn run_protocol(&mut self, plan: &SwapPlan) -> Result<(String, String), SwapFailure> {
        let id = &plan.identity;

        self.ensure_quote_current(plan)?;
        let psbt_request = PsbtRequest {
            orders: plan.quote.selected_orders.clone(),
            address: id.address.clone(),
            public_key: id.public_key.clone(),
            payment_address: id.payment_address.clone(),
            payment_public_key: id.payment_public_key.clone(),
            asset_name: plan.rune_name.clone(),
            sell: plan.sell,
        };
        let created = self
            .api
            .get_psbt(&psbt_request)
            .await
            .map_err(|e| classify(&e))?;
        let (Some(main_psbt), Some(swap_id)) = (created.psbt, created.swap_id) else {
            return Err(SwapFailure::protocol(
                "Invalid PSBT data received: missing PSBT or swap id",
            ));
        };
        debug!(%swap_id, rbf = created.rbf_protected.is_some(), "[SWAP] PSBT created");
        self.dispatch(SwapEvent::PsbtCreated {
            swap_id: swap_id.clone(),
        });

        self.dispatch(SwapEvent::Step(SwapStep::Signing));
        let signed_main = self
            .wallet
            .sign_psbt(&main_psbt)
            .await
            .map_err(|e| classify(&e))?
            .signed_psbt_base64
            .filter(|s| !s.is_empty())
            .ok_or_else(SwapFailure::cancelled)?;
        let signed_rbf = match created.rbf_protected {
            Some(rbf) => self.sign_rbf(&rbf.base64).await,
            None => None,
        };
        self.dispatch(SwapEvent::PsbtSigned {
            main: signed_main.clone(),
            rbf: signed_rbf.clone(),
        });

        self.ensure_quote_current(plan)?;
        self.dispatch(SwapEvent::Step(SwapStep::Confirming));
        let confirm_request = ConfirmRequest {
            orders: psbt_request.orders,
            address: psbt_request.address,
            public_key: psbt_request.public_key,
            payment_address: psbt_request.payment_address,
            payment_public_key: psbt_request.payment_public_key,
            signed_psbt: signed_main,
            swap_id: swap_id.clone(),
            asset_name: psbt_request.asset_name,
            sell: psbt_request.sell,
            rbf_protection: signed_rbf.is_some(),
            signed_rbf_psbt: signed_rbf,
        };
        let confirmed = self
            .api
            .confirm_psbt(&confirm_request)
            .await
            .map_err(|e| classify(&e))?;
        let tx_id = confirmed
            .transaction_id()
            .ok_or_else(|| {
                SwapFailure::protocol("Swap confirmation did not return a transaction id")
            })?
            .to_string();
        Ok((swap_id, tx_id))
    }

    /// RBF protection is optional: a failed signature only drops it.
    async fn sign_rbf(&self, psbt_base64: &str) -> Option<String> {
        match self.wallet.sign_psbt(psbt_base64).await {
            Ok(signed) => {
                let signed = signed.signed_psbt_base64.filter(|s| !s.is_empty());
                if signed.is_none() {
                    warn!("[SWAP] RBF PSBT not signed, continuing without RBF protection");
                }
                signed
            }
            Err(e) => {
                warn!(error = %e, "[SWAP] RBF signing failed, continuing without RBF protection");
                None
            }
        }
    }
}
