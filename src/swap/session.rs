//! Swap session state and its transition function.

use super::failure::{FailureKind, SwapFailure};
use crate::models::Quote;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SwapStep {
    #[default]
    Idle,
    FetchingQuote,
    QuoteReady,
    GettingPsbt,
    Signing,
    Confirming,
    Success,
    Error,
}

impl SwapStep {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::FetchingQuote => "fetching_quote",
            Self::QuoteReady => "quote_ready",
            Self::GettingPsbt => "getting_psbt",
            Self::Signing => "signing",
            Self::Confirming => "confirming",
            Self::Success => "success",
            Self::Error => "error",
        }
    }

    /// Steps during which a remote call of the swap protocol is outstanding.
    pub fn is_protocol_step(self) -> bool {
        matches!(self, Self::GettingPsbt | Self::Signing | Self::Confirming)
    }
}

impl fmt::Display for SwapStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SwapEvent {
    FetchQuoteStart,
    FetchQuoteSuccess(Arc<Quote>),
    FetchQuoteError(String),
    /// Input became unquotable; drop the quote.
    QuoteCleared,
    SwapStart,
    /// Advance to the next protocol step.
    Step(SwapStep),
    PsbtCreated { swap_id: String },
    PsbtSigned {
        main: String,
        rbf: Option<String>,
    },
    SwapSuccess { tx_id: String },
    SwapError(SwapFailure),
    QuoteExpired(String),
    Reset,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SwapSession {
    pub step: SwapStep,
    pub is_swapping: bool,
    pub quote: Option<Arc<Quote>>,
    pub quote_expired: bool,
    pub psbt_main_signed: Option<String>,
    pub psbt_rbf_signed: Option<String>,
    pub swap_id: Option<String>,
    pub tx_id: Option<String>,
    pub error: Option<SwapFailure>,
}

/// Apply one event to a session.
///
/// Quote lifecycle events are ignored while a swap is running so the quote
/// backing the swap cannot be replaced underneath it.
pub fn transition(state: SwapSession, event: SwapEvent) -> SwapSession {
    use SwapEvent::*;

    let quote_event = matches!(
        event,
        FetchQuoteStart | FetchQuoteSuccess(_) | FetchQuoteError(_) | QuoteCleared
    );
    if state.is_swapping && quote_event {
        return state;
    }

    match event {
        FetchQuoteStart => SwapSession {
            step: SwapStep::FetchingQuote,
            quote: None,
            quote_expired: false,
            error: None,
            ..state
        },
        FetchQuoteSuccess(quote) => SwapSession {
            step: SwapStep::QuoteReady,
            quote: Some(quote),
            quote_expired: false,
            error: None,
            ..state
        },
        FetchQuoteError(message) => SwapSession {
            step: SwapStep::Idle,
            quote: None,
            error: Some(SwapFailure::new(FailureKind::Quote, message)),
            ..state
        },
        QuoteCleared => SwapSession {
            step: SwapStep::Idle,
            quote: None,
            quote_expired: false,
            error: None,
            ..state
        },
        // a completed swap needs a fresh quote before another start
        SwapStart if state.is_swapping || state.step == SwapStep::Success => state,
        SwapStart => SwapSession {
            step: SwapStep::GettingPsbt,
            is_swapping: true,
            psbt_main_signed: None,
            psbt_rbf_signed: None,
            swap_id: None,
            tx_id: None,
            error: None,
            ..state
        },
        Step(step) if state.is_swapping && step.is_protocol_step() => SwapSession { step, ..state },
        Step(_) => state,
        PsbtCreated { swap_id } => SwapSession {
            swap_id: Some(swap_id),
            ..state
        },
        PsbtSigned { main, rbf } => SwapSession {
            psbt_main_signed: Some(main),
            psbt_rbf_signed: rbf,
            ..state
        },
        SwapSuccess { tx_id } => SwapSession {
            step: SwapStep::Success,
            is_swapping: false,
            quote: None,
            tx_id: Some(tx_id),
            error: None,
            ..state
        },
        SwapError(failure) => SwapSession {
            step: SwapStep::Error,
            is_swapping: false,
            error: Some(failure),
            ..state
        },
        QuoteExpired(message) => SwapSession {
            step: SwapStep::Idle,
            is_swapping: false,
            quote: None,
            quote_expired: true,
            error: Some(SwapFailure::new(FailureKind::QuoteExpired, message)),
            ..state
        },
        Reset => SwapSession::default(),
    }
}

/// Inputs outside the session that the swap control depends on.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActionContext {
    pub wallet_connected: bool,
    pub has_amount: bool,
    pub has_rune: bool,
}

impl SwapSession {
    /// Label for the swap control.
    pub fn action_label(&self, ctx: &ActionContext) -> &'static str {
        if !ctx.wallet_connected {
            return "Connect Wallet";
        }
        if self.quote_expired {
            return "Fetch New Quote";
        }
        match self.step {
            SwapStep::FetchingQuote => "Fetching Quote...",
            SwapStep::GettingPsbt => "Preparing Swap...",
            SwapStep::Signing => "Waiting for Signature...",
            SwapStep::Confirming => "Confirming Swap...",
            SwapStep::Success => "Swap Successful!",
            SwapStep::Error => "Swap Failed",
            SwapStep::Idle if self.has_quote_error() => "Quote Error",
            SwapStep::Idle | SwapStep::QuoteReady if !ctx.has_amount => "Enter Amount",
            SwapStep::Idle | SwapStep::QuoteReady if !ctx.has_rune => "Select Rune",
            SwapStep::Idle | SwapStep::QuoteReady => "Swap",
        }
    }

    /// The control is disabled while a remote call is outstanding or the swap
    /// preconditions are unmet.
    pub fn is_action_disabled(&self, ctx: &ActionContext) -> bool {
        if self.is_swapping || self.step == SwapStep::FetchingQuote {
            return true;
        }
        if !ctx.wallet_connected {
            // the control connects the wallet
            return false;
        }
        if self.quote_expired {
            return false;
        }
        !(ctx.has_amount && ctx.has_rune && self.quote.is_some())
    }

    pub fn has_quote_error(&self) -> bool {
        self.error
            .as_ref()
            .is_some_and(|e| e.kind == FailureKind::Quote)
    }
}
