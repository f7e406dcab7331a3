//! Classification of swap failures.

use crate::errors::AppError;
use std::fmt;

pub const QUOTE_EXPIRED_CODE: &str = "QUOTE_EXPIRED";
pub const SIGNING_CANCELLED: &str = "Signing cancelled or failed";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Local validation failed; nothing was sent.
    Precondition,
    /// Quote fetch failed; no quote is active.
    Quote,
    /// The backend rejected the quote as expired. Recoverable by re-fetching.
    QuoteExpired,
    /// The user declined or aborted signing.
    Cancelled,
    /// A response was missing required fields.
    Protocol,
    /// Any other remote or transport failure.
    Remote,
}

impl FailureKind {
    pub fn is_recoverable(self) -> bool {
        matches!(self, Self::QuoteExpired | Self::Quote)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl SwapFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn precondition(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Precondition, message)
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Protocol, message)
    }

    pub fn cancelled() -> Self {
        Self::new(FailureKind::Cancelled, SIGNING_CANCELLED)
    }
}

impl fmt::Display for SwapFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Classify an error raised by a remote call during the swap protocol.
pub fn classify(err: &AppError) -> SwapFailure {
    let message = err.to_string();
    let kind = match err {
        AppError::Malformed(_) => FailureKind::Protocol,
        _ if is_quote_expired(err.code(), &message) => FailureKind::QuoteExpired,
        _ if is_user_cancellation(&message) => FailureKind::Cancelled,
        _ => FailureKind::Remote,
    };
    SwapFailure { kind, message }
}

fn is_quote_expired(code: Option<&str>, message: &str) -> bool {
    code.is_some_and(|c| c.eq_ignore_ascii_case(QUOTE_EXPIRED_CODE))
        || message.to_lowercase().contains("quote expired")
}

fn is_user_cancellation(message: &str) -> bool {
    let lower = message.to_lowercase();
    let refused = ["cancel", "rejected", "denied"]
        .iter()
        .any(|w| lower.contains(w));
    refused && lower.contains("user")
}
