//! Core library for the rune-swap project.
//!
//! BTC <-> Rune swap orchestration: pair selection, debounced quoting,
//! quote valuation and the PSBT create -> sign -> confirm protocol. Remote
//! services and the wallet are injected through the traits in [`api`] and
//! [`wallet`].

pub mod api;
pub mod config;
pub mod errors;
pub mod models;
pub mod orchestrator;
pub mod pair;
pub mod quote;
pub mod swap;
pub mod utils;
pub mod wallet;

#[cfg(test)]
pub(crate) mod testing;

pub use orchestrator::SwapOrchestrator;
