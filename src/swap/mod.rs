//! Swap session state, failure taxonomy and the protocol driver.

pub mod failure;
pub mod machine;
pub mod session;

pub use failure::{FailureKind, SwapFailure, classify};
pub use machine::{SwapOutcome, SwapRequest, SwapStateMachine};
pub use session::{ActionContext, SwapEvent, SwapSession, SwapStep, transition};
