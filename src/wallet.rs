//! Wallet capability injected into the orchestrator.

use crate::errors::{AppError, Result};
use async_trait::async_trait;

/// Addresses and keys of the connected wallet. Any of them may be missing
/// while the wallet is still negotiating permissions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalletAccount {
    pub address: Option<String>,
    pub public_key: Option<String>,
    pub payment_address: Option<String>,
    pub payment_public_key: Option<String>,
}

/// All four account fields, present and non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningIdentity {
    pub address: String,
    pub public_key: String,
    pub payment_address: String,
    pub payment_public_key: String,
}

impl WalletAccount {
    pub fn signing_identity(&self) -> Option<SigningIdentity> {
        let present = |v: &Option<String>| v.as_ref().filter(|s| !s.trim().is_empty()).cloned();
        Some(SigningIdentity {
            address: present(&self.address)?,
            public_key: present(&self.public_key)?,
            payment_address: present(&self.payment_address)?,
            payment_public_key: present(&self.payment_public_key)?,
        })
    }
}

/// Result of a signing request. `None` means the wallet returned without a
/// signed payload, which the swap treats as cancellation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignedPsbt {
    pub signed_psbt_base64: Option<String>,
}

#[async_trait]
pub trait Wallet: Send + Sync {
    fn is_connected(&self) -> bool;

    fn account(&self) -> WalletAccount;

    async fn sign_psbt(&self, psbt_base64: &str) -> Result<SignedPsbt>;
}

/// Wallet stand-in for price previews: never connected, cannot sign.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisconnectedWallet;

#[async_trait]
impl Wallet for DisconnectedWallet {
    fn is_connected(&self) -> bool {
        false
    }

    fn account(&self) -> WalletAccount {
        WalletAccount::default()
    }

    async fn sign_psbt(&self, _psbt_base64: &str) -> Result<SignedPsbt> {
        Err(AppError::Other("no wallet connected".into()))
    }
}
