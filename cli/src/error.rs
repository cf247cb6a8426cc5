//! Error types for the wallet, pool client and swap panel layers

use amm_model::{AmmError, AmountError};
use ethers::types::TxHash;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("No wallet detected: pass --key-file or set SIMPLESWAP_PRIVATE_KEY")]
    NotDetected,

    #[error("Wallet returned no accounts")]
    NoAccounts,

    #[error("Wallet rejected request: {0}")]
    Rejected(String),

    #[error("Wallet is on chain {actual}, expected {expected}")]
    ChainMismatch { expected: u64, actual: u64 },
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Contract call failed: {0}")]
    Contract(String),

    #[error("No signer configured for write calls")]
    NoSigner,

    #[error("Transaction {0:?} reverted")]
    Reverted(TxHash),

    #[error("Transaction {0:?} was dropped before confirmation")]
    Dropped(TxHash),

    #[error("Execution reverted: {0}")]
    Sim(String),
}

impl From<AmmError> for ClientError {
    fn from(err: AmmError) -> Self {
        ClientError::Sim(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum PanelError {
    #[error(transparent)]
    Wallet(#[from] WalletError),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("Invalid amount: {0}")]
    InvalidAmount(#[from] AmountError),

    #[error(transparent)]
    Model(#[from] AmmError),
}
