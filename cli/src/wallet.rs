//! Wallet backed by a local private key

use std::sync::Arc;

use async_trait::async_trait;
use ethers::providers::{Http, Middleware, Provider};
use ethers::types::{Address, U256};
use log::debug;

use crate::backend::WalletProvider;
use crate::error::WalletError;

/// A key file cannot switch networks, so `switch_chain` only checks that the
/// RPC endpoint serves the requested chain.
pub struct LocalKeyWallet {
    address: Address,
    provider: Arc<Provider<Http>>,
}

impl LocalKeyWallet {
    pub fn new(address: Address, provider: Arc<Provider<Http>>) -> Self {
        Self { address, provider }
    }
}

#[async_trait]
impl WalletProvider for LocalKeyWallet {
    async fn switch_chain(&self, chain_id: u64) -> Result<(), WalletError> {
        let actual = self
            .provider
            .get_chainid()
            .await
            .map_err(|e| WalletError::Rejected(e.to_string()))?;
        debug!("RPC endpoint reports chain {}", actual);

        if actual != U256::from(chain_id) {
            return Err(WalletError::ChainMismatch {
                expected: chain_id,
                actual: actual.low_u64(),
            });
        }
        Ok(())
    }

    async fn request_accounts(&self) -> Result<Vec<Address>, WalletError> {
        Ok(vec![self.address])
    }
}
