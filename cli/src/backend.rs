//! Seams between the swap panel and the chain
//!
//! `WalletProvider` stands in for the user's wallet (chain switching and
//! account access). `PoolClient` covers the pool contract and the ERC-20
//! approvals it depends on. Write calls return as soon as the transaction is
//! submitted; `wait_for_receipt` blocks until it is mined.

use async_trait::async_trait;
use ethers::types::{Address, TxHash, U256};
use serde::Serialize;

use crate::error::{ClientError, WalletError};

/// Deadline value meaning "never expires"
pub const NO_DEADLINE: U256 = U256([0; 4]);

#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Ask the wallet to move to `chain_id`
    async fn switch_chain(&self, chain_id: u64) -> Result<(), WalletError>;

    /// Ask for account access; the first entry is the active account
    async fn request_accounts(&self) -> Result<Vec<Address>, WalletError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapArgs {
    pub amount_in: U256,
    pub amount_out_min: U256,
    pub path: Vec<Address>,
    pub to: Address,
    pub deadline: U256,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddLiquidityArgs {
    pub token_a: Address,
    pub token_b: Address,
    pub amount_a_desired: U256,
    pub amount_b_desired: U256,
    pub amount_a_min: U256,
    pub amount_b_min: U256,
    pub to: Address,
    pub deadline: U256,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoveLiquidityArgs {
    pub token_a: Address,
    pub token_b: Address,
    pub liquidity: U256,
    pub amount_a_min: U256,
    pub amount_b_min: U256,
    pub to: Address,
    pub deadline: U256,
}

/// A state-changing pool call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolCall {
    Swap(SwapArgs),
    AddLiquidity(AddLiquidityArgs),
    RemoveLiquidity(RemoveLiquidityArgs),
}

impl PoolCall {
    pub fn method(&self) -> &'static str {
        match self {
            PoolCall::Swap(_) => "swapExactTokensForTokens",
            PoolCall::AddLiquidity(_) => "addLiquidity",
            PoolCall::RemoveLiquidity(_) => "removeLiquidity",
        }
    }
}

/// Mined, successful transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TxReceipt {
    pub tx_hash: TxHash,
    pub block_number: Option<u64>,
}

#[async_trait]
pub trait PoolClient: Send + Sync {
    async fn get_reserves(
        &self,
        token_a: Address,
        token_b: Address,
    ) -> Result<(U256, U256), ClientError>;

    async fn get_price(&self, token_a: Address, token_b: Address) -> Result<U256, ClientError>;

    async fn get_amount_out(
        &self,
        amount_in: U256,
        reserve_in: U256,
        reserve_out: U256,
    ) -> Result<U256, ClientError>;

    /// Submit an ERC-20 `approve(spender, amount)` on `token`
    async fn approve(
        &self,
        token: Address,
        spender: Address,
        amount: U256,
    ) -> Result<TxHash, ClientError>;

    /// Submit a pool write
    async fn submit(&self, call: &PoolCall) -> Result<TxHash, ClientError>;

    /// Static-call `removeLiquidity` to learn the amounts it would return
    async fn preview_remove_liquidity(
        &self,
        args: &RemoveLiquidityArgs,
    ) -> Result<(U256, U256), ClientError>;

    /// Block until `tx_hash` is mined; a reverted transaction is an error
    async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<TxReceipt, ClientError>;
}
