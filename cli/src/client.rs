//! JSON-RPC pool client and panel construction

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use ethers::abi::Detokenize;
use ethers::contract::{abigen, ContractCall, ContractError};
use ethers::middleware::SignerMiddleware;
use ethers::providers::{Http, Middleware, PendingTransaction, Provider};
use ethers::signers::LocalWallet;
use ethers::types::{Address, TxHash, U256};
use log::debug;

use crate::backend::{PoolCall, PoolClient, RemoveLiquidityArgs, TxReceipt, WalletProvider};
use crate::config::{Network, NetworkConfig};
use crate::error::ClientError;
use crate::panel::SwapPanel;
use crate::sim::SimChain;
use crate::wallet::LocalKeyWallet;

abigen!(
    SimpleSwap,
    r#"[
        function getReserves(address tokenA, address tokenB) external view returns (uint256 reserveA, uint256 reserveB)
        function getPrice(address tokenA, address tokenB) external view returns (uint256 price)
        function getAmountOut(uint256 amountIn, uint256 reserveIn, uint256 reserveOut) external pure returns (uint256 amountOut)
        function swapExactTokensForTokens(uint256 amountIn, uint256 amountOutMin, address[] path, address to, uint256 deadline) external returns (uint256[] amounts)
        function addLiquidity(address tokenA, address tokenB, uint256 amountADesired, uint256 amountBDesired, uint256 amountAMin, uint256 amountBMin, address to, uint256 deadline) external returns (uint256 amountA, uint256 amountB, uint256 liquidity)
        function removeLiquidity(address tokenA, address tokenB, uint256 liquidity, uint256 amountAMin, uint256 amountBMin, address to, uint256 deadline) external returns (uint256 amountA, uint256 amountB)
    ]"#
);

abigen!(
    Erc20,
    r#"[
        function approve(address spender, uint256 amount) external returns (bool)
    ]"#
);

type Signed = SignerMiddleware<Provider<Http>, LocalWallet>;

/// Pool client backed by an HTTP JSON-RPC endpoint
pub struct RpcPool {
    provider: Arc<Provider<Http>>,
    reader: SimpleSwap<Provider<Http>>,
    writer: Option<Arc<Signed>>,
    pool: Address,
    poll_interval: Duration,
}

impl RpcPool {
    pub fn new(config: &NetworkConfig) -> Result<Self> {
        let provider = Provider::<Http>::try_from(config.rpc_url.as_str())
            .with_context(|| format!("Invalid RPC URL: {}", config.rpc_url))?
            .interval(config.receipt_poll);
        let provider = Arc::new(provider);

        let reader = SimpleSwap::new(config.contracts.pool, provider.clone());
        let writer = config
            .wallet
            .clone()
            .map(|wallet| Arc::new(SignerMiddleware::new(provider.as_ref().clone(), wallet)));

        Ok(Self {
            provider,
            reader,
            writer,
            pool: config.contracts.pool,
            poll_interval: config.receipt_poll,
        })
    }

    pub fn provider(&self) -> Arc<Provider<Http>> {
        self.provider.clone()
    }

    fn writer(&self) -> Result<&Arc<Signed>, ClientError> {
        self.writer.as_ref().ok_or(ClientError::NoSigner)
    }

    fn pool_writer(&self) -> Result<SimpleSwap<Signed>, ClientError> {
        Ok(SimpleSwap::new(self.pool, self.writer()?.clone()))
    }
}

fn contract_error<M: Middleware>(err: ContractError<M>) -> ClientError {
    match err.decode_revert::<String>() {
        Some(reason) => ClientError::Contract(format!("execution reverted: {}", reason)),
        None => ClientError::Contract(err.to_string()),
    }
}

/// Broadcast a write and return its hash without waiting for inclusion
async fn send_call<D>(call: ContractCall<Signed, D>) -> Result<TxHash, ClientError>
where
    D: Detokenize + Send + Sync,
{
    let pending = call.send().await.map_err(contract_error)?;
    Ok(pending.tx_hash())
}

#[async_trait]
impl PoolClient for RpcPool {
    async fn get_reserves(
        &self,
        token_a: Address,
        token_b: Address,
    ) -> Result<(U256, U256), ClientError> {
        self.reader
            .get_reserves(token_a, token_b)
            .call()
            .await
            .map_err(contract_error)
    }

    async fn get_price(&self, token_a: Address, token_b: Address) -> Result<U256, ClientError> {
        self.reader.get_price(token_a, token_b).call().await.map_err(contract_error)
    }

    async fn get_amount_out(
        &self,
        amount_in: U256,
        reserve_in: U256,
        reserve_out: U256,
    ) -> Result<U256, ClientError> {
        self.reader
            .get_amount_out(amount_in, reserve_in, reserve_out)
            .call()
            .await
            .map_err(contract_error)
    }

    async fn approve(
        &self,
        token: Address,
        spender: Address,
        amount: U256,
    ) -> Result<TxHash, ClientError> {
        let erc20 = Erc20::new(token, self.writer()?.clone());
        let hash = send_call(erc20.approve(spender, amount)).await?;
        debug!("approve {:?} on {:?}: {:?}", spender, token, hash);
        Ok(hash)
    }

    async fn submit(&self, call: &PoolCall) -> Result<TxHash, ClientError> {
        let pool = self.pool_writer()?;
        let hash = match call {
            PoolCall::Swap(args) => {
                send_call(pool.swap_exact_tokens_for_tokens(
                    args.amount_in,
                    args.amount_out_min,
                    args.path.clone(),
                    args.to,
                    args.deadline,
                ))
                .await?
            }
            PoolCall::AddLiquidity(args) => {
                send_call(pool.add_liquidity(
                    args.token_a,
                    args.token_b,
                    args.amount_a_desired,
                    args.amount_b_desired,
                    args.amount_a_min,
                    args.amount_b_min,
                    args.to,
                    args.deadline,
                ))
                .await?
            }
            PoolCall::RemoveLiquidity(args) => {
                send_call(pool.remove_liquidity(
                    args.token_a,
                    args.token_b,
                    args.liquidity,
                    args.amount_a_min,
                    args.amount_b_min,
                    args.to,
                    args.deadline,
                ))
                .await?
            }
        };
        Ok(hash)
    }

    async fn preview_remove_liquidity(
        &self,
        args: &RemoveLiquidityArgs,
    ) -> Result<(U256, U256), ClientError> {
        // eth_call from the LP holder so the contract sees their balance
        self.reader
            .remove_liquidity(
                args.token_a,
                args.token_b,
                args.liquidity,
                args.amount_a_min,
                args.amount_b_min,
                args.to,
                args.deadline,
            )
            .from(args.to)
            .call()
            .await
            .map_err(contract_error)
    }

    async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<TxReceipt, ClientError> {
        let receipt = PendingTransaction::new(tx_hash, self.provider.as_ref())
            .interval(self.poll_interval)
            .await
            .map_err(|e| ClientError::Rpc(e.to_string()))?
            .ok_or(ClientError::Dropped(tx_hash))?;

        if receipt.status.map(|s| s.is_zero()).unwrap_or(false) {
            return Err(ClientError::Reverted(tx_hash));
        }

        Ok(TxReceipt {
            tx_hash,
            block_number: receipt.block_number.map(|n| n.as_u64()),
        })
    }
}

/// Wire a panel to the configured network
pub fn build_panel(config: &NetworkConfig) -> Result<SwapPanel> {
    let contracts = config.contracts;

    let panel = match config.network {
        Network::Sim => {
            let chain = Arc::new(SimChain::new(contracts));
            SwapPanel::new(chain.clone(), Some(chain), contracts, config.chain_id)
        }
        Network::Sepolia | Network::Localnet => {
            let pool = RpcPool::new(config)?;
            let wallet: Option<Arc<dyn WalletProvider>> = match config.address() {
                Some(address) => Some(Arc::new(LocalKeyWallet::new(address, pool.provider()))),
                None => None,
            };
            SwapPanel::new(Arc::new(pool), wallet, contracts, config.chain_id)
        }
    };

    Ok(panel.with_slippage(config.slippage))
}

/// Full transaction hash, with an explorer link when the network has one
pub fn format_tx_hash(config: &NetworkConfig, tx_hash: &TxHash) -> String {
    match config.explorer_tx_url(tx_hash) {
        Some(url) => url,
        None => format!("{:?}", tx_hash),
    }
}

pub fn format_address(address: &Address) -> String {
    ethers::utils::to_checksum(address, None)
}
