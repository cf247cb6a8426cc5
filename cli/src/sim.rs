//! Offline simulated chain
//!
//! Plays both the wallet and the pool contract so the client can run with
//! `--network sim` and so tests have a deterministic double. The pool curve
//! comes from `amm_model::Pool`; this module adds token balances,
//! allowances and mined receipts around it. Transactions execute at
//! submission and revert there, the way a failed gas estimate surfaces on a
//! real node.

use std::collections::HashMap;

use amm_model::{amount_out, one_token, Pool};
use async_trait::async_trait;
use ethers::types::{Address, TxHash, U256};
use log::debug;
use parking_lot::Mutex;

use crate::backend::{PoolCall, PoolClient, RemoveLiquidityArgs, TxReceipt, WalletProvider};
use crate::config::Contracts;
use crate::error::{ClientError, WalletError};

const GENESIS_RESERVE_A: u64 = 1_000;
const GENESIS_RESERVE_B: u64 = 2_000;
const STARTING_BALANCE: u64 = 10_000;

#[derive(Default)]
struct SimState {
    pool: Pool,
    balances: HashMap<(Address, Address), U256>,
    allowances: HashMap<(Address, Address, Address), U256>,
    receipts: HashMap<TxHash, TxReceipt>,
    block: u64,
}

impl SimState {
    fn balance(&self, token: Address, owner: Address) -> U256 {
        self.balances.get(&(token, owner)).copied().unwrap_or_default()
    }

    fn allowance(&self, token: Address, owner: Address, spender: Address) -> U256 {
        self.allowances.get(&(token, owner, spender)).copied().unwrap_or_default()
    }

    /// Pull `amount` of `token` from `owner` into the pool using its allowance
    fn transfer_from(
        &mut self,
        token: Address,
        owner: Address,
        pool: Address,
        amount: U256,
    ) -> Result<(), ClientError> {
        let allowed = self.allowance(token, owner, pool);
        if allowed < amount {
            return Err(ClientError::Sim(format!("insufficient allowance for {:?}", token)));
        }
        let held = self.balance(token, owner);
        if held < amount {
            return Err(ClientError::Sim(format!("insufficient balance of {:?}", token)));
        }
        self.allowances.insert((token, owner, pool), allowed - amount);
        self.balances.insert((token, owner), held - amount);
        Ok(())
    }

    fn credit(&mut self, token: Address, owner: Address, amount: U256) {
        *self.balances.entry((token, owner)).or_default() += amount;
    }

    fn mine(&mut self) -> TxReceipt {
        self.block += 1;
        let receipt = TxReceipt {
            tx_hash: TxHash::from_low_u64_be(self.block),
            block_number: Some(self.block),
        };
        self.receipts.insert(receipt.tx_hash, receipt);
        receipt
    }
}

pub struct SimChain {
    contracts: Contracts,
    account: Address,
    state: Mutex<SimState>,
}

impl SimChain {
    pub const CHAIN_ID: u64 = 31_337;

    pub fn default_contracts() -> Contracts {
        Contracts {
            pool: Address::from_low_u64_be(0x5157),
            token_a: Address::from_low_u64_be(0xa),
            token_b: Address::from_low_u64_be(0xb),
            lp_token: None,
        }
    }

    /// Pool seeded with 1000 A / 2000 B by a genesis provider; the wallet
    /// account starts with 10_000 of each token and no LP shares.
    pub fn new(contracts: Contracts) -> Self {
        let account = Address::from_low_u64_be(0xacc0);
        let genesis = Address::from_low_u64_be(0x1);

        let mut state = SimState::default();
        if let Err(err) = state.pool.add_liquidity(
            genesis,
            U256::from(GENESIS_RESERVE_A) * one_token(),
            U256::from(GENESIS_RESERVE_B) * one_token(),
            U256::zero(),
            U256::zero(),
        ) {
            debug!("Genesis deposit rejected: {}", err);
        }
        let starting = U256::from(STARTING_BALANCE) * one_token();
        state.credit(contracts.token_a, account, starting);
        state.credit(contracts.token_b, account, starting);

        Self {
            contracts,
            account,
            state: Mutex::new(state),
        }
    }

    fn orientation(&self, token_a: Address, token_b: Address) -> Result<bool, ClientError> {
        if token_a == self.contracts.token_a && token_b == self.contracts.token_b {
            Ok(true)
        } else if token_a == self.contracts.token_b && token_b == self.contracts.token_a {
            Ok(false)
        } else {
            Err(ClientError::Sim(format!("unknown pair {:?}/{:?}", token_a, token_b)))
        }
    }

    fn execute(&self, call: &PoolCall) -> Result<TxReceipt, ClientError> {
        let pool_address = self.contracts.pool;
        let sender = self.account;
        let mut state = self.state.lock();

        match call {
            PoolCall::Swap(args) => {
                let [token_in, token_out] = args.path.as_slice() else {
                    return Err(ClientError::Sim("path must have exactly two tokens".to_string()));
                };
                let a_to_b = self.orientation(*token_in, *token_out)?;

                let mut pool = state.pool.clone();
                let out = pool.swap_exact_in(args.amount_in, args.amount_out_min, a_to_b)?;
                state.transfer_from(*token_in, sender, pool_address, args.amount_in)?;
                state.pool = pool;
                state.credit(*token_out, args.to, out);
            }
            PoolCall::AddLiquidity(args) => {
                let a_to_b = self.orientation(args.token_a, args.token_b)?;
                let desired = (args.amount_a_desired, args.amount_b_desired);
                let mins = (args.amount_a_min, args.amount_b_min);
                let ((desired_a, desired_b), (min_a, min_b)) = if a_to_b {
                    (desired, mins)
                } else {
                    ((desired.1, desired.0), (mins.1, mins.0))
                };

                let mut pool = state.pool.clone();
                let deposit = pool.add_liquidity(args.to, desired_a, desired_b, min_a, min_b)?;
                let (token_a, token_b) = (self.contracts.token_a, self.contracts.token_b);
                state.transfer_from(token_a, sender, pool_address, deposit.amount_a)?;
                state.transfer_from(token_b, sender, pool_address, deposit.amount_b)?;
                state.pool = pool;
            }
            PoolCall::RemoveLiquidity(args) => {
                let (out_a, out_b) = self.removal_amounts(&state, args)?;
                if let Some(lp_token) = self.contracts.lp_token {
                    let allowed = state.allowance(lp_token, sender, pool_address);
                    if allowed < args.liquidity {
                        return Err(ClientError::Sim("insufficient LP allowance".to_string()));
                    }
                    state
                        .allowances
                        .insert((lp_token, sender, pool_address), allowed - args.liquidity);
                }
                state.pool.remove_liquidity(&sender, args.liquidity, out_a, out_b)?;
                state.credit(self.contracts.token_a, args.to, out_a);
                state.credit(self.contracts.token_b, args.to, out_b);
            }
        }

        Ok(state.mine())
    }

    /// Amounts in (token A, token B) order, checked against the minimums
    fn removal_amounts(
        &self,
        state: &SimState,
        args: &RemoveLiquidityArgs,
    ) -> Result<(U256, U256), ClientError> {
        let a_to_b = self.orientation(args.token_a, args.token_b)?;
        let (out_a, out_b) = state.pool.preview_remove(&self.account, args.liquidity)?;
        let (min_a, min_b) = if a_to_b {
            (args.amount_a_min, args.amount_b_min)
        } else {
            (args.amount_b_min, args.amount_a_min)
        };
        if out_a < min_a || out_b < min_b {
            return Err(amm_model::AmmError::InsufficientOutput.into());
        }
        Ok((out_a, out_b))
    }
}

// Inspection helpers for tests
#[cfg(test)]
impl SimChain {
    pub(crate) fn account(&self) -> Address {
        self.account
    }

    pub(crate) fn contracts(&self) -> &Contracts {
        &self.contracts
    }

    pub(crate) fn balance_of(&self, token: Address, owner: Address) -> U256 {
        self.state.lock().balance(token, owner)
    }

    pub(crate) fn allowance(&self, token: Address, owner: Address, spender: Address) -> U256 {
        self.state.lock().allowance(token, owner, spender)
    }

    /// LP shares held by `owner`
    pub(crate) fn shares_of(&self, owner: Address) -> U256 {
        self.state.lock().pool.shares_of(&owner)
    }

    /// Swap by some other trader, moving the price under the wallet's feet
    pub(crate) fn trade_as_outsider(
        &self,
        amount_in: U256,
        a_to_b: bool,
    ) -> Result<U256, amm_model::AmmError> {
        self.state.lock().pool.swap_exact_in(amount_in, U256::zero(), a_to_b)
    }
}

#[async_trait]
impl WalletProvider for SimChain {
    async fn switch_chain(&self, chain_id: u64) -> Result<(), WalletError> {
        if chain_id == Self::CHAIN_ID {
            Ok(())
        } else {
            Err(WalletError::Rejected(format!(
                "simulated wallet cannot switch to chain {}",
                chain_id
            )))
        }
    }

    async fn request_accounts(&self) -> Result<Vec<Address>, WalletError> {
        Ok(vec![self.account])
    }
}

#[async_trait]
impl PoolClient for SimChain {
    async fn get_reserves(
        &self,
        token_a: Address,
        token_b: Address,
    ) -> Result<(U256, U256), ClientError> {
        let a_to_b = self.orientation(token_a, token_b)?;
        let (reserve_a, reserve_b) = self.state.lock().pool.reserves();
        Ok(if a_to_b { (reserve_a, reserve_b) } else { (reserve_b, reserve_a) })
    }

    async fn get_price(&self, token_a: Address, token_b: Address) -> Result<U256, ClientError> {
        let (reserve_a, reserve_b) = self.get_reserves(token_a, token_b).await?;
        Ok(amm_model::spot_price(reserve_a, reserve_b)?)
    }

    async fn get_amount_out(
        &self,
        amount_in: U256,
        reserve_in: U256,
        reserve_out: U256,
    ) -> Result<U256, ClientError> {
        Ok(amount_out(amount_in, reserve_in, reserve_out)?)
    }

    async fn approve(
        &self,
        token: Address,
        spender: Address,
        amount: U256,
    ) -> Result<TxHash, ClientError> {
        let mut state = self.state.lock();
        state.allowances.insert((token, self.account, spender), amount);
        Ok(state.mine().tx_hash)
    }

    async fn submit(&self, call: &PoolCall) -> Result<TxHash, ClientError> {
        let receipt = self.execute(call)?;
        debug!("Simulated {} mined in block {:?}", call.method(), receipt.block_number);
        Ok(receipt.tx_hash)
    }

    async fn preview_remove_liquidity(
        &self,
        args: &RemoveLiquidityArgs,
    ) -> Result<(U256, U256), ClientError> {
        let state = self.state.lock();
        let (out_a, out_b) = self.removal_amounts(&state, args)?;
        if self.orientation(args.token_a, args.token_b)? {
            Ok((out_a, out_b))
        } else {
            Ok((out_b, out_a))
        }
    }

    async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<TxReceipt, ClientError> {
        self.state
            .lock()
            .receipts
            .get(&tx_hash)
            .copied()
            .ok_or(ClientError::Dropped(tx_hash))
    }
}
