//! In-memory reference pool for a single token pair
//!
//! Behaves like the deployed pool contract for the operations the client
//! drives: swap A→B or B→A with a minimum-output guard, deposits with
//! per-token minimums, and pro-rata withdrawals. Token custody and
//! allowances are left to the caller.

use std::collections::HashMap;

use ethers_core::types::{Address, U256};

use crate::math::{amount_out, liquidity_for_deposit, proportional_amount, withdrawal_amounts};
use crate::AmmError;

/// Amounts actually taken by a deposit and the shares minted for it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deposit {
    pub amount_a: U256,
    pub amount_b: U256,
    pub liquidity: U256,
}

#[derive(Debug, Clone, Default)]
pub struct Pool {
    reserve_a: U256,
    reserve_b: U256,
    total_supply: U256,
    shares: HashMap<Address, U256>,
}

impl Pool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reserves(&self) -> (U256, U256) {
        (self.reserve_a, self.reserve_b)
    }

    pub fn shares_of(&self, owner: &Address) -> U256 {
        self.shares.get(owner).copied().unwrap_or_default()
    }

    /// Quote without touching state
    pub fn quote(&self, amount_in: U256, a_to_b: bool) -> Result<U256, AmmError> {
        let (reserve_in, reserve_out) = self.oriented(a_to_b);
        amount_out(amount_in, reserve_in, reserve_out)
    }

    /// Swap an exact input amount; fails if the output is below `min_out`
    pub fn swap_exact_in(
        &mut self,
        amount_in: U256,
        min_out: U256,
        a_to_b: bool,
    ) -> Result<U256, AmmError> {
        let out = self.quote(amount_in, a_to_b)?;
        if out < min_out {
            return Err(AmmError::InsufficientOutput);
        }

        if a_to_b {
            self.reserve_a = self.reserve_a.checked_add(amount_in).ok_or(AmmError::Overflow)?;
            self.reserve_b -= out;
        } else {
            self.reserve_b = self.reserve_b.checked_add(amount_in).ok_or(AmmError::Overflow)?;
            self.reserve_a -= out;
        }
        Ok(out)
    }

    /// Deposit up to (`desired_a`, `desired_b`) at the current ratio
    pub fn add_liquidity(
        &mut self,
        to: Address,
        desired_a: U256,
        desired_b: U256,
        min_a: U256,
        min_b: U256,
    ) -> Result<Deposit, AmmError> {
        if desired_a.is_zero() || desired_b.is_zero() {
            return Err(AmmError::InvalidAmount);
        }

        let (amount_a, amount_b) = if self.total_supply.is_zero() {
            (desired_a, desired_b)
        } else {
            let optimal_b = proportional_amount(desired_a, self.reserve_a, self.reserve_b)?;
            if optimal_b <= desired_b {
                (desired_a, optimal_b)
            } else {
                let optimal_a = proportional_amount(desired_b, self.reserve_b, self.reserve_a)?;
                (optimal_a, desired_b)
            }
        };
        if amount_a < min_a || amount_b < min_b {
            return Err(AmmError::InsufficientOutput);
        }

        let liquidity = liquidity_for_deposit(
            amount_a,
            amount_b,
            self.reserve_a,
            self.reserve_b,
            self.total_supply,
        )?;
        if liquidity.is_zero() {
            return Err(AmmError::InsufficientLiquidity);
        }

        self.reserve_a = self.reserve_a.checked_add(amount_a).ok_or(AmmError::Overflow)?;
        self.reserve_b = self.reserve_b.checked_add(amount_b).ok_or(AmmError::Overflow)?;
        self.total_supply = self.total_supply.checked_add(liquidity).ok_or(AmmError::Overflow)?;
        *self.shares.entry(to).or_default() += liquidity;

        Ok(Deposit { amount_a, amount_b, liquidity })
    }

    /// Amounts a withdrawal would return, without burning anything
    pub fn preview_remove(
        &self,
        owner: &Address,
        liquidity: U256,
    ) -> Result<(U256, U256), AmmError> {
        if liquidity.is_zero() {
            return Err(AmmError::InvalidAmount);
        }
        if self.shares_of(owner) < liquidity {
            return Err(AmmError::InsufficientLiquidity);
        }
        withdrawal_amounts(liquidity, self.reserve_a, self.reserve_b, self.total_supply)
    }

    /// Burn `liquidity` shares held by `owner` and release the pro-rata tokens
    pub fn remove_liquidity(
        &mut self,
        owner: &Address,
        liquidity: U256,
        min_a: U256,
        min_b: U256,
    ) -> Result<(U256, U256), AmmError> {
        let (amount_a, amount_b) = self.preview_remove(owner, liquidity)?;
        if amount_a < min_a || amount_b < min_b {
            return Err(AmmError::InsufficientOutput);
        }

        if let Some(held) = self.shares.get_mut(owner) {
            *held -= liquidity;
        }
        self.total_supply -= liquidity;
        self.reserve_a -= amount_a;
        self.reserve_b -= amount_b;

        Ok((amount_a, amount_b))
    }

    fn oriented(&self, a_to_b: bool) -> (U256, U256) {
        if a_to_b {
            (self.reserve_a, self.reserve_b)
        } else {
            (self.reserve_b, self.reserve_a)
        }
    }
}
