//! AMM Model - fixed-point units, slippage floors and a constant product
//! reference pool (x·y=k)
//!
//! The pool contract owns pricing on-chain. This crate carries the integer
//! arithmetic the client does itself (18-decimal parsing/formatting and the
//! minimum-output floor) plus a reference implementation of the contract's
//! curve, used by the simulated chain and by tests as a local double.

pub mod math;
pub mod pool;
pub mod slippage;
pub mod units;

pub use math::{
    amount_out, liquidity_for_deposit, proportional_amount, spot_price, withdrawal_amounts,
};
pub use pool::{Deposit, Pool};
pub use slippage::{min_output, ParseSlippageError, SlippageTolerance};
pub use units::{format_units, parse_units, AmountError, DECIMALS};

use ethers_core::types::U256;

/// One whole token in smallest units (1e18)
pub fn one_token() -> U256 {
    U256::exp10(DECIMALS)
}

/// Error types for AMM operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AmmError {
    /// Invalid reserves (zero on either side)
    #[error("invalid reserves")]
    InvalidReserves,
    /// Invalid amount (zero)
    #[error("invalid amount")]
    InvalidAmount,
    /// Insufficient liquidity in pool
    #[error("insufficient liquidity")]
    InsufficientLiquidity,
    /// Output (or deposit) fell below the caller's minimum
    #[error("insufficient output amount")]
    InsufficientOutput,
    /// Slippage percent outside 0..=100
    #[error("slippage must be between 0 and 100 percent, got {0}")]
    InvalidSlippage(u32),
    /// Arithmetic overflow
    #[error("arithmetic overflow")]
    Overflow,
}
