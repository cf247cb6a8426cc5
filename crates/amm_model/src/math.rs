//! Constant product AMM math (x·y=k), fee-less, mirroring the pool contract

use ethers_core::types::U256;

use crate::{one_token, AmmError};

/// Output amount for an exact input:
///
/// - Invariant: x0·y0 = x1·y1 with x1 = x0 + Δx_in
/// - Δy_out = Δx_in · y0 / (x0 + Δx_in)
///
/// Rounds down, so the pool never pays out more than the invariant allows.
///
/// # Arguments
/// * `amount_in` - Input token amount (smallest units)
/// * `reserve_in` - Pool reserve of the input token
/// * `reserve_out` - Pool reserve of the output token
pub fn amount_out(amount_in: U256, reserve_in: U256, reserve_out: U256) -> Result<U256, AmmError> {
    if reserve_in.is_zero() || reserve_out.is_zero() {
        return Err(AmmError::InvalidReserves);
    }
    if amount_in.is_zero() {
        return Err(AmmError::InvalidAmount);
    }

    let numerator = amount_in.checked_mul(reserve_out).ok_or(AmmError::Overflow)?;
    let denominator = reserve_in.checked_add(amount_in).ok_or(AmmError::Overflow)?;

    Ok(numerator / denominator)
}

/// Spot price of A denominated in B, scaled by 1e18
pub fn spot_price(reserve_a: U256, reserve_b: U256) -> Result<U256, AmmError> {
    if reserve_a.is_zero() {
        return Err(AmmError::InvalidReserves);
    }
    let scaled = reserve_b.checked_mul(one_token()).ok_or(AmmError::Overflow)?;
    Ok(scaled / reserve_a)
}

/// Amount of B matching `amount_a` at the current reserve ratio
pub fn proportional_amount(
    amount_a: U256,
    reserve_a: U256,
    reserve_b: U256,
) -> Result<U256, AmmError> {
    if reserve_a.is_zero() || reserve_b.is_zero() {
        return Err(AmmError::InvalidReserves);
    }
    let numerator = amount_a.checked_mul(reserve_b).ok_or(AmmError::Overflow)?;
    Ok(numerator / reserve_a)
}

/// LP shares minted for a deposit of (`amount_a`, `amount_b`).
///
/// First deposit mints `sqrt(a·b)`; later deposits mint the smaller of the
/// two pro-rata shares so an unbalanced deposit never dilutes holders.
pub fn liquidity_for_deposit(
    amount_a: U256,
    amount_b: U256,
    reserve_a: U256,
    reserve_b: U256,
    total_supply: U256,
) -> Result<U256, AmmError> {
    if total_supply.is_zero() {
        let product = amount_a.checked_mul(amount_b).ok_or(AmmError::Overflow)?;
        return Ok(product.integer_sqrt());
    }
    if reserve_a.is_zero() || reserve_b.is_zero() {
        return Err(AmmError::InvalidReserves);
    }

    let share_a = amount_a.checked_mul(total_supply).ok_or(AmmError::Overflow)? / reserve_a;
    let share_b = amount_b.checked_mul(total_supply).ok_or(AmmError::Overflow)? / reserve_b;
    Ok(share_a.min(share_b))
}

/// Token amounts returned for burning `liquidity` LP shares
pub fn withdrawal_amounts(
    liquidity: U256,
    reserve_a: U256,
    reserve_b: U256,
    total_supply: U256,
) -> Result<(U256, U256), AmmError> {
    if total_supply.is_zero() || liquidity > total_supply {
        return Err(AmmError::InsufficientLiquidity);
    }
    let amount_a = liquidity.checked_mul(reserve_a).ok_or(AmmError::Overflow)? / total_supply;
    let amount_b = liquidity.checked_mul(reserve_b).ok_or(AmmError::Overflow)? / total_supply;
    Ok((amount_a, amount_b))
}
