//! Slippage tolerance and the minimum-output floor sent with a swap

use std::fmt;
use std::str::FromStr;

use ethers_core::types::{U256, U512};
use serde::Serialize;

use crate::AmmError;

/// Whole-percent slippage tolerance, 0..=100
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct SlippageTolerance(u8);

impl SlippageTolerance {
    pub const MAX_PERCENT: u32 = 100;

    pub fn new(percent: u32) -> Result<Self, AmmError> {
        if percent > Self::MAX_PERCENT {
            return Err(AmmError::InvalidSlippage(percent));
        }
        Ok(Self(percent as u8))
    }

    pub fn percent(&self) -> u8 {
        self.0
    }
}

impl Default for SlippageTolerance {
    fn default() -> Self {
        Self(1)
    }
}

impl fmt::Display for SlippageTolerance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseSlippageError {
    #[error("slippage must be a whole percent, got {0:?}")]
    Malformed(String),
    #[error(transparent)]
    OutOfRange(#[from] AmmError),
}

impl FromStr for SlippageTolerance {
    type Err = ParseSlippageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_end_matches('%');
        let percent: u32 = trimmed
            .parse()
            .map_err(|_| ParseSlippageError::Malformed(s.trim().to_string()))?;
        Ok(Self::new(percent)?)
    }
}

/// Minimum acceptable output: `floor(quoted * (100 - slippage) / 100)`.
///
/// The product is taken in 512 bits so any `quoted` value is exact.
pub fn min_output(quoted: U256, tolerance: SlippageTolerance) -> U256 {
    let keep = U256::from(100 - tolerance.percent() as u64);
    let floor = quoted.full_mul(keep) / U512::from(100u64);

    // floor <= quoted, so the narrowing cannot fail
    U256::try_from(floor).unwrap_or(quoted)
}
