//! Ephemeral session state held by the swap panel

use std::fmt;

use amm_model::SlippageTolerance;
use ethers::types::{Address, TxHash, U256};
use serde::Serialize;

/// The three write actions the panel can run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Swap,
    AddLiquidity,
    RemoveLiquidity,
}

impl ActionKind {
    pub const ALL: [ActionKind; 3] = [
        ActionKind::Swap,
        ActionKind::AddLiquidity,
        ActionKind::RemoveLiquidity,
    ];

    pub(crate) fn index(self) -> usize {
        match self {
            ActionKind::Swap => 0,
            ActionKind::AddLiquidity => 1,
            ActionKind::RemoveLiquidity => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ActionKind::Swap => "Swap",
            ActionKind::AddLiquidity => "Add Liquidity",
            ActionKind::RemoveLiquidity => "Remove Liquidity",
        }
    }

    pub fn pending_text(self) -> &'static str {
        match self {
            ActionKind::Swap => "Swapping…",
            ActionKind::AddLiquidity => "Adding liquidity…",
            ActionKind::RemoveLiquidity => "Removing liquidity…",
        }
    }

    pub fn success_text(self) -> &'static str {
        match self {
            ActionKind::Swap => "Swap complete!",
            ActionKind::AddLiquidity => "Liquidity added!",
            ActionKind::RemoveLiquidity => "Liquidity removed!",
        }
    }

    pub fn failure_prefix(self) -> &'static str {
        match self {
            ActionKind::Swap => "Swap failed: ",
            ActionKind::AddLiquidity => "Add liquidity failed: ",
            ActionKind::RemoveLiquidity => "Remove liquidity failed: ",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "message", rename_all = "snake_case")]
pub enum TxStatus {
    #[default]
    Idle,
    Pending(String),
    Success(String),
    Failure(String),
}

impl fmt::Display for TxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxStatus::Idle => Ok(()),
            TxStatus::Pending(msg) | TxStatus::Success(msg) | TxStatus::Failure(msg) => {
                f.write_str(msg)
            }
        }
    }
}

/// Status and hash of the latest run of one action
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TxRecord {
    pub status: TxStatus,
    pub tx_hash: Option<TxHash>,
}

impl TxRecord {
    pub fn reset(&mut self) {
        self.status = TxStatus::Idle;
        self.tx_hash = None;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReserveSnapshot {
    pub a: String,
    pub b: String,
}

impl Default for ReserveSnapshot {
    fn default() -> Self {
        Self {
            a: "0".to_string(),
            b: "0".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SwapQuote {
    /// Input as typed
    pub amount_in: String,
    pub amount_in_wei: U256,
    pub amount_out: U256,
    pub amount_out_display: String,
}

/// Amounts returned by the latest liquidity removal
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemovalResult {
    pub a: String,
    pub b: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PanelState {
    pub account: Option<Address>,
    pub price: Option<String>,
    pub reserves: ReserveSnapshot,
    pub swap_input: String,
    pub quote: Option<SwapQuote>,
    pub slippage: SlippageTolerance,
    pub swap: TxRecord,
    pub add_liquidity: TxRecord,
    pub remove_liquidity: TxRecord,
    pub removal: Option<RemovalResult>,
    #[serde(skip)]
    pub(crate) quote_seq: u64,
}

impl PanelState {
    pub fn record(&self, kind: ActionKind) -> &TxRecord {
        match kind {
            ActionKind::Swap => &self.swap,
            ActionKind::AddLiquidity => &self.add_liquidity,
            ActionKind::RemoveLiquidity => &self.remove_liquidity,
        }
    }

    pub(crate) fn record_mut(&mut self, kind: ActionKind) -> &mut TxRecord {
        match kind {
            ActionKind::Swap => &mut self.swap,
            ActionKind::AddLiquidity => &mut self.add_liquidity,
            ActionKind::RemoveLiquidity => &mut self.remove_liquidity,
        }
    }
}
