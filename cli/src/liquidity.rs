//! Liquidity provider operations

use amm_model::{format_units, parse_units};
use anyhow::{Context, Result};
use colored::Colorize;
use ethers::types::U256;

use crate::config::NetworkConfig;
use crate::panel::{LiquidityLimits, SwapPanel};
use crate::state::ActionKind;
use crate::trading::{print_outcome, track};

/// Minimums from optional decimal strings; absent means zero
pub fn parse_limits(min_a: Option<&str>, min_b: Option<&str>) -> Result<LiquidityLimits> {
    let parse = |value: Option<&str>, name: &str| -> Result<U256> {
        match value {
            Some(s) => parse_units(s).with_context(|| format!("Invalid {}", name)),
            None => Ok(U256::zero()),
        }
    };

    Ok(LiquidityLimits {
        min_a: parse(min_a, "--min-a")?,
        min_b: parse(min_b, "--min-b")?,
    })
}

pub async fn add_liquidity(
    config: &NetworkConfig,
    panel: &SwapPanel,
    amount_a: &str,
    amount_b: &str,
    limits: LiquidityLimits,
) -> Result<()> {
    println!("{}", "=== Add Liquidity ===".bright_green().bold());
    println!("{} {}", "Amount A:".bright_cyan(), amount_a);
    println!("{} {}", "Amount B:".bright_cyan(), amount_b);
    print_limits(&limits);

    let outcome = track(
        panel,
        ActionKind::AddLiquidity,
        panel.add_liquidity(amount_a, amount_b, limits),
    )
    .await;
    print_outcome(config, panel, ActionKind::AddLiquidity, &outcome);
    Ok(())
}

pub async fn remove_liquidity(
    config: &NetworkConfig,
    panel: &SwapPanel,
    lp_amount: &str,
    limits: LiquidityLimits,
) -> Result<()> {
    println!("{}", "=== Remove Liquidity ===".bright_green().bold());
    println!("{} {}", "LP Amount:".bright_cyan(), lp_amount);
    print_limits(&limits);
    if panel.contracts().lp_token.is_none() {
        println!("{}", "No LP token configured, skipping LP approval".dimmed());
    }

    let outcome = track(
        panel,
        ActionKind::RemoveLiquidity,
        panel.remove_liquidity(lp_amount, limits),
    )
    .await;

    if let Some(removal) = &panel.snapshot().removal {
        println!("{} {} A, {} B", "Returned:".bright_cyan(), removal.a, removal.b);
    }
    print_outcome(config, panel, ActionKind::RemoveLiquidity, &outcome);
    Ok(())
}

fn print_limits(limits: &LiquidityLimits) {
    if limits.min_a.is_zero() && limits.min_b.is_zero() {
        println!("{} {}", "Minimums:".bright_cyan(), "none".dimmed());
    } else {
        println!(
            "{} A={} B={}",
            "Minimums:".bright_cyan(),
            format_units(limits.min_a),
            format_units(limits.min_b)
        );
    }
}
