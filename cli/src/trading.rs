//! Session, quote and swap commands

use std::future::Future;
use std::time::Duration;

use amm_model::{format_units, min_output};
use anyhow::Result;
use colored::Colorize;
use ethers::types::Address;
use indicatif::{ProgressBar, ProgressStyle};

use crate::client::{format_address, format_tx_hash};
use crate::config::NetworkConfig;
use crate::panel::{ActionOutcome, QuoteUpdate, SwapPanel};
use crate::state::{ActionKind, TxStatus};

pub async fn connect(config: &NetworkConfig, panel: &SwapPanel) -> Result<()> {
    println!("{}", "=== Connect Wallet ===".bright_green().bold());
    println!("{} {} (chain {})", "Network:".bright_cyan(), config.network, config.chain_id);

    let account = panel.connect().await?;
    let state = panel.snapshot();

    println!("{} {}", "Account:".bright_cyan(), format_address(&account));
    println!("{} {}", "Reserve A:".bright_cyan(), state.reserves.a);
    println!("{} {}", "Reserve B:".bright_cyan(), state.reserves.b);
    Ok(())
}

/// Connect quietly unless an account is already held
pub async fn ensure_connected(panel: &SwapPanel) -> Result<Address> {
    match panel.account() {
        Some(account) => Ok(account),
        None => Ok(panel.connect().await?),
    }
}

pub async fn show_reserves(panel: &SwapPanel) -> Result<()> {
    println!("{}", "=== Pool Reserves ===".bright_green().bold());
    let reserves = panel.refresh_reserves().await?;
    let contracts = panel.contracts();

    println!("{} {}", "Pool:".bright_cyan(), format_address(&contracts.pool));
    let token_a = format_address(&contracts.token_a);
    let token_b = format_address(&contracts.token_b);
    println!("{} {} ({})", "Reserve A:".bright_cyan(), reserves.a, token_a);
    println!("{} {} ({})", "Reserve B:".bright_cyan(), reserves.b, token_b);
    Ok(())
}

pub async fn show_price(panel: &SwapPanel) -> Result<()> {
    println!("{}", "=== Spot Price ===".bright_green().bold());
    let price = panel.show_price().await?;
    println!("{} 1 A = {} B", "Price:".bright_cyan(), price);
    Ok(())
}

pub async fn quote(panel: &SwapPanel, amount: &str) -> Result<()> {
    println!("{}", "=== Swap Quote ===".bright_green().bold());

    match panel.update_swap_input(amount).await? {
        QuoteUpdate::Applied(quote) => {
            let slippage = panel.snapshot().slippage;
            let floor = min_output(quote.amount_out, slippage);
            println!("{} {} A", "Amount In:".bright_cyan(), quote.amount_in);
            println!("{} {} B", "Estimated Out:".bright_cyan(), quote.amount_out_display);
            println!(
                "{} {} B ({} slippage)",
                "Minimum Out:".bright_cyan(),
                format_units(floor),
                slippage
            );
        }
        QuoteUpdate::Cleared => {
            println!("{}", "No quote: enter an amount and connect a wallet".dimmed());
        }
        QuoteUpdate::Stale => {
            println!("{}", "Quote superseded by newer input".dimmed());
        }
    }
    Ok(())
}

pub async fn swap(
    config: &NetworkConfig,
    panel: &SwapPanel,
    amount: &str,
    slippage: Option<u32>,
) -> Result<()> {
    if let Some(percent) = slippage {
        panel.set_slippage(percent)?;
    }
    quote(panel, amount).await?;

    println!("\n{}", "=== Swap A → B ===".bright_green().bold());
    let outcome = track(panel, ActionKind::Swap, panel.execute_swap()).await;
    print_outcome(config, panel, ActionKind::Swap, &outcome);
    Ok(())
}

pub fn show_status(config: &NetworkConfig, panel: &SwapPanel, json: bool) -> Result<()> {
    let state = panel.snapshot();

    if json {
        println!("{}", serde_json::to_string_pretty(&state)?);
        return Ok(());
    }

    println!("{}", "=== Panel Status ===".bright_green().bold());
    println!("{} {}", "Network:".bright_cyan(), config.network);
    match state.account {
        Some(account) => println!("{} {}", "Account:".bright_cyan(), format_address(&account)),
        None => println!("{} {}", "Account:".bright_cyan(), "not connected".dimmed()),
    }
    println!("{} A={} B={}", "Reserves:".bright_cyan(), state.reserves.a, state.reserves.b);
    if let Some(price) = &state.price {
        println!("{} {}", "Price:".bright_cyan(), price);
    }
    println!("{} {}", "Slippage:".bright_cyan(), state.slippage);
    if let Some(quote) = &state.quote {
        println!(
            "{} {} A → {} B",
            "Quote:".bright_cyan(),
            quote.amount_in,
            quote.amount_out_display
        );
    }

    for kind in ActionKind::ALL {
        let record = state.record(kind);
        let status = match &record.status {
            TxStatus::Idle => "idle".dimmed(),
            TxStatus::Pending(msg) => msg.yellow(),
            TxStatus::Success(msg) => msg.bright_green(),
            TxStatus::Failure(msg) => msg.bright_red(),
        };
        let busy = if panel.is_busy(kind) { " (in flight)" } else { "" };
        println!("{} {}{}", format!("{}:", kind.label()).bright_cyan(), status, busy.yellow());
        if let Some(hash) = &record.tx_hash {
            println!("  {} {}", "Tx:".dimmed(), format_tx_hash(config, hash));
        }
    }

    if let Some(removal) = &state.removal {
        println!("{} A={} B={}", "Last Removal:".bright_cyan(), removal.a, removal.b);
    }
    Ok(())
}

/// Drive an action while a spinner mirrors its status
pub async fn track<F>(panel: &SwapPanel, kind: ActionKind, action: F) -> ActionOutcome
where
    F: Future<Output = ActionOutcome>,
{
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message("Waiting for approval…");
    spinner.enable_steady_tick(Duration::from_millis(120));

    tokio::pin!(action);
    let mut ticker = tokio::time::interval(Duration::from_millis(200));
    let outcome = loop {
        tokio::select! {
            outcome = &mut action => break outcome,
            _ = ticker.tick() => {
                if let TxStatus::Pending(msg) = &panel.snapshot().record(kind).status {
                    spinner.set_message(msg.clone());
                }
            }
        }
    };

    spinner.finish_and_clear();
    outcome
}

pub fn print_outcome(
    config: &NetworkConfig,
    panel: &SwapPanel,
    kind: ActionKind,
    outcome: &ActionOutcome,
) {
    match outcome {
        ActionOutcome::Skipped(reason) => {
            println!("{} {}", format!("{} skipped:", kind.label()).yellow(), reason);
        }
        ActionOutcome::Completed(receipt) => {
            println!("{}", kind.success_text().bright_green().bold());
            println!("{} {}", "Tx:".bright_cyan(), format_tx_hash(config, &receipt.tx_hash));
            if let Some(block) = receipt.block_number {
                println!("{} {}", "Block:".bright_cyan(), block);
            }
            if kind != ActionKind::Swap {
                let reserves = panel.snapshot().reserves;
                println!("{} A={} B={}", "Reserves:".bright_cyan(), reserves.a, reserves.b);
            }
        }
        ActionOutcome::Failed(message) => {
            println!("{}", message.bright_red());
            if let Some(hash) = &panel.snapshot().record(kind).tx_hash {
                println!("{} {}", "Tx:".bright_cyan(), format_tx_hash(config, hash));
            }
        }
    }
}
