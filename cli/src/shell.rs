//! Interactive shell over a single panel session
//!
//! Reads run inline. Write actions run as background tasks so `status` can
//! be checked while they are pending.

use std::sync::Arc;

use amm_model::SlippageTolerance;
use anyhow::{bail, Result};
use chrono::Local;
use colored::Colorize;
use log::debug;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::config::NetworkConfig;
use crate::liquidity::parse_limits;
use crate::panel::{LiquidityLimits, SwapPanel};
use crate::state::ActionKind;
use crate::trading;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Connect,
    Reserves,
    Price,
    Quote(String),
    /// Swap the current quote, optionally re-quoting first
    Swap(Option<String>),
    Slippage(SlippageTolerance),
    AddLiquidity { amount_a: String, amount_b: String, limits: LiquidityLimits },
    RemoveLiquidity { lp_amount: String, limits: LiquidityLimits },
    Status { json: bool },
    Help,
    Quit,
}

pub fn parse_command(line: &str) -> Result<Option<ShellCommand>> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let Some((&head, args)) = words.split_first() else {
        return Ok(None);
    };

    let command = match (head, args) {
        ("connect", []) => ShellCommand::Connect,
        ("reserves", []) => ShellCommand::Reserves,
        ("price", []) => ShellCommand::Price,
        ("quote", [amount]) => ShellCommand::Quote(amount.to_string()),
        ("swap", []) => ShellCommand::Swap(None),
        ("swap", [amount]) => ShellCommand::Swap(Some(amount.to_string())),
        ("slippage", [percent]) => ShellCommand::Slippage(percent.parse()?),
        ("add", [a, b, mins @ ..]) if mins.len() <= 2 => ShellCommand::AddLiquidity {
            amount_a: a.to_string(),
            amount_b: b.to_string(),
            limits: parse_limits(mins.first().copied(), mins.get(1).copied())?,
        },
        ("remove", [lp, mins @ ..]) if mins.len() <= 2 => ShellCommand::RemoveLiquidity {
            lp_amount: lp.to_string(),
            limits: parse_limits(mins.first().copied(), mins.get(1).copied())?,
        },
        ("status", []) => ShellCommand::Status { json: false },
        ("status", ["--json"]) => ShellCommand::Status { json: true },
        ("help" | "?", []) => ShellCommand::Help,
        ("quit" | "exit", []) => ShellCommand::Quit,
        _ => bail!("Unrecognized command: {} (try `help`)", line.trim()),
    };
    Ok(Some(command))
}

fn print_help() {
    println!("{}", "=== Commands ===".bright_green().bold());
    for (usage, about) in [
        ("connect", "connect the wallet and load reserves"),
        ("reserves", "refresh pool reserves"),
        ("price", "show spot price of A in B"),
        ("quote <amount>", "quote a swap of A for B"),
        ("swap [amount]", "swap the quoted amount"),
        ("slippage <percent>", "set slippage tolerance"),
        ("add <a> <b> [min-a] [min-b]", "add liquidity"),
        ("remove <lp> [min-a] [min-b]", "remove liquidity"),
        ("status [--json]", "show panel state"),
        ("quit", "leave the shell"),
    ] {
        println!("  {:<30} {}", usage.bright_cyan(), about);
    }
}

fn timestamp() -> String {
    Local::now().format("%H:%M:%S").to_string()
}

pub async fn run(config: NetworkConfig, panel: SwapPanel) -> Result<()> {
    let config = Arc::new(config);
    let panel = Arc::new(panel);

    println!("{}", "=== SimpleSwap Shell ===".bright_green().bold());
    println!("{} {} (chain {})", "Network:".bright_cyan(), config.network, config.chain_id);
    println!("{}", "Type `help` for commands".dimmed());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = match parse_command(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                println!("{} {}", "Error:".bright_red(), e);
                continue;
            }
        };
        debug!("shell command: {:?}", command);

        if command == ShellCommand::Quit {
            break;
        }
        if let Err(e) = dispatch(&config, &panel, command).await {
            println!("{} {}", "Error:".bright_red(), e);
        }
    }

    Ok(())
}

async fn dispatch(
    config: &Arc<NetworkConfig>,
    panel: &Arc<SwapPanel>,
    command: ShellCommand,
) -> Result<()> {
    match command {
        ShellCommand::Connect => trading::connect(config, panel).await?,
        ShellCommand::Reserves => trading::show_reserves(panel).await?,
        ShellCommand::Price => trading::show_price(panel).await?,
        ShellCommand::Quote(amount) => trading::quote(panel, &amount).await?,
        ShellCommand::Slippage(tolerance) => {
            let slippage = panel.set_slippage(u32::from(tolerance.percent()))?;
            println!("{} {}", "Slippage:".bright_cyan(), slippage);
        }
        ShellCommand::Swap(amount) => {
            if let Some(amount) = amount {
                trading::quote(panel, &amount).await?;
            }
            spawn_action(config, panel, ActionKind::Swap, |panel| async move {
                panel.execute_swap().await
            });
        }
        ShellCommand::AddLiquidity { amount_a, amount_b, limits } => {
            spawn_action(config, panel, ActionKind::AddLiquidity, move |panel| async move {
                panel.add_liquidity(&amount_a, &amount_b, limits).await
            });
        }
        ShellCommand::RemoveLiquidity { lp_amount, limits } => {
            spawn_action(config, panel, ActionKind::RemoveLiquidity, move |panel| async move {
                panel.remove_liquidity(&lp_amount, limits).await
            });
        }
        ShellCommand::Status { json } => trading::show_status(config, panel, json)?,
        ShellCommand::Help => print_help(),
        ShellCommand::Quit => {}
    }
    Ok(())
}

fn spawn_action<F, Fut>(
    config: &Arc<NetworkConfig>,
    panel: &Arc<SwapPanel>,
    kind: ActionKind,
    action: F,
) where
    F: FnOnce(Arc<SwapPanel>) -> Fut + Send + 'static,
    Fut: std::future::Future<Output = crate::panel::ActionOutcome> + Send + 'static,
{
    let config = config.clone();
    let panel = panel.clone();

    println!("[{}] {} started", timestamp().dimmed(), kind.label());
    tokio::spawn(async move {
        let outcome = action(panel.clone()).await;
        println!("[{}] {} finished", timestamp().dimmed(), kind.label());
        trading::print_outcome(&config, &panel, kind, &outcome);
    });
}
