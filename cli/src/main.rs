//! SimpleSwap CLI - swap panel for a two-token constant-product pool
//!
//! Connects a wallet, reads reserves and price, quotes and executes swaps,
//! and adds or removes liquidity on a SimpleSwap pool (Sepolia, a local node,
//! or an in-process simulated chain).

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

mod backend;
mod client;
mod config;
mod error;
mod liquidity;
mod panel;
mod shell;
mod sim;
mod state;
mod trading;
mod wallet;

use config::NetworkConfig;

#[derive(Parser)]
#[command(name = "simpleswap")]
#[command(
    about = "SimpleSwap CLI - swap and provide liquidity on a two-token pool",
    long_about = None
)]
#[command(version)]
struct Cli {
    /// Network to connect to (sepolia, localnet, sim)
    #[arg(short, long)]
    network: Option<String>,

    /// RPC URL (overrides network default)
    #[arg(short, long)]
    url: Option<String>,

    /// Path to a file holding a hex private key
    #[arg(short, long)]
    key_file: Option<PathBuf>,

    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect the wallet and show pool reserves
    Connect,

    /// Show pool reserves
    Reserves,

    /// Show the spot price of token A in token B
    Price,

    /// Quote a swap of token A for token B
    Quote {
        /// Amount of token A (decimal)
        amount: String,
    },

    /// Swap token A for token B
    Swap {
        /// Amount of token A (decimal)
        amount: String,

        /// Slippage tolerance in percent (0-100)
        #[arg(short, long)]
        slippage: Option<u32>,
    },

    /// Liquidity operations
    Liquidity {
        #[command(subcommand)]
        command: LiquidityCommands,
    },

    /// Show panel state after connecting
    Status {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Interactive session
    Shell,
}

#[derive(Subcommand)]
enum LiquidityCommands {
    /// Deposit both tokens into the pool
    Add {
        /// Amount of token A (decimal)
        amount_a: String,

        /// Amount of token B (decimal)
        amount_b: String,

        /// Minimum token A accepted
        #[arg(long)]
        min_a: Option<String>,

        /// Minimum token B accepted
        #[arg(long)]
        min_b: Option<String>,
    },

    /// Burn LP shares for the underlying tokens
    Remove {
        /// LP amount (decimal)
        lp_amount: String,

        /// Minimum token A returned
        #[arg(long)]
        min_a: Option<String>,

        /// Minimum token B returned
        #[arg(long)]
        min_b: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    // Initialize network configuration
    let config = NetworkConfig::new(
        cli.network.clone(),
        cli.url.clone(),
        cli.key_file.clone(),
        cli.config.clone(),
    )?;

    if cli.verbose {
        println!("{} {}", "Network:".bright_cyan(), config.network);
        println!("{} {}", "RPC URL:".bright_cyan(), config.rpc_url);
        match &config.key_path {
            Some(path) => println!("{} {}", "Key file:".bright_cyan(), path.display()),
            None => println!("{} {}", "Key file:".bright_cyan(), "none".dimmed()),
        }
        println!("{} {:?}", "Pool:".bright_cyan(), config.contracts.pool);
    }

    let panel = client::build_panel(&config)?;

    // Execute command
    match cli.command {
        Commands::Connect => {
            trading::connect(&config, &panel).await?;
        }
        Commands::Reserves => {
            trading::show_reserves(&panel).await?;
        }
        Commands::Price => {
            trading::show_price(&panel).await?;
        }
        Commands::Quote { amount } => {
            trading::ensure_connected(&panel).await?;
            trading::quote(&panel, &amount).await?;
        }
        Commands::Swap { amount, slippage } => {
            trading::ensure_connected(&panel).await?;
            trading::swap(&config, &panel, &amount, slippage).await?;
        }
        Commands::Liquidity { command } => {
            trading::ensure_connected(&panel).await?;
            match command {
                LiquidityCommands::Add { amount_a, amount_b, min_a, min_b } => {
                    let limits = liquidity::parse_limits(min_a.as_deref(), min_b.as_deref())?;
                    liquidity::add_liquidity(&config, &panel, &amount_a, &amount_b, limits).await?;
                }
                LiquidityCommands::Remove { lp_amount, min_a, min_b } => {
                    let limits = liquidity::parse_limits(min_a.as_deref(), min_b.as_deref())?;
                    liquidity::remove_liquidity(&config, &panel, &lp_amount, limits).await?;
                }
            }
        }
        Commands::Status { json } => {
            if let Err(e) = trading::ensure_connected(&panel).await {
                log::warn!("Not connected: {}", e);
            }
            trading::show_status(&config, &panel, json)?;
        }
        Commands::Shell => {
            shell::run(config, panel).await?;
        }
    }

    Ok(())
}
