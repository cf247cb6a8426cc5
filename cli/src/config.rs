//! Network configuration, contract addresses and signing key management

use anyhow::{Context, Result};
use amm_model::SlippageTolerance;
use ethers::signers::{LocalWallet, Signer};
use ethers::types::Address;
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::sim::SimChain;

/// Environment variable holding a hex private key when no key file is given
pub const PRIVATE_KEY_ENV: &str = "SIMPLESWAP_PRIVATE_KEY";

// Deployed SimpleSwap pool and its pair on Sepolia
const SEPOLIA_POOL: &str = "0xBfBe54b54868C37034Cfa6A8E9E5d045CC1B8278";
const SEPOLIA_TOKEN_A: &str = "0xc3C4B92ccD54E42e23911F5212fE628370d99e2E";
const SEPOLIA_TOKEN_B: &str = "0x19546E766F5168dcDbB1A8F93733fFA23Aa79D52";

const DEFAULT_RECEIPT_POLL_MS: u64 = 2_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Network {
    Sepolia,
    Localnet,
    Sim,
}

impl Network {
    pub fn chain_id(&self) -> u64 {
        match self {
            Network::Sepolia => 11_155_111,
            Network::Localnet => 31_337,
            Network::Sim => SimChain::CHAIN_ID,
        }
    }

    fn default_rpc_url(&self) -> &'static str {
        match self {
            Network::Sepolia => "https://ethereum-sepolia-rpc.publicnode.com",
            Network::Localnet => "http://127.0.0.1:8545",
            Network::Sim => "sim://local",
        }
    }

    fn explorer_tx_base(&self) -> Option<&'static str> {
        match self {
            Network::Sepolia => Some("https://sepolia.etherscan.io/tx/"),
            Network::Localnet | Network::Sim => None,
        }
    }
}

impl FromStr for Network {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "sepolia" => Ok(Network::Sepolia),
            "localnet" | "local" | "anvil" => Ok(Network::Localnet),
            "sim" | "simulated" => Ok(Network::Sim),
            _ => anyhow::bail!("Unknown network: {}. Use sepolia, localnet, or sim", s),
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Network::Sepolia => "sepolia",
            Network::Localnet => "localnet",
            Network::Sim => "sim",
        };
        f.write_str(name)
    }
}

/// Pool contract and the token pair it trades
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Contracts {
    pub pool: Address,
    pub token_a: Address,
    pub token_b: Address,
    /// LP token, approved before removals when set
    pub lp_token: Option<Address>,
}

impl Contracts {
    pub fn sepolia() -> Result<Self> {
        Ok(Self {
            pool: parse_address(SEPOLIA_POOL).context("Invalid pool address")?,
            token_a: parse_address(SEPOLIA_TOKEN_A).context("Invalid token A address")?,
            token_b: parse_address(SEPOLIA_TOKEN_B).context("Invalid token B address")?,
            lp_token: None,
        })
    }
}

// ============================================================================
// Config file
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub network: Option<String>,
    pub rpc_url: Option<String>,
    pub key_file: Option<String>,
    #[serde(default)]
    pub contracts: ContractsSection,
    #[serde(default)]
    pub trade: TradeSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContractsSection {
    pub pool: Option<String>,
    pub token_a: Option<String>,
    pub token_b: Option<String>,
    pub lp_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TradeSection {
    pub slippage: Option<u32>,
    pub receipt_poll_ms: Option<u64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&data)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }
}

// ============================================================================
// Resolved configuration
// ============================================================================

pub struct NetworkConfig {
    pub network: Network,
    pub chain_id: u64,
    pub rpc_url: String,
    pub contracts: Contracts,
    /// `None` means no wallet is available
    pub wallet: Option<LocalWallet>,
    pub key_path: Option<PathBuf>,
    pub slippage: SlippageTolerance,
    pub receipt_poll: Duration,
}

impl NetworkConfig {
    /// Resolve settings with precedence: command line, config file, network defaults
    pub fn new(
        network: Option<String>,
        rpc_url: Option<String>,
        key_path: Option<PathBuf>,
        config_path: Option<PathBuf>,
    ) -> Result<Self> {
        let file = match config_path {
            Some(path) => FileConfig::load(&expand_path(&path.to_string_lossy()))?,
            None => FileConfig::default(),
        };

        let network: Network = network
            .or(file.network.clone())
            .unwrap_or_else(|| "sepolia".to_string())
            .parse()?;
        let chain_id = network.chain_id();

        let rpc_url = rpc_url
            .or(file.rpc_url.clone())
            .unwrap_or_else(|| network.default_rpc_url().to_string());

        let contracts = resolve_contracts(network, &file.contracts)?;

        let slippage = match file.trade.slippage {
            Some(percent) => SlippageTolerance::new(percent).context("Invalid [trade] slippage")?,
            None => SlippageTolerance::default(),
        };
        let receipt_poll =
            Duration::from_millis(file.trade.receipt_poll_ms.unwrap_or(DEFAULT_RECEIPT_POLL_MS));

        // Resolve signing key: --key-file, then config file, then environment
        let key_path = key_path.or_else(|| file.key_file.as_deref().map(expand_path));
        let wallet = match (&key_path, network) {
            (_, Network::Sim) => None,
            (Some(path), _) => Some(load_signing_key(path)?),
            (None, _) => match std::env::var(PRIVATE_KEY_ENV) {
                Ok(hex) => Some(
                    parse_signing_key(&hex)
                        .with_context(|| format!("Invalid key in {}", PRIVATE_KEY_ENV))?,
                ),
                Err(_) => None,
            },
        };
        let wallet = wallet.map(|w| w.with_chain_id(chain_id));

        Ok(Self {
            network,
            chain_id,
            rpc_url,
            contracts,
            wallet,
            key_path,
            slippage,
            receipt_poll,
        })
    }

    pub fn address(&self) -> Option<Address> {
        self.wallet.as_ref().map(|w| w.address())
    }

    /// Block explorer link for a transaction, when the network has one
    pub fn explorer_tx_url(&self, tx_hash: &ethers::types::TxHash) -> Option<String> {
        self.network
            .explorer_tx_base()
            .map(|base| format!("{}{:?}", base, tx_hash))
    }
}

fn resolve_contracts(network: Network, section: &ContractsSection) -> Result<Contracts> {
    let defaults = match network {
        Network::Sepolia => Some(Contracts::sepolia()?),
        Network::Sim => Some(SimChain::default_contracts()),
        Network::Localnet => None,
    };

    let pick = |value: &Option<String>, fallback: Option<Address>, name: &str| -> Result<Address> {
        match value {
            Some(s) => {
                parse_address(s).with_context(|| format!("Invalid {} address in config", name))
            }
            None => fallback.with_context(|| {
                format!(
                    "No {} address for {}; set [contracts].{} in the config file",
                    name, network, name
                )
            }),
        }
    };

    let pool = pick(&section.pool, defaults.map(|c| c.pool), "pool")?;
    let token_a = pick(&section.token_a, defaults.map(|c| c.token_a), "token_a")?;
    let token_b = pick(&section.token_b, defaults.map(|c| c.token_b), "token_b")?;
    let lp_token = match &section.lp_token {
        Some(s) => Some(parse_address(s).context("Invalid lp_token address in config")?),
        None => defaults.and_then(|c| c.lp_token),
    };

    Ok(Contracts {
        pool,
        token_a,
        token_b,
        lp_token,
    })
}

pub fn parse_address(s: &str) -> Result<Address> {
    Address::from_str(s.trim()).with_context(|| format!("Not an address: {}", s))
}

fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).into_owned())
}

/// Load a hex private key from a file
fn load_signing_key(path: &Path) -> Result<LocalWallet> {
    if !path.exists() {
        anyhow::bail!(
            "Key file not found: {}\n\
             Write a hex private key to it, or set {} instead",
            path.display(),
            PRIVATE_KEY_ENV
        );
    }

    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read key file: {}", path.display()))?;

    parse_signing_key(&data).with_context(|| format!("Invalid key data in: {}", path.display()))
}

fn parse_signing_key(hex: &str) -> Result<LocalWallet> {
    let hex = hex.trim();
    let hex = hex.strip_prefix("0x").unwrap_or(hex);
    Ok(LocalWallet::from_str(hex)?)
}
