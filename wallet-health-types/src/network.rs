use serde::{Deserialize, Serialize};
use solana_sdk::native_token::LAMPORTS_PER_SOL;
use std::fmt;
use std::str::FromStr;

const SOLSCAN_BASE_URL: &str = "https://solscan.io";

/// Which cluster the hub is pointed at. Devnet is the test network and every
/// action against it is simulated; mainnet-beta hits real infrastructure.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum NetworkMode {
    #[default]
    #[serde(rename = "devnet")]
    Devnet,
    #[serde(rename = "mainnet-beta", alias = "mainnet")]
    MainnetBeta,
}

impl NetworkMode {
    pub fn is_mainnet(&self) -> bool {
        matches!(self, NetworkMode::MainnetBeta)
    }

    /// Devnet actions go to the simulation store instead of the network.
    pub fn is_simulated(&self) -> bool {
        !self.is_mainnet()
    }

    pub fn toggled(&self) -> Self {
        match self {
            NetworkMode::Devnet => NetworkMode::MainnetBeta,
            NetworkMode::MainnetBeta => NetworkMode::Devnet,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NetworkMode::Devnet => "devnet",
            NetworkMode::MainnetBeta => "mainnet-beta",
        }
    }

    /// Human label shown next to every action.
    pub fn label(&self) -> &'static str {
        match self {
            NetworkMode::Devnet => "Testnet Mode",
            NetworkMode::MainnetBeta => "Mainnet Mode",
        }
    }

    /// Devnet rarely needs a priority fee; mainnet lets the aggregator pick.
    pub fn priority_fee(&self) -> PriorityFee {
        match self {
            NetworkMode::Devnet => PriorityFee::Lamports(0),
            NetworkMode::MainnetBeta => PriorityFee::Auto,
        }
    }

    /// Solscan link for a transaction, address or token.
    pub fn explorer_url(&self, id: &str, kind: ExplorerKind) -> String {
        let cluster_param = match self {
            NetworkMode::Devnet => "?cluster=devnet",
            NetworkMode::MainnetBeta => "",
        };
        format!("{}/{}/{}{}", SOLSCAN_BASE_URL, kind.path(), id, cluster_param)
    }
}

impl fmt::Display for NetworkMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NetworkMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "devnet" | "test" | "testnet" => Ok(NetworkMode::Devnet),
            "mainnet-beta" | "mainnet" | "main" => Ok(NetworkMode::MainnetBeta),
            _ => Err(format!("Invalid network mode: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExplorerKind {
    Tx,
    Address,
    Token,
}

impl ExplorerKind {
    fn path(&self) -> &'static str {
        match self {
            ExplorerKind::Tx => "tx",
            ExplorerKind::Address => "address",
            ExplorerKind::Token => "token",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriorityFee {
    Auto,
    Lamports(u64),
}

impl fmt::Display for PriorityFee {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PriorityFee::Auto => f.write_str("auto"),
            PriorityFee::Lamports(lamports) => write!(f, "{}", lamports),
        }
    }
}

/// Chain whose wallet is being maintained. Only Solana has live support;
/// the EVM chains are served from mock data.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    #[default]
    Solana,
    Ethereum,
    Polygon,
}

impl Chain {
    pub fn native_symbol(&self) -> &'static str {
        match self {
            Chain::Solana => "SOL",
            Chain::Ethereum => "ETH",
            Chain::Polygon => "MATIC",
        }
    }

    pub fn native_name(&self) -> &'static str {
        match self {
            Chain::Solana => "Solana",
            Chain::Ethereum => "Ethereum",
            Chain::Polygon => "Polygon",
        }
    }

    pub fn is_evm(&self) -> bool {
        !matches!(self, Chain::Solana)
    }
}

impl FromStr for Chain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "solana" | "sol" => Ok(Chain::Solana),
            "ethereum" | "eth" => Ok(Chain::Ethereum),
            "polygon" | "matic" => Ok(Chain::Polygon),
            _ => Err(format!("Invalid chain: {}", s)),
        }
    }
}

pub fn lamports_to_sol(lamports: u64) -> f64 {
    lamports as f64 / LAMPORTS_PER_SOL as f64
}

pub fn sol_to_lamports(sol: f64) -> u64 {
    (sol * LAMPORTS_PER_SOL as f64).round() as u64
}
