//! Supported chain registry.
//!
//! The registry is a static table consulted by id. An id that is not in the
//! table means "no current chain": the form refuses to submit until the
//! wallet is switched to one of these networks.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Sepolia testnet chain ID.
pub const SEPOLIA_CHAIN_ID: ChainId = ChainId(11_155_111);

/// Polygon PoS mainnet chain ID.
pub const POLYGON_CHAIN_ID: ChainId = ChainId(137);

/// BNB Smart Chain mainnet chain ID.
pub const BSC_CHAIN_ID: ChainId = ChainId(56);

/// EVM chain identifier, rendered as lowercase `0x` hex (`0xaa36a7`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChainId(pub u64);

impl ChainId {
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

impl FromStr for ChainId {
    type Err = String;

    /// Accepts `0x`-prefixed hex or a plain decimal number.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            Some(hex) => u64::from_str_radix(hex, 16),
            None => s.parse::<u64>(),
        };
        parsed
            .map(ChainId)
            .map_err(|e| format!("invalid chain id '{s}': {e}"))
    }
}

impl From<u64> for ChainId {
    fn from(id: u64) -> Self {
        ChainId(id)
    }
}

impl Serialize for ChainId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ChainId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A chain's base asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeCurrency {
    pub name: &'static str,
    pub symbol: &'static str,
    pub decimals: u8,
}

/// A supported network definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chain {
    pub id: ChainId,
    pub name: &'static str,
    pub native_currency: NativeCurrency,
    pub rpc_urls: &'static [&'static str],
    pub explorer_url: &'static str,
}

impl Chain {
    /// Block explorer link for a transaction hash.
    pub fn tx_url(&self, hash: impl fmt::Display) -> String {
        format!("{}/tx/{}", self.explorer_url.trim_end_matches('/'), hash)
    }

    /// Build the `wallet_addEthereumChain` (EIP-3085) parameters for this chain.
    pub fn add_chain_params(&self) -> AddChainParams {
        AddChainParams {
            chain_id: self.id,
            chain_name: self.name.to_string(),
            native_currency: CurrencyParams {
                name: self.native_currency.name.to_string(),
                symbol: self.native_currency.symbol.to_string(),
                decimals: self.native_currency.decimals,
            },
            rpc_urls: self.rpc_urls.iter().map(|u| u.to_string()).collect(),
            block_explorer_urls: vec![self.explorer_url.to_string()],
        }
    }
}

/// Chain definition handed to a wallet that does not know the chain yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddChainParams {
    pub chain_id: ChainId,
    pub chain_name: String,
    pub native_currency: CurrencyParams,
    pub rpc_urls: Vec<String>,
    pub block_explorer_urls: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyParams {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

pub static SUPPORTED_CHAINS: &[Chain] = &[
    Chain {
        id: SEPOLIA_CHAIN_ID,
        name: "Sepolia",
        native_currency: NativeCurrency {
            name: "Sepolia Ether",
            symbol: "ETH",
            decimals: 18,
        },
        rpc_urls: &["https://rpc.sepolia.org"],
        explorer_url: "https://sepolia.etherscan.io",
    },
    Chain {
        id: POLYGON_CHAIN_ID,
        name: "Polygon",
        native_currency: NativeCurrency {
            name: "MATIC",
            symbol: "MATIC",
            decimals: 18,
        },
        rpc_urls: &["https://polygon-rpc.com/"],
        explorer_url: "https://polygonscan.com/",
    },
    Chain {
        id: BSC_CHAIN_ID,
        name: "BNB Smart Chain",
        native_currency: NativeCurrency {
            name: "Binance Coin",
            symbol: "BNB",
            decimals: 18,
        },
        rpc_urls: &["https://bsc-dataseed.binance.org/"],
        explorer_url: "https://bscscan.com",
    },
];

/// Look up a supported chain by id.
pub fn find_chain(id: ChainId) -> Option<&'static Chain> {
    SUPPORTED_CHAINS.iter().find(|c| c.id == id)
}

/// Resolve a user-supplied chain reference: hex/decimal id or display name
/// (case-insensitive).
pub fn resolve_chain(reference: &str) -> Option<&'static Chain> {
    if let Ok(id) = reference.parse::<ChainId>() {
        return find_chain(id);
    }
    let wanted = reference.trim();
    SUPPORTED_CHAINS
        .iter()
        .find(|c| c.name.eq_ignore_ascii_case(wanted))
}
