//! Domain model shared across chainflight: the supported chains, the
//! per-family parsed block representations (Ethereum-family, Bitcoin and
//! Rosetta-normalized), chain events, and the contracts of the upstream
//! content-addressed block store.

pub mod bitcoin;
pub mod ethereum;
pub mod event;
pub mod rosetta;
pub mod source;

pub use event::{BlockIdentifier, BlockchainEvent, EventType};
pub use source::{
    BlockParser, BlockSource, ChainMetadata, EventPosition, NativeBlock, RawBlock,
};

use serde::{Deserialize, Serialize};

/// Supported blockchain networks
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Chain {
    Ethereum,
    BinanceSmartChain,
    Polygon,
    Avalanche,
    Arbitrum,
    Optimism,
    Bitcoin,
    Solana,
}

impl Chain {
    pub fn as_str(&self) -> &str {
        match self {
            Chain::Ethereum => "ethereum",
            Chain::BinanceSmartChain => "bsc",
            Chain::Polygon => "polygon",
            Chain::Avalanche => "avalanche",
            Chain::Arbitrum => "arbitrum",
            Chain::Optimism => "optimism",
            Chain::Bitcoin => "bitcoin",
            Chain::Solana => "solana",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "ethereum" | "eth" => Some(Chain::Ethereum),
            "bsc" | "binance" => Some(Chain::BinanceSmartChain),
            "polygon" | "matic" => Some(Chain::Polygon),
            "avalanche" | "avax" => Some(Chain::Avalanche),
            "arbitrum" | "arb" => Some(Chain::Arbitrum),
            "optimism" | "op" => Some(Chain::Optimism),
            "bitcoin" | "btc" => Some(Chain::Bitcoin),
            "solana" | "sol" => Some(Chain::Solana),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_round_trips_through_names() {
        for chain in [
            Chain::Ethereum,
            Chain::BinanceSmartChain,
            Chain::Polygon,
            Chain::Avalanche,
            Chain::Arbitrum,
            Chain::Optimism,
            Chain::Bitcoin,
            Chain::Solana,
        ] {
            assert_eq!(Chain::from_str(chain.as_str()), Some(chain));
        }
        assert_eq!(Chain::from_str("dogecoin"), None);
    }
}
