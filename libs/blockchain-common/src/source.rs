//! Contracts of the upstream block store and block parser.
//!
//! The gateway never talks to a chain node directly: raw blocks come from
//! a content-addressed block store and are decoded by an injected parser.
//! Both are provided by the embedding application; errors cross the
//! boundary as `anyhow::Error` and keep whatever status the upstream
//! client attached.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::bitcoin::BitcoinBlock;
use crate::ethereum::EthereumBlock;
use crate::event::BlockchainEvent;
use crate::rosetta::RosettaBlock;

/// An undecoded block as stored by the block store.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RawBlock {
    pub tag: u32,
    pub height: u64,
    pub hash: String,
    pub parent_hash: String,
    /// Opaque payload; only the parser looks inside.
    pub data: Vec<u8>,
}

/// Chain facts that do not change while a deployment is running.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ChainMetadata {
    /// First height the store carries for this chain.
    pub block_start_height: u64,
    /// Reorg buffer subtracted from the latest height to get the tip.
    pub irreversible_distance: u64,
}

/// Absolute positions in the event log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventPosition {
    Earliest,
    Latest,
}

impl EventPosition {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventPosition::Earliest => "EARLIEST",
            EventPosition::Latest => "LATEST",
        }
    }
}

/// Read access to the upstream block store.
#[async_trait]
pub trait BlockSource: Send + Sync {
    async fn get_static_chain_metadata(&self) -> Result<ChainMetadata>;

    /// Height of the most recent block the store has ingested.
    async fn get_latest_block(&self) -> Result<u64>;

    /// Raw blocks for heights `[start, end)`.
    async fn get_blocks_by_range(&self, start_height: u64, end_height: u64)
        -> Result<Vec<RawBlock>>;

    async fn get_block_with_tag(&self, tag: u32, height: u64, hash: &str) -> Result<RawBlock>;

    /// Up to `max_num_events` events following `sequence_num`.
    async fn get_chain_events(
        &self,
        sequence_num: i64,
        max_num_events: u64,
    ) -> Result<Vec<BlockchainEvent>>;

    /// The single event at an absolute position in the event log.
    async fn get_chain_events_at(&self, position: EventPosition) -> Result<Vec<BlockchainEvent>>;
}

/// A chain-specific parsed block.
#[derive(Debug, Clone, PartialEq)]
pub enum NativeBlock {
    Ethereum(EthereumBlock),
    Bitcoin(BitcoinBlock),
}

impl NativeBlock {
    pub fn ethereum(&self) -> Option<&EthereumBlock> {
        match self {
            NativeBlock::Ethereum(block) => Some(block),
            _ => None,
        }
    }

    pub fn bitcoin(&self) -> Option<&BitcoinBlock> {
        match self {
            NativeBlock::Bitcoin(block) => Some(block),
            _ => None,
        }
    }
}

/// Decodes raw block payloads into the parsed representations.
#[async_trait]
pub trait BlockParser: Send + Sync {
    async fn parse_native_block(&self, block: &RawBlock) -> Result<NativeBlock>;

    async fn parse_rosetta_block(&self, block: &RawBlock) -> Result<RosettaBlock>;
}
