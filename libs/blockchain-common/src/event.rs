//! Chain events emitted by the block store's sequencing layer.

use serde::{Deserialize, Serialize};

/// What happened to the referenced block.
///
/// `BlockRemoved` marks a reorged-out block; the gateway passes it through
/// as data and leaves compaction to downstream consumers.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    #[default]
    Unknown,
    BlockAdded,
    BlockRemoved,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Unknown => "UNKNOWN",
            EventType::BlockAdded => "BLOCK_ADDED",
            EventType::BlockRemoved => "BLOCK_REMOVED",
        }
    }
}

/// Locates a block in the content-addressed store.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BlockIdentifier {
    pub tag: u32,
    pub height: u64,
    pub hash: String,
}

/// One entry of the store's monotonically sequenced event log.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BlockchainEvent {
    pub sequence_num: i64,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub block: BlockIdentifier,
}
