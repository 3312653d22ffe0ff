//! Shared test doubles: an in-memory block source whose heights and event
//! log are synthesized on demand, and a parser that decodes the synthetic
//! payloads deterministically.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use blockchain_common::ethereum::{
    EthereumBlock, EthereumHeader, EthereumLog, EthereumReceipt, EthereumTrace,
    EthereumTransaction, EthereumWithdrawal,
};
use blockchain_common::rosetta::{
    RosettaBlock, RosettaBlockIdentifier, RosettaTransaction, RosettaTransactionIdentifier,
};
use blockchain_common::{
    BlockIdentifier, BlockParser, BlockSource, BlockchainEvent, ChainMetadata, EventPosition,
    EventType, NativeBlock, RawBlock,
};

use crate::session::Session;

pub(crate) struct MockBlockSource {
    pub metadata: ChainMetadata,
    pub latest_block: u64,
    pub earliest_sequence: i64,
    pub latest_sequence: i64,
    /// Per-height artificial latency for `get_block_with_tag`.
    pub fetch_delays: HashMap<u64, Duration>,
    /// Heights whose block fetch fails.
    pub fail_heights: HashSet<u64>,
}

impl Default for MockBlockSource {
    fn default() -> Self {
        Self {
            metadata: ChainMetadata::default(),
            latest_block: 1_000,
            earliest_sequence: 0,
            latest_sequence: 100,
            fetch_delays: HashMap::new(),
            fail_heights: HashSet::new(),
        }
    }
}

pub(crate) fn raw_block(height: u64) -> RawBlock {
    RawBlock {
        tag: 1,
        height,
        hash: format!("0xblock-{height}"),
        parent_hash: format!("0xblock-{}", height.saturating_sub(1)),
        data: height.to_be_bytes().to_vec(),
    }
}

/// Events map one-to-one onto heights in the mock log.
pub(crate) fn event_at(sequence: i64, height: u64) -> BlockchainEvent {
    BlockchainEvent {
        sequence_num: sequence,
        event_type: EventType::BlockAdded,
        block: BlockIdentifier {
            tag: 1,
            height,
            hash: format!("0xblock-{height}"),
        },
    }
}

#[async_trait]
impl BlockSource for MockBlockSource {
    async fn get_static_chain_metadata(&self) -> Result<ChainMetadata> {
        Ok(self.metadata)
    }

    async fn get_latest_block(&self) -> Result<u64> {
        Ok(self.latest_block)
    }

    async fn get_blocks_by_range(
        &self,
        start_height: u64,
        end_height: u64,
    ) -> Result<Vec<RawBlock>> {
        Ok((start_height..end_height).map(raw_block).collect())
    }

    async fn get_block_with_tag(&self, _tag: u32, height: u64, _hash: &str) -> Result<RawBlock> {
        if let Some(delay) = self.fetch_delays.get(&height) {
            tokio::time::sleep(*delay).await;
        }
        if self.fail_heights.contains(&height) {
            return Err(anyhow!("block {height} is gone"));
        }
        Ok(raw_block(height))
    }

    async fn get_chain_events(
        &self,
        sequence_num: i64,
        max_num_events: u64,
    ) -> Result<Vec<BlockchainEvent>> {
        let first = sequence_num + 1;
        let last = (sequence_num + max_num_events as i64).min(self.latest_sequence);
        Ok((first..=last).map(|seq| event_at(seq, seq as u64)).collect())
    }

    async fn get_chain_events_at(&self, position: EventPosition) -> Result<Vec<BlockchainEvent>> {
        let seq = match position {
            EventPosition::Earliest => self.earliest_sequence,
            EventPosition::Latest => self.latest_sequence,
        };
        Ok(vec![event_at(seq, seq as u64)])
    }
}

pub(crate) struct MockParser;

#[async_trait]
impl BlockParser for MockParser {
    async fn parse_native_block(&self, block: &RawBlock) -> Result<NativeBlock> {
        Ok(NativeBlock::Ethereum(ethereum_block(block.height, 1)))
    }

    async fn parse_rosetta_block(&self, block: &RawBlock) -> Result<RosettaBlock> {
        Ok(rosetta_block(block.height, 1))
    }
}

pub(crate) fn mock_session() -> Session {
    session_with(MockBlockSource::default())
}

pub(crate) fn session_with(source: MockBlockSource) -> Session {
    Session::new(Arc::new(source), Arc::new(MockParser))
}

pub(crate) fn ethereum_block(number: u64, transaction_count: usize) -> EthereumBlock {
    let transactions: Vec<EthereumTransaction> = (0..transaction_count)
        .map(|i| ethereum_transaction(number, i as u64))
        .collect();

    EthereumBlock {
        header: Some(EthereumHeader {
            hash: format!("0xblock-{number}"),
            parent_hash: format!("0xblock-{}", number.saturating_sub(1)),
            number,
            nonce: "0x0000000000000042".to_string(),
            sha3_uncles: "0xsha3-uncles".to_string(),
            logs_bloom: "0x0".to_string(),
            transactions_root: "0xtx-root".to_string(),
            state_root: "0xstate-root".to_string(),
            receipts_root: "0xreceipts-root".to_string(),
            miner: "0xminer".to_string(),
            difficulty: 2,
            total_difficulty: "58750003716598352816469".to_string(),
            size: 1_078,
            extra_data: "0x".to_string(),
            gas_limit: 30_000_000,
            gas_used: 21_000 * transaction_count as u64,
            timestamp: 1_600_000_000 + number,
            transactions: transactions.iter().map(|t| t.hash.clone()).collect(),
            uncles: vec![],
            base_fee_per_gas: Some(7),
            withdrawals: vec![EthereumWithdrawal {
                index: 1,
                validator_index: 9,
                address: "0xwithdrawal".to_string(),
                amount: 32_000_000,
            }],
            withdrawals_root: "0xwithdrawals-root".to_string(),
        }),
        transactions,
        uncles: vec![],
    }
}

fn ethereum_transaction(number: u64, index: u64) -> EthereumTransaction {
    let hash = format!("0xtx-{number}-{index}");
    EthereumTransaction {
        hash: hash.clone(),
        index,
        block_hash: format!("0xblock-{number}"),
        block_number: number,
        block_timestamp: 1_600_000_000 + number,
        from: "0xsender".to_string(),
        to: "0xreceiver".to_string(),
        nonce: index,
        value: "1000000000000000000".to_string(),
        gas: 21_000,
        gas_price: 5,
        input: "0x".to_string(),
        transaction_type: 2,
        max_fee_per_gas: Some(12),
        max_priority_fee_per_gas: Some(2),
        priority_fee_per_gas: Some(2),
        receipt: EthereumReceipt {
            transaction_hash: hash.clone(),
            transaction_index: index,
            block_hash: format!("0xblock-{number}"),
            block_number: number,
            from: "0xsender".to_string(),
            to: "0xreceiver".to_string(),
            cumulative_gas_used: 21_000 * (index + 1),
            gas_used: 21_000,
            contract_address: String::new(),
            logs: vec![EthereumLog {
                log_index: 0,
                transaction_hash: hash.clone(),
                transaction_index: index,
                block_hash: format!("0xblock-{number}"),
                block_number: number,
                address: "0xtoken".to_string(),
                data: "0xdeadbeef".to_string(),
                topics: vec!["0xtopic0".to_string(), "0xtopic1".to_string()],
                removed: false,
            }],
            logs_bloom: "0x0".to_string(),
            root: String::new(),
            receipt_type: 2,
            status: Some(1),
            effective_gas_price: Some(9),
            l1_fee_info: None,
        },
        flattened_traces: vec![EthereumTrace {
            transaction_hash: hash,
            transaction_index: index,
            block_hash: format!("0xblock-{number}"),
            block_number: number,
            from: "0xsender".to_string(),
            to: "0xreceiver".to_string(),
            value: "1000000000000000000".to_string(),
            input: "0x".to_string(),
            output: "0x".to_string(),
            trace_kind: "call".to_string(),
            trace_type: "call".to_string(),
            call_type: "call".to_string(),
            gas: 21_000,
            gas_used: 21_000,
            subtraces: 0,
            trace_address: vec![0],
            error: String::new(),
            status: 1,
            trace_id: "call_0".to_string(),
        }],
    }
}

pub(crate) fn rosetta_block(number: u64, transaction_count: usize) -> RosettaBlock {
    RosettaBlock {
        block_identifier: RosettaBlockIdentifier {
            index: number,
            hash: format!("0xblock-{number}"),
        },
        parent_block_identifier: RosettaBlockIdentifier {
            index: number.saturating_sub(1),
            hash: format!("0xblock-{}", number.saturating_sub(1)),
        },
        timestamp: 1_600_000_000 + number,
        transactions: (0..transaction_count)
            .map(|i| RosettaTransaction {
                transaction_identifier: RosettaTransactionIdentifier {
                    hash: format!("0xtx-{number}-{i}"),
                },
                ..Default::default()
            })
            .collect(),
        metadata: Default::default(),
    }
}
