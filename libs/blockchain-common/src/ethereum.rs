//! Parsed Ethereum-family blocks.
//!
//! Covers Ethereum mainnet and the EVM chains the gateway serves (Polygon,
//! Optimism, Arbitrum, BSC). Values that can exceed `u64` (transaction
//! value, trace value, total difficulty) are kept as decimal strings;
//! the table transformers decide how to project them.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EthereumBlock {
    pub header: Option<EthereumHeader>,
    pub transactions: Vec<EthereumTransaction>,
    /// Full headers of the block's uncles.
    pub uncles: Vec<EthereumHeader>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EthereumHeader {
    pub hash: String,
    pub parent_hash: String,
    pub number: u64,
    pub nonce: String,
    pub sha3_uncles: String,
    pub logs_bloom: String,
    pub transactions_root: String,
    pub state_root: String,
    pub receipts_root: String,
    pub miner: String,
    pub difficulty: u64,
    /// Cumulative chain difficulty as a decimal string; exceeds u64 on mainnet.
    pub total_difficulty: String,
    pub size: u64,
    pub extra_data: String,
    pub gas_limit: u64,
    pub gas_used: u64,
    pub timestamp: u64,
    /// Hashes of the block's transactions.
    pub transactions: Vec<String>,
    /// Hashes of the block's uncles.
    pub uncles: Vec<String>,
    pub base_fee_per_gas: Option<u64>,
    pub withdrawals: Vec<EthereumWithdrawal>,
    pub withdrawals_root: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EthereumWithdrawal {
    pub index: u64,
    pub validator_index: u64,
    pub address: String,
    pub amount: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EthereumTransaction {
    pub hash: String,
    pub index: u64,
    pub block_hash: String,
    pub block_number: u64,
    pub block_timestamp: u64,
    pub from: String,
    /// Empty for contract creation transactions.
    pub to: String,
    pub nonce: u64,
    /// Value transferred in Wei as a decimal string.
    pub value: String,
    pub gas: u64,
    pub gas_price: u64,
    pub input: String,
    pub transaction_type: u64,
    pub max_fee_per_gas: Option<u64>,
    pub max_priority_fee_per_gas: Option<u64>,
    pub priority_fee_per_gas: Option<u64>,
    pub receipt: EthereumReceipt,
    pub flattened_traces: Vec<EthereumTrace>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EthereumReceipt {
    pub transaction_hash: String,
    pub transaction_index: u64,
    pub block_hash: String,
    pub block_number: u64,
    pub from: String,
    pub to: String,
    pub cumulative_gas_used: u64,
    pub gas_used: u64,
    pub contract_address: String,
    pub logs: Vec<EthereumLog>,
    pub logs_bloom: String,
    /// Pre-Byzantium post-transaction state root.
    pub root: String,
    pub receipt_type: u64,
    pub status: Option<u64>,
    pub effective_gas_price: Option<u64>,
    /// L1 data fee details, present on rollup chains only.
    pub l1_fee_info: Option<L1FeeInfo>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct L1FeeInfo {
    pub l1_gas_used: u64,
    pub l1_gas_price: u64,
    pub l1_fee: u64,
    pub l1_fee_scalar: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EthereumLog {
    pub log_index: u64,
    pub transaction_hash: String,
    pub transaction_index: u64,
    pub block_hash: String,
    pub block_number: u64,
    pub address: String,
    pub data: String,
    pub topics: Vec<String>,
    pub removed: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EthereumTrace {
    pub transaction_hash: String,
    pub transaction_index: u64,
    pub block_hash: String,
    pub block_number: u64,
    pub from: String,
    pub to: String,
    /// Value transferred in Wei as a decimal string.
    pub value: String,
    pub input: String,
    pub output: String,
    #[serde(rename = "type")]
    pub trace_kind: String,
    pub trace_type: String,
    pub call_type: String,
    pub gas: u64,
    pub gas_used: u64,
    pub subtraces: u64,
    pub trace_address: Vec<u64>,
    pub error: String,
    pub status: u64,
    pub trace_id: String,
}
