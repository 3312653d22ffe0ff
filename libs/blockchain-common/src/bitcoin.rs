//! Parsed Bitcoin blocks.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BitcoinBlock {
    pub header: Option<BitcoinHeader>,
    pub transactions: Vec<BitcoinTransaction>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BitcoinHeader {
    pub hash: String,
    pub size: u64,
    pub stripped_size: u64,
    pub weight: u64,
    pub height: u64,
    pub version: u64,
    pub merkle_root: String,
    pub time: u64,
    pub nonce: u64,
    pub bits: String,
    pub difficulty: String,
    pub chain_work: String,
    pub number_of_transactions: u64,
    pub previous_block_hash: String,
    pub next_block_hash: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BitcoinTransaction {
    /// The canonical transaction id. Differs from `hash` for witness
    /// transactions; tables key on the id, never the hash.
    pub transaction_id: String,
    pub hash: String,
    pub size: u64,
    pub virtual_size: u64,
    pub weight: u64,
    pub version: u64,
    pub lock_time: u64,
    pub is_coinbase: bool,
    pub index: u64,
    pub inputs: Vec<BitcoinTransactionInput>,
    pub outputs: Vec<BitcoinTransactionOutput>,
    pub input_count: u64,
    pub output_count: u64,
    pub input_value: u64,
    pub output_value: u64,
    pub fee: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BitcoinTransactionInput {
    /// Content of the input of a generation transaction.
    pub coinbase: String,
    /// Hash of the spent transaction.
    pub transaction_id: String,
    pub from_output_index: u64,
    pub script_signature: Option<BitcoinScriptSignature>,
    pub sequence: u64,
    pub transaction_input_witnesses: Vec<String>,
    /// The output this input spends.
    pub from_output: Option<BitcoinTransactionOutput>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BitcoinScriptSignature {
    pub assembly: String,
    pub hex: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BitcoinTransactionOutput {
    pub index: u64,
    pub script_public_key: Option<BitcoinScriptPublicKey>,
    pub value: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BitcoinScriptPublicKey {
    pub assembly: String,
    pub hex: String,
    #[serde(rename = "type")]
    pub script_type: String,
    pub address: String,
}
