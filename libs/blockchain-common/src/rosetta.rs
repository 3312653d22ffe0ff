//! Rosetta-normalized blocks.
//!
//! The Rosetta form is chain-agnostic: every balance change is an
//! operation on an account, and free-form protocol details live in
//! `metadata` maps.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub type Metadata = Map<String, Value>;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RosettaBlock {
    pub block_identifier: RosettaBlockIdentifier,
    pub parent_block_identifier: RosettaBlockIdentifier,
    pub timestamp: u64,
    pub transactions: Vec<RosettaTransaction>,
    pub metadata: Metadata,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RosettaBlockIdentifier {
    pub index: u64,
    pub hash: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RosettaTransaction {
    pub transaction_identifier: RosettaTransactionIdentifier,
    pub operations: Vec<RosettaOperation>,
    pub related_transactions: Vec<RosettaRelatedTransaction>,
    pub metadata: Metadata,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RosettaTransactionIdentifier {
    pub hash: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RosettaOperation {
    pub operation_identifier: RosettaOperationIdentifier,
    pub related_operations: Vec<RosettaOperationIdentifier>,
    #[serde(rename = "type")]
    pub operation_type: String,
    pub status: String,
    pub account: Option<RosettaAccount>,
    pub amount: Option<RosettaAmount>,
    pub coin_change: Option<RosettaCoinChange>,
    pub metadata: Metadata,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RosettaOperationIdentifier {
    pub index: u64,
    pub network_index: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RosettaAccount {
    pub address: String,
    pub sub_account: Option<RosettaSubAccount>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RosettaSubAccount {
    pub address: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RosettaAmount {
    /// Arbitrary-precision signed integer as a decimal string.
    pub value: String,
    pub currency: RosettaCurrency,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RosettaCurrency {
    pub symbol: String,
    pub decimals: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RosettaCoinChange {
    pub coin_identifier: RosettaCoinIdentifier,
    /// One of COIN_ACTION_UNSPECIFIED, COIN_CREATED, COIN_SPENT.
    pub coin_action: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RosettaCoinIdentifier {
    pub identifier: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RosettaRelatedTransaction {
    pub transaction_identifier: RosettaTransactionIdentifier,
    /// One of DIRECTION_UNSPECIFIED, FORWARD, BACKWARD.
    pub direction: String,
}
