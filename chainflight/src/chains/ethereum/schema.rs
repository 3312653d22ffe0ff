//! Arrow schemas for the Ethereum-family tables.

use arrow::datatypes::{DataType, Field, Schema};
use blockchain_common::Chain;
use flight_common::{decimal128_type, SchemaFactory};

fn streamed_metadata_fields() -> Vec<Field> {
    let f = SchemaFactory::new();
    vec![
        f.new_field(
            "_sequence_number",
            DataType::Int64,
            "Monotonically increasing event sequence number",
        ),
        f.new_field(
            "_event_type",
            DataType::Utf8,
            "Event type UNKNOWN, BLOCK_ADDED, BLOCK_REMOVED",
        ),
    ]
}

pub(crate) fn partition_fields() -> Vec<Field> {
    let f = SchemaFactory::new();
    vec![
        f.new_field(
            "_partition_by",
            DataType::UInt64,
            "Records with the same _partition_by value will be stored in the same s3 directory",
        ),
        f.new_field(
            "_repartition_by_range",
            DataType::UInt64,
            "Records will be range partitioned base on the _repartition_by_range column",
        ),
    ]
}

fn transaction_fields(chain: Chain) -> Vec<Field> {
    let f = SchemaFactory::new();
    let mut fields = vec![
        f.new_field("transaction_hash", DataType::Utf8, "Hash of the transaction"),
        f.new_field(
            "transaction_index",
            DataType::UInt64,
            "Zero-based index of the transaction",
        ),
        f.new_field(
            "block_hash",
            DataType::Utf8,
            "Hash of the block where this transaction was in",
        ),
        f.new_field(
            "block_number",
            DataType::UInt64,
            "Block number where this transaction was in",
        ),
        f.new_field(
            "block_timestamp",
            DataType::UInt64,
            "The unix timestamp for when the block was collated",
        ),
        f.new_field("from_address", DataType::Utf8, "Address of the sender"),
        f.new_field(
            "to_address",
            DataType::Utf8,
            "Address of the receiver. Empty when its a contract creation transaction",
        ),
        f.new_field(
            "nonce",
            DataType::UInt64,
            "The number of transactions made by the sender prior to this one",
        ),
        f.new_field(
            "value",
            decimal128_type(),
            "Value transferred in Wei as decimal",
        ),
        f.new_field(
            "value_string",
            DataType::Utf8,
            "Value transferred in Wei as string",
        ),
        f.new_field("gas", DataType::UInt64, "Gas provided by the sender"),
        f.new_field(
            "gas_price",
            DataType::UInt64,
            "Gas price provided by the sender in Wei",
        ),
        f.new_field(
            "input",
            DataType::Utf8,
            "The data sent along with the transaction",
        ),
        f.new_field(
            "transaction_type",
            DataType::UInt64,
            "Transaction type. One of 0 (Legacy), 1 (Legacy), 2 (EIP-1559)",
        ),
        f.new_field(
            "max_fee_per_gas",
            DataType::UInt64,
            "Total fee that covers both base and priority fees",
        ),
        f.new_field(
            "max_priority_fee_per_gas",
            DataType::UInt64,
            "Fee given to miners to incentivize them to include the transaction",
        ),
        f.new_field(
            "priority_fee_per_gas",
            DataType::UInt64,
            "Fee given to miners to incentivize them to include the transaction",
        ),
        f.new_field(
            "block",
            block_data_type(),
            "The block containing this transaction",
        ),
        f.new_field("receipt", receipt_data_type(chain), "The transaction receipt"),
        f.new_field(
            "traces",
            f.new_list(trace_data_type()),
            "The list of transaction traces",
        ),
    ];
    fields.extend(partition_fields());
    fields
}

pub fn transaction_schema(chain: Chain) -> Schema {
    SchemaFactory::new().new_schema(transaction_fields(chain))
}

fn raw_transaction_fields() -> Vec<Field> {
    let f = SchemaFactory::new();
    let mut fields = vec![
        f.new_field("transaction_hash", DataType::Utf8, "Hash of the transaction"),
        f.new_field(
            "transaction_index",
            DataType::UInt64,
            "Zero-based index of the transaction",
        ),
        f.new_field(
            "block_hash",
            DataType::Utf8,
            "Hash of the block where this transaction was in",
        ),
        f.new_field(
            "block_number",
            DataType::UInt64,
            "Block number where this transaction was in",
        ),
        f.new_field(
            "block_timestamp",
            DataType::UInt64,
            "The unix timestamp for when the block was collated",
        ),
        f.new_field(
            "transaction_data",
            DataType::Binary,
            "The serialized native transaction data",
        ),
    ];
    fields.extend(partition_fields());
    fields
}

fn block_fields(chain: Chain) -> Vec<Field> {
    let f = SchemaFactory::new();
    let mut fields = vec![
        f.new_field("hash", DataType::Utf8, "Hash of the block"),
        f.new_field("parent_hash", DataType::Utf8, "Hash of the parent block"),
        f.new_field("number", DataType::UInt64, "The block number"),
        f.new_field("nonce", DataType::Utf8, "Hash of the generated proof-of-work"),
        f.new_field(
            "sha3_uncles",
            DataType::Utf8,
            "SHA3 of the uncles data in the block",
        ),
        f.new_field(
            "logs_bloom",
            DataType::Utf8,
            "The bloom filter for the logs of the block",
        ),
        f.new_field(
            "transactions_root",
            DataType::Utf8,
            "The root of the transaction trie of the block",
        ),
        f.new_field(
            "state_root",
            DataType::Utf8,
            "The root of the final state trie of the block",
        ),
        f.new_field(
            "receipts_root",
            DataType::Utf8,
            "The root of the receipts trie of the block",
        ),
        f.new_field(
            "miner",
            DataType::Utf8,
            "The address of the beneficiary to whom the mining rewards were given",
        ),
        f.new_field(
            "difficulty",
            DataType::UInt64,
            "Integer of the difficulty for this block",
        ),
        f.new_field(
            "total_difficulty",
            decimal128_type(),
            "Integer of the total difficulty of the chain until this block",
        ),
        f.new_field("size", DataType::UInt64, "The size of this block in bytes"),
        f.new_field(
            "extra_data",
            DataType::Utf8,
            "The extra data field of this block",
        ),
        f.new_field(
            "gas_limit",
            DataType::UInt64,
            "The maximum gas allowed in this block",
        ),
        f.new_field(
            "gas_used",
            DataType::UInt64,
            "The total used gas by all transactions in this block",
        ),
        f.new_field(
            "timestamp",
            DataType::UInt64,
            "The unix timestamp for when the block was collated",
        ),
        f.new_field(
            "transaction_count",
            DataType::UInt64,
            "The number of transactions in the block",
        ),
        f.new_field(
            "base_fee_per_gas",
            DataType::UInt64,
            "Protocol base fee per gas, which can move up or down",
        ),
        f.new_field(
            "transactions",
            f.new_list(DataType::Utf8),
            "The list of transaction hashes",
        ),
        f.new_field("uncles", f.new_list(DataType::Utf8), "The list of uncle hashes"),
        f.new_field(
            "uncle_blocks",
            f.new_list(block_data_type()),
            "The list of uncle blocks",
        ),
    ];

    if chain == Chain::Ethereum {
        fields.push(f.new_field(
            "withdrawals",
            f.new_list(withdrawal_data_type()),
            "The list of withdrawals",
        ));
        fields.push(f.new_field(
            "withdrawals_root",
            DataType::Utf8,
            "The root of the withdrawals trie of the block",
        ));
    }

    fields.extend(partition_fields());
    fields
}

pub fn block_schema(chain: Chain) -> Schema {
    SchemaFactory::new().new_schema(block_fields(chain))
}

pub fn streamed_transaction_schema(chain: Chain) -> Schema {
    let mut fields = streamed_metadata_fields();
    fields.extend(transaction_fields(chain));
    SchemaFactory::new().new_schema(fields)
}

pub fn raw_streamed_transaction_schema() -> Schema {
    let mut fields = streamed_metadata_fields();
    fields.extend(raw_transaction_fields());
    SchemaFactory::new().new_schema(fields)
}

pub fn streamed_blocks_schema(chain: Chain) -> Schema {
    let mut fields = streamed_metadata_fields();
    fields.extend(block_fields(chain));
    SchemaFactory::new().new_schema(fields)
}

pub(crate) fn block_data_type() -> DataType {
    let f = SchemaFactory::new();
    f.new_struct(vec![
        f.new_field("hash", DataType::Utf8, "Hash of the block"),
        f.new_field("parent_hash", DataType::Utf8, "Hash of the parent block"),
        f.new_field("number", DataType::UInt64, "The block number"),
        f.new_field(
            "timestamp",
            DataType::UInt64,
            "The unix timestamp for when the block was collated",
        ),
        f.new_field(
            "miner",
            DataType::Utf8,
            "The address of the beneficiary to whom the mining rewards were given",
        ),
        f.new_field(
            "difficulty",
            DataType::UInt64,
            "Integer of the difficulty for this block",
        ),
        f.new_field(
            "gas_limit",
            DataType::UInt64,
            "The maximum gas allowed in this block",
        ),
        f.new_field(
            "gas_used",
            DataType::UInt64,
            "The total used gas by all transactions in this block",
        ),
        f.new_field(
            "base_fee_per_gas",
            DataType::UInt64,
            "Protocol base fee per gas, which can move up or down",
        ),
    ])
}

pub(crate) fn receipt_data_type(chain: Chain) -> DataType {
    let f = SchemaFactory::new();
    let mut fields = vec![
        f.new_field("transaction_hash", DataType::Utf8, "Hash of the transaction"),
        f.new_field(
            "transaction_index",
            DataType::UInt64,
            "Zero-based index of the transaction",
        ),
        f.new_field(
            "block_hash",
            DataType::Utf8,
            "Hash of the block where this transaction was in",
        ),
        f.new_field(
            "block_number",
            DataType::UInt64,
            "Block number where this transaction was in",
        ),
        f.new_field("from_address", DataType::Utf8, "Address of the sender"),
        f.new_field(
            "to_address",
            DataType::Utf8,
            "Address of the receiver. Empty when its a contract creation transaction",
        ),
        f.new_field(
            "cumulative_gas_used",
            DataType::UInt64,
            "The total amount of gas used when this transaction was executed in the block",
        ),
        f.new_field(
            "gas_used",
            DataType::UInt64,
            "The amount of gas used by this specific transaction alone",
        ),
        f.new_field(
            "contract_address",
            DataType::Utf8,
            "The contract address created, if the transaction was a contract creation, otherwise empty",
        ),
        f.new_field(
            "logs",
            f.new_list(log_data_type()),
            "Array of log objects, which this transaction generated",
        ),
        f.new_field(
            "logs_bloom",
            DataType::Utf8,
            "Bloom filter for light clients to quickly retrieve related logs",
        ),
        f.new_field(
            "root",
            DataType::Utf8,
            "32 bytes of post-transaction stateroot (pre Byzantium)",
        ),
        f.new_field(
            "type",
            DataType::UInt64,
            "Transaction type. One of 0 (Legacy), 1 (Legacy), 2 (EIP-1559)",
        ),
        f.new_field(
            "status",
            DataType::UInt64,
            "Either 1 (success) or 0 (failure) (post Byzantium)",
        ),
        f.new_field(
            "effective_gas_price",
            DataType::UInt64,
            "The actual value per gas deducted from the senders account. Replacement of gas_price after EIP-1559",
        ),
    ];

    match chain {
        Chain::Arbitrum => {
            fields.push(f.new_field(
                "l1_gas_used",
                DataType::UInt64,
                "The costs to send the input call data to L1",
            ));
        }
        Chain::Optimism => {
            fields.push(f.new_field(
                "l1_gas_used",
                DataType::UInt64,
                "The costs to send the input call data to L1",
            ));
            fields.push(f.new_field("l1_gas_price", DataType::UInt64, "The gas price on L1"));
            fields.push(f.new_field("l1_fee", DataType::UInt64, "The amount in wei paid on L1"));
            fields.push(f.new_field(
                "l1_fee_scalar",
                DataType::Utf8,
                "Variable parameter that makes sure that gas costs on L1 get covered + profits",
            ));
        }
        _ => {}
    }

    f.new_struct(fields)
}

fn log_data_type() -> DataType {
    let f = SchemaFactory::new();
    f.new_struct(vec![
        f.new_field(
            "log_index",
            DataType::UInt64,
            "Integer of the log index position in the block",
        ),
        f.new_field(
            "transaction_hash",
            DataType::Utf8,
            "Hash of the transaction this log was created from",
        ),
        f.new_field(
            "transaction_index",
            DataType::UInt64,
            "Integer of the transactions index position log was created from",
        ),
        f.new_field(
            "block_hash",
            DataType::Utf8,
            "Hash of the block where this log was in",
        ),
        f.new_field(
            "block_number",
            DataType::UInt64,
            "The block number where this log was in",
        ),
        f.new_field(
            "address",
            DataType::Utf8,
            "Address from which this log originated",
        ),
        f.new_field(
            "data",
            DataType::Utf8,
            "Contains one or more 32 Bytes non-indexed arguments of the log",
        ),
        f.new_field(
            "topics",
            f.new_list(DataType::Utf8),
            "Indexed log arguments (0 to 4 32-byte hex strings)",
        ),
        f.new_field(
            "removed",
            DataType::Boolean,
            "True when the log was removed, due to a chain reorganization. false if its a valid log.",
        ),
    ])
}

fn trace_data_type() -> DataType {
    let f = SchemaFactory::new();
    f.new_struct(vec![
        f.new_field(
            "transaction_hash",
            DataType::Utf8,
            "Transaction hash where this trace was in",
        ),
        f.new_field(
            "transaction_index",
            DataType::UInt64,
            "Transaction index where this trace was in",
        ),
        f.new_field(
            "block_hash",
            DataType::Utf8,
            "Hash of the block where this trace was in",
        ),
        f.new_field(
            "block_number",
            DataType::UInt64,
            "Block number where this trace was in",
        ),
        f.new_field(
            "from_address",
            DataType::Utf8,
            "Address of the sender, empty when trace_type is genesis or reward",
        ),
        f.new_field(
            "to_address",
            DataType::Utf8,
            "Address of the receiver if trace_type is call, address of new contract or null if trace_type is create, beneficiary address if trace_type is suicide, miner address if trace_type is reward, shareholder address if trace_type is genesis, WithdrawDAO address if trace_type is daofork",
        ),
        f.new_field(
            "value",
            decimal128_type(),
            "Value transferred in Wei as decimal",
        ),
        f.new_field(
            "value_string",
            DataType::Utf8,
            "Value transferred in Wei as string",
        ),
        f.new_field(
            "input",
            DataType::Utf8,
            "The data sent along with the message call",
        ),
        f.new_field(
            "output",
            DataType::Utf8,
            "The output of the message call, bytecode of contract when trace_type is create",
        ),
        f.new_field("type", DataType::Utf8, "Trace type"),
        f.new_field(
            "trace_type",
            DataType::Utf8,
            "One of call, create, suicide, reward, genesis, daofork",
        ),
        f.new_field(
            "call_type",
            DataType::Utf8,
            "One of call, callcode, delegatecall, staticcall",
        ),
        f.new_field("gas", DataType::UInt64, "Gas provided with the message call"),
        f.new_field("gas_used", DataType::UInt64, "Gas used by the message call"),
        f.new_field("subtraces", DataType::UInt64, "Number of subtraces"),
        f.new_field(
            "trace_address",
            f.new_list(DataType::UInt64),
            "The list of trace address in call tree",
        ),
        f.new_field("error", DataType::Utf8, "Error if message call failed"),
        f.new_field(
            "status",
            DataType::UInt64,
            "Either 1 (success) or 0 (failure, due to any operation that can cause the call itself or any top-level call to revert)",
        ),
        f.new_field(
            "trace_id",
            DataType::Utf8,
            "Unique string that identifies the trace. For transaction-scoped traces it is {trace_type}_{transaction_hash}_{trace_address}. For block-scoped traces it is {trace_type}_{block_number}_{index_within_block}",
        ),
    ])
}

fn withdrawal_data_type() -> DataType {
    let f = SchemaFactory::new();
    f.new_struct(vec![
        f.new_field(
            "index",
            DataType::UInt64,
            "Value that increments by 1 per withdrawal to uniquely identify each withdrawal",
        ),
        f.new_field(
            "validator_index",
            DataType::UInt64,
            "The validator index of the validator on the consensus layer",
        ),
        f.new_field(
            "address",
            DataType::Utf8,
            "The recipient address for the withdrawn ether",
        ),
        f.new_field(
            "amount",
            DataType::UInt64,
            "A non zero amount of ether given in Gwei",
        ),
    ])
}
