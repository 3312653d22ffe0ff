//! Arrow schemas for EVM chains whose values overflow u64.
//!
//! Identical to the Ethereum-family schemas except that big values are
//! string-only: there is no decimal `value` column on transactions or
//! traces, so no value can fail decimal conversion.

use arrow::datatypes::{DataType, Field, Schema};
use blockchain_common::Chain;
use flight_common::SchemaFactory;

use super::super::ethereum::schema::{block_data_type, partition_fields, receipt_data_type};

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

pub fn streamed_transaction_schema(chain: Chain) -> Schema {
    let mut fields = streamed_metadata_fields();
    fields.extend(transaction_fields(chain));
    SchemaFactory::new().new_schema(fields)
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn big_values_are_string_only() {
        let schema = transaction_schema(Chain::BinanceSmartChain);
        assert!(schema.field_with_name("value_string").is_ok());
        assert!(schema.field_with_name("value").is_err());
    }

    #[test]
    fn streamed_variant_prepends_event_columns() {
        let schema = streamed_transaction_schema(Chain::Arbitrum);
        assert_eq!(schema.field(0).name(), "_sequence_number");
        assert_eq!(schema.field(1).name(), "_event_type");
        let n = schema.fields().len();
        assert_eq!(schema.field(n - 1).name(), "_repartition_by_range");
    }
}
