//! Arrow schemas for the Rosetta-normalized tables.

use arrow::datatypes::{DataType, Field, Schema};
use flight_common::{decimal128_type, SchemaFactory};

use super::super::ethereum::schema::partition_fields;

pub fn transaction_schema() -> Schema {
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
            "operations",
            f.new_list(operation_data_type()),
            "List of operations in this transaction",
        ),
        f.new_field(
            "operation_count",
            DataType::UInt64,
            "The number of operations in the transaction",
        ),
        f.new_field(
            "related_transactions",
            f.new_list(related_transaction_data_type()),
            "List of related transactions",
        ),
        f.new_field("metadata", DataType::Utf8, "Metadata for the block"),
    ];
    fields.extend(partition_fields());
    f.new_schema(fields)
}

pub fn block_schema() -> Schema {
    let f = SchemaFactory::new();
    let mut fields = vec![
        f.new_field("hash", DataType::Utf8, "Hash of the block"),
        f.new_field("parent_hash", DataType::Utf8, "Hash of the parent block"),
        f.new_field("number", DataType::UInt64, "The block number"),
        f.new_field(
            "parent_number",
            DataType::UInt64,
            "Block number of the parent block",
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
            "transactions",
            f.new_list(DataType::Utf8),
            "The list of transaction hashes",
        ),
        f.new_field("metadata", DataType::Utf8, "Metadata for the block"),
    ];
    fields.extend(partition_fields());
    f.new_schema(fields)
}

fn raw_transaction_fields() -> Vec<Field> {
    let f = SchemaFactory::new();
    let mut fields = vec![
        f.new_field(
            "block_info",
            block_data_type(),
            "The block containing the transaction",
        ),
        f.new_field(
            "transaction_index",
            DataType::UInt64,
            "The index of the transaction within the block",
        ),
        f.new_field(
            "transaction_data",
            DataType::Binary,
            "The serialized rosetta transaction content",
        ),
    ];
    fields.extend(partition_fields());
    fields
}

pub fn raw_streamed_transaction_schema() -> Schema {
    let f = SchemaFactory::new();
    let mut fields = vec![
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
    ];
    fields.extend(raw_transaction_fields());
    f.new_schema(fields)
}

fn block_data_type() -> DataType {
    let f = SchemaFactory::new();
    f.new_struct(vec![
        f.new_field(
            "block_identifier",
            block_identifier_type(),
            "the block identifier",
        ),
        f.new_field(
            "parent_identifier",
            block_identifier_type(),
            "the parent block identifier",
        ),
        f.new_field(
            "timestamp",
            DataType::UInt64,
            "The unix timestamp for when the block was collated",
        ),
    ])
}

fn block_identifier_type() -> DataType {
    let f = SchemaFactory::new();
    f.new_struct(vec![
        f.new_field("index", DataType::UInt64, "The block index"),
        f.new_field("hash", DataType::Utf8, "The block hash"),
    ])
}

fn operation_data_type() -> DataType {
    let f = SchemaFactory::new();
    f.new_struct(vec![
        f.new_field(
            "operation_index",
            DataType::UInt64,
            "Zero-based index of the operation",
        ),
        f.new_field(
            "network_index",
            DataType::UInt64,
            "Zero-based network index of the operation",
        ),
        f.new_field(
            "related_operations",
            f.new_list(related_operation_data_type()),
            "The list of related operations",
        ),
        f.new_field("type", DataType::Utf8, "The operation type"),
        f.new_field("status", DataType::Utf8, "The operation status"),
        f.new_field("account_address", DataType::Utf8, "The address of the account"),
        f.new_field(
            "sub_account_address",
            DataType::Utf8,
            "The identifier of the sub account",
        ),
        f.new_field(
            "amount_value",
            decimal128_type(),
            "The value of the transaction as an arbitrary-sized signed integer; amount_value is set to null for overflow and invalid values)",
        ),
        f.new_field(
            "amount_string",
            DataType::Utf8,
            "The value of the transaction as string",
        ),
        f.new_field(
            "amount_symbol",
            DataType::Utf8,
            "Canonical symbol associated with a currency",
        ),
        f.new_field(
            "amount_decimals",
            DataType::UInt64,
            "Number of decimal places in the standard unit representation of the amount",
        ),
        f.new_field(
            "coin_change_identifier",
            DataType::Utf8,
            "The globally unique identifier of a coin",
        ),
        f.new_field(
            "coin_change_action",
            DataType::Utf8,
            "Different state changes a coin can undergo. One of COIN_ACTION_UNSPECIFIED, COIN_CREATED, COIN_SPENT",
        ),
        f.new_field(
            "metadata",
            DataType::Utf8,
            "Protocol specific information regarding the operation",
        ),
    ])
}

fn related_operation_data_type() -> DataType {
    let f = SchemaFactory::new();
    f.new_struct(vec![
        f.new_field(
            "operation_index",
            DataType::UInt64,
            "Zero-based index of the operation",
        ),
        f.new_field(
            "network_index",
            DataType::UInt64,
            "Zero-based network index of the operation",
        ),
    ])
}

fn related_transaction_data_type() -> DataType {
    let f = SchemaFactory::new();
    f.new_struct(vec![
        f.new_field("transaction_hash", DataType::Utf8, "Hash of the transaction"),
        f.new_field(
            "direction",
            DataType::Utf8,
            "Direction of the related transaction. One of DIRECTION_UNSPECIFIED, FORWARD, BACKWARD",
        ),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partition_columns_are_last() {
        for schema in [
            transaction_schema(),
            block_schema(),
            raw_streamed_transaction_schema(),
        ] {
            let n = schema.fields().len();
            assert_eq!(schema.field(n - 2).name(), "_partition_by");
            assert_eq!(schema.field(n - 1).name(), "_repartition_by_range");
        }
    }

    #[test]
    fn raw_streamed_schema_embeds_identifier_pair() {
        let schema = raw_streamed_transaction_schema();
        let block_info = schema.field_with_name("block_info").unwrap();
        let DataType::Struct(fields) = block_info.data_type() else {
            panic!("block_info must be a struct");
        };
        assert_eq!(fields[0].name(), "block_identifier");
        assert_eq!(fields[1].name(), "parent_identifier");
    }
}
