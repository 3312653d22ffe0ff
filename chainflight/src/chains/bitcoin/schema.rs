//! Arrow schemas for the Bitcoin tables.

use arrow::datatypes::{DataType, Field, Schema};
use flight_common::SchemaFactory;

use super::super::ethereum::schema::partition_fields;

pub fn transaction_schema() -> Schema {
    let f = SchemaFactory::new();
    let mut fields = vec![
        f.new_field("hash", DataType::Utf8, "The transaction hash"),
        f.new_field("size", DataType::UInt64, "The serialized transaction size"),
        f.new_field(
            "virtual_size",
            DataType::UInt64,
            "The virtual transaction size (differs from size for witness transactions)",
        ),
        f.new_field(
            "weight",
            DataType::UInt64,
            "The transaction's weight (between vsize*4-3 and vsize*4)",
        ),
        f.new_field("version", DataType::UInt64, "The version"),
        f.new_field("lock_time", DataType::UInt64, "The lock time"),
        f.new_field(
            "is_coinbase",
            DataType::Boolean,
            "True if this transaction is a coinbase transaction",
        ),
        f.new_field("index", DataType::UInt64, "The transaction index"),
        f.new_field("block", block_data_type(), "The block header"),
        f.new_field(
            "inputs",
            f.new_list(transaction_input_data_type()),
            "The inputs",
        ),
        f.new_field(
            "outputs",
            f.new_list(transaction_output_data_type()),
            "The outputs",
        ),
        f.new_field("input_count", DataType::UInt64, "The number of inputs"),
        f.new_field("output_count", DataType::UInt64, "The number of outputs"),
        f.new_field("input_value", DataType::UInt64, "Total value of inputs"),
        f.new_field("output_value", DataType::UInt64, "Total value of outputs"),
        f.new_field("fee", DataType::UInt64, "The fee paid by this transaction"),
    ];
    fields.extend(partition_fields());
    f.new_schema(fields)
}

pub fn block_schema() -> Schema {
    let f = SchemaFactory::new();
    let mut fields = block_fields();
    fields.push(f.new_field(
        "transactions",
        f.new_list(DataType::Utf8),
        "The list of transaction hashes",
    ));
    fields.extend(partition_fields());
    f.new_schema(fields)
}

fn block_fields() -> Vec<Field> {
    let f = SchemaFactory::new();
    vec![
        f.new_field("hash", DataType::Utf8, "The block hash"),
        f.new_field("size", DataType::UInt64, "The block size"),
        f.new_field(
            "stripped_size",
            DataType::UInt64,
            "The block size excluding witness data",
        ),
        f.new_field(
            "weight",
            DataType::UInt64,
            "The block weight as defined in BIP 141",
        ),
        f.new_field("number", DataType::UInt64, "The block height or number"),
        f.new_field("version", DataType::UInt64, "The block version"),
        f.new_field(
            "merkle_root",
            DataType::Utf8,
            "The root node of a Merkle tree, where leaves are transaction hashes",
        ),
        f.new_field(
            "timestamp",
            DataType::UInt64,
            "The block creation time expressed in UNIX epoch time",
        ),
        f.new_field(
            "nonce",
            DataType::UInt64,
            "The median block time expressed in UNIX epoch time",
        ),
        f.new_field("bits", DataType::Utf8, "The bits"),
        f.new_field("difficulty", DataType::Utf8, "The difficulty"),
        f.new_field(
            "chain_work",
            DataType::Utf8,
            "Expected number of hashes required to produce the chain up to this block (in hex)",
        ),
        f.new_field(
            "transaction_count",
            DataType::UInt64,
            "The number of transactions in the block",
        ),
        f.new_field(
            "previous_block_hash",
            DataType::Utf8,
            "The hash of the previous block",
        ),
        f.new_field(
            "next_block_hash",
            DataType::Utf8,
            "The hash of the next block",
        ),
    ]
}

fn block_data_type() -> DataType {
    SchemaFactory::new().new_struct(block_fields())
}

fn transaction_input_data_type() -> DataType {
    let f = SchemaFactory::new();
    f.new_struct(vec![
        f.new_field(
            "index",
            DataType::UInt64,
            "Zero-indexed number of an input within a transaction",
        ),
        f.new_field(
            "coinbase",
            DataType::Utf8,
            "The coinbase is the content of the 'input' of a generation transaction.",
        ),
        f.new_field(
            "spent_transaction_hash",
            DataType::Utf8,
            "The hash of the spent transaction",
        ),
        f.new_field(
            "spent_output_index",
            DataType::UInt64,
            "The output index of the spent transaction",
        ),
        f.new_field(
            "script_asm",
            DataType::Utf8,
            "Symbolic representation of the bitcoin's script language op-codes",
        ),
        f.new_field(
            "script_hex",
            DataType::Utf8,
            "Hexadecimal representation of the bitcoin's script language op-codes",
        ),
        f.new_field("sequence", DataType::UInt64, "The script sequence number"),
        f.new_field(
            "transaction_input_witnesses",
            f.new_list(DataType::Utf8),
            "hex-encoded witness data",
        ),
        f.new_field(
            "type",
            DataType::Utf8,
            "The address type of the spent output",
        ),
        f.new_field(
            "address",
            DataType::Utf8,
            "The address which owns the spent output",
        ),
        f.new_field(
            "value",
            DataType::UInt64,
            "The value in base currency attached to the spent output",
        ),
    ])
}

fn transaction_output_data_type() -> DataType {
    let f = SchemaFactory::new();
    f.new_struct(vec![
        f.new_field(
            "index",
            DataType::UInt64,
            "Zero-indexed number of an output within a transaction used by a later transaction to refer to that specific output",
        ),
        f.new_field(
            "script_asm",
            DataType::Utf8,
            "Symbolic representation of the bitcoin's script language op-codes",
        ),
        f.new_field(
            "script_hex",
            DataType::Utf8,
            "Hexadecimal representation of the bitcoin's script language op-codes",
        ),
        f.new_field("type", DataType::Utf8, "The address type of the output"),
        f.new_field(
            "address",
            DataType::Utf8,
            "The address which owns this output",
        ),
        f.new_field(
            "value",
            DataType::UInt64,
            "The value in base currency attached to this output",
        ),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partition_columns_are_last() {
        for schema in [transaction_schema(), block_schema()] {
            let n = schema.fields().len();
            assert_eq!(schema.field(n - 2).name(), "_partition_by");
            assert_eq!(schema.field(n - 1).name(), "_repartition_by_range");
        }
    }
}
