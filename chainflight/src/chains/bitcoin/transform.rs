//! Row projection for the Bitcoin tables.

use blockchain_common::bitcoin::{
    BitcoinBlock, BitcoinHeader, BitcoinTransactionInput, BitcoinTransactionOutput,
};
use flight_common::{ListAppender, RecordBuilder, StructAppender};

use crate::error::GatewayError;
use crate::tables::partition_by_number;

fn require_header(block: &BitcoinBlock) -> Result<&BitcoinHeader, GatewayError> {
    block
        .header
        .as_ref()
        .ok_or_else(|| GatewayError::Transform("header is required".to_string()))
}

pub(crate) fn transform_transactions(
    builder: &mut RecordBuilder,
    block: &BitcoinBlock,
    partition_by_size: u64,
) -> Result<(), GatewayError> {
    let header = require_header(block)?;

    for transaction in &block.transactions {
        builder
            .appender()
            // The id is the stable identity; hash differs for witness
            // transactions.
            .append_string(&transaction.transaction_id)
            .append_u64(transaction.size)
            .append_u64(transaction.virtual_size)
            .append_u64(transaction.weight)
            .append_u64(transaction.version)
            .append_u64(transaction.lock_time)
            .append_bool(transaction.is_coinbase)
            .append_u64(transaction.index)
            .append_struct(|sa| append_header(sa, header))
            .append_list(|la| append_inputs(la, &transaction.inputs))
            .append_list(|la| append_outputs(la, &transaction.outputs))
            .append_u64(transaction.input_count)
            .append_u64(transaction.output_count)
            .append_u64(transaction.input_value)
            .append_u64(transaction.output_value)
            .append_u64(transaction.fee)
            .append_u64(partition_by_number(header.height, partition_by_size))
            .append_u64(header.height)
            .build();
    }

    Ok(())
}

pub(crate) fn transform_blocks(
    builder: &mut RecordBuilder,
    block: &BitcoinBlock,
    partition_by_size: u64,
) -> Result<(), GatewayError> {
    let header = require_header(block)?;

    builder
        .appender()
        .append_string(&header.hash)
        .append_u64(header.size)
        .append_u64(header.stripped_size)
        .append_u64(header.weight)
        .append_u64(header.height)
        .append_u64(header.version)
        .append_string(&header.merkle_root)
        .append_u64(header.time)
        .append_u64(header.nonce)
        .append_string(&header.bits)
        .append_string(&header.difficulty)
        .append_string(&header.chain_work)
        .append_u64(header.number_of_transactions)
        .append_string(&header.previous_block_hash)
        .append_string(&header.next_block_hash)
        .append_list(|la| {
            for transaction in &block.transactions {
                la.append_string(&transaction.transaction_id);
            }
        })
        .append_u64(partition_by_number(header.height, partition_by_size))
        .append_u64(header.height)
        .build();

    Ok(())
}

fn append_header(sa: &mut StructAppender<'_>, header: &BitcoinHeader) {
    sa.append_string(&header.hash)
        .append_u64(header.size)
        .append_u64(header.stripped_size)
        .append_u64(header.weight)
        .append_u64(header.height)
        .append_u64(header.version)
        .append_string(&header.merkle_root)
        .append_u64(header.time)
        .append_u64(header.nonce)
        .append_string(&header.bits)
        .append_string(&header.difficulty)
        .append_string(&header.chain_work)
        .append_u64(header.number_of_transactions)
        .append_string(&header.previous_block_hash)
        .append_string(&header.next_block_hash);
}

fn append_inputs(la: &mut ListAppender<'_>, inputs: &[BitcoinTransactionInput]) {
    for (i, input) in inputs.iter().enumerate() {
        la.append_struct(|sa| {
            let script = input.script_signature.clone().unwrap_or_default();
            let from_output = input.from_output.clone().unwrap_or_default();
            let from_key = from_output.script_public_key.unwrap_or_default();

            sa.append_u64(i as u64)
                .append_string(&input.coinbase)
                .append_string(&input.transaction_id)
                .append_u64(input.from_output_index)
                .append_string(&script.assembly)
                .append_string(&script.hex)
                .append_u64(input.sequence)
                .append_list(|la| {
                    for witness in &input.transaction_input_witnesses {
                        la.append_string(witness);
                    }
                })
                .append_string(&from_key.script_type)
                .append_string(&from_key.address)
                .append_u64(from_output.value);
        });
    }
}

fn append_outputs(la: &mut ListAppender<'_>, outputs: &[BitcoinTransactionOutput]) {
    for output in outputs {
        la.append_struct(|sa| {
            let key = output.script_public_key.clone().unwrap_or_default();
            sa.append_u64(output.index)
                .append_string(&key.assembly)
                .append_string(&key.hex)
                .append_string(&key.script_type)
                .append_string(&key.address)
                .append_u64(output.value);
        });
    }
}
