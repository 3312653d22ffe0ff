//! Row projection for the string-valued EVM tables. No decimal parsing
//! happens here, so no value can fail the projection.

use blockchain_common::ethereum::{EthereumBlock, EthereumHeader, EthereumTransaction};
use blockchain_common::{BlockchainEvent, Chain};
use flight_common::{ListAppender, RecordAppender, RecordBuilder};

use crate::error::GatewayError;
use crate::tables::partition_by_number;

use super::super::ethereum::transform::{append_header, append_receipt};

fn require_header(block: &EthereumBlock) -> Result<&EthereumHeader, GatewayError> {
    block
        .header
        .as_ref()
        .ok_or_else(|| GatewayError::Transform("header is required".to_string()))
}

pub(crate) fn transform_transactions(
    builder: &mut RecordBuilder,
    block: &EthereumBlock,
    chain: Chain,
    partition_by_size: u64,
) -> Result<(), GatewayError> {
    let header = require_header(block)?;
    for transaction in &block.transactions {
        append_transaction_row(
            builder.appender(),
            transaction,
            header,
            chain,
            partition_by_number(header.number, partition_by_size),
            header.number,
        );
    }
    Ok(())
}

pub(crate) fn transform_streamed_transactions(
    builder: &mut RecordBuilder,
    block: &EthereumBlock,
    event: &BlockchainEvent,
    chain: Chain,
    partition_by_size: u64,
) -> Result<(), GatewayError> {
    let header = require_header(block)?;
    let sequence = event.sequence_num;
    for transaction in &block.transactions {
        let appender = builder
            .appender()
            .append_i64(sequence)
            .append_string(event.event_type.as_str());
        append_transaction_row(
            appender,
            transaction,
            header,
            chain,
            partition_by_number(sequence as u64, partition_by_size),
            sequence as u64,
        );
    }
    Ok(())
}

fn append_transaction_row(
    appender: RecordAppender<'_>,
    transaction: &EthereumTransaction,
    header: &EthereumHeader,
    chain: Chain,
    partition_by: u64,
    repartition_key: u64,
) {
    appender
        .append_string(&transaction.hash)
        .append_u64(transaction.index)
        .append_string(&transaction.block_hash)
        .append_u64(transaction.block_number)
        .append_u64(transaction.block_timestamp)
        .append_string(&transaction.from)
        .append_string(&transaction.to)
        .append_u64(transaction.nonce)
        .append_string(&transaction.value)
        .append_u64(transaction.gas)
        .append_u64(transaction.gas_price)
        .append_string(&transaction.input)
        .append_u64(transaction.transaction_type)
        .append_u64(transaction.max_fee_per_gas.unwrap_or_default())
        .append_u64(transaction.max_priority_fee_per_gas.unwrap_or_default())
        .append_u64(transaction.priority_fee_per_gas.unwrap_or_default())
        .append_struct(|sa| append_header(sa, header))
        .append_struct(|sa| append_receipt(sa, &transaction.receipt, chain))
        .append_list(|la| append_traces(la, transaction))
        .append_u64(partition_by)
        .append_u64(repartition_key)
        .build();
}

fn append_traces(la: &mut ListAppender<'_>, transaction: &EthereumTransaction) {
    for trace in &transaction.flattened_traces {
        la.append_struct(|sa| {
            sa.append_string(&trace.transaction_hash)
                .append_u64(trace.transaction_index)
                .append_string(&trace.block_hash)
                .append_u64(trace.block_number)
                .append_string(&trace.from)
                .append_string(&trace.to)
                .append_string(&trace.value)
                .append_string(&trace.input)
                .append_string(&trace.output)
                .append_string(&trace.trace_kind)
                .append_string(&trace.trace_type)
                .append_string(&trace.call_type)
                .append_u64(trace.gas)
                .append_u64(trace.gas_used)
                .append_u64(trace.subtraces)
                .append_list(|la| {
                    for address in &trace.trace_address {
                        la.append_u64(*address);
                    }
                })
                .append_string(&trace.error)
                .append_u64(trace.status)
                .append_string(&trace.trace_id);
        });
    }
}
