//! Row projection for the Ethereum-family tables.

use blockchain_common::ethereum::{
    EthereumBlock, EthereumHeader, EthereumReceipt, EthereumTransaction,
};
use blockchain_common::{BlockchainEvent, Chain};
use flight_common::{
    decimal128_from_string, ListAppender, RecordAppender, RecordBuilder, StructAppender,
};

use crate::error::GatewayError;
use crate::tables::partition_by_number;

fn require_header(block: &EthereumBlock) -> Result<&EthereumHeader, GatewayError> {
    block
        .header
        .as_ref()
        .ok_or_else(|| GatewayError::Transform("header is required".to_string()))
}

fn transaction_value(transaction: &EthereumTransaction) -> Result<i128, GatewayError> {
    decimal128_from_string(&transaction.value).map_err(|err| {
        GatewayError::Transform(format!(
            "failed to convert value to decimal128 (hash={}): {err}",
            transaction.hash,
        ))
    })
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
        )?;
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
        )?;
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
) -> Result<(), GatewayError> {
    let value = transaction_value(transaction)?;

    appender
        .append_string(&transaction.hash)
        .append_u64(transaction.index)
        .append_string(&transaction.block_hash)
        .append_u64(transaction.block_number)
        .append_u64(transaction.block_timestamp)
        .append_string(&transaction.from)
        .append_string(&transaction.to)
        .append_u64(transaction.nonce)
        .append_decimal128(value)
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
    Ok(())
}

pub(crate) fn transform_blocks(
    builder: &mut RecordBuilder,
    block: &EthereumBlock,
    chain: Chain,
    partition_by_size: u64,
) -> Result<(), GatewayError> {
    let header = require_header(block)?;
    append_block_row(
        builder.appender(),
        block,
        header,
        chain,
        partition_by_number(header.number, partition_by_size),
        header.number,
    )
}

pub(crate) fn transform_streamed_blocks(
    builder: &mut RecordBuilder,
    block: &EthereumBlock,
    event: &BlockchainEvent,
    chain: Chain,
    partition_by_size: u64,
) -> Result<(), GatewayError> {
    let header = require_header(block)?;
    let sequence = event.sequence_num;
    let appender = builder
        .appender()
        .append_i64(sequence)
        .append_string(event.event_type.as_str());
    append_block_row(
        appender,
        block,
        header,
        chain,
        partition_by_number(sequence as u64, partition_by_size),
        sequence as u64,
    )
}

fn append_block_row(
    appender: RecordAppender<'_>,
    block: &EthereumBlock,
    header: &EthereumHeader,
    chain: Chain,
    partition_by: u64,
    repartition_key: u64,
) -> Result<(), GatewayError> {
    let total_difficulty = decimal128_from_string(&header.total_difficulty).map_err(|err| {
        GatewayError::Transform(format!(
            "failed to convert total difficulty to decimal128 (hash={}): {err}",
            header.hash,
        ))
    })?;

    let appender = appender
        .append_string(&header.hash)
        .append_string(&header.parent_hash)
        .append_u64(header.number)
        .append_string(&header.nonce)
        .append_string(&header.sha3_uncles)
        .append_string(&header.logs_bloom)
        .append_string(&header.transactions_root)
        .append_string(&header.state_root)
        .append_string(&header.receipts_root)
        .append_string(&header.miner)
        .append_u64(header.difficulty)
        .append_decimal128(total_difficulty)
        .append_u64(header.size)
        .append_string(&header.extra_data)
        .append_u64(header.gas_limit)
        .append_u64(header.gas_used)
        .append_u64(header.timestamp)
        .append_u64(header.transactions.len() as u64)
        .append_u64(header.base_fee_per_gas.unwrap_or_default())
        .append_list(|la| {
            for transaction in &header.transactions {
                la.append_string(transaction);
            }
        })
        .append_list(|la| {
            for uncle in &header.uncles {
                la.append_string(uncle);
            }
        })
        .append_list(|la| {
            for uncle in &block.uncles {
                la.append_struct(|sa| append_header(sa, uncle));
            }
        });

    let appender = if chain == Chain::Ethereum {
        appender
            .append_list(|la| append_withdrawals(la, header))
            .append_string(&header.withdrawals_root)
    } else {
        appender
    };

    appender
        .append_u64(partition_by)
        .append_u64(repartition_key)
        .build();
    Ok(())
}

pub(crate) fn transform_raw_streamed_transactions(
    builder: &mut RecordBuilder,
    block: &EthereumBlock,
    event: &BlockchainEvent,
    partition_by_size: u64,
) -> Result<(), GatewayError> {
    require_header(block)?;
    let sequence = event.sequence_num;
    for transaction in &block.transactions {
        let data = serde_json::to_vec(transaction)?;

        builder
            .appender()
            .append_i64(sequence)
            .append_string(event.event_type.as_str())
            .append_string(&transaction.hash)
            .append_u64(transaction.index)
            .append_string(&transaction.block_hash)
            .append_u64(transaction.block_number)
            .append_u64(transaction.block_timestamp)
            .append_binary(&data)
            .append_u64(partition_by_number(sequence as u64, partition_by_size))
            .append_u64(sequence as u64)
            .build();
    }
    Ok(())
}

pub(crate) fn append_header(sa: &mut StructAppender<'_>, header: &EthereumHeader) {
    sa.append_string(&header.hash)
        .append_string(&header.parent_hash)
        .append_u64(header.number)
        .append_u64(header.timestamp)
        .append_string(&header.miner)
        .append_u64(header.difficulty)
        .append_u64(header.gas_limit)
        .append_u64(header.gas_used)
        .append_u64(header.base_fee_per_gas.unwrap_or_default());
}

pub(crate) fn append_receipt(
    sa: &mut StructAppender<'_>,
    receipt: &EthereumReceipt,
    chain: Chain,
) {
    sa.append_string(&receipt.transaction_hash)
        .append_u64(receipt.transaction_index)
        .append_string(&receipt.block_hash)
        .append_u64(receipt.block_number)
        .append_string(&receipt.from)
        .append_string(&receipt.to)
        .append_u64(receipt.cumulative_gas_used)
        .append_u64(receipt.gas_used)
        .append_string(&receipt.contract_address)
        .append_list(|la| append_logs(la, receipt))
        .append_string(&receipt.logs_bloom)
        .append_string(&receipt.root)
        .append_u64(receipt.receipt_type)
        .append_u64(receipt.status.unwrap_or_default())
        .append_u64(receipt.effective_gas_price.unwrap_or_default());

    let l1 = receipt.l1_fee_info.clone().unwrap_or_default();
    match chain {
        Chain::Arbitrum => {
            sa.append_u64(l1.l1_gas_used);
        }
        Chain::Optimism => {
            sa.append_u64(l1.l1_gas_used)
                .append_u64(l1.l1_gas_price)
                .append_u64(l1.l1_fee)
                .append_string(&l1.l1_fee_scalar);
        }
        _ => {}
    }
}

fn append_logs(la: &mut ListAppender<'_>, receipt: &EthereumReceipt) {
    for log in &receipt.logs {
        la.append_struct(|sa| {
            sa.append_u64(log.log_index)
                .append_string(&log.transaction_hash)
                .append_u64(log.transaction_index)
                .append_string(&log.block_hash)
                .append_u64(log.block_number)
                .append_string(&log.address)
                .append_string(&log.data)
                .append_list(|la| {
                    for topic in &log.topics {
                        la.append_string(topic);
                    }
                })
                .append_bool(log.removed);
        });
    }
}

fn append_traces(la: &mut ListAppender<'_>, transaction: &EthereumTransaction) {
    for trace in &transaction.flattened_traces {
        la.append_struct(|sa| {
            // Trace values are best effort; an unparseable value keeps
            // the string column and records a zero decimal.
            let value = decimal128_from_string(&trace.value).unwrap_or_default();

            sa.append_string(&trace.transaction_hash)
                .append_u64(trace.transaction_index)
                .append_string(&trace.block_hash)
                .append_u64(trace.block_number)
                .append_string(&trace.from)
                .append_string(&trace.to)
                .append_decimal128(value)
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

fn append_withdrawals(la: &mut ListAppender<'_>, header: &EthereumHeader) {
    for withdrawal in &header.withdrawals {
        la.append_struct(|sa| {
            sa.append_u64(withdrawal.index)
                .append_u64(withdrawal.validator_index)
                .append_string(&withdrawal.address)
                .append_u64(withdrawal.amount);
        });
    }
}
