//! Row projection for the Rosetta tables.

use blockchain_common::rosetta::{
    Metadata, RosettaBlock, RosettaBlockIdentifier, RosettaOperation, RosettaTransaction,
};
use blockchain_common::BlockchainEvent;
use flight_common::{decimal128_from_string, ListAppender, RecordBuilder, StructAppender};

use crate::error::GatewayError;
use crate::tables::partition_by_number;

pub(crate) fn transform_transactions(
    builder: &mut RecordBuilder,
    block: &RosettaBlock,
    partition_by_size: u64,
) -> Result<(), GatewayError> {
    let block_number = block.block_identifier.index;

    for (transaction_index, transaction) in block.transactions.iter().enumerate() {
        let transaction_metadata = to_metadata(&transaction.metadata)?;

        let mut operation_err = None;
        builder
            .appender()
            .append_string(&transaction.transaction_identifier.hash)
            .append_u64(transaction_index as u64)
            .append_string(&block.block_identifier.hash)
            .append_u64(block_number)
            .append_u64(block.timestamp)
            .append_list(|la| {
                if let Err(err) = append_operations(la, transaction) {
                    operation_err = Some(err);
                }
            })
            .append_u64(transaction.operations.len() as u64)
            .append_list(|la| append_related_transactions(la, transaction))
            .append_string(&transaction_metadata)
            .append_u64(partition_by_number(block_number, partition_by_size))
            .append_u64(block_number)
            .build();

        if let Some(err) = operation_err {
            return Err(err);
        }
    }

    Ok(())
}

pub(crate) fn transform_blocks(
    builder: &mut RecordBuilder,
    block: &RosettaBlock,
    partition_by_size: u64,
) -> Result<(), GatewayError> {
    let metadata = to_metadata(&block.metadata)?;
    let block_number = block.block_identifier.index;

    builder
        .appender()
        .append_string(&block.block_identifier.hash)
        .append_string(&block.parent_block_identifier.hash)
        .append_u64(block_number)
        .append_u64(block.parent_block_identifier.index)
        .append_u64(block.timestamp)
        .append_u64(block.transactions.len() as u64)
        .append_list(|la| {
            for transaction in &block.transactions {
                la.append_string(&transaction.transaction_identifier.hash);
            }
        })
        .append_string(&metadata)
        .append_u64(partition_by_number(block_number, partition_by_size))
        .append_u64(block_number)
        .build();

    Ok(())
}

pub(crate) fn transform_raw_streamed_transactions(
    builder: &mut RecordBuilder,
    block: &RosettaBlock,
    event: &BlockchainEvent,
    partition_by_size: u64,
) -> Result<(), GatewayError> {
    let sequence = event.sequence_num;

    for (transaction_index, transaction) in block.transactions.iter().enumerate() {
        let data = serde_json::to_vec(transaction)?;

        builder
            .appender()
            .append_i64(sequence)
            .append_string(event.event_type.as_str())
            .append_struct(|sa| append_block_info(sa, block))
            .append_u64(transaction_index as u64)
            .append_binary(&data)
            .append_u64(partition_by_number(sequence as u64, partition_by_size))
            .append_u64(sequence as u64)
            .build();
    }

    Ok(())
}

fn append_block_info(sa: &mut StructAppender<'_>, block: &RosettaBlock) {
    sa.append_struct(|sa| append_block_identifier(sa, &block.block_identifier))
        .append_struct(|sa| append_block_identifier(sa, &block.parent_block_identifier))
        .append_u64(block.timestamp);
}

fn append_block_identifier(sa: &mut StructAppender<'_>, id: &RosettaBlockIdentifier) {
    sa.append_u64(id.index).append_string(&id.hash);
}

fn append_operations(
    la: &mut ListAppender<'_>,
    transaction: &RosettaTransaction,
) -> Result<(), GatewayError> {
    for operation in &transaction.operations {
        let metadata = to_metadata(&operation.metadata)?;
        let amount = operation.amount.clone().unwrap_or_default();
        // Operation amounts are best effort: overflow and junk become a
        // null decimal while the string column keeps the raw value.
        let amount_value = decimal128_from_string(&amount.value).ok();

        let account = operation.account.clone().unwrap_or_default();
        let sub_account = account.sub_account.unwrap_or_default();
        let coin_change = operation.coin_change.clone().unwrap_or_default();

        la.append_struct(|sa| {
            sa.append_u64(operation.operation_identifier.index)
                .append_u64(operation.operation_identifier.network_index)
                .append_list(|la| append_related_operations(la, operation))
                .append_string(&operation.operation_type)
                .append_string(&operation.status)
                .append_string(&account.address)
                .append_string(&sub_account.address);

            match amount_value {
                Some(value) => sa.append_decimal128(value),
                None => sa.append_decimal128_null(),
            };

            sa.append_string(&amount.value)
                .append_string(&amount.currency.symbol)
                .append_u64(amount.currency.decimals as u64)
                .append_string(&coin_change.coin_identifier.identifier)
                .append_string(&coin_change.coin_action)
                .append_string(&metadata);
        });
    }

    Ok(())
}

fn append_related_operations(la: &mut ListAppender<'_>, operation: &RosettaOperation) {
    for related in &operation.related_operations {
        la.append_struct(|sa| {
            sa.append_u64(related.index).append_u64(related.network_index);
        });
    }
}

fn append_related_transactions(la: &mut ListAppender<'_>, transaction: &RosettaTransaction) {
    for related in &transaction.related_transactions {
        la.append_struct(|sa| {
            sa.append_string(&related.transaction_identifier.hash)
                .append_string(&related.direction);
        });
    }
}

fn to_metadata(metadata: &Metadata) -> Result<String, GatewayError> {
    Ok(serde_json::to_string(metadata)?)
}
