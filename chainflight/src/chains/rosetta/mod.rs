//! Rosetta-normalized tables, served under `format=rosetta` by families
//! whose chains support rosetta parsing.

pub mod schema;
pub mod transform;

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use blockchain_common::rosetta::RosettaBlock;
use blockchain_common::{BlockParser, RawBlock};
use flight_common::RecordBuilder;

use crate::config::Config;
use crate::error::GatewayError;
use crate::query::{Encoding, TableFormat};
use crate::session::Session;
use crate::tables::{
    BatchTable, BatchTransformer, BlockAndEvent, StreamTable, StreamTransformer, Table,
    TableAttributes, TABLE_BLOCKS, TABLE_STREAMED_TRANSACTIONS, TABLE_TRANSACTIONS,
};

pub fn transactions_table(session: &Session) -> Arc<dyn Table> {
    Arc::new(BatchTable::new(
        TableAttributes::new(TABLE_TRANSACTIONS).with_format(TableFormat::Rosetta),
        Arc::new(schema::transaction_schema()),
        session.clone(),
        TransactionsTransformer,
    ))
}

pub fn blocks_table(session: &Session) -> Arc<dyn Table> {
    Arc::new(BatchTable::new(
        TableAttributes::new(TABLE_BLOCKS).with_format(TableFormat::Rosetta),
        Arc::new(schema::block_schema()),
        session.clone(),
        BlocksTransformer,
    ))
}

pub fn raw_streamed_transactions_table(config: &Config, session: &Session) -> Arc<dyn Table> {
    Arc::new(StreamTable::new(
        TableAttributes::new(TABLE_STREAMED_TRANSACTIONS)
            .with_format(TableFormat::Rosetta)
            .with_encoding(Encoding::Raw),
        Arc::new(schema::raw_streamed_transaction_schema()),
        session.clone(),
        RawStreamedTransactionsTransformer,
        config.stream_parallelism,
    ))
}

async fn parse_rosetta_block(
    parser: &dyn BlockParser,
    block: &RawBlock,
) -> Result<RosettaBlock, GatewayError> {
    parser
        .parse_rosetta_block(block)
        .await
        .context("failed to parse raw block to rosetta block")
        .map_err(GatewayError::Upstream)
}

struct TransactionsTransformer;

#[async_trait]
impl BatchTransformer for TransactionsTransformer {
    async fn transform_block(
        &self,
        block: &RawBlock,
        parser: &dyn BlockParser,
        builder: &mut RecordBuilder,
        partition_by_size: u64,
    ) -> Result<(), GatewayError> {
        let rosetta = parse_rosetta_block(parser, block).await?;
        transform::transform_transactions(builder, &rosetta, partition_by_size)
    }
}

struct BlocksTransformer;

#[async_trait]
impl BatchTransformer for BlocksTransformer {
    async fn transform_block(
        &self,
        block: &RawBlock,
        parser: &dyn BlockParser,
        builder: &mut RecordBuilder,
        partition_by_size: u64,
    ) -> Result<(), GatewayError> {
        let rosetta = parse_rosetta_block(parser, block).await?;
        transform::transform_blocks(builder, &rosetta, partition_by_size)
    }
}

struct RawStreamedTransactionsTransformer;

#[async_trait]
impl StreamTransformer for RawStreamedTransactionsTransformer {
    async fn transform_block(
        &self,
        block_and_event: &BlockAndEvent,
        parser: &dyn BlockParser,
        builder: &mut RecordBuilder,
        partition_by_size: u64,
    ) -> Result<(), GatewayError> {
        let rosetta = parse_rosetta_block(parser, &block_and_event.block).await?;
        transform::transform_raw_streamed_transactions(
            builder,
            &rosetta,
            &block_and_event.event,
            partition_by_size,
        )
    }
}

#[cfg(test)]
mod tests {
    use arrow::array::{Array, Decimal128Array, ListArray, StringArray, StructArray};
    use blockchain_common::rosetta::{
        RosettaAmount, RosettaCurrency, RosettaOperation, RosettaOperationIdentifier,
        RosettaTransaction, RosettaTransactionIdentifier,
    };

    use super::*;
    use crate::testing::rosetta_block;

    fn operation(value: &str) -> RosettaOperation {
        RosettaOperation {
            operation_identifier: RosettaOperationIdentifier {
                index: 0,
                network_index: 0,
            },
            operation_type: "TRANSFER".to_string(),
            status: "SUCCESS".to_string(),
            amount: Some(RosettaAmount {
                value: value.to_string(),
                currency: RosettaCurrency {
                    symbol: "ETH".to_string(),
                    decimals: 18,
                },
            }),
            ..Default::default()
        }
    }

    #[test]
    fn unparseable_operation_amounts_become_null_decimals() {
        let mut builder = RecordBuilder::new(Arc::new(schema::transaction_schema()));
        let mut block = rosetta_block(77, 0);
        block.transactions = vec![RosettaTransaction {
            transaction_identifier: RosettaTransactionIdentifier {
                hash: "0xtx".to_string(),
            },
            operations: vec![operation("100"), operation(&"9".repeat(40))],
            ..Default::default()
        }];

        transform::transform_transactions(&mut builder, &block, 0).unwrap();
        let batch = builder.finish().unwrap();

        let operations_col = batch.schema().index_of("operations").unwrap();
        let operations = batch
            .column(operations_col)
            .as_any()
            .downcast_ref::<ListArray>()
            .unwrap();
        let structs = operations.values();
        let structs = structs.as_any().downcast_ref::<StructArray>().unwrap();

        let amount_values = structs
            .column(7)
            .as_any()
            .downcast_ref::<Decimal128Array>()
            .unwrap();
        assert_eq!(amount_values.value(0), 100);
        assert!(amount_values.is_null(1));

        // The raw string survives either way.
        let amount_strings = structs
            .column(8)
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert_eq!(amount_strings.value(1), "9".repeat(40));
    }

    #[test]
    fn blocks_serialize_metadata_to_json() {
        let mut builder = RecordBuilder::new(Arc::new(schema::block_schema()));
        let mut block = rosetta_block(77, 1);
        block
            .metadata
            .insert("difficulty".to_string(), serde_json::json!("0x20000"));

        transform::transform_blocks(&mut builder, &block, 0).unwrap();
        let batch = builder.finish().unwrap();

        let metadata_col = batch.schema().index_of("metadata").unwrap();
        let metadata = batch
            .column(metadata_col)
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert_eq!(metadata.value(0), r#"{"difficulty":"0x20000"}"#);
    }

    #[test]
    fn raw_streamed_rows_embed_the_serialized_transaction() {
        let mut builder =
            RecordBuilder::new(Arc::new(schema::raw_streamed_transaction_schema()));
        let block = rosetta_block(77, 2);
        let event = crate::testing::event_at(9, 77);

        transform::transform_raw_streamed_transactions(&mut builder, &block, &event, 0).unwrap();
        let batch = builder.finish().unwrap();
        assert_eq!(batch.num_rows(), 2);

        let data_col = batch.schema().index_of("transaction_data").unwrap();
        let data = batch
            .column(data_col)
            .as_any()
            .downcast_ref::<arrow::array::BinaryArray>()
            .unwrap();
        let decoded: RosettaTransaction = serde_json::from_slice(data.value(0)).unwrap();
        assert_eq!(decoded, block.transactions[0]);
    }
}
