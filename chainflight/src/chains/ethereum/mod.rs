//! The Ethereum-family table set.

pub mod schema;
pub mod transform;

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use blockchain_common::ethereum::EthereumBlock;
use blockchain_common::{BlockParser, Chain, RawBlock};
use flight_common::RecordBuilder;

use crate::config::Config;
use crate::error::GatewayError;
use crate::query::Encoding;
use crate::session::Session;
use crate::tables::{
    BatchTable, BatchTransformer, BlockAndEvent, StreamTable, StreamTransformer, Table,
    TableAttributes, TABLE_BLOCKS, TABLE_STREAMED_BLOCKS, TABLE_STREAMED_TRANSACTIONS,
    TABLE_TRANSACTIONS,
};

use super::rosetta;

/// All tables the family offers; the controller filters by format.
pub fn tables(config: &Config, session: &Session) -> Vec<Arc<dyn Table>> {
    vec![
        transactions_table(config, session),
        blocks_table(config, session),
        streamed_transactions_table(config, session),
        streamed_blocks_table(config, session),
        raw_streamed_transactions_table(config, session),
        rosetta::transactions_table(session),
        rosetta::blocks_table(session),
        rosetta::raw_streamed_transactions_table(config, session),
    ]
}

pub fn transactions_table(config: &Config, session: &Session) -> Arc<dyn Table> {
    Arc::new(BatchTable::new(
        TableAttributes::new(TABLE_TRANSACTIONS),
        Arc::new(schema::transaction_schema(config.chain)),
        session.clone(),
        TransactionsTransformer { chain: config.chain },
    ))
}

pub fn blocks_table(config: &Config, session: &Session) -> Arc<dyn Table> {
    Arc::new(BatchTable::new(
        TableAttributes::new(TABLE_BLOCKS),
        Arc::new(schema::block_schema(config.chain)),
        session.clone(),
        BlocksTransformer { chain: config.chain },
    ))
}

pub fn streamed_transactions_table(config: &Config, session: &Session) -> Arc<dyn Table> {
    Arc::new(StreamTable::new(
        TableAttributes::new(TABLE_STREAMED_TRANSACTIONS),
        Arc::new(schema::streamed_transaction_schema(config.chain)),
        session.clone(),
        StreamedTransactionsTransformer { chain: config.chain },
        config.stream_parallelism,
    ))
}

pub fn streamed_blocks_table(config: &Config, session: &Session) -> Arc<dyn Table> {
    Arc::new(StreamTable::new(
        TableAttributes::new(TABLE_STREAMED_BLOCKS),
        Arc::new(schema::streamed_blocks_schema(config.chain)),
        session.clone(),
        StreamedBlocksTransformer { chain: config.chain },
        config.stream_parallelism,
    ))
}

pub fn raw_streamed_transactions_table(config: &Config, session: &Session) -> Arc<dyn Table> {
    Arc::new(StreamTable::new(
        TableAttributes::new(TABLE_STREAMED_TRANSACTIONS).with_encoding(Encoding::Raw),
        Arc::new(schema::raw_streamed_transaction_schema()),
        session.clone(),
        RawStreamedTransactionsTransformer,
        config.stream_parallelism,
    ))
}

/// Parses a raw block and projects the Ethereum-family representation.
pub(crate) async fn parse_ethereum_block(
    parser: &dyn BlockParser,
    block: &RawBlock,
) -> Result<EthereumBlock, GatewayError> {
    let native = parser
        .parse_native_block(block)
        .await
        .context("failed to parse raw block to native block")
        .map_err(GatewayError::Upstream)?;
    native
        .ethereum()
        .cloned()
        .ok_or_else(|| {
            GatewayError::Transform("failed to extract ethereum block from native block".to_string())
        })
}

struct TransactionsTransformer {
    chain: Chain,
}

#[async_trait]
impl BatchTransformer for TransactionsTransformer {
    async fn transform_block(
        &self,
        block: &RawBlock,
        parser: &dyn BlockParser,
        builder: &mut RecordBuilder,
        partition_by_size: u64,
    ) -> Result<(), GatewayError> {
        let ethereum = parse_ethereum_block(parser, block).await?;
        transform::transform_transactions(builder, &ethereum, self.chain, partition_by_size)
    }
}

struct BlocksTransformer {
    chain: Chain,
}

#[async_trait]
impl BatchTransformer for BlocksTransformer {
    async fn transform_block(
        &self,
        block: &RawBlock,
        parser: &dyn BlockParser,
        builder: &mut RecordBuilder,
        partition_by_size: u64,
    ) -> Result<(), GatewayError> {
        let ethereum = parse_ethereum_block(parser, block).await?;
        transform::transform_blocks(builder, &ethereum, self.chain, partition_by_size)
    }
}

struct StreamedTransactionsTransformer {
    chain: Chain,
}

#[async_trait]
impl StreamTransformer for StreamedTransactionsTransformer {
    async fn transform_block(
        &self,
        block_and_event: &BlockAndEvent,
        parser: &dyn BlockParser,
        builder: &mut RecordBuilder,
        partition_by_size: u64,
    ) -> Result<(), GatewayError> {
        let ethereum = parse_ethereum_block(parser, &block_and_event.block).await?;
        transform::transform_streamed_transactions(
            builder,
            &ethereum,
            &block_and_event.event,
            self.chain,
            partition_by_size,
        )
    }
}

struct StreamedBlocksTransformer {
    chain: Chain,
}

#[async_trait]
impl StreamTransformer for StreamedBlocksTransformer {
    async fn transform_block(
        &self,
        block_and_event: &BlockAndEvent,
        parser: &dyn BlockParser,
        builder: &mut RecordBuilder,
        partition_by_size: u64,
    ) -> Result<(), GatewayError> {
        let ethereum = parse_ethereum_block(parser, &block_and_event.block).await?;
        transform::transform_streamed_blocks(
            builder,
            &ethereum,
            &block_and_event.event,
            self.chain,
            partition_by_size,
        )
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
        let ethereum = parse_ethereum_block(parser, &block_and_event.block).await?;
        transform::transform_raw_streamed_transactions(
            builder,
            &ethereum,
            &block_and_event.event,
            partition_by_size,
        )
    }
}

#[cfg(test)]
mod tests {
    use arrow::array::{
        Array, BinaryArray, Decimal128Array, Int64Array, ListArray, StringArray, StructArray,
        UInt64Array,
    };

    use super::*;
    use crate::testing::{ethereum_block, event_at};

    #[test]
    fn transactions_rows_project_nested_columns() {
        let mut builder =
            RecordBuilder::new(Arc::new(schema::transaction_schema(Chain::Ethereum)));
        let block = ethereum_block(12, 2);

        transform::transform_transactions(&mut builder, &block, Chain::Ethereum, 10).unwrap();
        let batch = builder.finish().unwrap();
        assert_eq!(batch.num_rows(), 2);

        let schema = batch.schema();
        let hash_col = schema.index_of("transaction_hash").unwrap();
        let hashes = batch
            .column(hash_col)
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert_eq!(hashes.value(0), "0xtx-12-0");

        let value_col = schema.index_of("value").unwrap();
        let values = batch
            .column(value_col)
            .as_any()
            .downcast_ref::<Decimal128Array>()
            .unwrap();
        assert_eq!(values.value(0), 1_000_000_000_000_000_000i128);

        let block_col = schema.index_of("block").unwrap();
        let headers = batch
            .column(block_col)
            .as_any()
            .downcast_ref::<StructArray>()
            .unwrap();
        let numbers = headers
            .column(2)
            .as_any()
            .downcast_ref::<UInt64Array>()
            .unwrap();
        assert_eq!(numbers.value(0), 12);

        let partition_col = schema.index_of("_partition_by").unwrap();
        let partitions = batch
            .column(partition_col)
            .as_any()
            .downcast_ref::<UInt64Array>()
            .unwrap();
        assert_eq!(partitions.value(0), 10);
    }

    #[test]
    fn transactions_reject_headerless_blocks() {
        let mut builder =
            RecordBuilder::new(Arc::new(schema::transaction_schema(Chain::Ethereum)));
        let mut block = ethereum_block(12, 1);
        block.header = None;

        assert!(matches!(
            transform::transform_transactions(&mut builder, &block, Chain::Ethereum, 0),
            Err(GatewayError::Transform(_)),
        ));
    }

    #[test]
    fn empty_blocks_emit_zero_transaction_rows() {
        let mut builder =
            RecordBuilder::new(Arc::new(schema::transaction_schema(Chain::Ethereum)));
        let block = ethereum_block(12, 0);

        transform::transform_transactions(&mut builder, &block, Chain::Ethereum, 0).unwrap();
        assert_eq!(builder.finish().unwrap().num_rows(), 0);
    }

    #[test]
    fn overflowing_transaction_value_is_fatal() {
        let mut builder =
            RecordBuilder::new(Arc::new(schema::transaction_schema(Chain::Ethereum)));
        let mut block = ethereum_block(12, 1);
        block.transactions[0].value = "9".repeat(39);

        assert!(matches!(
            transform::transform_transactions(&mut builder, &block, Chain::Ethereum, 0),
            Err(GatewayError::Transform(_)),
        ));
    }

    #[test]
    fn blocks_row_keys_on_header_number() {
        let mut builder = RecordBuilder::new(Arc::new(schema::block_schema(Chain::Ethereum)));
        let block = ethereum_block(42, 3);

        transform::transform_blocks(&mut builder, &block, Chain::Ethereum, 100).unwrap();
        let batch = builder.finish().unwrap();
        assert_eq!(batch.num_rows(), 1);

        let schema = batch.schema();
        let n = schema.fields().len();
        let repartition = batch
            .column(n - 1)
            .as_any()
            .downcast_ref::<UInt64Array>()
            .unwrap();
        assert_eq!(repartition.value(0), 42);

        let tx_col = schema.index_of("transactions").unwrap();
        let tx_hashes = batch
            .column(tx_col)
            .as_any()
            .downcast_ref::<ListArray>()
            .unwrap();
        assert_eq!(tx_hashes.value_length(0), 3);
    }

    #[test]
    fn streamed_blocks_key_on_event_sequence() {
        let mut builder =
            RecordBuilder::new(Arc::new(schema::streamed_blocks_schema(Chain::Ethereum)));
        let block = ethereum_block(42, 1);
        let event = event_at(7, 42);

        transform::transform_streamed_blocks(&mut builder, &block, &event, Chain::Ethereum, 5)
            .unwrap();
        let batch = builder.finish().unwrap();

        let sequences = batch
            .column(0)
            .as_any()
            .downcast_ref::<Int64Array>()
            .unwrap();
        assert_eq!(sequences.value(0), 7);

        let event_types = batch
            .column(1)
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert_eq!(event_types.value(0), "BLOCK_ADDED");

        let n = batch.num_columns();
        let partition = batch
            .column(n - 2)
            .as_any()
            .downcast_ref::<UInt64Array>()
            .unwrap();
        assert_eq!(partition.value(0), 5);
        let repartition = batch
            .column(n - 1)
            .as_any()
            .downcast_ref::<UInt64Array>()
            .unwrap();
        assert_eq!(repartition.value(0), 7);
    }

    #[test]
    fn raw_streamed_rows_embed_the_serialized_transaction() {
        let mut builder =
            RecordBuilder::new(Arc::new(schema::raw_streamed_transaction_schema()));
        let block = ethereum_block(42, 1);
        let event = event_at(3, 42);

        transform::transform_raw_streamed_transactions(&mut builder, &block, &event, 0).unwrap();
        let batch = builder.finish().unwrap();
        assert_eq!(batch.num_rows(), 1);

        let schema = batch.schema();
        let data_col = schema.index_of("transaction_data").unwrap();
        let data = batch
            .column(data_col)
            .as_any()
            .downcast_ref::<BinaryArray>()
            .unwrap();
        let decoded: blockchain_common::ethereum::EthereumTransaction =
            serde_json::from_slice(data.value(0)).unwrap();
        assert_eq!(decoded, block.transactions[0]);
    }
}
