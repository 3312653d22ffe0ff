//! Table set for EVM chains whose values overflow u64 (BSC, Arbitrum).
//!
//! Big values are served as strings; blocks and the raw streamed table
//! come straight from the Ethereum family.

pub mod schema;
pub mod transform;

use std::sync::Arc;

use async_trait::async_trait;
use blockchain_common::{BlockParser, Chain, RawBlock};
use flight_common::RecordBuilder;

use crate::config::Config;
use crate::error::GatewayError;
use crate::session::Session;
use crate::tables::{
    BatchTable, BatchTransformer, BlockAndEvent, StreamTable, StreamTransformer, Table,
    TableAttributes, TABLE_STREAMED_TRANSACTIONS, TABLE_TRANSACTIONS,
};

use super::ethereum::{
    blocks_table, parse_ethereum_block, raw_streamed_transactions_table, streamed_blocks_table,
};

/// All tables the family offers; the controller filters by format.
pub fn tables(config: &Config, session: &Session) -> Vec<Arc<dyn Table>> {
    vec![
        transactions_table(config, session),
        blocks_table(config, session),
        streamed_transactions_table(config, session),
        streamed_blocks_table(config, session),
        raw_streamed_transactions_table(config, session),
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

pub fn streamed_transactions_table(config: &Config, session: &Session) -> Arc<dyn Table> {
    Arc::new(StreamTable::new(
        TableAttributes::new(TABLE_STREAMED_TRANSACTIONS),
        Arc::new(schema::streamed_transaction_schema(config.chain)),
        session.clone(),
        StreamedTransactionsTransformer { chain: config.chain },
        config.stream_parallelism,
    ))
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

#[cfg(test)]
mod tests {
    use arrow::array::StringArray;

    use super::*;
    use crate::testing::ethereum_block;

    #[test]
    fn overflowing_values_project_as_strings() {
        let mut builder =
            RecordBuilder::new(Arc::new(schema::transaction_schema(Chain::BinanceSmartChain)));
        let mut block = ethereum_block(12, 1);
        // 2^192, far beyond both u64 and DECIMAL(38, 0).
        let big = "6277101735386680763835789423207666416102355444464034512896";
        block.transactions[0].value = big.to_string();

        transform::transform_transactions(
            &mut builder,
            &block,
            Chain::BinanceSmartChain,
            0,
        )
        .unwrap();
        let batch = builder.finish().unwrap();

        let value_col = batch.schema().index_of("value_string").unwrap();
        let values = batch
            .column(value_col)
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert_eq!(values.value(0), big);
    }

    #[test]
    fn ethereum_raw_family_reuses_ethereum_block_tables() {
        let config = Config::for_chain(Chain::Arbitrum);
        let session = crate::testing::mock_session();
        let tables = tables(&config, &session);

        let keys: Vec<String> = tables
            .iter()
            .map(|t| t.attributes().table_key().to_string())
            .collect();
        assert!(keys.contains(&"table=blocks/format=native/encoding=none".to_string()));
        assert!(keys.contains(&"table=streamed_blocks/format=native/encoding=none".to_string()));
        assert!(keys
            .contains(&"table=streamed_transactions/format=native/encoding=raw".to_string()));
    }
}
