//! The Bitcoin table set: height-range blocks and transactions.

pub mod schema;
pub mod transform;

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use blockchain_common::bitcoin::BitcoinBlock;
use blockchain_common::{BlockParser, RawBlock};
use flight_common::RecordBuilder;

use crate::config::Config;
use crate::error::GatewayError;
use crate::session::Session;
use crate::tables::{
    BatchTable, BatchTransformer, Table, TableAttributes, TABLE_BLOCKS, TABLE_TRANSACTIONS,
};

pub fn tables(_config: &Config, session: &Session) -> Vec<Arc<dyn Table>> {
    vec![transactions_table(session), blocks_table(session)]
}

pub fn transactions_table(session: &Session) -> Arc<dyn Table> {
    Arc::new(BatchTable::new(
        TableAttributes::new(TABLE_TRANSACTIONS),
        Arc::new(schema::transaction_schema()),
        session.clone(),
        TransactionsTransformer,
    ))
}

pub fn blocks_table(session: &Session) -> Arc<dyn Table> {
    Arc::new(BatchTable::new(
        TableAttributes::new(TABLE_BLOCKS),
        Arc::new(schema::block_schema()),
        session.clone(),
        BlocksTransformer,
    ))
}

async fn parse_bitcoin_block(
    parser: &dyn BlockParser,
    block: &RawBlock,
) -> Result<BitcoinBlock, GatewayError> {
    let native = parser
        .parse_native_block(block)
        .await
        .context("failed to parse raw block to native block")
        .map_err(GatewayError::Upstream)?;
    native.bitcoin().cloned().ok_or_else(|| {
        GatewayError::Transform("failed to extract bitcoin block from native block".to_string())
    })
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
        let bitcoin = parse_bitcoin_block(parser, block).await?;
        transform::transform_transactions(builder, &bitcoin, partition_by_size)
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
        let bitcoin = parse_bitcoin_block(parser, block).await?;
        transform::transform_blocks(builder, &bitcoin, partition_by_size)
    }
}

#[cfg(test)]
mod tests {
    use arrow::array::{Array, BooleanArray, ListArray, StringArray, StructArray, UInt64Array};
    use blockchain_common::bitcoin::{
        BitcoinHeader, BitcoinScriptPublicKey, BitcoinTransaction, BitcoinTransactionInput,
        BitcoinTransactionOutput,
    };

    use super::*;

    fn bitcoin_block(height: u64) -> BitcoinBlock {
        BitcoinBlock {
            header: Some(BitcoinHeader {
                hash: format!("hash-{height}"),
                height,
                number_of_transactions: 1,
                time: 1_600_000_000,
                ..Default::default()
            }),
            transactions: vec![BitcoinTransaction {
                transaction_id: format!("txid-{height}"),
                hash: format!("wtxid-{height}"),
                is_coinbase: true,
                input_count: 1,
                output_count: 1,
                inputs: vec![BitcoinTransactionInput {
                    coinbase: "0xc0ffee".to_string(),
                    from_output: Some(BitcoinTransactionOutput {
                        index: 0,
                        value: 5_000_000_000,
                        script_public_key: Some(BitcoinScriptPublicKey {
                            address: "bc1qexample".to_string(),
                            script_type: "witness_v0_keyhash".to_string(),
                            ..Default::default()
                        }),
                    }),
                    ..Default::default()
                }],
                outputs: vec![BitcoinTransactionOutput {
                    index: 0,
                    value: 5_000_000_000,
                    script_public_key: None,
                }],
                ..Default::default()
            }],
        }
    }

    #[test]
    fn transactions_key_on_the_id_not_the_hash() {
        let mut builder = RecordBuilder::new(Arc::new(schema::transaction_schema()));
        transform::transform_transactions(&mut builder, &bitcoin_block(800_000), 1000).unwrap();

        let batch = builder.finish().unwrap();
        assert_eq!(batch.num_rows(), 1);
        let hashes = batch
            .column(0)
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert_eq!(hashes.value(0), "txid-800000");

        let coinbase_col = batch.schema().index_of("is_coinbase").unwrap();
        let coinbase = batch
            .column(coinbase_col)
            .as_any()
            .downcast_ref::<BooleanArray>()
            .unwrap();
        assert!(coinbase.value(0));

        let inputs_col = batch.schema().index_of("inputs").unwrap();
        let inputs = batch
            .column(inputs_col)
            .as_any()
            .downcast_ref::<ListArray>()
            .unwrap();
        assert_eq!(inputs.value_length(0), 1);
        let input_structs = inputs.values();
        let input_struct = input_structs.as_any().downcast_ref::<StructArray>().unwrap();
        let spent_values = input_struct
            .column(10)
            .as_any()
            .downcast_ref::<UInt64Array>()
            .unwrap();
        assert_eq!(spent_values.value(0), 5_000_000_000);
    }

    #[test]
    fn blocks_emit_one_row_even_without_transactions() {
        let mut builder = RecordBuilder::new(Arc::new(schema::block_schema()));
        let mut block = bitcoin_block(800_000);
        block.transactions.clear();

        transform::transform_blocks(&mut builder, &block, 0).unwrap();
        assert_eq!(builder.finish().unwrap().num_rows(), 1);
    }

    #[test]
    fn headerless_blocks_are_fatal() {
        let mut builder = RecordBuilder::new(Arc::new(schema::block_schema()));
        let block = BitcoinBlock::default();

        assert!(matches!(
            transform::transform_blocks(&mut builder, &block, 0),
            Err(GatewayError::Transform(_)),
        ));
    }
}
