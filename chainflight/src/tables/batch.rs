//! Height-range tables.
//!
//! Planning clamps the requested range against the chain's start height
//! and tip, then cuts it into per-partition endpoints. Execution walks
//! the ticket's range in `blocks_per_record` chunks: one bulk fetch per
//! chunk, one transformer invocation per block, one flush per record.

use arrow::datatypes::SchemaRef;
use arrow_flight::{FlightEndpoint, Ticket};
use async_trait::async_trait;
use blockchain_common::{BlockParser, RawBlock};
use flight_common::{RecordBuilder, TableWriter};
use tracing::debug;

use crate::error::GatewayError;
use crate::metrics;
use crate::query::{BatchQuery, GetFlightInfoCmd};
use crate::session::Session;
use crate::tables::{
    Table, TableAttributes, DEFAULT_BLOCKS_PER_PARTITION, DEFAULT_BLOCKS_PER_RECORD,
    MAX_NUM_ENDPOINTS,
};

/// Projects one parsed block into rows of the table's schema.
#[async_trait]
pub trait BatchTransformer: Send + Sync {
    async fn transform_block(
        &self,
        block: &RawBlock,
        parser: &dyn BlockParser,
        builder: &mut RecordBuilder,
        partition_by_size: u64,
    ) -> Result<(), GatewayError>;
}

pub struct BatchTable<T> {
    attributes: TableAttributes,
    schema: SchemaRef,
    session: Session,
    transformer: T,
}

impl<T: BatchTransformer> BatchTable<T> {
    pub fn new(
        attributes: TableAttributes,
        schema: SchemaRef,
        session: Session,
        transformer: T,
    ) -> Self {
        Self {
            attributes,
            schema,
            session,
            transformer,
        }
    }

    /// Normalizes a planning query into `(start, end, blocks_per_partition)`.
    async fn plan_params(&self, cmd: &GetFlightInfoCmd) -> Result<(u64, u64, u64), GatewayError> {
        let query = cmd
            .batch_query
            .as_ref()
            .ok_or_else(|| GatewayError::invalid_argument("batch_query is not provided"))?;

        let blocks_per_partition = if query.blocks_per_partition > 0 {
            query.blocks_per_partition
        } else {
            DEFAULT_BLOCKS_PER_PARTITION
        };

        let meta = self.session.static_chain_metadata().await?;
        let start_height = query.start_height.max(meta.block_start_height);

        let end_height = if query.end_height == 0 {
            self.session.tip_height().await?
        } else {
            query.end_height
        };

        if end_height <= start_height {
            return Err(GatewayError::invalid_argument(format!(
                "start_height={start_height} must be less than end_height={end_height}",
            )));
        }

        Ok((start_height, end_height, blocks_per_partition))
    }

    fn exec_params(&self, cmd: &GetFlightInfoCmd) -> Result<(BatchQuery, u64), GatewayError> {
        let query = cmd
            .batch_query
            .as_ref()
            .ok_or_else(|| GatewayError::invalid_argument("batch_query is not provided"))?;

        if query.end_height <= query.start_height {
            return Err(GatewayError::invalid_argument(format!(
                "start_height={} must be less than end_height={}",
                query.start_height, query.end_height,
            )));
        }

        let blocks_per_record = if query.blocks_per_record > 0 {
            query.blocks_per_record
        } else {
            DEFAULT_BLOCKS_PER_RECORD
        };

        Ok((query.clone(), blocks_per_record))
    }
}

#[async_trait]
impl<T: BatchTransformer> Table for BatchTable<T> {
    fn attributes(&self) -> &TableAttributes {
        &self.attributes
    }

    fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    async fn get_endpoints(
        &self,
        cmd: &GetFlightInfoCmd,
    ) -> Result<Vec<FlightEndpoint>, GatewayError> {
        let (start_height, end_height, blocks_per_partition) = self.plan_params(cmd).await?;

        let num_endpoints = (end_height - start_height).div_ceil(blocks_per_partition);
        if num_endpoints > MAX_NUM_ENDPOINTS {
            return Err(GatewayError::invalid_argument(format!(
                "blocks_per_partition={blocks_per_partition} is too small, \
                 resulted in {num_endpoints} endpoints",
            )));
        }

        debug!(
            table = %self.attributes.table_key(),
            start_height,
            end_height,
            num_endpoints,
            "planned batch query",
        );

        let mut endpoints = Vec::with_capacity(num_endpoints as usize);
        let mut chunk_start = start_height;
        while chunk_start < end_height {
            let mut ticket = cmd.clone();
            let query = ticket
                .batch_query
                .as_mut()
                .ok_or_else(|| GatewayError::invalid_argument("batch_query is not provided"))?;
            query.start_height = chunk_start;
            query.end_height = (chunk_start + blocks_per_partition).min(end_height);

            endpoints.push(FlightEndpoint::new().with_ticket(Ticket::new(ticket.encode()?)));
            chunk_start += blocks_per_partition;
        }

        Ok(endpoints)
    }

    async fn do_get(
        &self,
        cmd: &GetFlightInfoCmd,
        writer: &mut TableWriter,
    ) -> Result<(), GatewayError> {
        let (query, blocks_per_record) = self.exec_params(cmd)?;

        let mut blocks_written = 0u64;
        let mut chunk_start = query.start_height;
        while chunk_start < query.end_height {
            let chunk_end = (chunk_start + blocks_per_record).min(query.end_height);

            let blocks = self.session.blocks_by_range(chunk_start, chunk_end).await?;
            for block in &blocks {
                self.transformer
                    .transform_block(
                        block,
                        self.session.parser(),
                        writer.record_builder(),
                        query.partition_by_size,
                    )
                    .await?;

                blocks_written += 1;
                if blocks_written >= blocks_per_record {
                    writer.flush().await?;
                    blocks_written = 0;
                }
                metrics::block_processed(self.attributes.name);
            }

            chunk_start += blocks_per_record;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use arrow::array::UInt64Array;
    use arrow::record_batch::RecordBatch;
    use blockchain_common::{Chain, ChainMetadata};
    use tokio::sync::mpsc;

    use super::*;
    use crate::chains::ethereum;
    use crate::config::Config;
    use crate::query::BatchQuery;
    use crate::testing::{session_with, MockBlockSource};

    fn blocks_table(source: MockBlockSource) -> Arc<dyn Table> {
        let config = Config::for_chain(Chain::Ethereum);
        ethereum::blocks_table(&config, &session_with(source))
    }

    fn cmd(query: BatchQuery) -> GetFlightInfoCmd {
        GetFlightInfoCmd::batch(BatchQuery {
            table: "blocks".into(),
            ..query
        })
    }

    fn decode_range(endpoint: &FlightEndpoint) -> (u64, u64) {
        let ticket = endpoint.ticket.as_ref().unwrap();
        let cmd = GetFlightInfoCmd::decode(&ticket.ticket).unwrap();
        let query = cmd.batch_query.unwrap();
        (query.start_height, query.end_height)
    }

    #[tokio::test]
    async fn plans_a_single_endpoint() {
        let table = blocks_table(MockBlockSource::default());
        let endpoints = table
            .get_endpoints(&cmd(BatchQuery {
                start_height: 100,
                end_height: 200,
                blocks_per_partition: 100,
                ..Default::default()
            }))
            .await
            .unwrap();

        assert_eq!(endpoints.len(), 1);
        assert_eq!(decode_range(&endpoints[0]), (100, 200));
    }

    #[tokio::test]
    async fn clamps_to_the_chain_start_height() {
        let table = blocks_table(MockBlockSource {
            metadata: ChainMetadata {
                block_start_height: 50,
                irreversible_distance: 0,
            },
            ..Default::default()
        });
        let endpoints = table
            .get_endpoints(&cmd(BatchQuery {
                start_height: 0,
                end_height: 150,
                blocks_per_partition: 100,
                ..Default::default()
            }))
            .await
            .unwrap();

        assert_eq!(endpoints.len(), 1);
        assert_eq!(decode_range(&endpoints[0]), (50, 150));
    }

    #[tokio::test]
    async fn open_ended_queries_stop_at_the_tip() {
        let table = blocks_table(MockBlockSource {
            metadata: ChainMetadata {
                block_start_height: 0,
                irreversible_distance: 100,
            },
            latest_block: 1_000,
            ..Default::default()
        });
        let endpoints = table
            .get_endpoints(&cmd(BatchQuery {
                start_height: 0,
                end_height: 0,
                blocks_per_partition: 500,
                ..Default::default()
            }))
            .await
            .unwrap();

        let ranges: Vec<_> = endpoints.iter().map(decode_range).collect();
        assert_eq!(ranges, vec![(0, 500), (500, 900)]);
    }

    #[tokio::test]
    async fn partitions_cover_the_range_exactly() {
        let table = blocks_table(MockBlockSource::default());
        let endpoints = table
            .get_endpoints(&cmd(BatchQuery {
                start_height: 7,
                end_height: 260,
                blocks_per_partition: 64,
                ..Default::default()
            }))
            .await
            .unwrap();

        let ranges: Vec<_> = endpoints.iter().map(decode_range).collect();
        let covered: u64 = ranges.iter().map(|(s, e)| e - s).sum();
        assert_eq!(covered, 260 - 7);
        for window in ranges.windows(2) {
            assert_eq!(window[0].1, window[1].0);
        }
        for (start, end) in &ranges {
            assert!(end - start <= 64);
            assert!(*end <= 260);
        }
    }

    #[tokio::test]
    async fn rejects_missing_and_inverted_queries() {
        let table = blocks_table(MockBlockSource::default());

        let err = table
            .get_endpoints(&GetFlightInfoCmd::default())
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::InvalidArgument(_)));

        let err = table
            .get_endpoints(&cmd(BatchQuery {
                start_height: 200,
                end_height: 100,
                ..Default::default()
            }))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn rejects_degenerate_partition_sizes() {
        let table = blocks_table(MockBlockSource {
            latest_block: 200_000,
            ..Default::default()
        });
        let err = table
            .get_endpoints(&cmd(BatchQuery {
                start_height: 0,
                end_height: 100_000,
                blocks_per_partition: 1,
                ..Default::default()
            }))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::InvalidArgument(_)));
    }

    async fn collect_batches(table: &Arc<dyn Table>, query: BatchQuery) -> Vec<RecordBatch> {
        let (tx, mut rx) = mpsc::channel(64);
        let mut writer = TableWriter::new(table.schema().clone(), tx);
        table.do_get(&cmd(query), &mut writer).await.unwrap();
        writer.flush().await.unwrap();
        drop(writer);

        let mut batches = Vec::new();
        while let Some(item) = rx.recv().await {
            batches.push(item.unwrap());
        }
        batches
    }

    #[tokio::test]
    async fn executes_in_record_sized_chunks() {
        let table = blocks_table(MockBlockSource::default());
        let batches = collect_batches(
            &table,
            BatchQuery {
                start_height: 10,
                end_height: 15,
                blocks_per_record: 2,
                ..Default::default()
            },
        )
        .await;

        let rows: Vec<usize> = batches.iter().map(|b| b.num_rows()).collect();
        // Two full records, then the remainder via the final flush.
        assert_eq!(rows, vec![2, 2, 1]);

        let mut numbers = Vec::new();
        for batch in &batches {
            let column = batch.schema().index_of("number").unwrap();
            let values = batch
                .column(column)
                .as_any()
                .downcast_ref::<UInt64Array>()
                .unwrap();
            numbers.extend(values.iter().map(|v| v.unwrap()));
        }
        assert_eq!(numbers, vec![10, 11, 12, 13, 14]);
    }

    #[tokio::test]
    async fn do_get_rejects_open_ranges() {
        let table = blocks_table(MockBlockSource::default());
        let (tx, _rx) = mpsc::channel(1);
        let mut writer = TableWriter::new(table.schema().clone(), tx);

        let err = table
            .do_get(
                &cmd(BatchQuery {
                    start_height: 5,
                    end_height: 0,
                    ..Default::default()
                }),
                &mut writer,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::InvalidArgument(_)));
    }
}
