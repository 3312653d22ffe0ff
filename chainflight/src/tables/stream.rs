//! Event-sequence tables.
//!
//! Planning resolves the open-ended sequence range against the event
//! log's earliest and latest positions. Execution fetches events in
//! `events_per_record` mini-batches and resolves each event's block with
//! up to `parallelism` concurrent fetches. Fetches are buffered in event
//! order, so rows always come out sequenced; the first failed fetch
//! aborts the mini-batch and drops its in-flight siblings.

use arrow::datatypes::SchemaRef;
use arrow_flight::{FlightEndpoint, Ticket};
use async_trait::async_trait;
use blockchain_common::{BlockParser, BlockchainEvent, RawBlock};
use flight_common::{RecordBuilder, TableWriter};
use futures::{StreamExt, TryStreamExt};
use tracing::debug;

use crate::error::GatewayError;
use crate::metrics;
use crate::query::{GetFlightInfoCmd, StreamQuery};
use crate::session::Session;
use crate::tables::{
    Table, TableAttributes, DEFAULT_EVENTS_PER_PARTITION, DEFAULT_EVENTS_PER_RECORD,
    MAX_NUM_ENDPOINTS,
};

/// A chain event paired with the raw block it references.
#[derive(Debug, Clone)]
pub struct BlockAndEvent {
    pub event: BlockchainEvent,
    pub block: RawBlock,
}

/// Projects one event's block into rows of the table's schema.
#[async_trait]
pub trait StreamTransformer: Send + Sync {
    async fn transform_block(
        &self,
        block_and_event: &BlockAndEvent,
        parser: &dyn BlockParser,
        builder: &mut RecordBuilder,
        partition_by_size: u64,
    ) -> Result<(), GatewayError>;
}

pub struct StreamTable<T> {
    attributes: TableAttributes,
    schema: SchemaRef,
    session: Session,
    transformer: T,
    parallelism: usize,
}

struct SequenceInfo {
    start_seq: i64,
    end_seq: i64,
}

impl<T: StreamTransformer> StreamTable<T> {
    pub fn new(
        attributes: TableAttributes,
        schema: SchemaRef,
        session: Session,
        transformer: T,
        parallelism: usize,
    ) -> Self {
        Self {
            attributes,
            schema,
            session,
            transformer,
            parallelism: parallelism.max(1),
        }
    }

    /// Clamps the requested range against the event log's bounds.
    async fn sequence_info(
        &self,
        start_sequence: i64,
        end_sequence: i64,
    ) -> Result<SequenceInfo, GatewayError> {
        let earliest = self
            .session
            .event_sequence(blockchain_common::EventPosition::Earliest)
            .await?;
        let latest = self
            .session
            .event_sequence(blockchain_common::EventPosition::Latest)
            .await?;

        let mut start_seq = start_sequence;
        if start_seq > latest {
            return Err(GatewayError::invalid_argument(format!(
                "start_sequence={start_seq} must not exceed the latest event sequence {latest}",
            )));
        } else if start_seq < earliest {
            start_seq = earliest;
        }

        let mut end_seq = end_sequence;
        if end_seq < start_seq + 1 && end_seq > 0 {
            return Err(GatewayError::invalid_argument(format!(
                "end_sequence={end_seq} must be greater than start_sequence={start_seq}",
            )));
        } else if end_seq > latest + 1 || end_seq == 0 {
            end_seq = latest + 1;
        }

        Ok(SequenceInfo { start_seq, end_seq })
    }

    /// Fetches one mini-batch of events and resolves their blocks with
    /// bounded parallelism, preserving event order.
    async fn blocks_and_events(
        &self,
        start_seq: i64,
        mini_batch_size: u64,
    ) -> Result<Vec<BlockAndEvent>, GatewayError> {
        let events = self
            .session
            .chain_events(start_seq - 1, mini_batch_size)
            .await?;

        futures::stream::iter(events.into_iter().map(|event| {
            let session = self.session.clone();
            async move {
                let block = session
                    .block_with_tag(event.block.tag, event.block.height, &event.block.hash)
                    .await?;
                Ok::<_, GatewayError>(BlockAndEvent { event, block })
            }
        }))
        .buffered(self.parallelism)
        .try_collect()
        .await
    }

    fn exec_params(&self, cmd: &GetFlightInfoCmd) -> Result<(StreamQuery, u64), GatewayError> {
        let query = cmd
            .stream_query
            .as_ref()
            .ok_or_else(|| GatewayError::invalid_argument("stream_query is not provided"))?;

        if query.start_sequence >= query.end_sequence {
            return Err(GatewayError::invalid_argument(format!(
                "start_sequence={} must be less than end_sequence={}",
                query.start_sequence, query.end_sequence,
            )));
        }

        let events_per_record = if query.events_per_record > 0 {
            query.events_per_record
        } else {
            DEFAULT_EVENTS_PER_RECORD
        };

        Ok((query.clone(), events_per_record))
    }
}

#[async_trait]
impl<T: StreamTransformer> Table for StreamTable<T> {
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
        let query = cmd
            .stream_query
            .as_ref()
            .ok_or_else(|| GatewayError::invalid_argument("stream_query is not provided"))?;

        let info = self
            .sequence_info(query.start_sequence, query.end_sequence)
            .await?;

        let events_per_partition = if query.events_per_partition > 0 {
            query.events_per_partition
        } else {
            DEFAULT_EVENTS_PER_PARTITION
        };

        let num_endpoints =
            ((info.end_seq - info.start_seq + 1) as u64).div_ceil(events_per_partition);
        if num_endpoints > MAX_NUM_ENDPOINTS {
            return Err(GatewayError::invalid_argument(format!(
                "events_per_partition={events_per_partition} is too small, \
                 resulted in {num_endpoints} endpoints",
            )));
        }

        debug!(
            table = %self.attributes.table_key(),
            start_seq = info.start_seq,
            end_seq = info.end_seq,
            num_endpoints,
            "planned stream query",
        );

        let mut endpoints = Vec::with_capacity(num_endpoints as usize);
        let mut chunk_start = info.start_seq;
        while chunk_start < info.end_seq {
            let mut ticket = cmd.clone();
            let query = ticket
                .stream_query
                .as_mut()
                .ok_or_else(|| GatewayError::invalid_argument("stream_query is not provided"))?;
            query.start_sequence = chunk_start;
            query.end_sequence = (chunk_start + events_per_partition as i64).min(info.end_seq);

            endpoints.push(FlightEndpoint::new().with_ticket(Ticket::new(ticket.encode()?)));
            chunk_start += events_per_partition as i64;
        }

        Ok(endpoints)
    }

    async fn do_get(
        &self,
        cmd: &GetFlightInfoCmd,
        writer: &mut TableWriter,
    ) -> Result<(), GatewayError> {
        let (query, events_per_record) = self.exec_params(cmd)?;

        let mut events_written = 0u64;
        let mut batch_start = query.start_sequence;
        while batch_start < query.end_sequence {
            let mini_batch_size =
                (events_per_record as i64).min(query.end_sequence - batch_start) as u64;

            let pairs = self.blocks_and_events(batch_start, mini_batch_size).await?;
            for pair in &pairs {
                self.transformer
                    .transform_block(
                        pair,
                        self.session.parser(),
                        writer.record_builder(),
                        query.partition_by_size,
                    )
                    .await?;

                events_written += 1;
                if events_written >= events_per_record {
                    writer.flush().await?;
                    events_written = 0;
                }
                metrics::block_processed(self.attributes.name);
            }

            batch_start += events_per_record as i64;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, HashSet};
    use std::sync::Arc;
    use std::time::Duration;

    use arrow::array::Int64Array;
    use arrow::record_batch::RecordBatch;
    use blockchain_common::Chain;
    use tokio::sync::mpsc;

    use super::*;
    use crate::chains::ethereum;
    use crate::config::Config;
    use crate::query::StreamQuery;
    use crate::testing::{session_with, MockBlockSource};

    fn streamed_blocks_table(source: MockBlockSource, parallelism: usize) -> Arc<dyn Table> {
        let mut config = Config::for_chain(Chain::Ethereum);
        config.stream_parallelism = parallelism;
        ethereum::streamed_blocks_table(&config, &session_with(source))
    }

    fn cmd(query: StreamQuery) -> GetFlightInfoCmd {
        GetFlightInfoCmd::stream(StreamQuery {
            table: "streamed_blocks".into(),
            ..query
        })
    }

    fn decode_range(endpoint: &FlightEndpoint) -> (i64, i64) {
        let ticket = endpoint.ticket.as_ref().unwrap();
        let cmd = GetFlightInfoCmd::decode(&ticket.ticket).unwrap();
        let query = cmd.stream_query.unwrap();
        (query.start_sequence, query.end_sequence)
    }

    #[tokio::test]
    async fn plans_partitions_with_an_unequal_tail() {
        let table = streamed_blocks_table(
            MockBlockSource {
                earliest_sequence: 0,
                latest_sequence: 10,
                ..Default::default()
            },
            1,
        );
        let endpoints = table
            .get_endpoints(&cmd(StreamQuery {
                start_sequence: 0,
                end_sequence: 9,
                events_per_partition: 2,
                ..Default::default()
            }))
            .await
            .unwrap();

        let ranges: Vec<_> = endpoints.iter().map(decode_range).collect();
        assert_eq!(ranges, vec![(0, 2), (2, 4), (4, 6), (6, 8), (8, 9)]);
    }

    #[tokio::test]
    async fn clamps_to_the_event_log_bounds() {
        let table = streamed_blocks_table(
            MockBlockSource {
                earliest_sequence: 20,
                latest_sequence: 50,
                ..Default::default()
            },
            1,
        );

        // A start below the earliest is pulled up; an open end runs to
        // latest + 1.
        let endpoints = table
            .get_endpoints(&cmd(StreamQuery {
                start_sequence: 0,
                end_sequence: 0,
                events_per_partition: 100,
                ..Default::default()
            }))
            .await
            .unwrap();
        assert_eq!(decode_range(&endpoints[0]), (20, 51));

        // A start beyond the latest is rejected.
        let err = table
            .get_endpoints(&cmd(StreamQuery {
                start_sequence: 51,
                ..Default::default()
            }))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::InvalidArgument(_)));

        // A bounded end below start + 1 is rejected.
        let err = table
            .get_endpoints(&cmd(StreamQuery {
                start_sequence: 30,
                end_sequence: 30,
                ..Default::default()
            }))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn rejects_missing_stream_queries() {
        let table = streamed_blocks_table(MockBlockSource::default(), 1);
        let err = table
            .get_endpoints(&GetFlightInfoCmd::default())
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn rejects_degenerate_partition_sizes() {
        let table = streamed_blocks_table(
            MockBlockSource {
                earliest_sequence: 0,
                latest_sequence: 200_000,
                ..Default::default()
            },
            1,
        );
        let err = table
            .get_endpoints(&cmd(StreamQuery {
                start_sequence: 0,
                end_sequence: 100_000,
                events_per_partition: 1,
                ..Default::default()
            }))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::InvalidArgument(_)));
    }

    async fn collect_batches(
        table: &Arc<dyn Table>,
        query: StreamQuery,
    ) -> Result<Vec<RecordBatch>, GatewayError> {
        let (tx, mut rx) = mpsc::channel(64);
        let mut writer = TableWriter::new(table.schema().clone(), tx);
        let result = table.do_get(&cmd(query), &mut writer).await;
        if result.is_ok() {
            writer.flush().await?;
        }
        drop(writer);

        let mut batches = Vec::new();
        while let Some(item) = rx.recv().await {
            batches.push(item.unwrap());
        }
        result.map(|_| batches)
    }

    fn sequences(batches: &[RecordBatch]) -> Vec<i64> {
        let mut out = Vec::new();
        for batch in batches {
            let values = batch
                .column(0)
                .as_any()
                .downcast_ref::<Int64Array>()
                .unwrap();
            out.extend(values.iter().map(|v| v.unwrap()));
        }
        out
    }

    #[tokio::test]
    async fn parallel_fetches_preserve_event_order() {
        // Earlier events resolve slower than later ones; ordering must
        // come from the fan-out, not from fetch completion.
        let mut fetch_delays = HashMap::new();
        for height in 1..=10u64 {
            fetch_delays.insert(height, Duration::from_millis(2 * (11 - height)));
        }
        let table = streamed_blocks_table(
            MockBlockSource {
                earliest_sequence: 0,
                latest_sequence: 100,
                fetch_delays,
                ..Default::default()
            },
            4,
        );

        let batches = collect_batches(
            &table,
            StreamQuery {
                start_sequence: 1,
                end_sequence: 11,
                events_per_record: 10,
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(sequences(&batches), (1..=10).collect::<Vec<i64>>());
    }

    #[tokio::test]
    async fn one_failed_fetch_aborts_the_mini_batch() {
        let table = streamed_blocks_table(
            MockBlockSource {
                earliest_sequence: 0,
                latest_sequence: 100,
                fail_heights: HashSet::from([5]),
                ..Default::default()
            },
            4,
        );

        let err = collect_batches(
            &table,
            StreamQuery {
                start_sequence: 1,
                end_sequence: 11,
                events_per_record: 10,
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, GatewayError::Upstream(_)));
    }

    #[tokio::test]
    async fn flushes_per_record_mini_batches() {
        let table = streamed_blocks_table(
            MockBlockSource {
                earliest_sequence: 0,
                latest_sequence: 100,
                ..Default::default()
            },
            2,
        );

        let batches = collect_batches(
            &table,
            StreamQuery {
                start_sequence: 1,
                end_sequence: 8,
                events_per_record: 3,
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let rows: Vec<usize> = batches.iter().map(|b| b.num_rows()).collect();
        assert_eq!(rows, vec![3, 3, 1]);
        assert_eq!(sequences(&batches), (1..=7).collect::<Vec<i64>>());
    }

    #[tokio::test]
    async fn do_get_requires_a_bounded_range() {
        let table = streamed_blocks_table(MockBlockSource::default(), 1);
        let (tx, _rx) = mpsc::channel(1);
        let mut writer = TableWriter::new(table.schema().clone(), tx);

        let err = table
            .do_get(
                &cmd(StreamQuery {
                    start_sequence: 5,
                    end_sequence: 5,
                    ..Default::default()
                }),
                &mut writer,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::InvalidArgument(_)));
    }
}
