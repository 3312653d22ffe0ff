//! The per-request table writer.
//!
//! A writer is created for a single `DoGet` invocation. It owns the
//! request's [`RecordBuilder`]; `flush` materializes the pending rows into
//! a record batch and hands it to the Flight data stream feeding the
//! client. Dropping the writer closes the stream.

use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use tokio::sync::mpsc;
use tonic::Status;
use tracing::debug;

use crate::builder::RecordBuilder;
use crate::error::WriteError;

pub struct TableWriter {
    builder: RecordBuilder,
    tx: mpsc::Sender<Result<RecordBatch, Status>>,
}

impl TableWriter {
    pub fn new(schema: SchemaRef, tx: mpsc::Sender<Result<RecordBatch, Status>>) -> Self {
        Self {
            builder: RecordBuilder::new(schema),
            tx,
        }
    }

    pub fn record_builder(&mut self) -> &mut RecordBuilder {
        &mut self.builder
    }

    /// Materializes the rows appended since the last flush and ships them.
    ///
    /// Fails with [`WriteError::StreamClosed`] once the client has gone
    /// away and the receiving half of the stream is dropped.
    pub async fn flush(&mut self) -> Result<(), WriteError> {
        let batch = self.builder.finish()?;
        debug!(rows = batch.num_rows(), "writing record batch");
        self.tx
            .send(Ok(batch))
            .await
            .map_err(|_| WriteError::StreamClosed)
    }

    /// Terminates the stream with the given status. Pending rows are
    /// discarded.
    pub async fn fail(self, status: Status) {
        let _ = self.tx.send(Err(status)).await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use arrow::datatypes::DataType;

    use super::*;
    use crate::schema::SchemaFactory;

    fn test_schema() -> SchemaRef {
        let f = SchemaFactory::new();
        Arc::new(f.new_schema(vec![f.new_field(
            "number",
            DataType::UInt64,
            "row number",
        )]))
    }

    #[tokio::test]
    async fn flush_ships_pending_rows() {
        let (tx, mut rx) = mpsc::channel(1);
        let mut writer = TableWriter::new(test_schema(), tx);

        writer.record_builder().appender().append_u64(9).build();
        writer.flush().await.unwrap();

        let batch = rx.recv().await.unwrap().unwrap();
        assert_eq!(batch.num_rows(), 1);
    }

    #[tokio::test]
    async fn flush_fails_once_receiver_is_gone() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let mut writer = TableWriter::new(test_schema(), tx);
        writer.record_builder().appender().append_u64(1).build();

        assert!(matches!(
            writer.flush().await,
            Err(WriteError::StreamClosed)
        ));
    }

    #[tokio::test]
    async fn fail_forwards_the_status() {
        let (tx, mut rx) = mpsc::channel(1);
        let writer = TableWriter::new(test_schema(), tx);

        writer.fail(Status::internal("boom")).await;
        let err = rx.recv().await.unwrap().unwrap_err();
        assert_eq!(err.code(), tonic::Code::Internal);
    }
}
