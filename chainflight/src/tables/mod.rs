//! The table abstraction: a schema plus a planner (`get_endpoints`) and
//! an executor (`do_get`), registered under a composite routing key.

pub mod batch;
pub mod stream;

pub use batch::{BatchTable, BatchTransformer};
pub use stream::{BlockAndEvent, StreamTable, StreamTransformer};

use arrow::datatypes::SchemaRef;
use arrow_flight::FlightEndpoint;
use async_trait::async_trait;
use flight_common::TableWriter;

use crate::error::GatewayError;
use crate::query::{Encoding, GetFlightInfoCmd, TableFormat, TableKey};

pub const TABLE_BLOCKS: &str = "blocks";
pub const TABLE_TRANSACTIONS: &str = "transactions";
pub const TABLE_STREAMED_BLOCKS: &str = "streamed_blocks";
pub const TABLE_STREAMED_TRANSACTIONS: &str = "streamed_transactions";

pub(crate) const DEFAULT_BLOCKS_PER_RECORD: u64 = 1;
pub(crate) const DEFAULT_EVENTS_PER_RECORD: u64 = 1;
pub(crate) const DEFAULT_BLOCKS_PER_PARTITION: u64 = 100;
pub(crate) const DEFAULT_EVENTS_PER_PARTITION: u64 = 100;

/// Hard cap on endpoints per query; protects planners from degenerate
/// per-partition sizes.
pub(crate) const MAX_NUM_ENDPOINTS: u64 = 50_000;

/// Identity of a registered table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableAttributes {
    pub name: &'static str,
    pub format: TableFormat,
    pub encoding: Encoding,
}

impl TableAttributes {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            format: TableFormat::Native,
            encoding: Encoding::None,
        }
    }

    pub fn with_format(mut self, format: TableFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// The routing key this table registers under.
    pub fn table_key(&self) -> TableKey {
        TableKey::from_parts(self.name, self.format.as_str(), self.encoding.as_str())
    }
}

/// A queryable table.
#[async_trait]
pub trait Table: Send + Sync {
    fn attributes(&self) -> &TableAttributes;

    fn schema(&self) -> &SchemaRef;

    /// Plans the query into self-describing endpoints.
    async fn get_endpoints(
        &self,
        cmd: &GetFlightInfoCmd,
    ) -> Result<Vec<FlightEndpoint>, GatewayError>;

    /// Executes one endpoint's ticket, streaming record batches through
    /// the writer.
    async fn do_get(
        &self,
        cmd: &GetFlightInfoCmd,
        writer: &mut TableWriter,
    ) -> Result<(), GatewayError>;
}

/// Computes the bucketed `_partition_by` column value.
pub(crate) fn partition_by_number(input_number: u64, partition_by_size: u64) -> u64 {
    if partition_by_size > 0 {
        input_number / partition_by_size * partition_by_size
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attributes_default_to_native_none() {
        let attributes = TableAttributes::new(TABLE_BLOCKS);
        assert_eq!(
            attributes.table_key().to_string(),
            "table=blocks/format=native/encoding=none",
        );
    }

    #[test]
    fn attributes_render_overrides() {
        let attributes = TableAttributes::new(TABLE_STREAMED_TRANSACTIONS)
            .with_format(TableFormat::Rosetta)
            .with_encoding(Encoding::Raw);
        assert_eq!(
            attributes.table_key().to_string(),
            "table=streamed_transactions/format=rosetta/encoding=raw",
        );
    }

    #[test]
    fn partition_bucket_floors_to_size_multiples() {
        assert_eq!(partition_by_number(12_345, 1000), 12_000);
        assert_eq!(partition_by_number(999, 1000), 0);
        assert_eq!(partition_by_number(1000, 1000), 1000);
        // A zero size disables bucketing.
        assert_eq!(partition_by_number(12_345, 0), 0);
    }
}
