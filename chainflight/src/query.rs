//! Logical query descriptors and the table routing key.
//!
//! Flight descriptors and tickets carry these structs as JSON with
//! snake_case field names; unknown fields are discarded on read and
//! absent fields take their zero values, so tickets stay forward
//! compatible. A normalized query serializes back to an identical ticket.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::GatewayError;

/// Table format: how the source block is decoded before projection.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TableFormat {
    #[default]
    Native,
    Rosetta,
}

impl TableFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            TableFormat::Native => "native",
            TableFormat::Rosetta => "rosetta",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "native" => Some(TableFormat::Native),
            "rosetta" => Some(TableFormat::Rosetta),
            _ => None,
        }
    }
}

impl fmt::Display for TableFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Column encoding: `raw` tables embed the serialized source object.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    #[default]
    None,
    Raw,
}

impl Encoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            Encoding::None => "none",
            Encoding::Raw => "raw",
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The composite routing key. Rendered as
/// `table=<name>/format=<format>/encoding=<encoding>`, which is the sole
/// identity tables are registered and looked up under.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableKey {
    pub table: String,
    pub format: String,
    pub encoding: String,
}

impl TableKey {
    /// Builds a key from descriptor fields, applying the wire defaults
    /// `format=native` and `encoding=none` for absent values.
    pub fn from_parts(table: &str, format: &str, encoding: &str) -> Self {
        Self {
            table: table.to_string(),
            format: if format.is_empty() {
                TableFormat::Native.as_str().to_string()
            } else {
                format.to_string()
            },
            encoding: if encoding.is_empty() {
                Encoding::None.as_str().to_string()
            } else {
                encoding.to_string()
            },
        }
    }
}

impl fmt::Display for TableKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "table={}/format={}/encoding={}",
            self.table, self.format, self.encoding
        )
    }
}

/// Height-range query against a batch table.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BatchQuery {
    pub table: String,
    pub format: String,
    pub encoding: String,
    pub start_height: u64,
    /// Exclusive; zero means "up to the tip".
    pub end_height: u64,
    pub blocks_per_partition: u64,
    pub blocks_per_record: u64,
    pub partition_by_size: u64,
}

/// Sequence-range query against a stream table.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StreamQuery {
    pub table: String,
    pub format: String,
    pub encoding: String,
    pub start_sequence: i64,
    /// Exclusive; zero means "through the latest event".
    pub end_sequence: i64,
    pub events_per_partition: u64,
    pub events_per_record: u64,
    pub partition_by_size: u64,
}

/// Payload of `GetSchema` descriptors.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GetSchemaCmd {
    pub table: String,
    pub format: String,
    pub encoding: String,
}

impl GetSchemaCmd {
    pub fn table_key(&self) -> TableKey {
        TableKey::from_parts(&self.table, &self.format, &self.encoding)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, GatewayError> {
        serde_json::from_slice(bytes)
            .map_err(|err| GatewayError::invalid_argument(format!("failed to decode cmd: {err}")))
    }
}

/// Payload of `GetFlightInfo` descriptors and `DoGet` tickets. Exactly
/// one query variant is expected to be set.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GetFlightInfoCmd {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_query: Option<BatchQuery>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_query: Option<StreamQuery>,
}

impl GetFlightInfoCmd {
    pub fn batch(query: BatchQuery) -> Self {
        Self {
            batch_query: Some(query),
            stream_query: None,
        }
    }

    pub fn stream(query: StreamQuery) -> Self {
        Self {
            batch_query: None,
            stream_query: Some(query),
        }
    }

    pub fn table_key(&self) -> TableKey {
        if let Some(q) = &self.batch_query {
            TableKey::from_parts(&q.table, &q.format, &q.encoding)
        } else if let Some(q) = &self.stream_query {
            TableKey::from_parts(&q.table, &q.format, &q.encoding)
        } else {
            TableKey::from_parts("", "", "")
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, GatewayError> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, GatewayError> {
        serde_json::from_slice(bytes)
            .map_err(|err| GatewayError::invalid_argument(format!("failed to decode cmd: {err}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_applies_wire_defaults() {
        let key = TableKey::from_parts("blocks", "", "");
        assert_eq!(key.to_string(), "table=blocks/format=native/encoding=none");

        let key = TableKey::from_parts("streamed_transactions", "rosetta", "raw");
        assert_eq!(
            key.to_string(),
            "table=streamed_transactions/format=rosetta/encoding=raw",
        );
    }

    #[test]
    fn batch_cmd_round_trips() {
        let cmd = GetFlightInfoCmd::batch(BatchQuery {
            table: "transactions".into(),
            format: "native".into(),
            encoding: "".into(),
            start_height: 100,
            end_height: 200,
            blocks_per_partition: 50,
            blocks_per_record: 10,
            partition_by_size: 10_000,
        });

        let bytes = cmd.encode().unwrap();
        assert_eq!(GetFlightInfoCmd::decode(&bytes).unwrap(), cmd);
    }

    #[test]
    fn stream_cmd_round_trips() {
        let cmd = GetFlightInfoCmd::stream(StreamQuery {
            table: "streamed_blocks".into(),
            format: "".into(),
            encoding: "".into(),
            start_sequence: -5,
            end_sequence: 0,
            events_per_partition: 100,
            events_per_record: 20,
            partition_by_size: 0,
        });

        let bytes = cmd.encode().unwrap();
        assert_eq!(GetFlightInfoCmd::decode(&bytes).unwrap(), cmd);
    }

    #[test]
    fn decode_discards_unknown_fields() {
        let cmd = GetFlightInfoCmd::decode(
            br#"{"batch_query":{"table":"blocks","start_height":1,"end_height":2,"future_hint":true}}"#,
        )
        .unwrap();
        let query = cmd.batch_query.unwrap();
        assert_eq!(query.table, "blocks");
        assert_eq!(query.start_height, 1);
        assert_eq!(query.blocks_per_partition, 0);
    }

    #[test]
    fn decode_rejects_malformed_payloads() {
        assert!(matches!(
            GetFlightInfoCmd::decode(b"not json"),
            Err(GatewayError::InvalidArgument(_)),
        ));
    }
}
