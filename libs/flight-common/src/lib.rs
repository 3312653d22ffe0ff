//! Columnar plumbing shared by every chainflight table: a schema factory
//! that attaches column descriptions as Arrow field metadata, positional
//! appenders for writing nested rows, and the table writer that turns
//! finished record batches into a Flight data stream.

pub mod builder;
pub mod error;
pub mod schema;
pub mod writer;

pub use builder::{ListAppender, RecordAppender, RecordBuilder, StructAppender};
pub use error::{ColumnError, WriteError};
pub use schema::{decimal128_from_string, decimal128_type, SchemaFactory, DECIMAL128_PRECISION};
pub use writer::TableWriter;
