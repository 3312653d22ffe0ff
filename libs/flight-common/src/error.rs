//! Error types for the columnar layer.

use thiserror::Error;

/// Errors produced while converting scalar values into column slots.
#[derive(Error, Debug)]
pub enum ColumnError {
    /// The value is not a base-10 integer
    #[error("failed to parse decimal value: {0}")]
    InvalidDecimal(String),

    /// The value does not fit in a DECIMAL(38, 0) column
    #[error("value cannot be represented as DECIMAL(38, 0): {0}")]
    DecimalOutOfRange(String),
}

/// Errors produced while materializing or shipping record batches.
#[derive(Error, Debug)]
pub enum WriteError {
    /// A record batch could not be assembled from the column builders
    #[error("failed to build record batch: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// The receiving end of the Flight data stream is gone
    #[error("flight data stream closed by receiver")]
    StreamClosed,
}
