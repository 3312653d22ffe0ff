//! Gateway error model.
//!
//! Everything below the Flight handler returns [`GatewayError`]; the
//! handler is the single place where errors become gRPC statuses, via
//! [`GatewayError::into_status`]. Upstream failures stay opaque
//! (`anyhow::Error`) and keep whatever status the upstream client
//! attached.

use thiserror::Error;
use tonic::Status;

/// Gateway operation errors
#[derive(Error, Debug)]
pub enum GatewayError {
    /// The request is malformed: missing query variant, inverted range,
    /// too many partitions, unknown action, non-CMD descriptor
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The routed table key is not registered
    #[error("not found: {0}")]
    NotFound(String),

    /// The client went away while a DoGet stream was being written
    #[error("client stream closed")]
    ClientStreamClosed,

    /// The request was canceled
    #[error("request canceled")]
    Canceled,

    /// The block store or parser failed
    #[error(transparent)]
    Upstream(#[from] anyhow::Error),

    /// A transformer rejected the source block
    #[error("transform error: {0}")]
    Transform(String),

    /// A scalar value could not be projected into its column
    #[error(transparent)]
    Column(#[from] flight_common::ColumnError),

    /// Record batch assembly or schema serialization failed
    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// A cmd or ticket payload could not be serialized
    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),

    /// Anything else
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<flight_common::WriteError> for GatewayError {
    fn from(err: flight_common::WriteError) -> Self {
        match err {
            flight_common::WriteError::StreamClosed => GatewayError::ClientStreamClosed,
            flight_common::WriteError::Arrow(err) => GatewayError::Arrow(err),
        }
    }
}

impl GatewayError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        GatewayError::InvalidArgument(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        GatewayError::NotFound(msg.into())
    }

    /// Maps the error chain onto a gRPC status. The message keeps the
    /// full chain so operators can see where a request died.
    pub fn into_status(self) -> Status {
        match self {
            GatewayError::InvalidArgument(_) => {
                Status::invalid_argument(format!("invalid request parameter: {self}"))
            }
            GatewayError::NotFound(_) => Status::not_found(format!("not found: {self}")),
            GatewayError::ClientStreamClosed => Status::cancelled("client stream closed"),
            GatewayError::Canceled => Status::cancelled("request canceled"),
            GatewayError::Upstream(err) => {
                // Upstream clients surface typed statuses; keep their code.
                if let Some(status) = err.downcast_ref::<Status>() {
                    Status::new(status.code(), format!("{}: {err:#}", status.code()))
                } else {
                    Status::internal(format!("internal error: {err:#}"))
                }
            }
            other => Status::internal(format!("internal error: {other}")),
        }
    }
}
