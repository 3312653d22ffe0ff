//! The Arrow Flight server surface.
//!
//! Routing is by the composite key rendered from the query descriptor:
//! `table=<name>/format=<format>/encoding=<encoding>`. Schemas are
//! IPC-serialized once at startup. Every method reports metrics and maps
//! its error chain through [`GatewayError::into_status`], the single
//! error choke point.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use arrow_flight::encode::FlightDataEncoderBuilder;
use arrow_flight::error::FlightError;
use arrow_flight::flight_service_server::FlightService;
use arrow_flight::{
    flight_descriptor::DescriptorType, Action, ActionType, Criteria, Empty, FlightData,
    FlightDescriptor, FlightInfo, HandshakeRequest, HandshakeResponse, PollInfo, PutResult,
    SchemaAsIpc, SchemaResult, Ticket,
};
use arrow::ipc::writer::IpcWriteOptions;
use bytes::Bytes;
use flight_common::TableWriter;
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::{Request, Response, Status};
use tracing::{info, warn};

use crate::chains::Controller;
use crate::error::GatewayError;
use crate::metrics::MethodTimer;
use crate::query::{GetFlightInfoCmd, GetSchemaCmd, TableKey};
use crate::session::Session;
use crate::tables::Table;

const ACTION_TIP: &str = "TIP";
const ACTION_EARLIEST: &str = "EARLIEST";
const ACTION_STREAM_TIP: &str = "STREAM_TIP";
const ACTION_STREAM_EARLIEST: &str = "STREAM_EARLIEST";

/// How many finished record batches may sit between the executor and the
/// gRPC sender before the executor backpressures.
const BATCH_CHANNEL_CAPACITY: usize = 2;

pub struct FlightHandler {
    tables: HashMap<String, Arc<dyn Table>>,
    serialized_schemas: HashMap<String, Bytes>,
    session: Session,
}

impl FlightHandler {
    pub fn new(controller: &Controller, session: Session) -> Result<Self, GatewayError> {
        let registered = controller.tables();
        if registered.is_empty() {
            return Err(GatewayError::Internal("tables is empty".to_string()));
        }

        let mut tables = HashMap::with_capacity(registered.len());
        let mut serialized_schemas = HashMap::with_capacity(registered.len());
        for table in registered {
            let key = table.attributes().table_key().to_string();
            if tables.contains_key(&key) {
                return Err(GatewayError::Internal(format!(
                    "found duplicated table names: {key}",
                )));
            }

            let options = IpcWriteOptions::default();
            let message: arrow_flight::IpcMessage =
                SchemaAsIpc::new(table.schema().as_ref(), &options).try_into()?;
            serialized_schemas.insert(key.clone(), message.0);
            tables.insert(key, table.clone());
        }

        Ok(Self {
            tables,
            serialized_schemas,
            session,
        })
    }

    fn table(&self, key: &TableKey) -> Result<Arc<dyn Table>, GatewayError> {
        self.tables
            .get(&key.to_string())
            .cloned()
            .ok_or_else(|| GatewayError::not_found(format!("table({key})")))
    }

    fn serialized_schema(&self, key: &TableKey) -> Result<Bytes, GatewayError> {
        self.serialized_schemas
            .get(&key.to_string())
            .cloned()
            .ok_or_else(|| GatewayError::not_found(format!("schema for table({key})")))
    }

    /// Runs one handler method: counts it, times it, and maps the error
    /// chain to a gRPC status.
    async fn instrumented<T, F>(&self, method: &'static str, fut: F) -> Result<T, Status>
    where
        F: Future<Output = Result<T, GatewayError>>,
    {
        let timer = MethodTimer::start(method);
        match fut.await {
            Ok(value) => {
                timer.finish(true);
                Ok(value)
            }
            Err(err) => {
                timer.finish(false);
                let status = err.into_status();
                warn!(method, code = ?status.code(), message = status.message(), "request failed");
                Err(status)
            }
        }
    }

    fn require_cmd_descriptor(descriptor: &FlightDescriptor) -> Result<(), GatewayError> {
        if descriptor.r#type != DescriptorType::Cmd as i32 {
            return Err(GatewayError::invalid_argument(format!(
                "invalid descriptor type({})",
                descriptor.r#type,
            )));
        }
        Ok(())
    }
}

#[tonic::async_trait]
impl FlightService for FlightHandler {
    type HandshakeStream = BoxStream<'static, Result<HandshakeResponse, Status>>;
    type ListFlightsStream = BoxStream<'static, Result<FlightInfo, Status>>;
    type DoGetStream = BoxStream<'static, Result<FlightData, Status>>;
    type DoPutStream = BoxStream<'static, Result<PutResult, Status>>;
    type DoActionStream = BoxStream<'static, Result<arrow_flight::Result, Status>>;
    type ListActionsStream = BoxStream<'static, Result<ActionType, Status>>;
    type DoExchangeStream = BoxStream<'static, Result<FlightData, Status>>;

    async fn handshake(
        &self,
        _request: Request<tonic::Streaming<HandshakeRequest>>,
    ) -> Result<Response<Self::HandshakeStream>, Status> {
        Err(Status::unimplemented("handshake is not supported"))
    }

    async fn list_flights(
        &self,
        _request: Request<Criteria>,
    ) -> Result<Response<Self::ListFlightsStream>, Status> {
        self.instrumented("list_flights", async {
            let mut flights = Vec::with_capacity(self.serialized_schemas.len());
            for (key, schema) in &self.serialized_schemas {
                let mut info = FlightInfo::new()
                    .with_descriptor(FlightDescriptor::new_path(vec![key.clone()]))
                    .with_total_records(-1)
                    .with_total_bytes(-1);
                info.schema = schema.clone();
                flights.push(Ok(info));
            }
            Ok(futures::stream::iter(flights).boxed())
        })
        .await
        .map(Response::new)
    }

    async fn get_schema(
        &self,
        request: Request<FlightDescriptor>,
    ) -> Result<Response<SchemaResult>, Status> {
        self.instrumented("get_schema", async {
            let descriptor = request.into_inner();
            Self::require_cmd_descriptor(&descriptor)?;

            let cmd = GetSchemaCmd::decode(&descriptor.cmd)?;
            let schema = self.serialized_schema(&cmd.table_key())?;
            Ok(SchemaResult { schema })
        })
        .await
        .map(Response::new)
    }

    async fn get_flight_info(
        &self,
        request: Request<FlightDescriptor>,
    ) -> Result<Response<FlightInfo>, Status> {
        self.instrumented("get_flight_info", async {
            let descriptor = request.into_inner();
            Self::require_cmd_descriptor(&descriptor)?;

            let cmd = GetFlightInfoCmd::decode(&descriptor.cmd)?;
            let key = cmd.table_key();
            info!(table = %key, "decoded cmd");

            let table = self.table(&key)?;
            let schema = self.serialized_schema(&key)?;
            let endpoints = table.get_endpoints(&cmd).await?;

            let mut info = FlightInfo::new()
                .with_descriptor(descriptor)
                .with_total_records(-1)
                .with_total_bytes(-1);
            info.schema = schema;
            for endpoint in endpoints {
                info = info.with_endpoint(endpoint);
            }
            Ok(info)
        })
        .await
        .map(Response::new)
    }

    async fn do_get(
        &self,
        request: Request<Ticket>,
    ) -> Result<Response<Self::DoGetStream>, Status> {
        self.instrumented("do_get", async {
            let ticket = request.into_inner();
            let cmd = if ticket.ticket.is_empty() {
                GetFlightInfoCmd::default()
            } else {
                GetFlightInfoCmd::decode(&ticket.ticket)?
            };
            let key = cmd.table_key();
            info!(table = %key, "decoded ticket");

            let table = self.table(&key)?;
            let schema = table.schema().clone();

            let (tx, rx) = mpsc::channel(BATCH_CHANNEL_CAPACITY);
            let mut writer = TableWriter::new(schema.clone(), tx);
            let table_key = key.to_string();
            tokio::spawn(async move {
                match execute_do_get(table, &cmd, &mut writer).await {
                    Ok(()) => {}
                    Err(err) => {
                        warn!(table = %table_key, error = %err, "do_get aborted");
                        writer.fail(err.into_status()).await;
                    }
                }
            });

            let batches = ReceiverStream::new(rx).map(|item| item.map_err(FlightError::from));
            let stream = FlightDataEncoderBuilder::new()
                .with_schema(schema)
                .build(batches)
                .map_err(Status::from)
                .boxed();
            Ok(stream)
        })
        .await
        .map(Response::new)
    }

    async fn do_put(
        &self,
        _request: Request<tonic::Streaming<FlightData>>,
    ) -> Result<Response<Self::DoPutStream>, Status> {
        Err(Status::unimplemented("do_put is not supported"))
    }

    async fn do_action(
        &self,
        request: Request<Action>,
    ) -> Result<Response<Self::DoActionStream>, Status> {
        self.instrumented("do_action", async {
            let action = request.into_inner();
            let body = match action.r#type.as_str() {
                ACTION_TIP => self.session.tip_height().await?.to_string(),
                ACTION_EARLIEST => self.session.start_height().await?.to_string(),
                ACTION_STREAM_TIP => self
                    .session
                    .event_sequence(blockchain_common::EventPosition::Latest)
                    .await?
                    .to_string(),
                ACTION_STREAM_EARLIEST => self
                    .session
                    .event_sequence(blockchain_common::EventPosition::Earliest)
                    .await?
                    .to_string(),
                other => {
                    return Err(GatewayError::invalid_argument(format!(
                        "unsupported action type({other})",
                    )))
                }
            };

            let result = arrow_flight::Result {
                body: Bytes::from(body),
            };
            Ok(futures::stream::iter([Ok(result)]).boxed())
        })
        .await
        .map(Response::new)
    }

    async fn list_actions(
        &self,
        _request: Request<Empty>,
    ) -> Result<Response<Self::ListActionsStream>, Status> {
        Err(Status::unimplemented("list_actions is not supported"))
    }

    async fn do_exchange(
        &self,
        _request: Request<tonic::Streaming<FlightData>>,
    ) -> Result<Response<Self::DoExchangeStream>, Status> {
        Err(Status::unimplemented("do_exchange is not supported"))
    }

    async fn poll_flight_info(
        &self,
        _request: Request<FlightDescriptor>,
    ) -> Result<Response<PollInfo>, Status> {
        Err(Status::unimplemented("poll_flight_info is not supported"))
    }
}

/// Runs a ticket to completion: executes the table, then flushes the
/// final partial record. On failure nothing further is flushed.
async fn execute_do_get(
    table: Arc<dyn Table>,
    cmd: &GetFlightInfoCmd,
    writer: &mut TableWriter,
) -> Result<(), GatewayError> {
    table.do_get(cmd, writer).await?;
    writer.flush().await?;
    Ok(())
}
