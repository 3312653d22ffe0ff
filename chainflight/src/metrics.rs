//! Metrics collection for the Flight surface.
//!
//! Exposes Prometheus metrics over HTTP: per-method request counters and
//! latency histograms, plus a per-table processed-blocks counter.

use std::net::SocketAddr;
use std::time::Instant;

use anyhow::{Context, Result};
use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::info;

pub const REQUESTS_TOTAL: &str = "chainflight_requests_total";
pub const REQUEST_ERRORS_TOTAL: &str = "chainflight_request_errors_total";
pub const REQUEST_DURATION_SECONDS: &str = "chainflight_request_duration_seconds";
pub const BLOCKS_PROCESSED_TOTAL: &str = "chainflight_blocks_processed_total";

/// Install the Prometheus exporter and register metric descriptions.
pub fn init_metrics(port: u16) -> Result<()> {
    let addr: SocketAddr = format!("0.0.0.0:{port}")
        .parse()
        .context("invalid metrics port")?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .context("failed to start metrics exporter")?;

    describe_counter!(REQUESTS_TOTAL, "Total Flight requests by method");
    describe_counter!(
        REQUEST_ERRORS_TOTAL,
        "Total failed Flight requests by method"
    );
    describe_histogram!(
        REQUEST_DURATION_SECONDS,
        "Flight request latency by method in seconds"
    );
    describe_counter!(
        BLOCKS_PROCESSED_TOTAL,
        "Blocks projected into record batches, by table"
    );

    info!("metrics server listening on http://{addr}/metrics");
    Ok(())
}

/// Tracks one handler invocation; reports count, outcome and latency.
pub struct MethodTimer {
    method: &'static str,
    started: Instant,
}

impl MethodTimer {
    pub fn start(method: &'static str) -> Self {
        counter!(REQUESTS_TOTAL, "method" => method).increment(1);
        Self {
            method,
            started: Instant::now(),
        }
    }

    pub fn finish(self, success: bool) {
        if !success {
            counter!(REQUEST_ERRORS_TOTAL, "method" => self.method).increment(1);
        }
        histogram!(REQUEST_DURATION_SECONDS, "method" => self.method)
            .record(self.started.elapsed().as_secs_f64());
    }
}

/// Counts a block projected by a table's transformer.
pub fn block_processed(table: &str) {
    counter!(BLOCKS_PROCESSED_TOTAL, "table" => table.to_string()).increment(1);
}
