//! Gateway configuration, loaded from the environment.

use std::collections::HashSet;
use std::env;

use anyhow::{Context, Result};
use blockchain_common::Chain;
use serde::{Deserialize, Serialize};

use crate::query::TableFormat;

const DEFAULT_STREAM_PARALLELISM: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Service configuration
    pub service_name: String,
    /// Address the Flight gRPC server binds to.
    pub bind_address: String,
    pub metrics_port: u16,

    // Chain identity; selects the active table family
    pub chain: Chain,
    pub network: String,

    // Table configuration
    /// Formats the deployment serves; tables outside this set are not
    /// registered.
    pub supported_formats: HashSet<TableFormat>,
    /// Concurrent block fetches per stream mini-batch.
    pub stream_parallelism: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let chain_name = env::var("CHAIN").unwrap_or_else(|_| "ethereum".to_string());
        let chain = Chain::from_str(&chain_name)
            .with_context(|| format!("unsupported CHAIN value: {chain_name}"))?;

        let formats = env::var("SUPPORTED_FORMATS").unwrap_or_else(|_| "native".to_string());
        let supported_formats = formats
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                TableFormat::from_str(s)
                    .with_context(|| format!("unsupported format in SUPPORTED_FORMATS: {s}"))
            })
            .collect::<Result<HashSet<_>>>()?;

        let stream_parallelism = env::var("STREAM_PARALLELISM")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_STREAM_PARALLELISM);

        Ok(Config {
            service_name: env::var("SERVICE_NAME").unwrap_or_else(|_| "chainflight".to_string()),

            bind_address: env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8815".to_string()),

            metrics_port: env::var("METRICS_PORT")
                .unwrap_or_else(|_| "9090".to_string())
                .parse()
                .context("METRICS_PORT must be a port number")?,

            chain,
            network: env::var("NETWORK").unwrap_or_else(|_| "mainnet".to_string()),

            supported_formats,
            stream_parallelism,
        })
    }

    /// A config for a given chain with defaults everywhere else. Used by
    /// tests and embedders that wire the gateway programmatically.
    pub fn for_chain(chain: Chain) -> Self {
        Config {
            service_name: "chainflight".to_string(),
            bind_address: "0.0.0.0:8815".to_string(),
            metrics_port: 9090,
            chain,
            network: "mainnet".to_string(),
            supported_formats: HashSet::from([TableFormat::Native]),
            stream_parallelism: DEFAULT_STREAM_PARALLELISM,
        }
    }

    pub fn with_formats(mut self, formats: impl IntoIterator<Item = TableFormat>) -> Self {
        self.supported_formats = formats.into_iter().collect();
        self
    }

    pub fn supports(&self, format: TableFormat) -> bool {
        self.supported_formats.contains(&format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_defaults_apply() {
        let config = Config::for_chain(Chain::Ethereum);
        assert_eq!(config.stream_parallelism, 10);
        assert!(config.supports(TableFormat::Native));
        assert!(!config.supports(TableFormat::Rosetta));
    }

    #[test]
    fn format_set_is_replaceable() {
        let config = Config::for_chain(Chain::Ethereum)
            .with_formats([TableFormat::Native, TableFormat::Rosetta]);
        assert!(config.supports(TableFormat::Rosetta));
    }
}
