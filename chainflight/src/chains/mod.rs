//! Per-chain-family table sets.
//!
//! The ethereum family defines schemas for most EVM chains. The
//! ethereum_raw family serves EVM chains whose values overflow u64 by
//! keeping big values as strings. The bitcoin family covers the Bitcoin
//! network. Rosetta tables ride along in the ethereum family and are
//! selected by `format=rosetta`.

pub mod bitcoin;
pub mod ethereum;
pub mod ethereum_raw;
pub mod rosetta;

use std::sync::Arc;

use blockchain_common::Chain;

use crate::config::Config;
use crate::error::GatewayError;
use crate::session::Session;
use crate::tables::Table;

/// The active table family, filtered down to the formats this deployment
/// serves.
pub struct Controller {
    tables: Vec<Arc<dyn Table>>,
}

impl Controller {
    pub fn new(config: &Config, session: Session) -> Result<Self, GatewayError> {
        let family = match config.chain {
            Chain::Ethereum | Chain::Polygon | Chain::Optimism => {
                ethereum::tables(config, &session)
            }
            Chain::Bitcoin => bitcoin::tables(config, &session),
            Chain::BinanceSmartChain | Chain::Arbitrum => ethereum_raw::tables(config, &session),
            other => {
                return Err(GatewayError::Internal(format!(
                    "no table family implemented for chain: {}",
                    other.as_str(),
                )))
            }
        };

        let tables = family
            .into_iter()
            .filter(|table| config.supports(table.attributes().format))
            .collect();

        Ok(Self { tables })
    }

    pub fn tables(&self) -> &[Arc<dyn Table>] {
        &self.tables
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::TableFormat;
    use crate::testing::mock_session;

    fn keys(controller: &Controller) -> Vec<String> {
        controller
            .tables()
            .iter()
            .map(|t| t.attributes().table_key().to_string())
            .collect()
    }

    #[test]
    fn ethereum_family_serves_native_and_rosetta() {
        let config = Config::for_chain(Chain::Ethereum)
            .with_formats([TableFormat::Native, TableFormat::Rosetta]);
        let controller = Controller::new(&config, mock_session()).unwrap();

        let keys = keys(&controller);
        assert_eq!(keys.len(), 8);
        assert!(keys.contains(&"table=blocks/format=native/encoding=none".to_string()));
        assert!(keys.contains(&"table=streamed_blocks/format=native/encoding=none".to_string()));
        assert!(keys
            .contains(&"table=streamed_transactions/format=native/encoding=raw".to_string()));
        assert!(keys
            .contains(&"table=streamed_transactions/format=rosetta/encoding=raw".to_string()));
    }

    #[test]
    fn format_filter_drops_unserved_tables() {
        let config = Config::for_chain(Chain::Ethereum);
        let controller = Controller::new(&config, mock_session()).unwrap();

        assert_eq!(keys(&controller).len(), 5);
        assert!(!keys(&controller)
            .iter()
            .any(|key| key.contains("format=rosetta")));
    }

    #[test]
    fn bitcoin_family_serves_batch_tables_only() {
        let config = Config::for_chain(Chain::Bitcoin);
        let controller = Controller::new(&config, mock_session()).unwrap();

        let keys = keys(&controller);
        assert_eq!(keys.len(), 2);
        assert!(keys.contains(&"table=blocks/format=native/encoding=none".to_string()));
        assert!(keys.contains(&"table=transactions/format=native/encoding=none".to_string()));
    }

    #[test]
    fn unsupported_chains_are_rejected() {
        let config = Config::for_chain(Chain::Solana);
        assert!(Controller::new(&config, mock_session()).is_err());
    }
}
