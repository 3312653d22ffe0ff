//! The session wraps the injected block store and parser and adds the
//! derived reads the planner needs: tip height (latest minus the reorg
//! buffer), chain start height, and absolute event-log positions.

use std::sync::Arc;

use anyhow::Context;
use blockchain_common::{
    BlockParser, BlockSource, BlockchainEvent, ChainMetadata, EventPosition, RawBlock,
};

use crate::error::GatewayError;

#[derive(Clone)]
pub struct Session {
    source: Arc<dyn BlockSource>,
    parser: Arc<dyn BlockParser>,
}

impl Session {
    pub fn new(source: Arc<dyn BlockSource>, parser: Arc<dyn BlockParser>) -> Self {
        Self { source, parser }
    }

    pub fn parser(&self) -> &dyn BlockParser {
        self.parser.as_ref()
    }

    pub async fn static_chain_metadata(&self) -> Result<ChainMetadata, GatewayError> {
        self.source
            .get_static_chain_metadata()
            .await
            .context("failed to get chain metadata")
            .map_err(GatewayError::Upstream)
    }

    /// Latest ingested height minus the chain's irreversible distance.
    pub async fn tip_height(&self) -> Result<u64, GatewayError> {
        let meta = self.static_chain_metadata().await?;
        let latest = self
            .source
            .get_latest_block()
            .await
            .context("failed to get latest block")
            .map_err(GatewayError::Upstream)?;
        Ok(latest.saturating_sub(meta.irreversible_distance))
    }

    pub async fn start_height(&self) -> Result<u64, GatewayError> {
        Ok(self.static_chain_metadata().await?.block_start_height)
    }

    pub async fn blocks_by_range(
        &self,
        start_height: u64,
        end_height: u64,
    ) -> Result<Vec<RawBlock>, GatewayError> {
        self.source
            .get_blocks_by_range(start_height, end_height)
            .await
            .context("failed to get raw blocks")
            .map_err(GatewayError::Upstream)
    }

    pub async fn block_with_tag(
        &self,
        tag: u32,
        height: u64,
        hash: &str,
    ) -> Result<RawBlock, GatewayError> {
        self.source
            .get_block_with_tag(tag, height, hash)
            .await
            .with_context(|| {
                format!("failed to get block with tag={tag} height={height} hash={hash}")
            })
            .map_err(GatewayError::Upstream)
    }

    pub async fn chain_events(
        &self,
        sequence_num: i64,
        max_num_events: u64,
    ) -> Result<Vec<BlockchainEvent>, GatewayError> {
        self.source
            .get_chain_events(sequence_num, max_num_events)
            .await
            .context("failed to get chain events")
            .map_err(GatewayError::Upstream)
    }

    /// Sequence number of the event at an absolute log position. The
    /// store returns exactly one event for a position lookup.
    pub async fn event_sequence(&self, position: EventPosition) -> Result<i64, GatewayError> {
        let events = self
            .source
            .get_chain_events_at(position)
            .await
            .with_context(|| format!("failed to get {} chain event", position.as_str()))
            .map_err(GatewayError::Upstream)?;
        if events.len() != 1 {
            return Err(GatewayError::Internal(format!(
                "expected exactly one {} event, got {}",
                position.as_str(),
                events.len(),
            )));
        }
        Ok(events[0].sequence_num)
    }
}
