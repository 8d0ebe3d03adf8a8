//! NFT floor price monitor
//!
//! Full-refresh job over configured collection slugs with USD conversion.
//! The whole batch aborts on a fetch error (the scheduler logs it and the
//! next tick retries from scratch).

use crate::alert::{format, Notifier};
use crate::feeds::{CmcClient, FloorPriceInfo, OpenSeaClient};
use crate::schedule::Job;
use async_trait::async_trait;
use std::sync::Arc;

/// Source of floor prices for a list of collection slugs.
#[async_trait]
pub trait FloorSource: Send + Sync + 'static {
    async fn floor_prices(&self, slugs: &[String]) -> anyhow::Result<Vec<FloorPriceInfo>>;
}

/// Production source: collection stats plus USD conversion through quotes.
pub struct OpenSeaFloorSource {
    opensea: Arc<OpenSeaClient>,
    quotes: Arc<CmcClient>,
}

impl OpenSeaFloorSource {
    pub fn new(opensea: Arc<OpenSeaClient>, quotes: Arc<CmcClient>) -> Self {
        Self { opensea, quotes }
    }
}

#[async_trait]
impl FloorSource for OpenSeaFloorSource {
    async fn floor_prices(&self, slugs: &[String]) -> anyhow::Result<Vec<FloorPriceInfo>> {
        self.opensea.floor_prices(slugs, &self.quotes, true).await
    }
}

/// Periodic job publishing a floor price digest.
pub struct FloorWatchJob<S: FloorSource> {
    source: S,
    notifier: Arc<dyn Notifier>,
    collections: Vec<String>,
}

impl<S: FloorSource> FloorWatchJob<S> {
    pub fn new(source: S, notifier: Arc<dyn Notifier>, collections: Vec<String>) -> Self {
        Self {
            source,
            notifier,
            collections,
        }
    }
}

fn render_floor(info: &FloorPriceInfo) -> String {
    let mut line = format!(
        "### {}\n- Floor: {} {}",
        info.collection_slug,
        format::price(info.floor_price),
        info.floor_price_symbol,
    );
    if info.floor_price_usd > 0.0 {
        line.push_str(&format!(" (${})", format::price(info.floor_price_usd)));
    }
    line
}

#[async_trait]
impl<S: FloorSource> Job for FloorWatchJob<S> {
    fn name(&self) -> &str {
        "floor_monitor"
    }

    async fn run(&mut self) -> anyhow::Result<()> {
        let floors = self.source.floor_prices(&self.collections).await?;
        if floors.is_empty() {
            tracing::debug!("no floor prices returned");
            return Ok(());
        }

        let text = floors
            .iter()
            .map(render_floor)
            .collect::<Vec<_>>()
            .join("\n\n");
        self.notifier
            .send_markdown("NFT floor prices", &text, &[], false)
            .await?;
        Ok(())
    }
}
