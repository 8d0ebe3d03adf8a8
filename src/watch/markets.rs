//! Prediction-market monitor
//!
//! Full-refresh job over configured market ids. A failing id is logged and
//! skipped so one delisted market never silences the rest; closed markets are
//! skipped quietly.

use crate::alert::{format, Notifier};
use crate::feeds::{MarketDetail, PredictionClient};
use crate::schedule::Job;
use async_trait::async_trait;
use std::sync::Arc;

/// Source of market snapshots by id.
#[async_trait]
pub trait MarketSource: Send + Sync + 'static {
    async fn market_detail(&self, market_id: &str) -> anyhow::Result<MarketDetail>;
}

#[async_trait]
impl MarketSource for PredictionClient {
    async fn market_detail(&self, market_id: &str) -> anyhow::Result<MarketDetail> {
        PredictionClient::market_detail(self, market_id).await
    }
}

#[async_trait]
impl<T: MarketSource> MarketSource for Arc<T> {
    async fn market_detail(&self, market_id: &str) -> anyhow::Result<MarketDetail> {
        (**self).market_detail(market_id).await
    }
}

/// Periodic job publishing a prediction-market digest.
pub struct MarketWatchJob<S: MarketSource> {
    source: S,
    notifier: Arc<dyn Notifier>,
    market_ids: Vec<String>,
}

impl<S: MarketSource> MarketWatchJob<S> {
    pub fn new(source: S, notifier: Arc<dyn Notifier>, market_ids: Vec<String>) -> Self {
        Self {
            source,
            notifier,
            market_ids,
        }
    }
}

pub(crate) fn render_market(detail: &MarketDetail) -> String {
    let outcomes = detail
        .outcome_prices
        .iter()
        .map(|(name, price)| format!("{} {}", name, format::price(*price)))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "### [{}](https://polymarket.com/event/{})\n- Outcomes: {}\n- 1h move: {:+.4}\n- Volume: {}",
        detail.question,
        detail.slug,
        outcomes,
        detail.one_hour_price_change,
        format::liquidity(detail.volume),
    )
}

#[async_trait]
impl<S: MarketSource> Job for MarketWatchJob<S> {
    fn name(&self) -> &str {
        "market_monitor"
    }

    async fn run(&mut self) -> anyhow::Result<()> {
        let mut sections = Vec::new();
        for id in &self.market_ids {
            let detail = match self.source.market_detail(id).await {
                Ok(d) => d,
                Err(e) => {
                    tracing::warn!(market_id = %id, error = %e, "market fetch failed");
                    continue;
                }
            };
            if detail.closed {
                tracing::debug!(market_id = %id, "market closed, skipping");
                continue;
            }
            sections.push(render_market(&detail));
        }

        if sections.is_empty() {
            return Ok(());
        }

        self.notifier
            .send_markdown("Prediction markets", &sections.join("\n\n"), &[], false)
            .await?;
        Ok(())
    }
}
