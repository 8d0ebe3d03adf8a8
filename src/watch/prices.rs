//! Token price monitor
//!
//! Full-refresh job: every tick fetches the latest quote for each configured
//! token id and pushes one markdown digest. No state between ticks.

use crate::alert::{format, Notifier};
use crate::feeds::{CmcClient, TokenQuote};
use crate::schedule::Job;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Source of latest token quotes keyed by numeric id.
#[async_trait]
pub trait QuoteSource: Send + Sync + 'static {
    async fn latest_quotes(&self, ids: &[String]) -> anyhow::Result<HashMap<String, TokenQuote>>;
}

#[async_trait]
impl QuoteSource for CmcClient {
    async fn latest_quotes(&self, ids: &[String]) -> anyhow::Result<HashMap<String, TokenQuote>> {
        self.quotes_by_id(ids).await
    }
}

#[async_trait]
impl<T: QuoteSource> QuoteSource for Arc<T> {
    async fn latest_quotes(&self, ids: &[String]) -> anyhow::Result<HashMap<String, TokenQuote>> {
        (**self).latest_quotes(ids).await
    }
}

/// Periodic job publishing a token price digest.
pub struct PriceWatchJob<S: QuoteSource> {
    source: S,
    notifier: Arc<dyn Notifier>,
    token_ids: Vec<String>,
}

impl<S: QuoteSource> PriceWatchJob<S> {
    pub fn new(source: S, notifier: Arc<dyn Notifier>, token_ids: Vec<String>) -> Self {
        Self {
            source,
            notifier,
            token_ids,
        }
    }
}

/// One markdown section per token, in configured order.
pub(crate) fn render_quotes(
    token_ids: &[String],
    quotes: &HashMap<String, TokenQuote>,
) -> String {
    let mut sections = Vec::new();
    for id in token_ids {
        let Some(quote) = quotes.get(id) else {
            continue;
        };
        sections.push(format!(
            "### {}\n- Price: ${}\n- 1h: {:+.2}%  24h: {:+.2}%\n- Updated: {}",
            quote.symbol,
            format::price(quote.price),
            quote.percent_change_1h,
            quote.percent_change_24h,
            format::display_time(quote.last_updated),
        ));
    }
    sections.join("\n\n")
}

#[async_trait]
impl<S: QuoteSource> Job for PriceWatchJob<S> {
    fn name(&self) -> &str {
        "price_monitor"
    }

    async fn run(&mut self) -> anyhow::Result<()> {
        let quotes = self.source.latest_quotes(&self.token_ids).await?;
        let text = render_quotes(&self.token_ids, &quotes);
        if text.is_empty() {
            tracing::debug!(tokens = self.token_ids.len(), "no quotes returned");
            return Ok(());
        }

        self.notifier
            .send_markdown("Token prices", &text, &[], false)
            .await?;
        Ok(())
    }
}
