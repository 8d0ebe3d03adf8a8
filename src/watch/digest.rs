//! Aggregated digest
//!
//! One periodic message combining sections from the other monitors' data
//! sources. Sections are opt-in by name; a failing section is logged and
//! dropped from that tick's digest rather than suppressing the whole message.

use super::markets::{render_market, MarketSource};
use super::prices::{render_quotes, QuoteSource};
use crate::alert::Notifier;
use crate::schedule::Job;
use async_trait::async_trait;
use std::sync::Arc;

pub const SECTION_TOKEN_PRICE: &str = "token_price";
pub const SECTION_PREDICTION: &str = "prediction";

/// Periodic job publishing a combined market digest.
pub struct DigestJob<Q: QuoteSource, M: MarketSource> {
    quotes: Q,
    markets: M,
    notifier: Arc<dyn Notifier>,
    /// Enabled section names, in digest order
    modules: Vec<String>,
    token_ids: Vec<String>,
    market_ids: Vec<String>,
}

impl<Q: QuoteSource, M: MarketSource> DigestJob<Q, M> {
    pub fn new(
        quotes: Q,
        markets: M,
        notifier: Arc<dyn Notifier>,
        modules: Vec<String>,
        token_ids: Vec<String>,
        market_ids: Vec<String>,
    ) -> Self {
        Self {
            quotes,
            markets,
            notifier,
            modules,
            token_ids,
            market_ids,
        }
    }

    async fn token_price_section(&self) -> Option<String> {
        if self.token_ids.is_empty() {
            return None;
        }
        match self.quotes.latest_quotes(&self.token_ids).await {
            Ok(quotes) => {
                let body = render_quotes(&self.token_ids, &quotes);
                (!body.is_empty()).then(|| format!("## Token prices\n\n{}", body))
            }
            Err(e) => {
                tracing::warn!(error = %e, "digest token price section failed");
                None
            }
        }
    }

    async fn prediction_section(&self) -> Option<String> {
        let mut parts = Vec::new();
        for id in &self.market_ids {
            match self.markets.market_detail(id).await {
                Ok(detail) if !detail.closed => parts.push(render_market(&detail)),
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(market_id = %id, error = %e, "digest market fetch failed");
                }
            }
        }
        (!parts.is_empty()).then(|| format!("## Prediction markets\n\n{}", parts.join("\n\n")))
    }
}

#[async_trait]
impl<Q: QuoteSource, M: MarketSource> Job for DigestJob<Q, M> {
    fn name(&self) -> &str {
        "digest_monitor"
    }

    async fn run(&mut self) -> anyhow::Result<()> {
        let mut sections = Vec::new();
        for module in &self.modules {
            let section = match module.as_str() {
                SECTION_TOKEN_PRICE => self.token_price_section().await,
                SECTION_PREDICTION => self.prediction_section().await,
                other => {
                    tracing::warn!(module = %other, "unknown digest module");
                    None
                }
            };
            if let Some(section) = section {
                sections.push(section);
            }
        }

        if sections.is_empty() {
            tracing::debug!("digest has no sections this tick");
            return Ok(());
        }

        self.notifier
            .send_markdown("Market digest", &sections.join("\n\n---\n\n"), &[], false)
            .await?;
        Ok(())
    }
}
