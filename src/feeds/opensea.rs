//! OpenSea collection stats client
//!
//! Fetches per-collection floor prices; optional USD conversion goes through
//! the quote client for non-stable denominations.

use super::cmc::CmcClient;
use serde::Deserialize;
use std::time::Duration;

/// OpenSea API v2 base URL
pub const OPENSEA_BASE_URL: &str = "https://api.opensea.io/api/v2";

/// Floor price for one collection
#[derive(Debug, Clone)]
pub struct FloorPriceInfo {
    pub collection_slug: String,
    pub floor_price: f64,
    pub floor_price_symbol: String,
    /// Zero when conversion was skipped or unavailable
    pub floor_price_usd: f64,
}

#[derive(Debug, Deserialize)]
struct StatsResponse {
    total: RawStats,
}

#[derive(Debug, Deserialize)]
struct RawStats {
    #[serde(default)]
    floor_price: f64,
    #[serde(default)]
    floor_price_symbol: String,
}

/// OpenSea REST client
pub struct OpenSeaClient {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenSeaClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, OPENSEA_BASE_URL)
    }

    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            client,
        }
    }

    async fn collection_stats(&self, slug: &str) -> anyhow::Result<RawStats> {
        let url = format!("{}/collections/{}/stats", self.base_url, slug);

        let mut request = self.client.get(&url).header("Accept", "application/json");
        if !self.api_key.is_empty() {
            request = request.header("X-API-KEY", &self.api_key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("collection stats error for {}: {} - {}", slug, status, body);
        }

        let stats: StatsResponse = response.json().await?;
        Ok(stats.total)
    }

    /// Floor prices for each slug, optionally converted to USD.
    ///
    /// A failure on any slug aborts the batch; per-slug USD conversion
    /// failures are logged and leave the USD field at zero.
    pub async fn floor_prices(
        &self,
        slugs: &[String],
        quotes: &CmcClient,
        convert_to_usd: bool,
    ) -> anyhow::Result<Vec<FloorPriceInfo>> {
        let mut results = Vec::with_capacity(slugs.len());

        for slug in slugs {
            let stats = self.collection_stats(slug).await?;

            let mut info = FloorPriceInfo {
                collection_slug: slug.clone(),
                floor_price: stats.floor_price,
                floor_price_symbol: stats.floor_price_symbol.clone(),
                floor_price_usd: 0.0,
            };

            if convert_to_usd {
                let symbol = stats.floor_price_symbol.to_uppercase();
                if matches!(symbol.as_str(), "USD" | "USDT" | "USDC") {
                    info.floor_price_usd = stats.floor_price;
                } else if !symbol.is_empty() {
                    match quotes.quotes_by_symbol(&[symbol.clone()]).await {
                        Ok(prices) => {
                            if let Some(quote) = prices.get(&symbol) {
                                info.floor_price_usd = stats.floor_price * quote.price;
                            }
                        }
                        Err(e) => {
                            tracing::warn!(symbol = %symbol, error = %e, "USD conversion unavailable");
                        }
                    }
                }
            }

            results.push(info);
        }

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_response_parses() {
        let json = r#"{"total": {"floor_price": 1.5, "floor_price_symbol": "ETH"}}"#;
        let parsed: StatsResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.total.floor_price, 1.5);
        assert_eq!(parsed.total.floor_price_symbol, "ETH");
    }

    #[test]
    fn stats_response_defaults() {
        let json = r#"{"total": {}}"#;
        let parsed: StatsResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.total.floor_price, 0.0);
        assert!(parsed.total.floor_price_symbol.is_empty());
    }
}
