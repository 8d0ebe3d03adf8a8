//! Prediction-market detail client
//!
//! Fetches single-market detail from a Gamma-style API. Outcomes and their
//! prices arrive as JSON-encoded string arrays inside the JSON payload and
//! are flattened into a name-to-price map.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

/// Gamma-style market API base URL
pub const PREDICTION_BASE_URL: &str = "https://gamma-api.polymarket.com";

/// Refined market snapshot
#[derive(Debug, Clone)]
pub struct MarketDetail {
    pub question: String,
    pub slug: String,
    pub closed: bool,
    pub volume: f64,
    /// Outcome name to latest price, insertion-stable for display
    pub outcome_prices: BTreeMap<String, f64>,
    pub one_hour_price_change: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMarket {
    #[serde(default)]
    question: String,
    #[serde(default)]
    slug: String,
    #[serde(default)]
    closed: bool,
    /// Volume as a decimal string
    #[serde(default)]
    volume: String,
    /// JSON-encoded array of outcome names
    #[serde(default)]
    outcomes: String,
    /// JSON-encoded array of outcome prices, parallel to `outcomes`
    #[serde(default)]
    outcome_prices: String,
    #[serde(default)]
    one_hour_price_change: f64,
}

impl RawMarket {
    fn refine(self) -> MarketDetail {
        MarketDetail {
            volume: self.volume.parse().unwrap_or_default(),
            outcome_prices: parse_outcome_prices(&self.outcomes, &self.outcome_prices),
            question: self.question,
            slug: self.slug,
            closed: self.closed,
            one_hour_price_change: self.one_hour_price_change,
        }
    }
}

/// Zip the stringly outcome arrays into a name-to-price map.
///
/// Format: outcomes `"[\"Yes\", \"No\"]"`, prices `"[\"0.75\", \"0.25\"]"`.
fn parse_outcome_prices(outcomes: &str, prices: &str) -> BTreeMap<String, f64> {
    let names: Vec<String> = match serde_json::from_str(outcomes) {
        Ok(v) => v,
        Err(_) => return BTreeMap::new(),
    };
    let prices: Vec<String> = match serde_json::from_str(prices) {
        Ok(v) => v,
        Err(_) => return BTreeMap::new(),
    };

    names
        .into_iter()
        .zip(prices)
        .filter_map(|(name, price)| price.parse().ok().map(|p| (name, p)))
        .collect()
}

/// Prediction-market REST client
pub struct PredictionClient {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl PredictionClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, PREDICTION_BASE_URL)
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

    /// Fetch one market's detail by id.
    pub async fn market_detail(&self, market_id: &str) -> anyhow::Result<MarketDetail> {
        let url = format!("{}/markets/{}", self.base_url, market_id);

        let mut request = self.client.get(&url).header("accept", "application/json");
        if !self.api_key.is_empty() {
            request = request.bearer_auth(&self.api_key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("market API error for {}: {} - {}", market_id, status, body);
        }

        let raw: RawMarket = response.json().await?;
        Ok(raw.refine())
    }
}
