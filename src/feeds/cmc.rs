//! CoinMarketCap client
//!
//! Token quotes via /v2/cryptocurrency/quotes/latest (by id or by symbol) and
//! DEX pair quotes via /v4/dex/pairs/quotes/latest. The status envelope's
//! error code is surfaced as an error even on HTTP 200.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

/// Quote API base URL (v2; the DEX endpoint swaps in v4)
pub const CMC_BASE_URL: &str = "https://pro-api.coinmarketcap.com/v2";

const API_KEY_HEADER: &str = "X-CMC_PRO_API_KEY";

/// One token's latest USD quote
#[derive(Debug, Clone)]
pub struct TokenQuote {
    pub symbol: String,
    pub price: f64,
    pub percent_change_1h: f64,
    pub percent_change_24h: f64,
    pub last_updated: DateTime<Utc>,
}

/// One DEX trading pair's latest quote
#[derive(Debug, Clone)]
pub struct DexPairInfo {
    pub name: String,
    pub price: f64,
    pub percent_change_1h: f64,
    pub liquidity: f64,
    pub dex_slug: String,
    pub network_slug: String,
    pub last_updated: String,
}

#[derive(Debug, Deserialize)]
struct QuoteStatus {
    #[serde(default)]
    error_code: i64,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QuoteResponse {
    status: QuoteStatus,
    #[serde(default)]
    data: HashMap<String, RawCrypto>,
}

// The by-symbol variant wraps each entry in an array because symbols are not
// unique across networks.
#[derive(Debug, Deserialize)]
struct QuoteBySymbolResponse {
    status: QuoteStatus,
    #[serde(default)]
    data: HashMap<String, Vec<RawCrypto>>,
}

#[derive(Debug, Deserialize)]
struct RawCrypto {
    symbol: String,
    #[serde(default)]
    quote: HashMap<String, RawQuote>,
}

#[derive(Debug, Deserialize)]
struct RawQuote {
    #[serde(default)]
    price: f64,
    #[serde(default)]
    percent_change_1h: f64,
    #[serde(default)]
    percent_change_24h: f64,
    #[serde(default)]
    last_updated: String,
}

#[derive(Debug, Deserialize)]
struct DexStatus {
    #[serde(default)]
    error_code: String,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DexQuoteResponse {
    status: DexStatus,
    #[serde(default)]
    data: Vec<RawDexPair>,
}

#[derive(Debug, Deserialize)]
struct RawDexPair {
    #[serde(default)]
    contract_address: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    dex_slug: String,
    #[serde(default)]
    network_slug: String,
    #[serde(default)]
    quote: Vec<RawDexQuote>,
}

#[derive(Debug, Deserialize)]
struct RawDexQuote {
    #[serde(default)]
    price: f64,
    #[serde(default)]
    percent_change_1h: f64,
    #[serde(default)]
    liquidity: f64,
    #[serde(default)]
    last_updated: String,
}

impl RawCrypto {
    fn into_quote(self) -> TokenQuote {
        let usd = self.quote.get("USD");
        TokenQuote {
            symbol: self.symbol,
            price: usd.map(|q| q.price).unwrap_or_default(),
            percent_change_1h: usd.map(|q| q.percent_change_1h).unwrap_or_default(),
            percent_change_24h: usd.map(|q| q.percent_change_24h).unwrap_or_default(),
            last_updated: usd
                .and_then(|q| DateTime::parse_from_rfc3339(&q.last_updated).ok())
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(Utc::now),
        }
    }
}

/// CoinMarketCap REST client
pub struct CmcClient {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl CmcClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, CMC_BASE_URL)
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

    /// Latest USD quotes keyed by the requested numeric id.
    pub async fn quotes_by_id(&self, ids: &[String]) -> anyhow::Result<HashMap<String, TokenQuote>> {
        let url = format!("{}/cryptocurrency/quotes/latest", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("id", ids.join(","))])
            .header(API_KEY_HEADER, &self.api_key)
            .header("Accept", "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("quote API error: {} - {}", status, body);
        }

        let parsed: QuoteResponse = response.json().await?;
        if parsed.status.error_code != 0 {
            anyhow::bail!(
                "quote API error: {} (code: {})",
                parsed.status.error_message.unwrap_or_default(),
                parsed.status.error_code
            );
        }

        Ok(parsed
            .data
            .into_iter()
            .map(|(id, raw)| (id, raw.into_quote()))
            .collect())
    }

    /// Latest USD quotes keyed by symbol. Multiple listings for one symbol
    /// collapse to the first (the dominant asset for major coins).
    pub async fn quotes_by_symbol(
        &self,
        symbols: &[String],
    ) -> anyhow::Result<HashMap<String, TokenQuote>> {
        let url = format!("{}/cryptocurrency/quotes/latest", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("symbol", symbols.join(","))])
            .header(API_KEY_HEADER, &self.api_key)
            .header("Accept", "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("quote API error: {} - {}", status, body);
        }

        let parsed: QuoteBySymbolResponse = response.json().await?;
        if parsed.status.error_code != 0 {
            anyhow::bail!(
                "quote API error: {} (code: {})",
                parsed.status.error_message.unwrap_or_default(),
                parsed.status.error_code
            );
        }

        Ok(parsed
            .data
            .into_iter()
            .filter_map(|(symbol, list)| {
                list.into_iter().next().map(|raw| (symbol, raw.into_quote()))
            })
            .collect())
    }

    /// Latest DEX pair quotes keyed by contract address.
    pub async fn dex_pair_quotes(
        &self,
        contract_addresses: &[String],
        network_id: &str,
    ) -> anyhow::Result<HashMap<String, DexPairInfo>> {
        // The DEX endpoint lives under v4
        let url = format!(
            "{}/dex/pairs/quotes/latest",
            self.base_url.replacen("/v2", "/v4", 1)
        );

        let mut query = vec![("contract_address", contract_addresses.join(","))];
        if !network_id.is_empty() {
            query.push(("network_id", network_id.to_string()));
        }

        let response = self
            .client
            .get(&url)
            .query(&query)
            .header(API_KEY_HEADER, &self.api_key)
            .header("Accept", "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("dex quote API error: {} - {}", status, body);
        }

        let parsed: DexQuoteResponse = response.json().await?;
        if parsed.status.error_code != "0" {
            anyhow::bail!(
                "dex quote API error: {} (code: {})",
                parsed.status.error_message.unwrap_or_default(),
                parsed.status.error_code
            );
        }

        Ok(parsed
            .data
            .into_iter()
            .map(|raw| {
                let quote = raw.quote.into_iter().next().unwrap_or(RawDexQuote {
                    price: 0.0,
                    percent_change_1h: 0.0,
                    liquidity: 0.0,
                    last_updated: String::new(),
                });
                (
                    raw.contract_address,
                    DexPairInfo {
                        name: raw.name,
                        price: quote.price,
                        percent_change_1h: quote.percent_change_1h,
                        liquidity: quote.liquidity,
                        dex_slug: raw.dex_slug,
                        network_slug: raw.network_slug,
                        last_updated: quote.last_updated,
                    },
                )
            })
            .collect())
    }
}
