//! Configuration types for coinwatch
//!
//! Loaded from a single YAML file. Every monitor section is optional; a
//! section with `interval_seconds: 0` (or missing) leaves that monitor
//! disabled.

use crate::schedule::QuietHours;
use serde::Deserialize;
use std::collections::HashMap;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub coinmarketcap: ApiKeyConfig,
    #[serde(default)]
    pub opensea: ApiKeyConfig,
    #[serde(default)]
    pub prediction: ApiKeyConfig,
    #[serde(default)]
    pub twitter: ApiKeyConfig,
    #[serde(default)]
    pub announcements: AnnouncementConfig,
    /// Webhook bots keyed by name; monitors reference them by `bot_name`
    #[serde(default)]
    pub bots: HashMap<String, BotConfig>,
    #[serde(default)]
    pub price_monitor: PriceMonitorConfig,
    #[serde(default)]
    pub dex_monitor: DexMonitorConfig,
    #[serde(default)]
    pub floor_monitor: FloorMonitorConfig,
    #[serde(default)]
    pub market_monitor: MarketMonitorConfig,
    #[serde(default)]
    pub post_monitor: PostMonitorConfig,
    #[serde(default)]
    pub digest_monitor: DigestMonitorConfig,
}

/// HTTP surface configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Key-only credential for a REST collaborator
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiKeyConfig {
    #[serde(default)]
    pub api_key: String,
}

/// Announcement stream credentials and routing
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnnouncementConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub secret_key: String,
    /// Optional forward proxy, e.g. "http://127.0.0.1:7890"
    #[serde(default)]
    pub proxy_url: String,
    /// Topics to subscribe; defaults applied at wiring time when empty
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub bot_name: String,
}

/// One webhook bot's credentials
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BotConfig {
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub secret: String,
    #[serde(default)]
    pub keyword: String,
}

/// Token price monitor section
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PriceMonitorConfig {
    #[serde(default)]
    pub bot_name: String,
    #[serde(default)]
    pub interval_seconds: u64,
    /// Numeric quote-API token ids
    #[serde(default)]
    pub token_ids: Vec<String>,
    #[serde(default)]
    pub quiet_hours: Option<QuietHours>,
}

/// DEX pair monitor section
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DexMonitorConfig {
    #[serde(default)]
    pub bot_name: String,
    #[serde(default)]
    pub interval_seconds: u64,
    /// Network id to pair contract addresses
    #[serde(default)]
    pub pairs: HashMap<String, Vec<String>>,
    #[serde(default)]
    pub quiet_hours: Option<QuietHours>,
}

/// NFT floor price monitor section
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FloorMonitorConfig {
    #[serde(default)]
    pub bot_name: String,
    #[serde(default)]
    pub interval_seconds: u64,
    /// Collection slugs
    #[serde(default)]
    pub collections: Vec<String>,
    #[serde(default)]
    pub quiet_hours: Option<QuietHours>,
}

/// Prediction-market monitor section
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MarketMonitorConfig {
    #[serde(default)]
    pub bot_name: String,
    #[serde(default)]
    pub interval_seconds: u64,
    #[serde(default)]
    pub market_ids: Vec<String>,
    #[serde(default)]
    pub quiet_hours: Option<QuietHours>,
}

/// Account post monitor section (the dedup feed)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostMonitorConfig {
    #[serde(default)]
    pub bot_name: String,
    #[serde(default)]
    pub interval_seconds: u64,
    #[serde(default)]
    pub usernames: Vec<String>,
    /// Allow-list: a post is delivered only if it contains one of these
    /// (case-insensitive); empty means deliver all
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub quiet_hours: Option<QuietHours>,
}

/// Aggregated digest section
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DigestMonitorConfig {
    #[serde(default)]
    pub bot_name: String,
    #[serde(default)]
    pub interval_seconds: u64,
    /// Enabled sections: "token_price", "prediction"
    #[serde(default)]
    pub modules: Vec<String>,
    #[serde(default)]
    pub quiet_hours: Option<QuietHours>,
}

impl Config {
    /// Load configuration from a YAML file
    pub fn load(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::QuietBehavior;
    use std::io::Write;

    const SAMPLE: &str = r#"
server:
  port: 9000

telemetry:
  log_level: debug

coinmarketcap:
  api_key: cmc-key

bots:
  main:
    access_token: tok
    secret: sec
    keyword: ALERTS

price_monitor:
  bot_name: main
  interval_seconds: 60
  token_ids: ["1", "1027"]
  quiet_hours:
    enabled: true
    start_hour: 0
    end_hour: 8
    behavior: throttle
    throttle_multiplier: 5

post_monitor:
  bot_name: main
  interval_seconds: 600
  usernames: [alice, bob]
  keywords: [launch]
"#;

    #[test]
    fn sample_config_deserializes() {
        let config: Config = serde_yaml::from_str(SAMPLE).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.telemetry.log_level, "debug");
        assert_eq!(config.coinmarketcap.api_key, "cmc-key");
        assert_eq!(config.bots.get("main").unwrap().keyword, "ALERTS");
        assert_eq!(config.price_monitor.token_ids.len(), 2);

        let qh = config.price_monitor.quiet_hours.as_ref().unwrap();
        assert!(qh.enabled);
        assert_eq!(qh.behavior, QuietBehavior::Throttle);
        assert_eq!(qh.throttle_multiplier, 5);

        assert_eq!(config.post_monitor.usernames, vec!["alice", "bob"]);
        assert_eq!(config.post_monitor.keywords, vec!["launch"]);
    }

    #[test]
    fn missing_sections_default_to_disabled() {
        let config: Config = serde_yaml::from_str("server:\n  port: 8080\n").unwrap();
        assert_eq!(config.price_monitor.interval_seconds, 0);
        assert!(config.post_monitor.usernames.is_empty());
        assert!(config.bots.is_empty());
        assert!(config.price_monitor.quiet_hours.is_none());
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.server.port, 9000);
    }

    #[test]
    fn load_nonexistent_path_errors() {
        assert!(Config::load("/nonexistent/coinwatch.yaml").is_err());
    }
}
