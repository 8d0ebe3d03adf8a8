//! Monitor jobs
//!
//! One periodic job per watched feed, plus the wiring that turns config
//! sections into running tasks. A monitor starts only when its section has
//! a positive interval, something to watch, and a resolvable bot; anything
//! else is logged at wiring time and the task is never spawned.

pub mod watermark;

mod dex;
mod digest;
mod floor;
mod markets;
mod posts;
mod prices;

pub use dex::{DexWatchJob, PairSource};
pub use digest::{DigestJob, SECTION_PREDICTION, SECTION_TOKEN_PRICE};
pub use floor::{FloorSource, FloorWatchJob, OpenSeaFloorSource};
pub use markets::{MarketSource, MarketWatchJob};
pub use posts::{PostSource, PostWatchJob};
pub use prices::{PriceWatchJob, QuoteSource};
pub use watermark::WatermarkStore;

use crate::alert::Notifier;
use crate::config::Config;
use crate::feeds::{CmcClient, OpenSeaClient, PredictionClient, TwitterClient};
use crate::schedule::{PeriodicTask, QuietHours, Schedule, TaskHandle};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

// Fallback intervals when a section leaves interval_seconds unset in favor
// of enabling via other fields.
const DEFAULT_PRICE_INTERVAL: Duration = Duration::from_secs(60);
const DEFAULT_DEX_INTERVAL: Duration = Duration::from_secs(60);
const DEFAULT_DIGEST_INTERVAL: Duration = Duration::from_secs(60);
const DEFAULT_FLOOR_INTERVAL: Duration = Duration::from_secs(3600);
const DEFAULT_MARKET_INTERVAL: Duration = Duration::from_secs(3600);
const DEFAULT_POST_INTERVAL: Duration = Duration::from_secs(600);

/// REST collaborators shared across monitors.
pub struct Sources {
    pub cmc: Arc<CmcClient>,
    pub opensea: Arc<OpenSeaClient>,
    pub prediction: Arc<PredictionClient>,
    pub twitter: Arc<TwitterClient>,
}

impl Sources {
    pub fn from_config(config: &Config) -> Self {
        Self {
            cmc: Arc::new(CmcClient::new(config.coinmarketcap.api_key.clone())),
            opensea: Arc::new(OpenSeaClient::new(config.opensea.api_key.clone())),
            prediction: Arc::new(PredictionClient::new(config.prediction.api_key.clone())),
            twitter: Arc::new(TwitterClient::new(config.twitter.api_key.clone())),
        }
    }
}

fn resolve_bot(
    bots: &HashMap<String, Arc<dyn Notifier>>,
    name: &str,
    task: &str,
) -> Option<Arc<dyn Notifier>> {
    match bots.get(name) {
        Some(bot) => Some(bot.clone()),
        None => {
            tracing::warn!(task = %task, bot = %name, "bot not configured, task not started");
            None
        }
    }
}

fn quiet_or(configured: &Option<QuietHours>, default: QuietHours) -> QuietHours {
    configured.clone().unwrap_or(default)
}

/// Spawn every enabled monitor and return the running handles.
pub fn spawn_all(
    config: &Config,
    bots: &HashMap<String, Arc<dyn Notifier>>,
    sources: &Sources,
) -> Vec<TaskHandle> {
    let mut handles = Vec::new();
    let watermarks = Arc::new(WatermarkStore::new());

    let c = &config.price_monitor;
    if c.interval_seconds > 0 && !c.token_ids.is_empty() {
        if let Some(notifier) = resolve_bot(bots, &c.bot_name, "price_monitor") {
            let schedule = Schedule::new(
                c.interval_seconds,
                DEFAULT_PRICE_INTERVAL,
                quiet_or(&c.quiet_hours, QuietHours::throttle(0, 8, 5)),
            );
            handles.push(PeriodicTask::spawn(
                schedule,
                PriceWatchJob::new(sources.cmc.clone(), notifier, c.token_ids.clone()),
            ));
        }
    }

    let c = &config.dex_monitor;
    if c.interval_seconds > 0 && !c.pairs.is_empty() {
        if let Some(notifier) = resolve_bot(bots, &c.bot_name, "dex_monitor") {
            let schedule = Schedule::new(
                c.interval_seconds,
                DEFAULT_DEX_INTERVAL,
                quiet_or(&c.quiet_hours, QuietHours::pause(0, 8)),
            );
            handles.push(PeriodicTask::spawn(
                schedule,
                DexWatchJob::new(sources.cmc.clone(), notifier, c.pairs.clone()),
            ));
        }
    }

    let c = &config.floor_monitor;
    if c.interval_seconds > 0 && !c.collections.is_empty() {
        if let Some(notifier) = resolve_bot(bots, &c.bot_name, "floor_monitor") {
            let schedule = Schedule::new(
                c.interval_seconds,
                DEFAULT_FLOOR_INTERVAL,
                quiet_or(&c.quiet_hours, QuietHours::pause(0, 8)),
            );
            let source = OpenSeaFloorSource::new(sources.opensea.clone(), sources.cmc.clone());
            handles.push(PeriodicTask::spawn(
                schedule,
                FloorWatchJob::new(source, notifier, c.collections.clone()),
            ));
        }
    }

    let c = &config.market_monitor;
    if c.interval_seconds > 0 && !c.market_ids.is_empty() {
        if let Some(notifier) = resolve_bot(bots, &c.bot_name, "market_monitor") {
            let schedule = Schedule::new(
                c.interval_seconds,
                DEFAULT_MARKET_INTERVAL,
                quiet_or(&c.quiet_hours, QuietHours::pause(0, 8)),
            );
            handles.push(PeriodicTask::spawn(
                schedule,
                MarketWatchJob::new(sources.prediction.clone(), notifier, c.market_ids.clone()),
            ));
        }
    }

    let c = &config.post_monitor;
    if c.interval_seconds > 0 && !c.usernames.is_empty() {
        if let Some(notifier) = resolve_bot(bots, &c.bot_name, "post_monitor") {
            let schedule = Schedule::new(
                c.interval_seconds,
                DEFAULT_POST_INTERVAL,
                quiet_or(&c.quiet_hours, QuietHours::pause(0, 7)),
            );
            handles.push(PeriodicTask::spawn(
                schedule,
                PostWatchJob::new(
                    sources.twitter.clone(),
                    notifier,
                    watermarks.clone(),
                    c.usernames.clone(),
                    c.keywords.clone(),
                ),
            ));
        }
    }

    let c = &config.digest_monitor;
    if c.interval_seconds > 0 && !c.modules.is_empty() {
        if let Some(notifier) = resolve_bot(bots, &c.bot_name, "digest_monitor") {
            let schedule = Schedule::new(
                c.interval_seconds,
                DEFAULT_DIGEST_INTERVAL,
                quiet_or(&c.quiet_hours, QuietHours::throttle(0, 8, 5)),
            );
            handles.push(PeriodicTask::spawn(
                schedule,
                DigestJob::new(
                    sources.cmc.clone(),
                    sources.prediction.clone(),
                    notifier,
                    c.modules.clone(),
                    config.price_monitor.token_ids.clone(),
                    config.market_monitor.market_ids.clone(),
                ),
            ));
        }
    }

    tracing::info!(tasks = handles.len(), "monitors spawned");
    handles
}

#[cfg(test)]
pub(crate) mod testutil {
    use crate::alert::{AlertError, Notifier};
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    /// Capturing notifier for monitor tests.
    pub struct RecordingNotifier {
        sent: Arc<Mutex<Vec<String>>>,
        fail: bool,
    }

    impl RecordingNotifier {
        pub fn new() -> Self {
            Self {
                sent: Arc::new(Mutex::new(Vec::new())),
                fail: false,
            }
        }

        pub fn failing() -> Self {
            Self {
                sent: Arc::new(Mutex::new(Vec::new())),
                fail: true,
            }
        }

        /// Every "title\ntext" delivered so far.
        pub fn sent(&self) -> Vec<String> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        fn tag(&self) -> &str {
            "TEST"
        }

        async fn send_markdown(
            &self,
            title: &str,
            text: &str,
            _mentions: &[String],
            _mention_all: bool,
        ) -> Result<(), AlertError> {
            if self.fail {
                return Err(AlertError::Rejected {
                    code: 1,
                    message: "rejected".to_string(),
                });
            }
            self.sent
                .lock()
                .unwrap()
                .push(format!("{}\n{}", title, text));
            Ok(())
        }

        async fn send_text(
            &self,
            content: &str,
            _mentions: &[String],
            _mention_all: bool,
        ) -> Result<(), AlertError> {
            if self.fail {
                return Err(AlertError::Rejected {
                    code: 1,
                    message: "rejected".to_string(),
                });
            }
            self.sent.lock().unwrap().push(content.to_string());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bots_with(name: &str) -> HashMap<String, Arc<dyn Notifier>> {
        let mut bots: HashMap<String, Arc<dyn Notifier>> = HashMap::new();
        bots.insert(name.to_string(), Arc::new(testutil::RecordingNotifier::new()));
        bots
    }

    // Unroutable endpoints so spawned jobs fail fast instead of reaching out
    fn sources() -> Sources {
        Sources {
            cmc: Arc::new(CmcClient::with_base_url("", "http://127.0.0.1:9/v2")),
            opensea: Arc::new(OpenSeaClient::with_base_url("", "http://127.0.0.1:9")),
            prediction: Arc::new(PredictionClient::with_base_url("", "http://127.0.0.1:9")),
            twitter: Arc::new(TwitterClient::with_base_url("", "http://127.0.0.1:9")),
        }
    }

    #[tokio::test]
    async fn nothing_configured_spawns_nothing() {
        let handles = spawn_all(&Config::default(), &HashMap::new(), &sources());
        assert!(handles.is_empty());
    }

    #[tokio::test]
    async fn missing_bot_skips_task() {
        let mut config = Config::default();
        config.price_monitor.bot_name = "nope".to_string();
        config.price_monitor.interval_seconds = 60;
        config.price_monitor.token_ids = vec!["1".to_string()];

        let handles = spawn_all(&config, &HashMap::new(), &sources());
        assert!(handles.is_empty());
    }

    #[tokio::test]
    async fn configured_monitors_spawn_and_stop() {
        let mut config = Config::default();
        config.price_monitor.bot_name = "main".to_string();
        config.price_monitor.interval_seconds = 3600;
        config.price_monitor.token_ids = vec!["1".to_string()];
        config.post_monitor.bot_name = "main".to_string();
        config.post_monitor.interval_seconds = 600;
        config.post_monitor.usernames = vec!["alice".to_string()];

        let handles = spawn_all(&config, &bots_with("main"), &sources());
        assert_eq!(handles.len(), 2);

        for handle in &handles {
            handle.stop();
        }
        for handle in handles {
            handle.join().await;
        }
    }

    #[tokio::test]
    async fn zero_interval_disables_monitor() {
        let mut config = Config::default();
        config.price_monitor.bot_name = "main".to_string();
        config.price_monitor.interval_seconds = 0;
        config.price_monitor.token_ids = vec!["1".to_string()];

        let handles = spawn_all(&config, &bots_with("main"), &sources());
        assert!(handles.is_empty());
    }
}
