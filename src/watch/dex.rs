//! DEX pair monitor
//!
//! Full-refresh job over configured pair contracts, grouped by network. A
//! failing network is logged and skipped; the remaining networks still make
//! it into the digest.

use crate::alert::{format, Notifier};
use crate::feeds::{CmcClient, DexPairInfo};
use crate::schedule::Job;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Source of latest DEX pair quotes keyed by contract address.
#[async_trait]
pub trait PairSource: Send + Sync + 'static {
    async fn pair_quotes(
        &self,
        contract_addresses: &[String],
        network_id: &str,
    ) -> anyhow::Result<HashMap<String, DexPairInfo>>;
}

#[async_trait]
impl PairSource for CmcClient {
    async fn pair_quotes(
        &self,
        contract_addresses: &[String],
        network_id: &str,
    ) -> anyhow::Result<HashMap<String, DexPairInfo>> {
        self.dex_pair_quotes(contract_addresses, network_id).await
    }
}

#[async_trait]
impl<T: PairSource> PairSource for Arc<T> {
    async fn pair_quotes(
        &self,
        contract_addresses: &[String],
        network_id: &str,
    ) -> anyhow::Result<HashMap<String, DexPairInfo>> {
        (**self).pair_quotes(contract_addresses, network_id).await
    }
}

/// Periodic job publishing a DEX pair digest.
pub struct DexWatchJob<S: PairSource> {
    source: S,
    notifier: Arc<dyn Notifier>,
    /// Network id to pair contract addresses
    pairs: HashMap<String, Vec<String>>,
}

impl<S: PairSource> DexWatchJob<S> {
    pub fn new(
        source: S,
        notifier: Arc<dyn Notifier>,
        pairs: HashMap<String, Vec<String>>,
    ) -> Self {
        Self {
            source,
            notifier,
            pairs,
        }
    }
}

fn render_pair(info: &DexPairInfo) -> String {
    format!(
        "### {}\n- Price: ${}\n- 1h: {:+.2}%\n- Liquidity: {}\n- Venue: {} ({})\n- Updated: {}",
        info.name,
        format::price(info.price),
        info.percent_change_1h,
        format::liquidity(info.liquidity),
        info.dex_slug,
        info.network_slug,
        info.last_updated,
    )
}

#[async_trait]
impl<S: PairSource> Job for DexWatchJob<S> {
    fn name(&self) -> &str {
        "dex_monitor"
    }

    async fn run(&mut self) -> anyhow::Result<()> {
        // Stable network order for a deterministic digest
        let mut networks: Vec<&String> = self.pairs.keys().collect();
        networks.sort();

        let mut sections = Vec::new();
        for network in networks {
            let addresses = &self.pairs[network];
            if addresses.is_empty() {
                continue;
            }
            let quotes = match self.source.pair_quotes(addresses, network).await {
                Ok(q) => q,
                Err(e) => {
                    tracing::warn!(network = %network, error = %e, "dex quote fetch failed");
                    continue;
                }
            };
            for address in addresses {
                if let Some(info) = quotes.get(address) {
                    sections.push(render_pair(info));
                }
            }
        }

        if sections.is_empty() {
            tracing::debug!("no dex quotes this tick");
            return Ok(());
        }

        self.notifier
            .send_markdown("DEX pairs", &sections.join("\n\n"), &[], false)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::watch::testutil::RecordingNotifier;
    use std::sync::Mutex;

    struct StubPairs {
        by_network: HashMap<String, HashMap<String, DexPairInfo>>,
        failing_networks: Vec<String>,
        calls: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl PairSource for StubPairs {
        async fn pair_quotes(
            &self,
            _contract_addresses: &[String],
            network_id: &str,
        ) -> anyhow::Result<HashMap<String, DexPairInfo>> {
            self.calls.lock().unwrap().push(network_id.to_string());
            if self.failing_networks.iter().any(|n| n == network_id) {
                anyhow::bail!("network unavailable");
            }
            Ok(self.by_network.get(network_id).cloned().unwrap_or_default())
        }
    }

    fn pair(name: &str, network: &str) -> DexPairInfo {
        DexPairInfo {
            name: name.to_string(),
            price: 0.00042,
            percent_change_1h: 2.5,
            liquidity: 1_500_000.0,
            dex_slug: "uniswap-v3".to_string(),
            network_slug: network.to_string(),
            last_updated: "2025-06-01T12:00:00Z".to_string(),
        }
    }

    #[tokio::test]
    async fn failing_network_is_skipped_not_fatal() {
        let mut eth = HashMap::new();
        eth.insert("0xabc".to_string(), pair("WETH/USDC", "ethereum"));

        let mut by_network = HashMap::new();
        by_network.insert("1".to_string(), eth);

        let calls = Arc::new(Mutex::new(Vec::new()));
        let notifier = Arc::new(RecordingNotifier::new());

        let mut pairs = HashMap::new();
        pairs.insert("1".to_string(), vec!["0xabc".to_string()]);
        pairs.insert("56".to_string(), vec!["0xdef".to_string()]);

        let mut job = DexWatchJob::new(
            StubPairs {
                by_network,
                failing_networks: vec!["56".to_string()],
                calls: calls.clone(),
            },
            notifier.clone(),
            pairs,
        );

        job.run().await.unwrap();

        assert_eq!(calls.lock().unwrap().len(), 2);
        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("WETH/USDC"));
        assert!(sent[0].contains("1.50M(1500000)"));
    }

    #[tokio::test]
    async fn all_networks_failing_sends_nothing() {
        let notifier = Arc::new(RecordingNotifier::new());
        let mut pairs = HashMap::new();
        pairs.insert("1".to_string(), vec!["0xabc".to_string()]);

        let mut job = DexWatchJob::new(
            StubPairs {
                by_network: HashMap::new(),
                failing_networks: vec!["1".to_string()],
                calls: Arc::new(Mutex::new(Vec::new())),
            },
            notifier.clone(),
            pairs,
        );

        job.run().await.unwrap();
        assert!(notifier.sent().is_empty());
    }
}
