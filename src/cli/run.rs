//! Run command implementation

use crate::alert::{Notifier, WebhookBot, WebhookConfig};
use crate::config::Config;
use crate::stream::{
    AnnouncementHandler, StreamConfig, StreamHandle, StreamSubscriber, DEFAULT_TOPICS,
};
use crate::watch::{self, Sources};
use clap::Args;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Args, Debug)]
pub struct RunArgs {}

impl RunArgs {
    /// Wire everything from config, run until ctrl-c, then drain.
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let bots = build_bots(config);
        let sources = Sources::from_config(config);

        let handles = watch::spawn_all(config, &bots, &sources);
        let stream = spawn_stream(config, &bots);

        let server_port = config.server.port;
        let api = tokio::spawn(async move {
            if let Err(e) = crate::api::serve(server_port).await {
                tracing::error!(error = %e, "http server exited");
            }
        });

        tokio::signal::ctrl_c().await?;
        tracing::info!("shutdown requested");

        for handle in &handles {
            handle.stop();
        }
        if let Some(stream) = &stream {
            stream.stop();
        }
        for handle in handles {
            handle.join().await;
        }
        if let Some(stream) = stream {
            stream.join().await;
        }
        api.abort();

        tracing::info!("shutdown complete");
        Ok(())
    }
}

/// One webhook bot per config entry, shared by name.
pub(crate) fn build_bots(config: &Config) -> HashMap<String, Arc<dyn Notifier>> {
    config
        .bots
        .iter()
        .map(|(name, bot)| {
            let webhook = WebhookBot::new(WebhookConfig::new(
                bot.access_token.clone(),
                bot.secret.clone(),
                bot.keyword.clone(),
            ));
            (name.clone(), Arc::new(webhook) as Arc<dyn Notifier>)
        })
        .collect()
}

fn spawn_stream(
    config: &Config,
    bots: &HashMap<String, Arc<dyn Notifier>>,
) -> Option<StreamHandle> {
    let c = &config.announcements;
    if c.api_key.is_empty() || c.secret_key.is_empty() {
        return None;
    }

    let Some(notifier) = bots.get(&c.bot_name).cloned() else {
        tracing::warn!(bot = %c.bot_name, "announcement bot not configured, stream not started");
        return None;
    };

    let topics = if c.topics.is_empty() {
        DEFAULT_TOPICS.iter().map(|t| t.to_string()).collect()
    } else {
        c.topics.clone()
    };

    let stream_config = StreamConfig::new(c.api_key.clone(), c.secret_key.clone())
        .topics(topics)
        .proxy(c.proxy_url.clone());

    Some(StreamSubscriber::new(stream_config).spawn(AnnouncementHandler::new(notifier)))
}
