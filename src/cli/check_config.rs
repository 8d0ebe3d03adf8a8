//! Check-config command implementation

use crate::config::Config;
use clap::Args;

#[derive(Args, Debug)]
pub struct CheckConfigArgs {}

impl CheckConfigArgs {
    /// Validate cross-references in an already-parsed config.
    pub fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let problems = validate(config);

        println!("bots: {}", config.bots.len());
        for (name, enabled) in enabled_monitors(config) {
            println!("monitor {}: {}", name, if enabled { "on" } else { "off" });
        }

        if problems.is_empty() {
            println!("configuration ok");
            return Ok(());
        }
        for problem in &problems {
            eprintln!("problem: {}", problem);
        }
        anyhow::bail!("{} configuration problem(s)", problems.len())
    }
}

fn enabled_monitors(config: &Config) -> Vec<(&'static str, bool)> {
    vec![
        (
            "price_monitor",
            config.price_monitor.interval_seconds > 0
                && !config.price_monitor.token_ids.is_empty(),
        ),
        (
            "dex_monitor",
            config.dex_monitor.interval_seconds > 0 && !config.dex_monitor.pairs.is_empty(),
        ),
        (
            "floor_monitor",
            config.floor_monitor.interval_seconds > 0
                && !config.floor_monitor.collections.is_empty(),
        ),
        (
            "market_monitor",
            config.market_monitor.interval_seconds > 0
                && !config.market_monitor.market_ids.is_empty(),
        ),
        (
            "post_monitor",
            config.post_monitor.interval_seconds > 0
                && !config.post_monitor.usernames.is_empty(),
        ),
        (
            "digest_monitor",
            config.digest_monitor.interval_seconds > 0
                && !config.digest_monitor.modules.is_empty(),
        ),
        (
            "announcements",
            !config.announcements.api_key.is_empty()
                && !config.announcements.secret_key.is_empty(),
        ),
    ]
}

/// Every enabled section must point at a configured bot.
fn validate(config: &Config) -> Vec<String> {
    let mut problems = Vec::new();

    let mut check_bot = |section: &str, enabled: bool, bot_name: &str| {
        if enabled && !config.bots.contains_key(bot_name) {
            problems.push(format!(
                "{} references unknown bot \"{}\"",
                section, bot_name
            ));
        }
    };

    for (name, enabled) in enabled_monitors(config) {
        let bot_name = match name {
            "price_monitor" => &config.price_monitor.bot_name,
            "dex_monitor" => &config.dex_monitor.bot_name,
            "floor_monitor" => &config.floor_monitor.bot_name,
            "market_monitor" => &config.market_monitor.bot_name,
            "post_monitor" => &config.post_monitor.bot_name,
            "digest_monitor" => &config.digest_monitor.bot_name,
            "announcements" => &config.announcements.bot_name,
            _ => continue,
        };
        check_bot(name, enabled, bot_name);
    }

    for (name, quiet_hours) in [
        ("price_monitor", &config.price_monitor.quiet_hours),
        ("dex_monitor", &config.dex_monitor.quiet_hours),
        ("floor_monitor", &config.floor_monitor.quiet_hours),
        ("market_monitor", &config.market_monitor.quiet_hours),
        ("post_monitor", &config.post_monitor.quiet_hours),
        ("digest_monitor", &config.digest_monitor.quiet_hours),
    ] {
        if let Some(quiet_hours) = quiet_hours {
            if quiet_hours.start_hour > 23 || quiet_hours.end_hour > 23 {
                problems.push(format!("{} quiet hours outside 0-23", name));
            }
        }
    }

    problems
}
