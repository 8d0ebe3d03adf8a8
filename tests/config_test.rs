//! Configuration integration tests

use coinwatch::config::Config;
use coinwatch::schedule::QuietBehavior;

#[test]
fn example_config_loads_and_matches_defaults() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config.yaml.example");
    let config = Config::load(path).expect("example config must stay parseable");

    assert_eq!(config.server.port, 8080);
    assert_eq!(config.telemetry.log_level, "info");
    assert!(config.bots.contains_key("main"));

    assert_eq!(config.price_monitor.token_ids, vec!["1", "1027"]);
    let quiet = config.price_monitor.quiet_hours.as_ref().unwrap();
    assert!(quiet.enabled);
    assert_eq!(quiet.behavior, QuietBehavior::Throttle);
    assert_eq!(quiet.throttle_multiplier, 5);

    // Stream stays disabled until credentials are filled in
    assert!(config.announcements.api_key.is_empty());

    assert_eq!(
        config.digest_monitor.modules,
        vec!["token_price", "prediction"]
    );
}

#[test]
fn minimal_config_gets_defaults() {
    let config: Config = serde_yaml::from_str("{}").unwrap();
    assert_eq!(config.server.port, 8080);
    assert_eq!(config.telemetry.log_level, "info");
    assert_eq!(config.post_monitor.interval_seconds, 0);
}
