//! coinwatch: market and social monitoring daemon
//!
//! This library provides the core components for:
//! - A recurring-task runtime with per-job quiet-hours policies
//! - Watermark-deduplicated account post monitoring
//! - Token, DEX pair, NFT floor and prediction-market monitors
//! - A signed, self-healing announcement stream subscriber
//! - Webhook alert delivery with HMAC signing
//! - A small HTTP health surface

pub mod alert;
pub mod api;
pub mod cli;
pub mod config;
pub mod feeds;
pub mod schedule;
pub mod stream;
pub mod telemetry;
pub mod watch;
