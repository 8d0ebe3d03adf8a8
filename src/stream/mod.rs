//! Long-lived announcement stream
//!
//! Signed websocket subscription with keep-alive and unbounded reconnect.

mod announcement;
mod subscriber;

pub use announcement::AnnouncementHandler;
pub use subscriber::{StreamConfig, StreamHandle, StreamSubscriber, STREAM_BASE_URL};

use async_trait::async_trait;
use thiserror::Error;

/// Default subscription topics when config leaves them unset.
pub const DEFAULT_TOPICS: [&str; 2] = ["com_announcement_en", "com_announcement_cn"];

/// Stream connection errors
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("connect failed: {0}")]
    Connect(String),
    #[error("proxy tunnel failed: {0}")]
    Proxy(String),
    #[error("signing failed: {0}")]
    Signing(String),
}

/// Consumer of raw text frames from the stream.
#[async_trait]
pub trait FrameHandler: Send + Sync + 'static {
    async fn handle(&self, raw: &str);
}
