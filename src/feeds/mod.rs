//! External data-source clients
//!
//! Thin REST fetchers with no interesting control flow: each returns typed
//! data or an error, and the monitors decide what a failure means for the
//! current tick.

mod cmc;
mod opensea;
mod prediction;
mod twitter;

pub use cmc::{CmcClient, DexPairInfo, TokenQuote};
pub use opensea::{FloorPriceInfo, OpenSeaClient};
pub use prediction::{MarketDetail, PredictionClient};
pub use twitter::{snowflake_to_time, Post, SearchRequest, TwitterClient};
