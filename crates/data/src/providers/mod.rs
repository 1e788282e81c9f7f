//! Upstream market-data providers.

mod kraken;
mod pair_index;
mod wire;

pub use kraken::{DEFAULT_BASE_URL, KrakenClient, KrakenConfig, MAX_PAGE_SIZE};
pub use pair_index::PairIndex;
pub use wire::decode_trade;
