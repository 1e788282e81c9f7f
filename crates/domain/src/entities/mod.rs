pub mod pair;
pub mod trade;

// Re-export for easier access
pub use pair::PairDescriptor;
pub use trade::{Trade, TradePage, epoch_nanos};
