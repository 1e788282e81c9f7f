//! Core domain types for the trade-history sync.
//!
//! Everything here is pure data: no I/O, no runtime. The data and engine
//! crates build on these types.

/// Entities exchanged between the fetcher, the store and the engine.
pub mod entities;
/// Enumerations shared across crates.
pub mod enums;
/// Domain validation errors.
pub mod error;
/// Validated value objects.
pub mod value_objects;

pub use entities::{PairDescriptor, Trade, TradePage};
pub use enums::{OrderType, RateLimitTier, Side};
pub use error::DomainError;
pub use value_objects::TableName;
