use serde::{Deserialize, Serialize};

/// A tradeable pair as listed by the exchange catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PairDescriptor {
    /// Canonical identifier (e.g. `XXBTZUSD`).
    pub id: String,
    /// Human-facing alternate names (e.g. `XBTUSD`, `XBT/USD`).
    pub alt_names: Vec<String>,
}

impl PairDescriptor {
    pub fn new(id: impl Into<String>, alt_names: Vec<String>) -> Self {
        Self {
            id: id.into(),
            alt_names,
        }
    }

    /// The primary alternate name, falling back to the canonical id.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.alt_names.first().map_or(self.id.as_str(), String::as_str)
    }
}
