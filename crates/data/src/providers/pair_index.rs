//! Case-insensitive lookup of tradeable pairs.

use crate::error::SyncError;
use std::collections::HashMap;
use trade_history_domain::PairDescriptor;

/// Two lookup tables over the exchange catalog: canonical ids and alternate names.
#[derive(Debug, Clone, Default)]
pub struct PairIndex {
    by_id: HashMap<String, PairDescriptor>,
    by_alt_name: HashMap<String, PairDescriptor>,
}

fn normalize(symbol: &str) -> String {
    symbol.trim().to_ascii_uppercase()
}

impl PairIndex {
    /// Builds the index from catalog entries.
    pub fn new(pairs: impl IntoIterator<Item = PairDescriptor>) -> Self {
        let mut index = Self::default();
        for pair in pairs {
            for alt in &pair.alt_names {
                index.by_alt_name.insert(normalize(alt), pair.clone());
            }
            index.by_id.insert(normalize(&pair.id), pair);
        }
        index
    }

    /// Resolves `symbol`; a canonical id match wins over an alternate name.
    ///
    /// # Errors
    /// Returns [`SyncError::PairNotFound`] when neither table matches.
    pub fn resolve(&self, symbol: &str) -> Result<PairDescriptor, SyncError> {
        let key = normalize(symbol);
        self.by_id
            .get(&key)
            .or_else(|| self.by_alt_name.get(&key))
            .cloned()
            .ok_or_else(|| SyncError::PairNotFound(symbol.to_string()))
    }

    /// Number of canonical pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}
