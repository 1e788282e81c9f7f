use crate::entities::PairDescriptor;
use crate::error::DomainError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Suffix appended to the lower-cased pair id.
pub const TABLE_SUFFIX: &str = "_kraken_trades";

/// Postgres truncates identifiers longer than this.
const MAX_IDENTIFIER_LEN: usize = 63;

/// A validated SQL table identifier.
///
/// Only `[a-z0-9_]` is accepted. Statements always use [`TableName::quoted`],
/// so names such as `1inchusd_kraken_trades` are valid too.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TableName(String);

impl TableName {
    /// Validates an explicit table name.
    ///
    /// # Errors
    /// Returns [`DomainError::InvalidTableName`] if the name is empty, too
    /// long, or contains anything outside `[a-z0-9_]`.
    pub fn new(name: impl Into<String>) -> Result<Self, DomainError> {
        let name = name.into();
        let invalid = |reason| DomainError::InvalidTableName {
            name: name.clone(),
            reason,
        };

        if name.is_empty() {
            return Err(invalid("name is empty"));
        }
        if name.len() > MAX_IDENTIFIER_LEN {
            return Err(invalid("longer than 63 bytes"));
        }
        if !name.chars().all(is_identifier_char) {
            return Err(invalid("only [a-z0-9_] is allowed"));
        }
        Ok(Self(name))
    }

    /// Table holding the trade history of `pair`.
    ///
    /// The id is lower-cased and every character outside `[a-z0-9_]`
    /// (`.` in `ETH2.SETH`, `/` in websocket names) becomes `_`.
    ///
    /// # Errors
    /// Fails if the resulting name is longer than 63 bytes.
    pub fn for_pair(pair: &PairDescriptor) -> Result<Self, DomainError> {
        let stem: String = pair
            .id
            .to_ascii_lowercase()
            .chars()
            .map(|c| if is_identifier_char(c) { c } else { '_' })
            .collect();
        Self::new(format!("{stem}{TABLE_SUFFIX}"))
    }

    /// Double-quoted form for interpolation into SQL.
    #[must_use]
    pub fn quoted(&self) -> String {
        format!("\"{}\"", self.0)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_identifier_char(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_'
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for TableName {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TableName> for String {
    fn from(value: TableName) -> Self {
        value.0
    }
}
