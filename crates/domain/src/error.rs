use thiserror::Error;

/// Errors raised while constructing domain values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("invalid table name '{name}': {reason}")]
    InvalidTableName { name: String, reason: &'static str },

    #[error("unknown trade side code '{0}'")]
    UnknownSide(String),

    #[error("unknown order type code '{0}'")]
    UnknownOrderType(String),

    #[error("unknown rate-limit tier '{0}' (expected starter, intermediate or pro)")]
    UnknownTier(String),

    #[error("invalid cursor marker '{0}'")]
    InvalidCursor(String),
}
