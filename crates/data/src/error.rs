use std::fmt;
use thiserror::Error;
use trade_history_domain::DomainError;

/// Upstream error prefixes that clear up on their own after backing off.
const TRANSIENT_UPSTREAM_PREFIXES: &[&str] = &[
    "EAPI:Rate limit exceeded",
    "EGeneral:Too many requests",
    "EService:",
];

const UNKNOWN_PAIR_PREFIX: &str = "EQuery:Unknown asset pair";

/// Flavor of a storage failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistenceErrorKind {
    /// Lost or unavailable connection; worth retrying.
    Connectivity,
    /// Integrity constraint violation (SQLSTATE class 23).
    Constraint,
    /// Schema conflict such as a missing table or column (SQLSTATE class 42).
    Schema,
    /// Anything else.
    Other,
}

impl fmt::Display for PersistenceErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PersistenceErrorKind::Connectivity => "connectivity",
            PersistenceErrorKind::Constraint => "constraint",
            PersistenceErrorKind::Schema => "schema",
            PersistenceErrorKind::Other => "other",
        };
        f.write_str(name)
    }
}

/// Classified failure of any sync component.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("pair not found: {0}")]
    PairNotFound(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("upstream returned errors: {}", .0.join("; "))]
    Upstream(Vec<String>),

    #[error("malformed record: {0}")]
    MalformedRecord(String),

    #[error("persistence error ({kind}): {message}")]
    Persistence {
        kind: PersistenceErrorKind,
        message: String,
    },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl SyncError {
    /// Whether retrying the same operation later may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            SyncError::Transport(_) => true,
            SyncError::Upstream(messages) => {
                !messages.is_empty()
                    && messages.iter().all(|m| {
                        TRANSIENT_UPSTREAM_PREFIXES
                            .iter()
                            .any(|prefix| m.starts_with(prefix))
                    })
            }
            SyncError::Persistence { kind, .. } => *kind == PersistenceErrorKind::Connectivity,
            SyncError::PairNotFound(_) | SyncError::MalformedRecord(_) | SyncError::Config(_) => {
                false
            }
        }
    }

    /// Classifies the `error` array of an upstream response.
    ///
    /// `symbol` is reported when the upstream rejects the pair itself.
    #[must_use]
    pub fn from_upstream(messages: Vec<String>, symbol: Option<&str>) -> Self {
        match symbol {
            Some(symbol) if messages.iter().any(|m| m.starts_with(UNKNOWN_PAIR_PREFIX)) => {
                SyncError::PairNotFound(symbol.to_string())
            }
            _ => SyncError::Upstream(messages),
        }
    }

    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        SyncError::MalformedRecord(message.into())
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return SyncError::MalformedRecord(err.to_string());
        }
        match err.status() {
            Some(status) if status.is_server_error() || status.as_u16() == 429 => {
                SyncError::Transport(err.to_string())
            }
            Some(status) => SyncError::Upstream(vec![format!("HTTP {status}")]),
            None => SyncError::Transport(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::MalformedRecord(err.to_string())
    }
}

impl From<sqlx::Error> for SyncError {
    fn from(err: sqlx::Error) -> Self {
        SyncError::Persistence {
            kind: persistence_kind(&err),
            message: err.to_string(),
        }
    }
}

impl From<DomainError> for SyncError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::InvalidTableName { .. } | DomainError::UnknownTier(_) => {
                SyncError::Config(err.to_string())
            }
            DomainError::UnknownSide(_)
            | DomainError::UnknownOrderType(_)
            | DomainError::InvalidCursor(_) => SyncError::MalformedRecord(err.to_string()),
        }
    }
}

fn persistence_kind(err: &sqlx::Error) -> PersistenceErrorKind {
    match err {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => PersistenceErrorKind::Connectivity,
        sqlx::Error::Database(db) => db
            .code()
            .as_deref()
            .map_or(PersistenceErrorKind::Other, sqlstate_kind),
        _ => PersistenceErrorKind::Other,
    }
}

/// Maps a Postgres SQLSTATE code to a persistence error kind.
fn sqlstate_kind(code: &str) -> PersistenceErrorKind {
    match code {
        // connection exceptions, admin/crash shutdown, serialization, deadlock, too many connections
        c if c.starts_with("08") || c.starts_with("57P0") => PersistenceErrorKind::Connectivity,
        "40001" | "40P01" | "53300" => PersistenceErrorKind::Connectivity,
        c if c.starts_with("23") => PersistenceErrorKind::Constraint,
        c if c.starts_with("42") => PersistenceErrorKind::Schema,
        _ => PersistenceErrorKind::Other,
    }
}
