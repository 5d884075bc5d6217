use thiserror::Error;

use loadsmith_core::ConfigError;

/// SQLSTATE reported for transport failures that carry no server code.
pub const CONNECTION_FAILURE: &str = "08006";

/// Database error reduced to what the retry policy needs.
#[derive(Debug, Clone, Error)]
#[error("{message} (sqlstate {})", .code.as_deref().unwrap_or("none"))]
pub struct DbError {
    /// Five-character SQLSTATE, when the driver reported one.
    pub code: Option<String>,
    pub message: String,
}

impl DbError {
    pub fn new(code: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            code: code.map(str::to_string),
            message: message.into(),
        }
    }

    pub fn with_code(code: &str, message: impl Into<String>) -> Self {
        Self::new(Some(code), message)
    }

    pub fn connection_failure(message: impl Into<String>) -> Self {
        Self::with_code(CONNECTION_FAILURE, message)
    }

    /// The connection that produced this error can no longer be used.
    pub fn is_connection_failure(&self) -> bool {
        self.code.as_deref() == Some(CONNECTION_FAILURE)
    }
}

/// Unrecoverable classification of a database error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FatalKind {
    /// The call site used up its retry budget.
    RetryBudgetExhausted,
    /// SQLSTATE class `5`.
    ServerFatal,
    /// Anything the policy does not recognize.
    Unclassified,
}

impl FatalKind {
    /// Process exit status reserved for this kind.
    pub fn exit_code(self) -> i32 {
        match self {
            FatalKind::RetryBudgetExhausted => 5,
            FatalKind::ServerFatal => 6,
            FatalKind::Unclassified => 255,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FatalKind::RetryBudgetExhausted => "retry_budget_exhausted",
            FatalKind::ServerFatal => "server_fatal",
            FatalKind::Unclassified => "unclassified",
        }
    }
}

/// A database error that must stop the run.
#[derive(Debug, Clone, Error)]
#[error("fatal {} in {site}: {source}", .kind.as_str())]
pub struct FatalError {
    pub kind: FatalKind,
    /// Call site that gave up (create phase, load phase, ...).
    pub site: String,
    pub source: DbError,
}

impl FatalError {
    pub fn exit_code(&self) -> i32 {
        self.kind.exit_code()
    }
}

/// Errors emitted by the load engine.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("database error: {0}")]
    Database(#[from] DbError),
    #[error("{0}")]
    Fatal(#[from] FatalError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("workload error: {0}")]
    Workload(String),
}

impl LoadError {
    /// The fatal classification, if this error must end the process.
    pub fn as_fatal(&self) -> Option<&FatalError> {
        match self {
            LoadError::Fatal(fatal) => Some(fatal),
            _ => None,
        }
    }

    pub fn is_connection_failure(&self) -> bool {
        matches!(self, LoadError::Database(db) if db.is_connection_failure())
    }
}
