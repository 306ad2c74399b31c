use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Candidate strategy parameters failed range validation. Carries every
    /// violated rule so the caller can show them all at once.
    #[error("invalid configuration: {}", .0.join("; "))]
    ConfigValidation(Vec<String>),

    /// Network, timeout, rate-limit or malformed-response failure talking to
    /// the price source or the exchange. Safe to retry on the next cycle.
    #[error("transient external error: {0}")]
    Transient(String),

    /// The exchange refused the order.
    #[error("order rejected: {0}")]
    Rejected(String),

    #[error("storage error: {0}")]
    Storage(String),

    /// Unrecoverable startup problem (missing env var, malformed persisted config).
    #[error("configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Short tag used in logs and in the status `last_error` field.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::ConfigValidation(_) => "config_validation",
            Error::Transient(_) => "transient",
            Error::Rejected(_) => "rejected",
            Error::Storage(_) => "storage",
            Error::Config(_) => "config",
            Error::Json(_) => "json",
            Error::Io(_) => "io",
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Transient(_))
    }
}

impl From<sqlx::Error> for Error {
    fn from(e: sqlx::Error) -> Self {
        Error::Storage(e.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for Error {
    fn from(e: sqlx::migrate::MigrateError) -> Self {
        Error::Storage(e.to_string())
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_lists_every_violation() {
        let e = Error::ConfigValidation(vec!["a out of range".into(), "b too small".into()]);
        assert_eq!(
            e.to_string(),
            "invalid configuration: a out of range; b too small"
        );
        assert_eq!(e.kind(), "config_validation");
    }

    #[test]
    fn only_transient_errors_are_transient() {
        assert!(Error::Transient("timeout".into()).is_transient());
        assert!(!Error::Rejected("insufficient balance".into()).is_transient());
        assert!(!Error::Storage("disk full".into()).is_transient());
    }
}
