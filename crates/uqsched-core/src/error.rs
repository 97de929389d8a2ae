//! Crate-wide error type.
//!
//! Errors fall into three classes that matter to callers: configuration
//! problems caught at construction time, numerical degeneracies that cannot be
//! recovered locally, and simulation failures raised inside a worker. All of
//! them are fatal to the current construction; there is no retry path.

/// Errors produced by uqsched.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid or inconsistent configuration, detected before any work starts.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A numerical operation has no usable result (e.g. a singular decomposition).
    #[error("numerical degeneracy: {0}")]
    Numeric(String),

    /// A simulator could not produce a valid result for a sample.
    #[error("simulation failed: {0}")]
    Simulation(String),

    /// The worker pool shut down while jobs were outstanding.
    #[error("worker pool disconnected")]
    Disconnected,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub(crate) fn numeric(message: impl Into<String>) -> Self {
        Self::Numeric(message.into())
    }

    pub(crate) fn simulation(message: impl Into<String>) -> Self {
        Self::Simulation(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_carry_context() {
        let e = Error::config("variance threshold must be in (0, 1]");
        assert_eq!(
            e.to_string(),
            "invalid configuration: variance threshold must be in (0, 1]"
        );
        let e = Error::simulation("non-finite temperature");
        assert!(e.to_string().contains("non-finite temperature"));
    }

    #[test]
    fn test_json_error_converts() {
        let parse: std::result::Result<u32, _> = serde_json::from_str("not json");
        let e: Error = parse.unwrap_err().into();
        assert!(matches!(e, Error::Json(_)));
    }
}
