use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Required template {display_name} not found ({})", .path.display())]
    MissingTemplate { display_name: String, path: PathBuf },

    #[error("Case file count ({cases}) does not match macro file count ({macros})")]
    PairingMismatch { cases: usize, macros: usize },

    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CoreError {
    /// Attach the offending path to an I/O error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_pairing_mismatch() {
        let err = CoreError::PairingMismatch {
            cases: 3,
            macros: 2,
        };
        assert_eq!(
            err.to_string(),
            "Case file count (3) does not match macro file count (2)"
        );
    }

    #[test]
    fn io_error_keeps_source() {
        let err = CoreError::io("/tmp/out", std::io::Error::other("disk full"));
        assert!(err.to_string().contains("/tmp/out"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
