use thiserror::Error;

/// Unified error type for hg-resource operations
#[derive(Error, Debug)]
pub enum HgResourceError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{context}")]
    Backend { context: String, output: String },

    #[error("Unknown revision '{reference}'")]
    UnknownReference { reference: String, output: String },

    #[error("Version resolution failed: {context}")]
    Resolution { context: String, output: String },

    #[error("Push still rejected after {attempts} attempts: destination kept moving")]
    RetriesExhausted { attempts: u32, output: String },

    #[error("Resource error: {0}")]
    Resource(String),

    #[error("Metadata error: {0}")]
    Metadata(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Settings file error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Convenience type alias for Results in hg-resource
pub type Result<T> = std::result::Result<T, HgResourceError>;

impl HgResourceError {
    /// Create a configuration error with context
    pub fn config(msg: impl Into<String>) -> Self {
        HgResourceError::Config(msg.into())
    }

    /// Create a resource (filesystem, temp dir, agent) error with context
    pub fn resource(msg: impl Into<String>) -> Self {
        HgResourceError::Resource(msg.into())
    }

    /// Create a metadata parsing error with context
    pub fn metadata(msg: impl Into<String>) -> Self {
        HgResourceError::Metadata(msg.into())
    }

    /// Create a backend invocation error carrying the raw diagnostic text
    pub fn backend(context: impl Into<String>, output: impl Into<String>) -> Self {
        HgResourceError::Backend {
            context: context.into(),
            output: output.into(),
        }
    }

    /// Raw backend diagnostic text attached to this error, if any.
    ///
    /// The binary echoes it verbatim before the single diagnostic line.
    pub fn output(&self) -> Option<&str> {
        match self {
            HgResourceError::Backend { output, .. }
            | HgResourceError::UnknownReference { output, .. }
            | HgResourceError::Resolution { output, .. }
            | HgResourceError::RetriesExhausted { output, .. } => {
                if output.trim().is_empty() {
                    None
                } else {
                    Some(output.as_str())
                }
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = HgResourceError::config("Repository URI must be provided");
        assert_eq!(
            err.to_string(),
            "Configuration error: Repository URI must be provided"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: HgResourceError = io_err.into();
        assert!(err.to_string().contains("I/O error"));
    }

    #[test]
    fn test_backend_error_keeps_output() {
        let err = HgResourceError::backend(
            "Error pushing to ssh://hg/repo",
            "abort: push creates new remote head 1a2b3c!\n",
        );
        assert_eq!(err.to_string(), "Error pushing to ssh://hg/repo");
        assert_eq!(
            err.output(),
            Some("abort: push creates new remote head 1a2b3c!\n")
        );
    }

    #[test]
    fn test_blank_output_is_not_reported() {
        let err = HgResourceError::backend("Error purging repository", "  \n");
        assert_eq!(err.output(), None);
        assert_eq!(HgResourceError::config("x").output(), None);
    }

    #[test]
    fn test_retries_exhausted_message() {
        let err = HgResourceError::RetriesExhausted {
            attempts: 10,
            output: String::new(),
        };
        assert!(err.to_string().contains("10 attempts"));
    }

    #[test]
    fn test_error_messages_are_descriptive() {
        let error_pairs = vec![
            (HgResourceError::config("x"), "Configuration error"),
            (HgResourceError::resource("x"), "Resource error"),
            (HgResourceError::metadata("x"), "Metadata error"),
            (
                HgResourceError::Resolution {
                    context: "x".to_string(),
                    output: String::new(),
                },
                "Version resolution failed",
            ),
        ];

        for (err, expected_prefix) in error_pairs {
            let msg = err.to_string();
            assert!(
                msg.starts_with(expected_prefix),
                "Error message should start with '{}', but got '{}'",
                expected_prefix,
                msg
            );
        }
    }
}
