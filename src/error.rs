//! Error types for quill.

use thiserror::Error;

/// Errors raised while assembling a statement.
///
/// These are recorded inside the builder by the first failing call and
/// returned from every subsequent `render()`, so they must be cheap to clone.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    /// The statement is structurally incomplete (e.g. SELECT without FROM).
    #[error("Configuration error: {0}")]
    Config(String),

    /// A condition string matched none of the recognized shapes.
    #[error("Parse error in '{input}': {message}")]
    Parse { input: String, message: String },

    /// A keyword the MySQL dialect does not know.
    #[error("Unsupported by dialect: '{0}'")]
    Unsupported(String),
}

impl BuildError {
    /// Create a parse error for the given input.
    pub fn parse(input: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            input: input.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

/// The main error type for quill operations.
#[derive(Debug, Error)]
pub enum QuillError {
    /// The query could not be built.
    #[error(transparent)]
    Build(#[from] BuildError),

    /// Error returned by the database driver, passed through untouched.
    #[error(transparent)]
    Database(#[from] sqlx::Error),

    /// Connection error.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Configuration file error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed configuration file.
    #[error("Invalid config file: {0}")]
    Toml(#[from] toml::de::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for quill operations.
pub type QuillResult<T> = Result<T, QuillError>;

/// Result type alias for builder-level operations.
pub type BuildResult<T> = Result<T, BuildError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BuildError::parse("age ~ 3", "no operator found");
        assert_eq!(
            err.to_string(),
            "Parse error in 'age ~ 3': no operator found"
        );
    }

    #[test]
    fn test_build_error_is_transparent() {
        let err: QuillError = BuildError::config("SELECT without FROM").into();
        assert_eq!(err.to_string(), "Configuration error: SELECT without FROM");
    }
}
