//! Error types for batch image generation

use thiserror::Error;

/// Result type alias for generation operations
pub type Result<T> = std::result::Result<T, GenerationError>;

/// Error types for loading prompts, calling the image API and saving results
#[derive(Error, Debug)]
pub enum GenerationError {
    /// Input/output errors (file not found, permission denied, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed CSV input
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A prompt row that cannot be processed
    #[error("Invalid prompt on line {line}: {reason}")]
    InvalidPrompt { line: usize, reason: String },

    /// Invalid configuration or parameters
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Transport-level failures talking to the API or downloading images
    #[error("Network error: {0}")]
    Network(String),

    /// The image API answered with an error
    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// The API answered with a body we could not interpret
    #[error("Response parsing error: {0}")]
    ResponseParsing(String),
}

impl GenerationError {
    /// Create a new invalid configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new response parsing error
    pub fn response_parsing<S: Into<String>>(msg: S) -> Self {
        Self::ResponseParsing(msg.into())
    }

    /// Create an invalid prompt error for a file line (the header is line 1)
    pub fn invalid_prompt<S: Into<String>>(line: usize, reason: S) -> Self {
        Self::InvalidPrompt {
            line,
            reason: reason.into(),
        }
    }

    /// Create an API error
    pub fn api<S: Into<String>>(status: u16, message: S) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Create file I/O error with operation context
    pub fn file_io_error<P: AsRef<std::path::Path>>(
        operation: &str,
        path: P,
        error: &std::io::Error,
    ) -> Self {
        let path_display = path.as_ref().display();
        Self::Io(std::io::Error::new(
            error.kind(),
            format!("Failed to {} '{}': {}", operation, path_display, error),
        ))
    }

    /// Create network error with request context
    pub fn network_error<S: Into<String>, E: std::fmt::Display>(context: S, error: E) -> Self {
        Self::Network(format!("{}: {}", context.into(), error))
    }

    /// Create configuration error with valid ranges
    pub fn config_value_error<T: std::fmt::Display>(
        parameter: &str,
        value: T,
        valid_range: &str,
        recommended: Option<T>,
    ) -> Self {
        let recommendation = match recommended {
            Some(rec) => format!(" Recommended: {}", rec),
            None => String::new(),
        };

        Self::Config(format!(
            "Invalid {}: {} (valid range: {}).{}",
            parameter, value, valid_range, recommendation
        ))
    }
}
