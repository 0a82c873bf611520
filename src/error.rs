use thiserror::Error;

#[derive(Error, Debug)]
pub enum InteropError {
    #[error("Object store error: {message}")]
    Store { message: String },

    #[error("Reporting error: {message}")]
    Reporting { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Timeout: {message}")]
    Timeout { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),
}

impl InteropError {
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }

    pub fn reporting(message: impl Into<String>) -> Self {
        Self::Reporting {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout {
            message: message.into(),
        }
    }

    /// Whether the error came from talking to an external collaborator
    /// (object store, issue tracker) rather than from local processing.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            InteropError::Store { .. } | InteropError::Timeout { .. } | InteropError::Io(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, InteropError>;
