//! Error types for Spyglass Mail Core

/// Result type alias for Spyglass Mail operations
pub type SpyglassResult<T> = Result<T, SpyglassError>;

/// Main error type for Spyglass Mail
#[derive(Debug, thiserror::Error)]
pub enum SpyglassError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration directory not found
    #[error("Configuration directory not found")]
    ConfigDirNotFound,

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing errors
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization errors
    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    /// HTTP errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// URL parsing errors
    #[error("URL parsing error: {0}")]
    Url(#[from] url::ParseError),

    /// Graph API request rejected by the service
    #[error("Graph API error ({status}): {message}")]
    Graph {
        /// HTTP status code returned by the service
        status: u16,
        /// Truncated response body or status text
        message: String,
    },

    /// Authentication errors
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Operation requires a signed-in session
    #[error("Not signed in")]
    SignedOut,

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Invalid state errors
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl SpyglassError {
    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a new validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a new invalid state error
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    /// Create a new Graph API error
    pub fn graph(status: u16, message: impl Into<String>) -> Self {
        Self::Graph {
            status,
            message: message.into(),
        }
    }

    /// Check if this is a network-related error
    pub fn is_network_error(&self) -> bool {
        match self {
            Self::Http(_) => true,
            Self::Graph { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Check if this is an authentication error
    pub fn is_auth_error(&self) -> bool {
        match self {
            Self::Authentication(_) | Self::SignedOut => true,
            Self::Graph { status, .. } => *status == 401 || *status == 403,
            _ => false,
        }
    }
}
