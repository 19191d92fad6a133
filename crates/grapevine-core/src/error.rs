use thiserror::Error;

/// Everything that can go wrong between the registry, the fetchers and the
/// local analytics.
#[derive(Error, Debug)]
pub enum Error {
    #[error("API request failed: {0}")]
    ApiError(String),

    #[error("Storage operation failed: {0}")]
    StorageError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Category '{0}' is protected and cannot be changed this way")]
    ProtectedCategory(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Authentication failed: {0}")]
    AuthError(String),

    #[error("OAuth state mismatch - refusing to continue the login")]
    CsrfMismatch,

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<grapevine_api::GitHubError> for Error {
    fn from(err: grapevine_api::GitHubError) -> Self {
        use grapevine_api::GitHubError;
        match err {
            GitHubError::NotFound(what) => Error::NotFound(what),
            GitHubError::RateLimitExceeded => Error::RateLimitExceeded,
            GitHubError::AuthRequired => Error::AuthError("GitHub rejected the token".into()),
            GitHubError::InvalidArgument(msg) => Error::InvalidInput(msg),
            GitHubError::NetworkError(e) => Error::NetworkError(e),
            other => Error::ApiError(other.to_string()),
        }
    }
}

impl From<grapevine_api::OAuthError> for Error {
    fn from(err: grapevine_api::OAuthError) -> Self {
        Error::AuthError(err.to_string())
    }
}

impl From<grapevine_api::GeocodeError> for Error {
    fn from(err: grapevine_api::GeocodeError) -> Self {
        use grapevine_api::GeocodeError;
        match err {
            GeocodeError::InvalidCoordinates { .. } => Error::InvalidInput(err.to_string()),
            GeocodeError::NetworkError(e) => Error::NetworkError(e),
            other => Error::ApiError(other.to_string()),
        }
    }
}

impl From<grapevine_store::StoreError> for Error {
    fn from(err: grapevine_store::StoreError) -> Self {
        Error::StorageError(err.to_string())
    }
}
