use crate::core::validation::ValidationError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Dsp2Error {
    #[error("Client construction error: {0}")]
    ConstructionError(String),

    #[error("Authentication failed: {0}")]
    AuthenticationError(#[source] AuthError),

    #[error("Failed {method} {path}: {cause}")]
    RequestError {
        method: &'static str,
        path: String,
        #[source]
        cause: TransportError,
    },

    #[error("Validation error: {0}")]
    ValidationError(#[from] ValidationError),

    #[error("Configuration error: {0}")]
    ConfigError(#[from] crate::core::config::ConfigError),
}

/// Why a single HTTP exchange failed
#[derive(Error, Debug)]
pub enum TransportError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("invalid JSON response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("token request failed: {0}")]
    TokenRequest(#[source] Box<Dsp2Error>),

    #[error("token response did not contain an access token")]
    MissingToken,
}

impl Dsp2Error {
    pub(crate) fn request(
        method: &'static str,
        path: &str,
        cause: impl Into<TransportError>,
    ) -> Self {
        Self::RequestError {
            method,
            path: path.to_string(),
            cause: cause.into(),
        }
    }

    /// HTTP status of the failed exchange, when the server answered at all
    pub fn status(&self) -> Option<reqwest::StatusCode> {
        match self {
            Self::RequestError {
                cause: TransportError::Status { status, .. },
                ..
            } => Some(*status),
            Self::AuthenticationError(AuthError::TokenRequest(inner)) => inner.status(),
            _ => None,
        }
    }
}
