use options_engine_core::CoreError;
use std::fmt;

/// Errors coming from external API calls (broker HTTP, WS, JSON).
#[derive(Debug)]
pub enum ApiError {
    Http(reqwest::Error),
    Json(serde_json::Error),
    WebSocket(String),
    Other(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Http(e) => write!(f, "HTTP error: {e}"),
            ApiError::Json(e) => write!(f, "JSON error: {e}"),
            ApiError::WebSocket(e) => write!(f, "WebSocket error: {e}"),
            ApiError::Other(m) => write!(f, "{m}"),
        }
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ApiError::Http(e) => Some(e),
            ApiError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        ApiError::Http(e)
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        ApiError::Json(e)
    }
}

/// Errors at the Brain's engine level: wraps `ApiError` plus domain
/// validation issues raised by strategies and the position manager.
#[derive(Debug)]
pub enum BrainError {
    Api(ApiError),
    Core(CoreError),
    InvalidState(String),
    Io(std::io::Error),
}

impl fmt::Display for BrainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BrainError::Api(e) => write!(f, "{e}"),
            BrainError::Core(e) => write!(f, "{e}"),
            BrainError::InvalidState(m) => write!(f, "invalid state: {m}"),
            BrainError::Io(e) => write!(f, "io error: {e}"),
        }
    }
}

impl std::error::Error for BrainError {}

impl From<ApiError> for BrainError {
    fn from(e: ApiError) -> Self {
        BrainError::Api(e)
    }
}

impl From<CoreError> for BrainError {
    fn from(e: CoreError) -> Self {
        BrainError::Core(e)
    }
}

impl From<std::io::Error> for BrainError {
    fn from(e: std::io::Error) -> Self {
        BrainError::Io(e)
    }
}

impl From<reqwest::Error> for BrainError {
    fn from(e: reqwest::Error) -> Self {
        BrainError::Api(ApiError::Http(e))
    }
}
