use std::fmt;

/// Errors coming from external collaborators: the broker API, the ledger.
#[derive(Debug)]
pub enum ApiError {
    Http(reqwest::Error),
    Json(serde_json::Error),
    Db(sqlx::Error),
    Other(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Http(e) => write!(f, "HTTP error: {}", e),
            ApiError::Json(e) => write!(f, "JSON error: {}", e),
            ApiError::Db(e) => write!(f, "database error: {}", e),
            ApiError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ApiError::Http(e) => Some(e),
            ApiError::Json(e) => Some(e),
            ApiError::Db(e) => Some(e),
            ApiError::Other(_) => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Http(err)
    }
}
impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Json(err)
    }
}
impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        ApiError::Db(err)
    }
}

/// Errors at the gate-evaluation level: wraps `ApiError` plus the
/// "internal invariant violation" case spec §7 asks for (log fully,
/// return 500 with a generic message).
#[derive(Debug)]
pub enum GateError {
    Api(ApiError),
    Invariant(String),
}

impl fmt::Display for GateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GateError::Api(e) => write!(f, "{e}"),
            GateError::Invariant(m) => write!(f, "internal invariant violation: {m}"),
        }
    }
}

impl std::error::Error for GateError {}

impl From<ApiError> for GateError {
    fn from(e: ApiError) -> Self {
        GateError::Api(e)
    }
}
impl From<sqlx::Error> for GateError {
    fn from(e: sqlx::Error) -> Self {
        GateError::Api(e.into())
    }
}
impl From<reqwest::Error> for GateError {
    fn from(e: reqwest::Error) -> Self {
        GateError::Api(e.into())
    }
}
