use std::fmt;

/// Errors shared across both processes: bad wire shapes, signing failures.
/// Each side wraps this in its own richer error enum (`BrainError`,
/// `GateError`) the way the teacher's `TradeError` wraps `ApiError`.
#[derive(Debug)]
pub enum CoreError {
    Serialization(serde_json::Error),
    InvalidOccSymbol(String),
    Signing(String),
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreError::Serialization(e) => write!(f, "serialization error: {e}"),
            CoreError::InvalidOccSymbol(s) => write!(f, "invalid OCC symbol: {s}"),
            CoreError::Signing(m) => write!(f, "signing error: {m}"),
        }
    }
}

impl std::error::Error for CoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CoreError::Serialization(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::Serialization(e)
    }
}
