use thiserror::Error;

/// Errors produced when parsing or converting domain types.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid call status: {0}")]
    InvalidCallStatus(String),

    #[error("invalid route kind: {0}")]
    InvalidRouteKind(String),
}
