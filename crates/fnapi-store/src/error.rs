use std::fmt;

use fnapi_types::CallStatus;

/// Coarse classification of a [`StoreError`], used by callers that map
/// errors onto responses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    NotFound,
    AlreadyExists,
    Conflict,
    Cancelled,
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Validation => "validation",
            Self::NotFound => "not_found",
            Self::AlreadyExists => "already_exists",
            Self::Conflict => "conflict",
            Self::Cancelled => "cancelled",
            Self::Internal => "internal",
        };
        f.write_str(s)
    }
}

/// Errors from store operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// No app was supplied, or a route names no app.
    #[error("missing app")]
    EmptyApp,

    #[error("missing app name")]
    EmptyAppName,

    #[error("missing app id")]
    EmptyAppId,

    #[error("missing route")]
    EmptyRoute,

    #[error("missing route path")]
    EmptyRoutePath,

    #[error("missing call id")]
    EmptyCallId,

    #[error("app not found: {0}")]
    AppNotFound(String),

    #[error("route not found: {app}{path}")]
    RouteNotFound { app: String, path: String },

    #[error("call not found: {0}")]
    CallNotFound(String),

    #[error("call log not found: {0}")]
    CallLogNotFound(String),

    #[error("app already exists: {0}")]
    AppAlreadyExists(String),

    #[error("route already exists: {app}{path}")]
    RouteAlreadyExists { app: String, path: String },

    #[error("call already exists: {0}")]
    CallAlreadyExists(String),

    /// Conditional call update found a different persisted status.
    #[error("call {id} is {actual}, expected {expected}")]
    Conflict {
        id: String,
        expected: CallStatus,
        actual: CallStatus,
    },

    #[error("context cancelled")]
    Cancelled,

    #[error("context deadline exceeded")]
    DeadlineExceeded,

    #[error("internal store error: {0}")]
    Internal(String),
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::EmptyApp
            | Self::EmptyAppName
            | Self::EmptyAppId
            | Self::EmptyRoute
            | Self::EmptyRoutePath
            | Self::EmptyCallId => ErrorKind::Validation,
            Self::AppNotFound(_)
            | Self::RouteNotFound { .. }
            | Self::CallNotFound(_)
            | Self::CallLogNotFound(_) => ErrorKind::NotFound,
            Self::AppAlreadyExists(_)
            | Self::RouteAlreadyExists { .. }
            | Self::CallAlreadyExists(_) => ErrorKind::AlreadyExists,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::Cancelled | Self::DeadlineExceeded => ErrorKind::Cancelled,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    pub(crate) fn poisoned<E: fmt::Display>(err: E) -> Self {
        Self::Internal(format!("lock poisoned: {err}"))
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds() {
        assert_eq!(StoreError::EmptyRoutePath.kind(), ErrorKind::Validation);
        assert_eq!(StoreError::CallLogNotFound("c".into()).kind(), ErrorKind::NotFound);
        assert_eq!(
            StoreError::Conflict {
                id: "c".into(),
                expected: CallStatus::Queued,
                actual: CallStatus::Running,
            }
            .kind(),
            ErrorKind::Conflict
        );
        assert_eq!(StoreError::DeadlineExceeded.kind(), ErrorKind::Cancelled);
    }

    #[test]
    fn conflict_message_names_both_states() {
        let err = StoreError::Conflict {
            id: "c1".into(),
            expected: CallStatus::Queued,
            actual: CallStatus::Success,
        };
        assert_eq!(err.to_string(), "call c1 is success, expected queued");
    }
}
