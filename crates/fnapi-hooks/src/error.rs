use fnapi_store::StoreError;
use thiserror::Error;

/// Errors that abort a guarded operation.
///
/// Storage errors travel through the hook pipeline untouched, so a caller
/// sees the same error whether a listener or the operation produced it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HookError {
    /// A listener vetoed the operation.
    #[error("rejected by {listener}: {reason}")]
    Rejected { listener: String, reason: String },

    /// The subject at an interception point was not the expected variant.
    #[error("hook subject mismatch: expected {expected}, got {found}")]
    SubjectMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl HookError {
    pub fn rejected(listener: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Rejected {
            listener: listener.into(),
            reason: reason.into(),
        }
    }
}

/// Result alias for hook operations.
pub type HookResult<T> = Result<T, HookError>;
