//! Request-scoped context passed to every store operation.
//!
//! A [`Context`] bundles a cancellation token, an optional deadline and the
//! parent span for anything traced underneath it. Cloning is cheap and clones
//! share cancellation.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::Span;

use crate::error::{StoreError, StoreResult};

#[derive(Clone, Debug)]
pub struct Context {
    cancel: CancellationToken,
    deadline: Option<Instant>,
    span: Span,
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}

impl Context {
    /// A root context: never cancelled on its own, no deadline, no span.
    pub fn background() -> Self {
        Self {
            cancel: CancellationToken::new(),
            deadline: None,
            span: Span::none(),
        }
    }

    /// A derived context that is cancelled when either `self` is cancelled
    /// or the returned context's own [`Context::cancel`] is called.
    pub fn child(&self) -> Self {
        Self {
            cancel: self.cancel.child_token(),
            deadline: self.deadline,
            span: self.span.clone(),
        }
    }

    /// A derived context whose deadline is at most `timeout` from now.
    /// An earlier inherited deadline wins.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let candidate = Instant::now() + timeout;
        let deadline = match self.deadline {
            Some(existing) if existing < candidate => existing,
            _ => candidate,
        };
        Self {
            deadline: Some(deadline),
            ..self.child()
        }
    }

    /// Same cancellation and deadline, different parent span.
    pub fn with_span(&self, span: Span) -> Self {
        Self {
            cancel: self.cancel.clone(),
            deadline: self.deadline,
            span,
        }
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Cancel this context and every context derived from it.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Fail fast if the context is already done.
    pub fn check(&self) -> StoreResult<()> {
        if self.cancel.is_cancelled() {
            return Err(StoreError::Cancelled);
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(StoreError::DeadlineExceeded);
            }
        }
        Ok(())
    }

    /// Drive `fut` to completion unless the context is cancelled or its
    /// deadline passes first, in which case `fut` is dropped.
    pub async fn run<T, E, F>(&self, fut: F) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
        E: From<StoreError>,
    {
        self.check()?;
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(StoreError::Cancelled.into()),
            _ = sleep_until(self.deadline) => Err(StoreError::DeadlineExceeded.into()),
            out = fut => out,
        }
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}
