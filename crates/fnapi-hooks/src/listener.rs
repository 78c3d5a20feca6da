use std::sync::Arc;

use async_trait::async_trait;
use fnapi_store::Context;

use crate::error::HookResult;
use crate::subject::HookSubject;

/// A callback bound to a lifecycle event.
///
/// Returning `Err` aborts the guarded operation with that error. Listeners
/// run on the caller's task; a panic in a listener is not caught.
#[async_trait]
pub trait Listener: Send + Sync {
    /// Name used in logs and for inspection.
    fn name(&self) -> &str;

    /// Observe, veto, or rewrite `subject`.
    async fn call(&self, ctx: &Context, subject: &mut HookSubject) -> HookResult<()>;
}

/// Adapts a plain closure into a [`Listener`].
pub struct FnListener<F> {
    name: String,
    f: F,
}

#[async_trait]
impl<F> Listener for FnListener<F>
where
    F: Fn(&Context, &mut HookSubject) -> HookResult<()> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn call(&self, ctx: &Context, subject: &mut HookSubject) -> HookResult<()> {
        (self.f)(ctx, subject)
    }
}

/// Build a named listener from a synchronous closure.
pub fn listener_fn<F>(name: impl Into<String>, f: F) -> Arc<dyn Listener>
where
    F: Fn(&Context, &mut HookSubject) -> HookResult<()> + Send + Sync + 'static,
{
    Arc::new(FnListener {
        name: name.into(),
        f,
    })
}
