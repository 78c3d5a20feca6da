//! Hook registry: ordered listener lists per named event.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use fnapi_store::Context;

use crate::error::HookResult;
use crate::listener::Listener;
use crate::subject::HookSubject;

/// Which side of the guarded operation a listener runs on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Before,
    After,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Before => f.write_str("before"),
            Self::After => f.write_str("after"),
        }
    }
}

#[derive(Default)]
struct EventHooks {
    before: Vec<Arc<dyn Listener>>,
    after: Vec<Arc<dyn Listener>>,
}

impl EventHooks {
    fn stage(&self, stage: Stage) -> &[Arc<dyn Listener>] {
        match stage {
            Stage::Before => &self.before,
            Stage::After => &self.after,
        }
    }
}

/// Listeners registered per event name, in registration order.
///
/// Registration takes `&mut self` and happens at setup; once built the
/// registry is shared read-only (typically behind an `Arc`). Both stages
/// are fail-fast: the first listener error stops the chain and becomes the
/// result.
#[derive(Default)]
pub struct HookRegistry {
    events: BTreeMap<String, EventHooks>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a listener that runs ahead of `event`'s operation.
    pub fn register_before(&mut self, event: impl Into<String>, listener: Arc<dyn Listener>) {
        self.events.entry(event.into()).or_default().before.push(listener);
    }

    /// Append a listener that runs on `event`'s result.
    pub fn register_after(&mut self, event: impl Into<String>, listener: Arc<dyn Listener>) {
        self.events.entry(event.into()).or_default().after.push(listener);
    }

    /// Event names with at least one listener, sorted.
    pub fn events(&self) -> Vec<&str> {
        self.events.keys().map(String::as_str).collect()
    }

    /// Names of `event`'s before-listeners, in run order.
    pub fn before_listeners(&self, event: &str) -> Vec<&str> {
        self.listener_names(event, Stage::Before)
    }

    /// Names of `event`'s after-listeners, in run order.
    pub fn after_listeners(&self, event: &str) -> Vec<&str> {
        self.listener_names(event, Stage::After)
    }

    fn listener_names(&self, event: &str, stage: Stage) -> Vec<&str> {
        self.events
            .get(event)
            .map(|hooks| hooks.stage(stage).iter().map(|l| l.name()).collect())
            .unwrap_or_default()
    }

    /// Drop every listener for `event`. Returns `true` if any existed.
    pub fn clear(&mut self, event: &str) -> bool {
        self.events.remove(event).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Run `event`'s before-listeners over the request subject.
    pub async fn fire_before(
        &self,
        event: &str,
        ctx: &Context,
        subject: &mut HookSubject,
    ) -> HookResult<()> {
        self.fire(event, Stage::Before, ctx, subject).await
    }

    /// Run `event`'s after-listeners over the result subject.
    pub async fn fire_after(
        &self,
        event: &str,
        ctx: &Context,
        subject: &mut HookSubject,
    ) -> HookResult<()> {
        self.fire(event, Stage::After, ctx, subject).await
    }

    async fn fire(
        &self,
        event: &str,
        stage: Stage,
        ctx: &Context,
        subject: &mut HookSubject,
    ) -> HookResult<()> {
        let Some(hooks) = self.events.get(event) else {
            return Ok(());
        };
        for listener in hooks.stage(stage) {
            if let Err(err) = listener.call(ctx, subject).await {
                tracing::debug!(
                    event,
                    %stage,
                    listener = listener.name(),
                    error = %err,
                    "listener aborted operation"
                );
                return Err(err);
            }
        }
        Ok(())
    }

    /// Run before-listeners on `request`, then `op` on the (possibly
    /// rewritten) request, then after-listeners on its result.
    ///
    /// `op` never runs if a before-listener fails.
    pub async fn guard<F, Fut>(
        &self,
        event: &str,
        ctx: &Context,
        mut request: HookSubject,
        op: F,
    ) -> HookResult<HookSubject>
    where
        F: FnOnce(HookSubject) -> Fut,
        Fut: Future<Output = HookResult<HookSubject>>,
    {
        self.fire_before(event, ctx, &mut request).await?;
        let mut result = op(request).await?;
        self.fire_after(event, ctx, &mut result).await?;
        Ok(result)
    }
}

impl fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (event, hooks) in &self.events {
            map.entry(event, &(hooks.before.len(), hooks.after.len()));
        }
        map.finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use fnapi_store::StoreError;
    use fnapi_types::App;

    use super::*;
    use crate::error::HookError;
    use crate::events;
    use crate::listener::listener_fn;

    /// Appends its name to a shared trace, optionally failing.
    struct Recording {
        name: &'static str,
        trace: Arc<Mutex<Vec<&'static str>>>,
        fail: bool,
    }

    #[async_trait]
    impl Listener for Recording {
        fn name(&self) -> &str {
            self.name
        }

        async fn call(&self, _ctx: &Context, _subject: &mut HookSubject) -> HookResult<()> {
            self.trace.lock().unwrap().push(self.name);
            if self.fail {
                return Err(HookError::rejected(self.name, "not allowed"));
            }
            Ok(())
        }
    }

    fn recording(
        name: &'static str,
        trace: &Arc<Mutex<Vec<&'static str>>>,
        fail: bool,
    ) -> Arc<dyn Listener> {
        Arc::new(Recording {
            name,
            trace: trace.clone(),
            fail,
        })
    }

    fn app_subject(name: &str) -> HookSubject {
        HookSubject::App(App::named(name))
    }

    #[tokio::test]
    async fn listeners_run_in_registration_order() {
        let trace = Arc::new(Mutex::new(Vec::new()));
        let mut registry = HookRegistry::new();
        registry.register_before(events::APP_GET, recording("a", &trace, false));
        registry.register_before(events::APP_GET, recording("b", &trace, false));
        registry.register_after(events::APP_GET, recording("c", &trace, false));

        let out = registry
            .guard(
                events::APP_GET,
                &Context::background(),
                HookSubject::AppName("myapp".into()),
                |key| async move { Ok(HookSubject::App(App::named(key.into_app_name()?))) },
            )
            .await
            .unwrap();
        assert_eq!(out, app_subject("myapp"));
        assert_eq!(*trace.lock().unwrap(), ["a", "b", "c"]);
    }

    #[tokio::test]
    async fn failing_before_hook_short_circuits() {
        let trace = Arc::new(Mutex::new(Vec::new()));
        let ran = Arc::new(AtomicUsize::new(0));
        let mut registry = HookRegistry::new();
        registry.register_before(events::APP_GET, recording("a", &trace, true));
        registry.register_before(events::APP_GET, recording("b", &trace, false));
        registry.register_after(events::APP_GET, recording("after", &trace, false));

        let op_ran = ran.clone();
        let err = registry
            .guard(
                events::APP_GET,
                &Context::background(),
                HookSubject::AppName("myapp".into()),
                |key| async move {
                    op_ran.fetch_add(1, Ordering::SeqCst);
                    Ok(key)
                },
            )
            .await
            .unwrap_err();

        assert_eq!(err, HookError::rejected("a", "not allowed"));
        assert_eq!(*trace.lock().unwrap(), ["a"]);
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn after_hook_can_replace_result() {
        let mut registry = HookRegistry::new();
        registry.register_after(
            events::APP_GET,
            listener_fn("redact", |_ctx, subject| {
                if let HookSubject::App(app) = subject {
                    app.config.clear();
                }
                Ok(())
            }),
        );
        registry.register_after(
            events::APP_GET,
            listener_fn("swap", |_ctx, subject| {
                *subject = app_subject("replaced");
                Ok(())
            }),
        );

        let out = registry
            .guard(
                events::APP_GET,
                &Context::background(),
                HookSubject::AppName("myapp".into()),
                |_| async { Ok(HookSubject::App(App::named("myapp").with_config("SECRET", "x"))) },
            )
            .await
            .unwrap();
        assert_eq!(out, app_subject("replaced"));
    }

    #[tokio::test]
    async fn after_hook_error_replaces_result() {
        let trace = Arc::new(Mutex::new(Vec::new()));
        let mut registry = HookRegistry::new();
        registry.register_after(events::APP_GET, recording("x", &trace, true));
        registry.register_after(events::APP_GET, recording("y", &trace, false));

        let err = registry
            .guard(
                events::APP_GET,
                &Context::background(),
                HookSubject::AppName("myapp".into()),
                |_| async { Ok(app_subject("myapp")) },
            )
            .await
            .unwrap_err();
        assert_eq!(err, HookError::rejected("x", "not allowed"));
        assert_eq!(*trace.lock().unwrap(), ["x"]);
    }

    #[tokio::test]
    async fn before_hook_can_rewrite_request() {
        let mut registry = HookRegistry::new();
        registry.register_before(
            events::APP_GET,
            listener_fn("lowercase", |_ctx, subject| {
                if let HookSubject::AppName(name) = subject {
                    *name = name.to_lowercase();
                }
                Ok(())
            }),
        );

        let out = registry
            .guard(
                events::APP_GET,
                &Context::background(),
                HookSubject::AppName("MyApp".into()),
                |key| async move { Ok(HookSubject::App(App::named(key.into_app_name()?))) },
            )
            .await
            .unwrap();
        assert_eq!(out, app_subject("myapp"));
    }

    #[tokio::test]
    async fn operation_errors_pass_through_verbatim() {
        let registry = HookRegistry::new();
        let err = registry
            .guard(
                events::APP_GET,
                &Context::background(),
                HookSubject::AppName("ghost".into()),
                |_| async { Err(StoreError::AppNotFound("ghost".into()).into()) },
            )
            .await
            .unwrap_err();
        assert_eq!(err, HookError::Store(StoreError::AppNotFound("ghost".into())));
    }

    #[tokio::test]
    async fn listener_may_fail_with_store_error() {
        let mut registry = HookRegistry::new();
        registry.register_before(
            events::CALL_GET,
            listener_fn("hide", |_ctx, _subject| {
                Err(StoreError::CallNotFound("c1".into()).into())
            }),
        );
        let mut subject = HookSubject::CallKey {
            app: "myapp".into(),
            call_id: "c1".into(),
        };
        let err = registry
            .fire_before(events::CALL_GET, &Context::background(), &mut subject)
            .await
            .unwrap_err();
        assert_eq!(err, HookError::Store(StoreError::CallNotFound("c1".into())));
    }

    #[tokio::test]
    async fn events_are_isolated() {
        let trace = Arc::new(Mutex::new(Vec::new()));
        let mut registry = HookRegistry::new();
        registry.register_before(events::APP_DELETE, recording("deny", &trace, true));

        let mut subject = HookSubject::AppName("myapp".into());
        registry
            .fire_before(events::APP_GET, &Context::background(), &mut subject)
            .await
            .unwrap();
        assert!(trace.lock().unwrap().is_empty());
    }

    #[test]
    fn inspection_and_teardown() {
        let trace = Arc::new(Mutex::new(Vec::new()));
        let mut registry = HookRegistry::new();
        assert!(registry.is_empty());
        registry.register_before(events::ROUTE_GET, recording("one", &trace, false));
        registry.register_before(events::ROUTE_GET, recording("two", &trace, false));
        registry.register_after(events::APP_GET, recording("three", &trace, false));

        assert_eq!(registry.events(), [events::APP_GET, events::ROUTE_GET]);
        assert_eq!(registry.before_listeners(events::ROUTE_GET), ["one", "two"]);
        assert!(registry.after_listeners(events::ROUTE_GET).is_empty());
        assert_eq!(registry.after_listeners(events::APP_GET), ["three"]);

        assert!(registry.clear(events::ROUTE_GET));
        assert!(!registry.clear(events::ROUTE_GET));
        assert_eq!(registry.events(), [events::APP_GET]);
    }
}
