//! Tracing decorator.
//!
//! [`Traced`] opens one span per operation, named `ds_<verb>_<entity>`,
//! parented on the context's span. The span is bound into the context
//! handed to the wrapped store and closes when the operation finishes,
//! whether it succeeded or not. Results pass through untouched.

use std::future::Future;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::{info_span, Instrument, Span};

use fnapi_types::{App, AppFilter, Call, CallFilter, Route, RouteFilter};

use crate::context::Context;
use crate::error::StoreResult;
use crate::traits::{Datastore, LogStore, LogStream, RawHandle};

/// Wraps a [`Datastore`] and emits a span around every call.
#[derive(Debug)]
pub struct Traced<D> {
    inner: D,
}

impl<D: Datastore> Traced<D> {
    pub fn new(inner: D) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &D {
        &self.inner
    }

    pub fn into_inner(self) -> D {
        self.inner
    }
}

async fn in_span<T, F, Fut>(span: Span, ctx: &Context, op: F) -> StoreResult<T>
where
    F: FnOnce(Context) -> Fut,
    Fut: Future<Output = StoreResult<T>>,
{
    let result = op(ctx.with_span(span.clone()))
        .instrument(span.clone())
        .await;
    if let Err(err) = &result {
        span.in_scope(|| tracing::debug!(error = %err, kind = %err.kind(), "datastore operation failed"));
    }
    result
}

#[async_trait]
impl<D: Datastore> LogStore for Traced<D> {
    async fn insert_log(
        &self,
        ctx: &Context,
        app_id: &str,
        call_id: &str,
        log: LogStream<'_>,
    ) -> StoreResult<()> {
        let span = info_span!(parent: ctx.span(), "ds_insert_log", app_id, call_id);
        in_span(span, ctx, |ctx| async move {
            self.inner.insert_log(&ctx, app_id, call_id, log).await
        })
        .await
    }

    async fn get_log(&self, ctx: &Context, app_id: &str, call_id: &str) -> StoreResult<Bytes> {
        let span = info_span!(parent: ctx.span(), "ds_get_log", app_id, call_id);
        in_span(span, ctx, |ctx| async move {
            self.inner.get_log(&ctx, app_id, call_id).await
        })
        .await
    }
}

#[async_trait]
impl<D: Datastore> Datastore for Traced<D> {
    async fn get_app(&self, ctx: &Context, app: &App) -> StoreResult<App> {
        let span = info_span!(parent: ctx.span(), "ds_get_app", app = %app.name);
        in_span(span, ctx, |ctx| async move { self.inner.get_app(&ctx, app).await }).await
    }

    async fn get_app_by_id(&self, ctx: &Context, app_id: &str) -> StoreResult<App> {
        let span = info_span!(parent: ctx.span(), "ds_get_app_by_id", app_id);
        in_span(span, ctx, |ctx| async move {
            self.inner.get_app_by_id(&ctx, app_id).await
        })
        .await
    }

    async fn get_apps(&self, ctx: &Context, filter: &AppFilter) -> StoreResult<Vec<App>> {
        let span = info_span!(parent: ctx.span(), "ds_get_apps");
        in_span(span, ctx, |ctx| async move { self.inner.get_apps(&ctx, filter).await }).await
    }

    async fn insert_app(&self, ctx: &Context, app: &App) -> StoreResult<App> {
        let span = info_span!(parent: ctx.span(), "ds_insert_app", app = %app.name);
        in_span(span, ctx, |ctx| async move { self.inner.insert_app(&ctx, app).await }).await
    }

    async fn update_app(&self, ctx: &Context, app: &App) -> StoreResult<App> {
        let span = info_span!(parent: ctx.span(), "ds_update_app", app = %app.name);
        in_span(span, ctx, |ctx| async move { self.inner.update_app(&ctx, app).await }).await
    }

    async fn remove_app(&self, ctx: &Context, app: &App) -> StoreResult<()> {
        let span = info_span!(parent: ctx.span(), "ds_remove_app", app = %app.name);
        in_span(span, ctx, |ctx| async move { self.inner.remove_app(&ctx, app).await }).await
    }

    async fn get_route(&self, ctx: &Context, app: &App, route_path: &str) -> StoreResult<Route> {
        let span = info_span!(parent: ctx.span(), "ds_get_route", app = %app.name, path = route_path);
        in_span(span, ctx, |ctx| async move {
            self.inner.get_route(&ctx, app, route_path).await
        })
        .await
    }

    async fn get_routes_by_app(
        &self,
        ctx: &Context,
        app: &App,
        filter: &RouteFilter,
    ) -> StoreResult<Vec<Route>> {
        let span = info_span!(parent: ctx.span(), "ds_get_routes_by_app", app = %app.name);
        in_span(span, ctx, |ctx| async move {
            self.inner.get_routes_by_app(&ctx, app, filter).await
        })
        .await
    }

    async fn insert_route(&self, ctx: &Context, route: &Route) -> StoreResult<Route> {
        let span = info_span!(parent: ctx.span(), "ds_insert_route", app_id = %route.app_id, path = %route.path);
        in_span(span, ctx, |ctx| async move { self.inner.insert_route(&ctx, route).await }).await
    }

    async fn update_route(&self, ctx: &Context, route: &Route) -> StoreResult<Route> {
        let span = info_span!(parent: ctx.span(), "ds_update_route", app_id = %route.app_id, path = %route.path);
        in_span(span, ctx, |ctx| async move { self.inner.update_route(&ctx, route).await }).await
    }

    async fn remove_route(&self, ctx: &Context, app: &App, route_path: &str) -> StoreResult<()> {
        let span = info_span!(parent: ctx.span(), "ds_remove_route", app = %app.name, path = route_path);
        in_span(span, ctx, |ctx| async move {
            self.inner.remove_route(&ctx, app, route_path).await
        })
        .await
    }

    async fn insert_call(&self, ctx: &Context, call: &Call) -> StoreResult<()> {
        let span = info_span!(parent: ctx.span(), "ds_insert_call", call_id = %call.id);
        in_span(span, ctx, |ctx| async move { self.inner.insert_call(&ctx, call).await }).await
    }

    async fn update_call(&self, ctx: &Context, from: &Call, to: &Call) -> StoreResult<()> {
        let span = info_span!(
            parent: ctx.span(),
            "ds_update_call",
            call_id = %from.id,
            from = %from.status,
            to = %to.status,
        );
        in_span(span, ctx, |ctx| async move {
            self.inner.update_call(&ctx, from, to).await
        })
        .await
    }

    async fn get_call(&self, ctx: &Context, app_id: &str, call_id: &str) -> StoreResult<Call> {
        let span = info_span!(parent: ctx.span(), "ds_get_call", app_id, call_id);
        in_span(span, ctx, |ctx| async move {
            self.inner.get_call(&ctx, app_id, call_id).await
        })
        .await
    }

    async fn get_calls(&self, ctx: &Context, filter: &CallFilter) -> StoreResult<Vec<Call>> {
        let span = info_span!(parent: ctx.span(), "ds_get_calls");
        in_span(span, ctx, |ctx| async move { self.inner.get_calls(&ctx, filter).await }).await
    }

    fn database(&self) -> Option<RawHandle> {
        self.inner.database()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use tracing::span::{Attributes, Id};
    use tracing::Subscriber;
    use tracing_subscriber::layer::{self, Layer, SubscriberExt};
    use tracing_subscriber::registry::LookupSpan;

    use super::*;
    use crate::error::StoreError;
    use crate::memory::InMemoryDatastore;
    use crate::validator::Validator;

    /// Records `(name, parent)` for opened spans and names for closed ones.
    #[derive(Clone, Default)]
    struct SpanRecorder {
        opened: Arc<Mutex<Vec<(String, Option<String>)>>>,
        closed: Arc<Mutex<Vec<String>>>,
    }

    impl SpanRecorder {
        fn opened(&self) -> Vec<String> {
            self.opened
                .lock()
                .unwrap()
                .iter()
                .map(|(name, _)| name.clone())
                .filter(|name| name.starts_with("ds_"))
                .collect()
        }

        fn parent_of(&self, name: &str) -> Option<String> {
            self.opened
                .lock()
                .unwrap()
                .iter()
                .find(|(n, _)| n == name)
                .and_then(|(_, parent)| parent.clone())
        }

        fn closed(&self) -> Vec<String> {
            self.closed
                .lock()
                .unwrap()
                .iter()
                .filter(|name| name.starts_with("ds_"))
                .cloned()
                .collect()
        }
    }

    impl<S> Layer<S> for SpanRecorder
    where
        S: Subscriber + for<'a> LookupSpan<'a>,
    {
        fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: layer::Context<'_, S>) {
            let parent = ctx
                .span(id)
                .and_then(|span| span.parent().map(|p| p.name().to_string()));
            self.opened
                .lock()
                .unwrap()
                .push((attrs.metadata().name().to_string(), parent));
        }

        fn on_close(&self, id: Id, ctx: layer::Context<'_, S>) {
            if let Some(span) = ctx.span(&id) {
                self.closed.lock().unwrap().push(span.name().to_string());
            }
        }
    }

    fn recording() -> (SpanRecorder, tracing::subscriber::DefaultGuard) {
        let recorder = SpanRecorder::default();
        let subscriber = tracing_subscriber::registry().with(recorder.clone());
        let guard = tracing::subscriber::set_default(subscriber);
        (recorder, guard)
    }

    #[tokio::test]
    async fn one_span_per_successful_call() {
        let (recorder, _guard) = recording();
        let store = Traced::new(InMemoryDatastore::new());
        let ctx = Context::background();

        let app = store.insert_app(&ctx, &App::named("myapp")).await.unwrap();
        assert_eq!(recorder.opened(), ["ds_insert_app"]);
        assert_eq!(recorder.closed(), ["ds_insert_app"]);

        let fetched = store.get_app(&ctx, &App::named("myapp")).await.unwrap();
        assert_eq!(fetched, app);
        assert_eq!(recorder.opened(), ["ds_insert_app", "ds_get_app"]);
        assert_eq!(recorder.closed(), ["ds_insert_app", "ds_get_app"]);
    }

    #[tokio::test]
    async fn span_closes_when_store_errors() {
        let (recorder, _guard) = recording();
        let store = Traced::new(InMemoryDatastore::new());
        let ctx = Context::background();

        let err = store.get_app(&ctx, &App::named("ghost")).await.unwrap_err();
        assert_eq!(err, StoreError::AppNotFound("ghost".into()));
        assert_eq!(recorder.opened(), ["ds_get_app"]);
        assert_eq!(recorder.closed(), ["ds_get_app"]);

        let mut log: &[u8] = b"x";
        ctx.cancel();
        let err = store.insert_log(&ctx, "a", "c", &mut log).await.unwrap_err();
        assert_eq!(err, StoreError::Cancelled);
        assert_eq!(recorder.closed(), ["ds_get_app", "ds_insert_log"]);
    }

    #[tokio::test]
    async fn validation_failure_inside_span_still_closes_it() {
        let (recorder, _guard) = recording();
        let store = Traced::new(Validator::new(InMemoryDatastore::new()));
        let err = store
            .insert_route(&Context::background(), &Route::new("app-id", "", "img"))
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::EmptyRoutePath);
        assert_eq!(recorder.opened(), ["ds_insert_route"]);
        assert_eq!(recorder.closed(), ["ds_insert_route"]);
    }

    #[tokio::test]
    async fn span_is_parented_on_context_span() {
        let (recorder, _guard) = recording();
        let store = Traced::new(InMemoryDatastore::new());
        let request = info_span!("request");
        let ctx = Context::background().with_span(request.clone());

        store.get_apps(&ctx, &AppFilter::default()).await.unwrap();
        assert_eq!(recorder.parent_of("ds_get_apps").as_deref(), Some("request"));
    }

    #[tokio::test]
    async fn nested_tracing_layers_stack_spans() {
        let (recorder, _guard) = recording();
        let store = Traced::new(Validator::new(Traced::new(InMemoryDatastore::new())));
        store
            .get_calls(&Context::background(), &CallFilter::default())
            .await
            .unwrap();
        assert_eq!(recorder.opened(), ["ds_get_calls", "ds_get_calls"]);
        assert_eq!(recorder.closed().len(), 2);
        // The inner span hangs off the outer one via the context.
        let opened = recorder.opened.lock().unwrap().clone();
        assert_eq!(opened[1].1.as_deref(), Some("ds_get_calls"));
    }

    #[tokio::test]
    async fn database_bypasses_tracing() {
        let (recorder, _guard) = recording();
        let store = Traced::new(InMemoryDatastore::new());
        assert!(store.database().is_some());
        assert!(recorder.opened().is_empty());
    }
}
