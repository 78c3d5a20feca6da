//! Argument-validating decorator.
//!
//! [`Validator`] checks the preconditions each operation needs and fails
//! before the wrapped store is touched. It performs no I/O. Operations with
//! nothing to check forward unchanged.

use async_trait::async_trait;
use bytes::Bytes;

use fnapi_types::{App, AppFilter, Call, CallFilter, Route, RouteFilter};

use crate::context::Context;
use crate::error::{StoreError, StoreResult};
use crate::traits::{Datastore, LogStore, LogStream, RawHandle};

/// Wraps a [`Datastore`] and rejects malformed arguments before delegating.
#[derive(Debug)]
pub struct Validator<D> {
    inner: D,
}

impl<D: Datastore> Validator<D> {
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

/// An app must be present and named.
pub fn check_app(app: &App) -> StoreResult<()> {
    if app.is_absent() {
        return Err(StoreError::EmptyApp);
    }
    if app.name.is_empty() {
        return Err(StoreError::EmptyAppName);
    }
    Ok(())
}

/// A route must be present and carry both its app id and its path.
pub fn check_route(route: &Route) -> StoreResult<()> {
    if route.is_absent() {
        return Err(StoreError::EmptyRoute);
    }
    if route.app_id.is_empty() {
        return Err(StoreError::EmptyApp);
    }
    if route.path.is_empty() {
        return Err(StoreError::EmptyRoutePath);
    }
    Ok(())
}

fn check_route_path(route_path: &str) -> StoreResult<()> {
    if route_path.is_empty() {
        return Err(StoreError::EmptyRoutePath);
    }
    Ok(())
}

#[async_trait]
impl<D: Datastore> LogStore for Validator<D> {
    async fn insert_log(
        &self,
        ctx: &Context,
        app_id: &str,
        call_id: &str,
        log: LogStream<'_>,
    ) -> StoreResult<()> {
        self.inner.insert_log(ctx, app_id, call_id, log).await
    }

    async fn get_log(&self, ctx: &Context, app_id: &str, call_id: &str) -> StoreResult<Bytes> {
        self.inner.get_log(ctx, app_id, call_id).await
    }
}

#[async_trait]
impl<D: Datastore> Datastore for Validator<D> {
    async fn get_app(&self, ctx: &Context, app: &App) -> StoreResult<App> {
        check_app(app)?;
        self.inner.get_app(ctx, app).await
    }

    async fn get_app_by_id(&self, ctx: &Context, app_id: &str) -> StoreResult<App> {
        if app_id.is_empty() {
            return Err(StoreError::EmptyAppId);
        }
        self.inner.get_app_by_id(ctx, app_id).await
    }

    async fn get_apps(&self, ctx: &Context, filter: &AppFilter) -> StoreResult<Vec<App>> {
        self.inner.get_apps(ctx, filter).await
    }

    async fn insert_app(&self, ctx: &Context, app: &App) -> StoreResult<App> {
        check_app(app)?;
        self.inner.insert_app(ctx, app).await
    }

    async fn update_app(&self, ctx: &Context, app: &App) -> StoreResult<App> {
        check_app(app)?;
        self.inner.update_app(ctx, app).await
    }

    async fn remove_app(&self, ctx: &Context, app: &App) -> StoreResult<()> {
        check_app(app)?;
        self.inner.remove_app(ctx, app).await
    }

    async fn get_route(&self, ctx: &Context, app: &App, route_path: &str) -> StoreResult<Route> {
        check_app(app)?;
        check_route_path(route_path)?;
        self.inner.get_route(ctx, app, route_path).await
    }

    async fn get_routes_by_app(
        &self,
        ctx: &Context,
        app: &App,
        filter: &RouteFilter,
    ) -> StoreResult<Vec<Route>> {
        self.inner.get_routes_by_app(ctx, app, filter).await
    }

    async fn insert_route(&self, ctx: &Context, route: &Route) -> StoreResult<Route> {
        check_route(route)?;
        self.inner.insert_route(ctx, route).await
    }

    async fn update_route(&self, ctx: &Context, route: &Route) -> StoreResult<Route> {
        check_route(route)?;
        self.inner.update_route(ctx, route).await
    }

    async fn remove_route(&self, ctx: &Context, app: &App, route_path: &str) -> StoreResult<()> {
        check_app(app)?;
        check_route_path(route_path)?;
        self.inner.remove_route(ctx, app, route_path).await
    }

    async fn insert_call(&self, ctx: &Context, call: &Call) -> StoreResult<()> {
        self.inner.insert_call(ctx, call).await
    }

    async fn update_call(&self, ctx: &Context, from: &Call, to: &Call) -> StoreResult<()> {
        self.inner.update_call(ctx, from, to).await
    }

    async fn get_call(&self, ctx: &Context, app_id: &str, call_id: &str) -> StoreResult<Call> {
        if call_id.is_empty() {
            return Err(StoreError::EmptyCallId);
        }
        self.inner.get_call(ctx, app_id, call_id).await
    }

    async fn get_calls(&self, ctx: &Context, filter: &CallFilter) -> StoreResult<Vec<Call>> {
        self.inner.get_calls(ctx, filter).await
    }

    fn database(&self) -> Option<RawHandle> {
        self.inner.database()
    }
}
