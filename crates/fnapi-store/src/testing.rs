//! Instrumented store double.
//!
//! [`CountingDatastore`] records how often each operation reached it and
//! then delegates. Put it underneath a decorator to prove the decorator did
//! or did not forward a call.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;

use fnapi_types::{App, AppFilter, Call, CallFilter, Route, RouteFilter};

use crate::context::Context;
use crate::error::StoreResult;
use crate::traits::{Datastore, LogStore, LogStream, RawHandle};

#[derive(Debug)]
pub struct CountingDatastore<D> {
    inner: D,
    counts: Mutex<HashMap<&'static str, usize>>,
}

impl<D: Datastore> CountingDatastore<D> {
    pub fn new(inner: D) -> Self {
        Self {
            inner,
            counts: Mutex::new(HashMap::new()),
        }
    }

    pub fn inner(&self) -> &D {
        &self.inner
    }

    /// Invocations of the operation named `op` (e.g. `"get_app"`).
    pub fn count(&self, op: &str) -> usize {
        self.counts
            .lock()
            .map(|counts| counts.get(op).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    /// Invocations across all operations.
    pub fn total(&self) -> usize {
        self.counts
            .lock()
            .map(|counts| counts.values().sum())
            .unwrap_or(0)
    }

    fn record(&self, op: &'static str) {
        if let Ok(mut counts) = self.counts.lock() {
            *counts.entry(op).or_insert(0) += 1;
        }
    }
}

#[async_trait]
impl<D: Datastore> LogStore for CountingDatastore<D> {
    async fn insert_log(
        &self,
        ctx: &Context,
        app_id: &str,
        call_id: &str,
        log: LogStream<'_>,
    ) -> StoreResult<()> {
        self.record("insert_log");
        self.inner.insert_log(ctx, app_id, call_id, log).await
    }

    async fn get_log(&self, ctx: &Context, app_id: &str, call_id: &str) -> StoreResult<Bytes> {
        self.record("get_log");
        self.inner.get_log(ctx, app_id, call_id).await
    }
}

#[async_trait]
impl<D: Datastore> Datastore for CountingDatastore<D> {
    async fn get_app(&self, ctx: &Context, app: &App) -> StoreResult<App> {
        self.record("get_app");
        self.inner.get_app(ctx, app).await
    }

    async fn get_app_by_id(&self, ctx: &Context, app_id: &str) -> StoreResult<App> {
        self.record("get_app_by_id");
        self.inner.get_app_by_id(ctx, app_id).await
    }

    async fn get_apps(&self, ctx: &Context, filter: &AppFilter) -> StoreResult<Vec<App>> {
        self.record("get_apps");
        self.inner.get_apps(ctx, filter).await
    }

    async fn insert_app(&self, ctx: &Context, app: &App) -> StoreResult<App> {
        self.record("insert_app");
        self.inner.insert_app(ctx, app).await
    }

    async fn update_app(&self, ctx: &Context, app: &App) -> StoreResult<App> {
        self.record("update_app");
        self.inner.update_app(ctx, app).await
    }

    async fn remove_app(&self, ctx: &Context, app: &App) -> StoreResult<()> {
        self.record("remove_app");
        self.inner.remove_app(ctx, app).await
    }

    async fn get_route(&self, ctx: &Context, app: &App, route_path: &str) -> StoreResult<Route> {
        self.record("get_route");
        self.inner.get_route(ctx, app, route_path).await
    }

    async fn get_routes_by_app(
        &self,
        ctx: &Context,
        app: &App,
        filter: &RouteFilter,
    ) -> StoreResult<Vec<Route>> {
        self.record("get_routes_by_app");
        self.inner.get_routes_by_app(ctx, app, filter).await
    }

    async fn insert_route(&self, ctx: &Context, route: &Route) -> StoreResult<Route> {
        self.record("insert_route");
        self.inner.insert_route(ctx, route).await
    }

    async fn update_route(&self, ctx: &Context, route: &Route) -> StoreResult<Route> {
        self.record("update_route");
        self.inner.update_route(ctx, route).await
    }

    async fn remove_route(&self, ctx: &Context, app: &App, route_path: &str) -> StoreResult<()> {
        self.record("remove_route");
        self.inner.remove_route(ctx, app, route_path).await
    }

    async fn insert_call(&self, ctx: &Context, call: &Call) -> StoreResult<()> {
        self.record("insert_call");
        self.inner.insert_call(ctx, call).await
    }

    async fn update_call(&self, ctx: &Context, from: &Call, to: &Call) -> StoreResult<()> {
        self.record("update_call");
        self.inner.update_call(ctx, from, to).await
    }

    async fn get_call(&self, ctx: &Context, app_id: &str, call_id: &str) -> StoreResult<Call> {
        self.record("get_call");
        self.inner.get_call(ctx, app_id, call_id).await
    }

    async fn get_calls(&self, ctx: &Context, filter: &CallFilter) -> StoreResult<Vec<Call>> {
        self.record("get_calls");
        self.inner.get_calls(ctx, filter).await
    }

    fn database(&self) -> Option<RawHandle> {
        self.inner.database()
    }
}
