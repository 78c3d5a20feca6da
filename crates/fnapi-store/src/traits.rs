use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::AsyncRead;

use fnapi_types::{App, AppFilter, Call, CallFilter, Route, RouteFilter};

use crate::context::Context;
use crate::error::StoreResult;

/// Readable log stream handed to [`LogStore::insert_log`].
pub type LogStream<'a> = &'a mut (dyn AsyncRead + Send + Unpin);

/// Opaque handle to a backend's underlying storage, for administrative
/// access that must bypass every decorator.
pub type RawHandle = Arc<dyn Any + Send + Sync>;

/// Keyed storage for call logs.
#[async_trait]
pub trait LogStore: Send + Sync {
    /// Read `log` to the end and store it under `call_id`, replacing any
    /// earlier entry.
    async fn insert_log(
        &self,
        ctx: &Context,
        app_id: &str,
        call_id: &str,
        log: LogStream<'_>,
    ) -> StoreResult<()>;

    /// Fetch the log for `call_id`.
    ///
    /// Returns `Err(StoreError::CallLogNotFound)` if nothing was stored.
    async fn get_log(&self, ctx: &Context, app_id: &str, call_id: &str) -> StoreResult<Bytes>;
}

/// Persistence contract for apps, routes, calls and logs.
///
/// Backends and decorators implement the same trait so they stack freely.
/// A decorator may fail an operation early or add side effects, but when
/// it delegates it must return the wrapped result unchanged.
#[async_trait]
pub trait Datastore: LogStore {
    /// Look up an app by name.
    async fn get_app(&self, ctx: &Context, app: &App) -> StoreResult<App>;

    /// Look up an app by its storage id.
    async fn get_app_by_id(&self, ctx: &Context, app_id: &str) -> StoreResult<App>;

    async fn get_apps(&self, ctx: &Context, filter: &AppFilter) -> StoreResult<Vec<App>>;

    /// Insert a new app. The stored app (with id and timestamps) is returned.
    async fn insert_app(&self, ctx: &Context, app: &App) -> StoreResult<App>;

    /// Merge `app` into the stored app of the same name.
    async fn update_app(&self, ctx: &Context, app: &App) -> StoreResult<App>;

    /// Remove an app together with its routes, calls and call logs.
    async fn remove_app(&self, ctx: &Context, app: &App) -> StoreResult<()>;

    async fn get_route(&self, ctx: &Context, app: &App, route_path: &str) -> StoreResult<Route>;

    async fn get_routes_by_app(
        &self,
        ctx: &Context,
        app: &App,
        filter: &RouteFilter,
    ) -> StoreResult<Vec<Route>>;

    async fn insert_route(&self, ctx: &Context, route: &Route) -> StoreResult<Route>;

    async fn update_route(&self, ctx: &Context, route: &Route) -> StoreResult<Route>;

    async fn remove_route(&self, ctx: &Context, app: &App, route_path: &str) -> StoreResult<()>;

    async fn insert_call(&self, ctx: &Context, call: &Call) -> StoreResult<()>;

    /// Replace the stored call with `to`, but only if its persisted status
    /// still equals `from.status`. Otherwise `StoreError::Conflict`.
    async fn update_call(&self, ctx: &Context, from: &Call, to: &Call) -> StoreResult<()>;

    async fn get_call(&self, ctx: &Context, app_id: &str, call_id: &str) -> StoreResult<Call>;

    async fn get_calls(&self, ctx: &Context, filter: &CallFilter) -> StoreResult<Vec<Call>>;

    /// Raw access to the backend's storage. Not validated, not traced.
    fn database(&self) -> Option<RawHandle>;
}
