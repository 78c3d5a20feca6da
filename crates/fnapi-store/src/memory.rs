use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;

use fnapi_types::{App, AppFilter, Call, CallFilter, Route, RouteFilter};

use crate::context::Context;
use crate::error::{StoreError, StoreResult};
use crate::logs::InMemoryLogStore;
use crate::traits::{Datastore, LogStore, LogStream, RawHandle};

/// Everything an [`InMemoryDatastore`] holds, exposed through
/// [`Datastore::database`] for administrative access.
#[derive(Debug, Default)]
pub struct MemoryState {
    /// Apps keyed by name.
    pub apps: BTreeMap<String, App>,
    /// Routes keyed by `(app_id, path)`.
    pub routes: BTreeMap<(String, String), Route>,
    /// Calls keyed by id. Ids are time ordered.
    pub calls: BTreeMap<String, Call>,
}

impl MemoryState {
    fn app_by_id(&self, app_id: &str) -> Option<&App> {
        self.apps.values().find(|a| a.id == app_id)
    }

    /// The storage id of `app`, preferring an explicit id over a name lookup.
    fn resolve_app_id(&self, app: &App) -> StoreResult<String> {
        if !app.id.is_empty() {
            return self
                .app_by_id(&app.id)
                .map(|a| a.id.clone())
                .ok_or_else(|| StoreError::AppNotFound(app.id.clone()));
        }
        self.apps
            .get(&app.name)
            .map(|a| a.id.clone())
            .ok_or_else(|| StoreError::AppNotFound(app.name.clone()))
    }
}

/// In-memory [`Datastore`] for tests, local development and embedding.
///
/// All state sits behind a single `RwLock`; logs live in a separate
/// [`InMemoryLogStore`]. Data is lost when the store is dropped.
pub struct InMemoryDatastore {
    state: Arc<RwLock<MemoryState>>,
    logs: InMemoryLogStore,
}

impl InMemoryDatastore {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(MemoryState::default())),
            logs: InMemoryLogStore::new(),
        }
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, MemoryState>> {
        self.state.read().map_err(StoreError::poisoned)
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, MemoryState>> {
        self.state.write().map_err(StoreError::poisoned)
    }
}

impl Default for InMemoryDatastore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryDatastore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (apps, routes, calls) = self
            .state
            .read()
            .map(|s| (s.apps.len(), s.routes.len(), s.calls.len()))
            .unwrap_or_default();
        f.debug_struct("InMemoryDatastore")
            .field("apps", &apps)
            .field("routes", &routes)
            .field("calls", &calls)
            .field("logs", &self.logs.len())
            .finish()
    }
}

#[async_trait]
impl LogStore for InMemoryDatastore {
    async fn insert_log(
        &self,
        ctx: &Context,
        app_id: &str,
        call_id: &str,
        log: LogStream<'_>,
    ) -> StoreResult<()> {
        self.logs.insert_log(ctx, app_id, call_id, log).await
    }

    async fn get_log(&self, ctx: &Context, app_id: &str, call_id: &str) -> StoreResult<Bytes> {
        self.logs.get_log(ctx, app_id, call_id).await
    }
}

#[async_trait]
impl Datastore for InMemoryDatastore {
    async fn get_app(&self, ctx: &Context, app: &App) -> StoreResult<App> {
        ctx.check()?;
        let state = self.read()?;
        if app.name.is_empty() {
            return state
                .app_by_id(&app.id)
                .cloned()
                .ok_or_else(|| StoreError::AppNotFound(app.id.clone()));
        }
        state
            .apps
            .get(&app.name)
            .cloned()
            .ok_or_else(|| StoreError::AppNotFound(app.name.clone()))
    }

    async fn get_app_by_id(&self, ctx: &Context, app_id: &str) -> StoreResult<App> {
        ctx.check()?;
        self.read()?
            .app_by_id(app_id)
            .cloned()
            .ok_or_else(|| StoreError::AppNotFound(app_id.to_string()))
    }

    async fn get_apps(&self, ctx: &Context, filter: &AppFilter) -> StoreResult<Vec<App>> {
        ctx.check()?;
        let state = self.read()?;
        let apps = state
            .apps
            .values()
            .filter(|a| match &filter.name_prefix {
                Some(prefix) => a.name.starts_with(prefix.as_str()),
                None => true,
            })
            .filter(|a| match &filter.cursor {
                Some(cursor) => a.name.as_str() > cursor.as_str(),
                None => true,
            })
            .take(filter.page_size())
            .cloned()
            .collect();
        Ok(apps)
    }

    async fn insert_app(&self, ctx: &Context, app: &App) -> StoreResult<App> {
        ctx.check()?;
        let mut state = self.write()?;
        if state.apps.contains_key(&app.name) {
            return Err(StoreError::AppAlreadyExists(app.name.clone()));
        }
        let now = Utc::now();
        let mut stored = app.clone();
        if stored.id.is_empty() {
            stored.id = fnapi_types::new_id();
        }
        stored.created_at = Some(now);
        stored.updated_at = Some(now);
        state.apps.insert(stored.name.clone(), stored.clone());
        tracing::debug!(app = %stored.name, id = %stored.id, "inserted app");
        Ok(stored)
    }

    async fn update_app(&self, ctx: &Context, app: &App) -> StoreResult<App> {
        ctx.check()?;
        let mut state = self.write()?;
        let stored = state
            .apps
            .get_mut(&app.name)
            .ok_or_else(|| StoreError::AppNotFound(app.name.clone()))?;
        stored.apply_patch(app);
        stored.updated_at = Some(Utc::now());
        tracing::debug!(app = %stored.name, "updated app");
        Ok(stored.clone())
    }

    async fn remove_app(&self, ctx: &Context, app: &App) -> StoreResult<()> {
        ctx.check()?;
        let mut state = self.write()?;
        let removed = state
            .apps
            .remove(&app.name)
            .ok_or_else(|| StoreError::AppNotFound(app.name.clone()))?;
        state.routes.retain(|(app_id, _), _| *app_id != removed.id);
        let call_ids: Vec<String> = state
            .calls
            .values()
            .filter(|c| c.app_id == removed.id)
            .map(|c| c.id.clone())
            .collect();
        for id in &call_ids {
            state.calls.remove(id);
        }
        drop(state);
        let logs = self.logs.remove_logs(call_ids.iter().map(String::as_str))?;
        tracing::debug!(
            app = %removed.name,
            calls = call_ids.len(),
            logs,
            "removed app with its routes, calls and logs"
        );
        Ok(())
    }

    async fn get_route(&self, ctx: &Context, app: &App, route_path: &str) -> StoreResult<Route> {
        ctx.check()?;
        let state = self.read()?;
        let app_id = state.resolve_app_id(app)?;
        let path = Route::normalize_path(route_path);
        state
            .routes
            .get(&(app_id, path.clone()))
            .cloned()
            .ok_or_else(|| StoreError::RouteNotFound {
                app: app.name.clone(),
                path,
            })
    }

    async fn get_routes_by_app(
        &self,
        ctx: &Context,
        app: &App,
        filter: &RouteFilter,
    ) -> StoreResult<Vec<Route>> {
        ctx.check()?;
        let state = self.read()?;
        let app_id = state.resolve_app_id(app)?;
        let routes = state
            .routes
            .iter()
            .filter(|((owner, _), _)| *owner == app_id)
            .map(|(_, route)| route)
            .filter(|r| match &filter.path_prefix {
                Some(prefix) => r.path.starts_with(prefix.as_str()),
                None => true,
            })
            .filter(|r| match &filter.image {
                Some(image) => r.image == *image,
                None => true,
            })
            .filter(|r| match &filter.cursor {
                Some(cursor) => r.path.as_str() > cursor.as_str(),
                None => true,
            })
            .take(filter.page_size())
            .cloned()
            .collect();
        Ok(routes)
    }

    async fn insert_route(&self, ctx: &Context, route: &Route) -> StoreResult<Route> {
        ctx.check()?;
        let mut state = self.write()?;
        if state.app_by_id(&route.app_id).is_none() {
            return Err(StoreError::AppNotFound(route.app_id.clone()));
        }
        let mut stored = route.clone();
        stored.path = Route::normalize_path(&route.path);
        let key = (stored.app_id.clone(), stored.path.clone());
        if state.routes.contains_key(&key) {
            return Err(StoreError::RouteAlreadyExists {
                app: stored.app_id,
                path: stored.path,
            });
        }
        let now = Utc::now();
        stored.created_at = Some(now);
        stored.updated_at = Some(now);
        state.routes.insert(key, stored.clone());
        tracing::debug!(app_id = %stored.app_id, path = %stored.path, "inserted route");
        Ok(stored)
    }

    async fn update_route(&self, ctx: &Context, route: &Route) -> StoreResult<Route> {
        ctx.check()?;
        let mut state = self.write()?;
        let path = Route::normalize_path(&route.path);
        let stored = state
            .routes
            .get_mut(&(route.app_id.clone(), path.clone()))
            .ok_or_else(|| StoreError::RouteNotFound {
                app: route.app_id.clone(),
                path,
            })?;
        stored.apply_patch(route);
        stored.updated_at = Some(Utc::now());
        tracing::debug!(app_id = %stored.app_id, path = %stored.path, "updated route");
        Ok(stored.clone())
    }

    async fn remove_route(&self, ctx: &Context, app: &App, route_path: &str) -> StoreResult<()> {
        ctx.check()?;
        let mut state = self.write()?;
        let app_id = state.resolve_app_id(app)?;
        let path = Route::normalize_path(route_path);
        if state.routes.remove(&(app_id, path.clone())).is_none() {
            return Err(StoreError::RouteNotFound {
                app: app.name.clone(),
                path,
            });
        }
        tracing::debug!(app = %app.name, %path, "removed route");
        Ok(())
    }

    async fn insert_call(&self, ctx: &Context, call: &Call) -> StoreResult<()> {
        ctx.check()?;
        let mut state = self.write()?;
        if state.calls.contains_key(&call.id) {
            return Err(StoreError::CallAlreadyExists(call.id.clone()));
        }
        state.calls.insert(call.id.clone(), call.clone());
        tracing::debug!(call_id = %call.id, status = %call.status, "inserted call");
        Ok(())
    }

    async fn update_call(&self, ctx: &Context, from: &Call, to: &Call) -> StoreResult<()> {
        ctx.check()?;
        let mut state = self.write()?;
        let stored = state
            .calls
            .get_mut(&from.id)
            .ok_or_else(|| StoreError::CallNotFound(from.id.clone()))?;
        if stored.status != from.status {
            return Err(StoreError::Conflict {
                id: from.id.clone(),
                expected: from.status,
                actual: stored.status,
            });
        }
        *stored = Call {
            id: from.id.clone(),
            ..to.clone()
        };
        tracing::debug!(call_id = %from.id, from = %from.status, to = %to.status, "updated call");
        Ok(())
    }

    async fn get_call(&self, ctx: &Context, app_id: &str, call_id: &str) -> StoreResult<Call> {
        ctx.check()?;
        let state = self.read()?;
        state
            .calls
            .get(call_id)
            .filter(|c| app_id.is_empty() || c.app_id == app_id)
            .cloned()
            .ok_or_else(|| StoreError::CallNotFound(call_id.to_string()))
    }

    async fn get_calls(&self, ctx: &Context, filter: &CallFilter) -> StoreResult<Vec<Call>> {
        ctx.check()?;
        let state = self.read()?;
        let calls = state
            .calls
            .values()
            .rev()
            .filter(|c| match &filter.app_id {
                Some(app_id) => c.app_id == *app_id,
                None => true,
            })
            .filter(|c| match &filter.path {
                Some(path) => c.path == *path,
                None => true,
            })
            .filter(|c| match (filter.created_after, c.created_at) {
                (Some(after), Some(created)) => created > after,
                (Some(_), None) => false,
                (None, _) => true,
            })
            .filter(|c| match (filter.created_before, c.created_at) {
                (Some(before), Some(created)) => created < before,
                (Some(_), None) => false,
                (None, _) => true,
            })
            .filter(|c| match &filter.cursor {
                Some(cursor) => c.id.as_str() < cursor.as_str(),
                None => true,
            })
            .take(filter.page_size())
            .cloned()
            .collect();
        Ok(calls)
    }

    fn database(&self) -> Option<RawHandle> {
        let handle: RawHandle = self.state.clone();
        Some(handle)
    }
}
