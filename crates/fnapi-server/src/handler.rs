//! Request handlers.
//!
//! Every entity endpoint runs its store work through
//! [`HookRegistry::guard`](fnapi_hooks::HookRegistry::guard) under a
//! per-request [`Context`], so listeners see each request and the
//! configured timeout bounds the whole guarded operation.

use std::future::Future;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use fnapi_hooks::{events, HookResult, HookSubject};
use fnapi_store::Context;
use fnapi_types::{App, AppFilter, CallFilter, Route, RouteFilter, RoutePatch};

use crate::error::{ServerError, ServerResult};
use crate::state::AppState;

/// `{"app": {...}}` request body.
#[derive(Debug, Deserialize)]
pub struct AppBody {
    pub app: App,
}

/// `{"route": {...}}` request body.
#[derive(Debug, Deserialize)]
pub struct RouteBody {
    pub route: Route,
}

/// `{"route": {...}}` body of a partial route update.
#[derive(Debug, Deserialize)]
pub struct RoutePatchBody {
    pub route: RoutePatch,
}

/// Build `{"message": ..., "<key>": value}`.
fn reply(message: &str, key: &str, value: impl Serialize) -> ServerResult<Json<Value>> {
    let value = serde_json::to_value(value).map_err(|e| ServerError::Internal(e.to_string()))?;
    let mut body = Map::new();
    body.insert("message".into(), Value::String(message.into()));
    body.insert(key.into(), value);
    Ok(Json(Value::Object(body)))
}

/// Like [`reply`] for list results, adding `next_cursor` when the page is
/// full and more items may follow.
fn page<T: Serialize>(
    message: &str,
    key: &str,
    items: Vec<T>,
    page_size: usize,
    cursor_of: impl Fn(&T) -> String,
) -> ServerResult<Json<Value>> {
    let next = (items.len() >= page_size)
        .then(|| items.last().map(&cursor_of))
        .flatten();
    let Json(mut body) = reply(message, key, &items)?;
    if let (Some(next), Value::Object(map)) = (next, &mut body) {
        map.insert("next_cursor".into(), Value::String(next));
    }
    Ok(Json(body))
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> ServerResult<T> {
    payload
        .map(|Json(inner)| inner)
        .map_err(|e| ServerError::BadRequest(e.body_text()))
}

fn query<T>(params: Result<Query<T>, QueryRejection>) -> ServerResult<T> {
    params
        .map(|Query(inner)| inner)
        .map_err(|e| ServerError::BadRequest(e.body_text()))
}

/// Run `op` behind `event`'s hooks, bounded by the request context.
async fn guarded<F, Fut>(
    state: &AppState,
    ctx: &Context,
    event: &str,
    request: HookSubject,
    op: F,
) -> ServerResult<HookSubject>
where
    F: FnOnce(HookSubject) -> Fut,
    Fut: Future<Output = HookResult<HookSubject>>,
{
    Ok(ctx.run(state.hooks.guard(event, ctx, request, op)).await?)
}

async fn lookup_app(state: &AppState, ctx: &Context, name: &str) -> ServerResult<App> {
    Ok(state.datastore.get_app(ctx, &App::named(name)).await?)
}

pub async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

// ---------------------------------------------------------------------------
// Apps
// ---------------------------------------------------------------------------

pub async fn list_apps(
    State(state): State<AppState>,
    params: Result<Query<AppFilter>, QueryRejection>,
) -> ServerResult<Json<Value>> {
    let filter = query(params)?;
    let page_size = filter.page_size();
    let ctx = &state.request_context();
    let store = state.datastore.as_ref();
    let apps = guarded(&state, ctx, events::APP_LIST, HookSubject::AppFilter(filter), |req| async move {
        let filter = req.into_app_filter()?;
        Ok(HookSubject::Apps(store.get_apps(ctx, &filter).await?))
    })
    .await?
    .into_apps()?;
    page("Successfully listed applications", "apps", apps, page_size, |a| {
        a.name.clone()
    })
}

pub async fn create_app(
    State(state): State<AppState>,
    payload: Result<Json<AppBody>, JsonRejection>,
) -> ServerResult<Json<Value>> {
    let app = body(payload)?.app;
    let ctx = &state.request_context();
    let store = state.datastore.as_ref();
    let app = guarded(&state, ctx, events::APP_CREATE, HookSubject::App(app), |req| async move {
        let app = req.into_app()?;
        Ok(HookSubject::App(store.insert_app(ctx, &app).await?))
    })
    .await?
    .into_app()?;
    tracing::info!(app = %app.name, id = %app.id, "app created");
    reply("App successfully created", "app", app)
}

pub async fn get_app(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ServerResult<Json<Value>> {
    let ctx = &state.request_context();
    let store = state.datastore.as_ref();
    let app = guarded(&state, ctx, events::APP_GET, HookSubject::AppName(name), |req| async move {
        let name = req.into_app_name()?;
        Ok(HookSubject::App(store.get_app(ctx, &App::named(name)).await?))
    })
    .await?
    .into_app()?;
    reply("Successfully loaded app", "app", app)
}

pub async fn update_app(
    State(state): State<AppState>,
    Path(name): Path<String>,
    payload: Result<Json<AppBody>, JsonRejection>,
) -> ServerResult<Json<Value>> {
    let mut app = body(payload)?.app;
    if !app.name.is_empty() && app.name != name {
        return Err(ServerError::BadRequest(
            "app name in body does not match path".into(),
        ));
    }
    app.name = name;
    let ctx = &state.request_context();
    let store = state.datastore.as_ref();
    let app = guarded(&state, ctx, events::APP_UPDATE, HookSubject::App(app), |req| async move {
        let app = req.into_app()?;
        Ok(HookSubject::App(store.update_app(ctx, &app).await?))
    })
    .await?
    .into_app()?;
    reply("App successfully updated", "app", app)
}

pub async fn delete_app(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ServerResult<Json<Value>> {
    let ctx = &state.request_context();
    let store = state.datastore.as_ref();
    guarded(&state, ctx, events::APP_DELETE, HookSubject::AppName(name), |req| async move {
        let name = req.into_app_name()?;
        store.remove_app(ctx, &App::named(name.clone())).await?;
        Ok(HookSubject::AppName(name))
    })
    .await?;
    Ok(Json(json!({ "message": "App deleted" })))
}

// ---------------------------------------------------------------------------
// Routes
// ---------------------------------------------------------------------------

pub async fn list_routes(
    State(state): State<AppState>,
    Path(app): Path<String>,
    params: Result<Query<RouteFilter>, QueryRejection>,
) -> ServerResult<Json<Value>> {
    let filter = query(params)?;
    let page_size = filter.page_size();
    let ctx = &state.request_context();
    let store = state.datastore.as_ref();
    let request = HookSubject::RouteFilter { app, filter };
    let routes = guarded(&state, ctx, events::ROUTE_LIST, request, |req| async move {
        let (app, filter) = req.into_route_filter()?;
        Ok(HookSubject::Routes(
            store.get_routes_by_app(ctx, &App::named(app), &filter).await?,
        ))
    })
    .await?
    .into_routes()?;
    page("Successfully listed routes", "routes", routes, page_size, |r| {
        r.path.clone()
    })
}

pub async fn create_route(
    State(state): State<AppState>,
    Path(app): Path<String>,
    payload: Result<Json<RouteBody>, JsonRejection>,
) -> ServerResult<Json<Value>> {
    let mut route = body(payload)?.route;
    let ctx = &state.request_context();
    route.app_id = lookup_app(&state, ctx, &app).await?.id;
    route.path = Route::normalize_path(&route.path);
    let store = state.datastore.as_ref();
    let route = guarded(&state, ctx, events::ROUTE_CREATE, HookSubject::Route(route), |req| async move {
        let route = req.into_route()?;
        Ok(HookSubject::Route(store.insert_route(ctx, &route).await?))
    })
    .await?
    .into_route()?;
    tracing::info!(%app, path = %route.path, image = %route.image, "route created");
    reply("Route successfully created", "route", route)
}

pub async fn get_route(
    State(state): State<AppState>,
    Path((app, path)): Path<(String, String)>,
) -> ServerResult<Json<Value>> {
    let ctx = &state.request_context();
    let store = state.datastore.as_ref();
    let request = HookSubject::RouteKey {
        app,
        path: Route::normalize_path(&path),
    };
    let route = guarded(&state, ctx, events::ROUTE_GET, request, |req| async move {
        let (app, path) = req.into_route_key()?;
        Ok(HookSubject::Route(
            store.get_route(ctx, &App::named(app), &path).await?,
        ))
    })
    .await?
    .into_route()?;
    reply("Successfully loaded route", "route", route)
}

pub async fn update_route(
    State(state): State<AppState>,
    Path((app, path)): Path<(String, String)>,
    payload: Result<Json<RoutePatchBody>, JsonRejection>,
) -> ServerResult<Json<Value>> {
    let patch = body(payload)?.route;
    let path = Route::normalize_path(&path);
    if let Some(body_path) = patch.path.as_deref() {
        if !body_path.is_empty() && Route::normalize_path(body_path) != path {
            return Err(ServerError::BadRequest(
                "route path in body does not match path".into(),
            ));
        }
    }
    let ctx = &state.request_context();
    let owner = lookup_app(&state, ctx, &app).await?;
    let current = state.datastore.get_route(ctx, &owner, &path).await?;
    let store = state.datastore.as_ref();
    let update = HookSubject::Route(patch.onto(&current));
    let route = guarded(&state, ctx, events::ROUTE_UPDATE, update, |req| async move {
        let route = req.into_route()?;
        Ok(HookSubject::Route(store.update_route(ctx, &route).await?))
    })
    .await?
    .into_route()?;
    reply("Route successfully updated", "route", route)
}

pub async fn delete_route(
    State(state): State<AppState>,
    Path((app, path)): Path<(String, String)>,
) -> ServerResult<Json<Value>> {
    let ctx = &state.request_context();
    let store = state.datastore.as_ref();
    let request = HookSubject::RouteKey {
        app,
        path: Route::normalize_path(&path),
    };
    guarded(&state, ctx, events::ROUTE_DELETE, request, |req| async move {
        let (app, path) = req.into_route_key()?;
        store.remove_route(ctx, &App::named(app.clone()), &path).await?;
        Ok(HookSubject::RouteKey { app, path })
    })
    .await?;
    Ok(Json(json!({ "message": "Route deleted" })))
}

// ---------------------------------------------------------------------------
// Calls and logs
// ---------------------------------------------------------------------------

pub async fn list_calls(
    State(state): State<AppState>,
    Path(app): Path<String>,
    params: Result<Query<CallFilter>, QueryRejection>,
) -> ServerResult<Json<Value>> {
    let mut filter = query(params)?;
    let ctx = &state.request_context();
    filter.app_id = Some(lookup_app(&state, ctx, &app).await?.id);
    if let Some(path) = &filter.path {
        filter.path = Some(Route::normalize_path(path));
    }
    let page_size = filter.page_size();
    let store = state.datastore.as_ref();
    let calls = guarded(&state, ctx, events::CALL_LIST, HookSubject::CallFilter(filter), |req| async move {
        let filter = req.into_call_filter()?;
        Ok(HookSubject::Calls(store.get_calls(ctx, &filter).await?))
    })
    .await?
    .into_calls()?;
    page("Successfully listed calls", "calls", calls, page_size, |c| {
        c.id.clone()
    })
}

pub async fn get_call(
    State(state): State<AppState>,
    Path((app, call_id)): Path<(String, String)>,
) -> ServerResult<Json<Value>> {
    let ctx = &state.request_context();
    let store = state.datastore.as_ref();
    let request = HookSubject::CallKey { app, call_id };
    let call = guarded(&state, ctx, events::CALL_GET, request, |req| async move {
        let (app, call_id) = req.into_call_key()?;
        let app = store.get_app(ctx, &App::named(app)).await?;
        Ok(HookSubject::Call(store.get_call(ctx, &app.id, &call_id).await?))
    })
    .await?
    .into_call()?;
    reply("Successfully loaded call", "call", call)
}

pub async fn get_call_log(
    State(state): State<AppState>,
    Path((app, call_id)): Path<(String, String)>,
) -> ServerResult<impl IntoResponse> {
    let ctx = &state.request_context();
    let store = state.datastore.as_ref();
    let request = HookSubject::CallKey { app, call_id };
    let log = guarded(&state, ctx, events::LOG_GET, request, |req| async move {
        let (app, call_id) = req.into_call_key()?;
        let app = store.get_app(ctx, &App::named(app)).await?;
        let body = store.get_log(ctx, &app.id, &call_id).await?;
        Ok(HookSubject::Log { call_id, body })
    })
    .await?
    .into_log()?;
    Ok(([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], log))
}
