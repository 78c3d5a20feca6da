use bytes::Bytes;

use fnapi_types::{App, AppFilter, Call, CallFilter, Route, RouteFilter};

use crate::error::{HookError, HookResult};

/// What a listener sees at an interception point.
///
/// Before-hooks get the raw request: a lookup key, a filter, or the entity
/// the client submitted. They never get an entity guessed from a key.
/// After-hooks get the operation's result. Listeners may replace the
/// subject in place; the replacement is what flows on.
#[derive(Clone, Debug, PartialEq)]
pub enum HookSubject {
    AppName(String),
    App(App),
    Apps(Vec<App>),
    AppFilter(AppFilter),
    RouteKey { app: String, path: String },
    Route(Route),
    Routes(Vec<Route>),
    RouteFilter { app: String, filter: RouteFilter },
    CallKey { app: String, call_id: String },
    Call(Call),
    Calls(Vec<Call>),
    CallFilter(CallFilter),
    Log { call_id: String, body: Bytes },
}

impl HookSubject {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AppName(_) => "app_name",
            Self::App(_) => "app",
            Self::Apps(_) => "apps",
            Self::AppFilter(_) => "app_filter",
            Self::RouteKey { .. } => "route_key",
            Self::Route(_) => "route",
            Self::Routes(_) => "routes",
            Self::RouteFilter { .. } => "route_filter",
            Self::CallKey { .. } => "call_key",
            Self::Call(_) => "call",
            Self::Calls(_) => "calls",
            Self::CallFilter(_) => "call_filter",
            Self::Log { .. } => "log",
        }
    }

    fn mismatch(&self, expected: &'static str) -> HookError {
        HookError::SubjectMismatch {
            expected,
            found: self.kind(),
        }
    }

    pub fn into_app_name(self) -> HookResult<String> {
        match self {
            Self::AppName(name) => Ok(name),
            other => Err(other.mismatch("app_name")),
        }
    }

    pub fn into_app(self) -> HookResult<App> {
        match self {
            Self::App(app) => Ok(app),
            other => Err(other.mismatch("app")),
        }
    }

    pub fn into_apps(self) -> HookResult<Vec<App>> {
        match self {
            Self::Apps(apps) => Ok(apps),
            other => Err(other.mismatch("apps")),
        }
    }

    pub fn into_app_filter(self) -> HookResult<AppFilter> {
        match self {
            Self::AppFilter(filter) => Ok(filter),
            other => Err(other.mismatch("app_filter")),
        }
    }

    /// `(app, path)`
    pub fn into_route_key(self) -> HookResult<(String, String)> {
        match self {
            Self::RouteKey { app, path } => Ok((app, path)),
            other => Err(other.mismatch("route_key")),
        }
    }

    pub fn into_route(self) -> HookResult<Route> {
        match self {
            Self::Route(route) => Ok(route),
            other => Err(other.mismatch("route")),
        }
    }

    pub fn into_routes(self) -> HookResult<Vec<Route>> {
        match self {
            Self::Routes(routes) => Ok(routes),
            other => Err(other.mismatch("routes")),
        }
    }

    /// `(app, filter)`
    pub fn into_route_filter(self) -> HookResult<(String, RouteFilter)> {
        match self {
            Self::RouteFilter { app, filter } => Ok((app, filter)),
            other => Err(other.mismatch("route_filter")),
        }
    }

    /// `(app, call_id)`
    pub fn into_call_key(self) -> HookResult<(String, String)> {
        match self {
            Self::CallKey { app, call_id } => Ok((app, call_id)),
            other => Err(other.mismatch("call_key")),
        }
    }

    pub fn into_call(self) -> HookResult<Call> {
        match self {
            Self::Call(call) => Ok(call),
            other => Err(other.mismatch("call")),
        }
    }

    pub fn into_calls(self) -> HookResult<Vec<Call>> {
        match self {
            Self::Calls(calls) => Ok(calls),
            other => Err(other.mismatch("calls")),
        }
    }

    pub fn into_call_filter(self) -> HookResult<CallFilter> {
        match self {
            Self::CallFilter(filter) => Ok(filter),
            other => Err(other.mismatch("call_filter")),
        }
    }

    pub fn into_log(self) -> HookResult<Bytes> {
        match self {
            Self::Log { body, .. } => Ok(body),
            other => Err(other.mismatch("log")),
        }
    }
}
