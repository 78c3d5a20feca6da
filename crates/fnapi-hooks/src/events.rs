//! Event names shared by the server and listeners.

pub const APP_GET: &str = "app.get";
pub const APP_LIST: &str = "app.list";
pub const APP_CREATE: &str = "app.create";
pub const APP_UPDATE: &str = "app.update";
pub const APP_DELETE: &str = "app.delete";

pub const ROUTE_GET: &str = "route.get";
pub const ROUTE_LIST: &str = "route.list";
pub const ROUTE_CREATE: &str = "route.create";
pub const ROUTE_UPDATE: &str = "route.update";
pub const ROUTE_DELETE: &str = "route.delete";

pub const CALL_GET: &str = "call.get";
pub const CALL_LIST: &str = "call.list";

pub const LOG_GET: &str = "log.get";
