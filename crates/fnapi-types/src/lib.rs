//! Domain types for the fnapi control plane.
//!
//! Every other fnapi crate depends on `fnapi-types`. The types here carry no
//! storage behaviour of their own; they describe what the store contract
//! moves around.
//!
//! # Key Types
//!
//! - [`App`] -- a named application owning routes and calls
//! - [`Route`] -- a path within an app bound to a function image
//! - [`Call`] -- one invocation of a route, with a [`CallStatus`] lifecycle
//! - [`AppFilter`], [`RouteFilter`], [`CallFilter`] -- list query parameters

pub mod app;
pub mod call;
pub mod error;
pub mod filter;
pub mod route;

pub use app::App;
pub use call::{Call, CallStatus};
pub use error::TypeError;
pub use filter::{AppFilter, CallFilter, RouteFilter, DEFAULT_PER_PAGE, MAX_PER_PAGE};
pub use route::{Route, RouteKind, RoutePatch};

/// Generate a fresh, time-ordered identifier (UUID v7).
pub fn new_id() -> String {
    uuid::Uuid::now_v7().to_string()
}
