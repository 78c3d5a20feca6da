//! HTTP control plane for fnapi.
//!
//! Exposes apps, routes, calls and call logs over a JSON REST API. Every
//! entity request passes through the [`HookRegistry`](fnapi_hooks::HookRegistry)
//! and then the configured [`Datastore`](fnapi_store::Datastore) chain.

pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;
pub mod state;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use server::FnServer;
pub use state::{decorate, AppState};
