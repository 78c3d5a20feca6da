//! Before/after lifecycle hooks for fnapi operations.
//!
//! A [`HookRegistry`] maps an event name (see [`events`]) to two ordered
//! lists of [`Listener`]s. [`HookRegistry::guard`] runs the before list on
//! the request, the operation itself, then the after list on the result.
//! Any listener can veto by returning an error, or rewrite the
//! [`HookSubject`] it is handed.
//!
//! ```ignore
//! let mut hooks = HookRegistry::new();
//! hooks.register_before(events::APP_DELETE, listener_fn("protect-prod", |_ctx, subject| {
//!     match subject {
//!         HookSubject::AppName(name) if name == "prod" => {
//!             Err(HookError::rejected("protect-prod", "prod cannot be deleted"))
//!         }
//!         _ => Ok(()),
//!     }
//! }));
//! ```

pub mod error;
pub mod events;
pub mod listener;
pub mod registry;
pub mod subject;

pub use error::{HookError, HookResult};
pub use listener::{listener_fn, FnListener, Listener};
pub use registry::{HookRegistry, Stage};
pub use subject::HookSubject;
