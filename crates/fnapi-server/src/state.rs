use std::sync::Arc;

use fnapi_hooks::HookRegistry;
use fnapi_store::{Context, Datastore, Traced, Validator};

use crate::config::ServerConfig;

/// Shared per-server state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub datastore: Arc<dyn Datastore>,
    pub hooks: Arc<HookRegistry>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(datastore: Arc<dyn Datastore>, hooks: HookRegistry, config: ServerConfig) -> Self {
        Self {
            datastore,
            hooks: Arc::new(hooks),
            config: Arc::new(config),
        }
    }

    /// A fresh context for one request, bounded by the configured timeout
    /// and parented on the request's span.
    pub fn request_context(&self) -> Context {
        Context::background()
            .with_timeout(self.config.request_timeout())
            .with_span(tracing::Span::current())
    }
}

/// Wrap `backend` in the decorators `config` enables: validation first,
/// then tracing outermost.
pub fn decorate<D: Datastore + 'static>(backend: D, config: &ServerConfig) -> Arc<dyn Datastore> {
    match (config.validate, config.trace) {
        (true, true) => Arc::new(Traced::new(Validator::new(backend))),
        (true, false) => Arc::new(Validator::new(backend)),
        (false, true) => Arc::new(Traced::new(backend)),
        (false, false) => Arc::new(backend),
    }
}
