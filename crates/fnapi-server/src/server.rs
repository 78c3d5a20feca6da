use std::sync::Arc;

use tokio::net::TcpListener;

use fnapi_hooks::HookRegistry;
use fnapi_store::{Datastore, InMemoryDatastore};

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::router::build_router;
use crate::state::{decorate, AppState};

/// The fnapi control-plane HTTP server.
pub struct FnServer {
    state: AppState,
}

impl FnServer {
    /// Serve from an in-memory backend, decorated per `config`.
    pub fn in_memory(config: ServerConfig, hooks: HookRegistry) -> Self {
        let datastore = decorate(InMemoryDatastore::new(), &config);
        Self::new(datastore, hooks, config)
    }

    /// Serve from an already assembled store chain.
    pub fn new(datastore: Arc<dyn Datastore>, hooks: HookRegistry, config: ServerConfig) -> Self {
        Self {
            state: AppState::new(datastore, hooks, config),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.state.config
    }

    pub fn datastore(&self) -> &Arc<dyn Datastore> {
        &self.state.datastore
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(self.state.clone())
    }

    /// Bind the configured address and serve until the process exits.
    pub async fn serve(self) -> ServerResult<()> {
        let addr = self.config().bind_addr;
        let listener = TcpListener::bind(addr).await?;
        tracing::info!(%addr, "fnapi server listening");
        axum::serve(listener, self.router())
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))
    }
}
