use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handler;
use crate::state::AppState;

/// Build the axum router with all fnapi endpoints.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/v1/health", get(handler::health))
        .route("/v1/apps", get(handler::list_apps).post(handler::create_app))
        .route(
            "/v1/apps/:app",
            get(handler::get_app)
                .patch(handler::update_app)
                .delete(handler::delete_app),
        )
        .route(
            "/v1/apps/:app/routes",
            get(handler::list_routes).post(handler::create_route),
        )
        .route(
            "/v1/apps/:app/routes/*path",
            get(handler::get_route)
                .patch(handler::update_route)
                .delete(handler::delete_route),
        )
        .route("/v1/apps/:app/calls", get(handler::list_calls))
        .route("/v1/apps/:app/calls/:call", get(handler::get_call))
        .route("/v1/apps/:app/calls/:call/log", get(handler::get_call_log))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
