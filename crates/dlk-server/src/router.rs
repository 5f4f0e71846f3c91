use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::{middleware, Router};
use dlk_protocol::endpoints;
use tower_http::trace::TraceLayer;

use crate::auth::require_auth;
use crate::handler::{self, AppState};

/// Build the axum router with all web API endpoints.
pub fn build_router(state: AppState, max_body_size: usize) -> Router {
    Router::new()
        .route(endpoints::STATUS, get(handler::status))
        .route(
            endpoints::OBJECTS,
            get(handler::list_objects).delete(handler::clear),
        )
        .route(
            endpoints::OBJECT,
            get(handler::object_metadata).delete(handler::delete_object),
        )
        .route(
            endpoints::OBJECT_DATA,
            get(handler::get_object_data).put(handler::put_object_data),
        )
        .route(endpoints::OBJECT_RENAME, post(handler::rename_object))
        .route(endpoints::WORKSPACE_SAVE, post(handler::save_workspace))
        .route(endpoints::WORKSPACE_LOAD, post(handler::load_workspace))
        .route(endpoints::CALC, post(handler::calc))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .layer(DefaultBodyLimit::max(max_body_size))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
