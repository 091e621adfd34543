use std::sync::Arc;

use axum::routing::{delete, get, post};
use axum::Router;
use ripshelf_driver::Catalog;
use ripshelf_store::JobStore;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

pub fn build_app(store: Arc<dyn JobStore>, catalog: Option<Arc<dyn Catalog>>) -> Router {
    let state = AppState { store, catalog };

    Router::new()
        // Health
        .route("/health", get(handlers::health))
        // Jobs
        .route("/jobs", get(handlers::list_jobs))
        .route("/jobs/:id", get(handlers::get_job))
        .route("/jobs/:id/approve", post(handlers::approve))
        .route("/jobs/:id/identify", post(handlers::identify))
        .route("/jobs/:id/skip", post(handlers::skip))
        .route("/jobs/:id/pre-identify", post(handlers::pre_identify))
        .route("/jobs/:id/archive", post(handlers::archive))
        // Oversight
        .route("/oversight/check", get(handlers::oversight_check))
        .route("/oversight/fix-encoding", post(handlers::oversight_fix_encoding))
        // Active mode
        .route(
            "/settings/active-mode",
            get(handlers::get_active_mode).post(handlers::set_active_mode),
        )
        .route("/settings/active-mode/toggle", post(handlers::toggle_active_mode))
        // Wanted list
        .route("/wanted", get(handlers::list_wanted).post(handlers::add_wanted))
        .route("/wanted/:id", delete(handlers::remove_wanted))
        // Collection
        .route("/collection", get(handlers::list_collection))
        .route("/collection/:id", delete(handlers::remove_collection))
        // Status
        .route("/status", get(handlers::status))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
