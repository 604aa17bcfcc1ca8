pub mod health;

use axum::Router;

use crate::state::AppState;

/// Search routes, mounted under `/api` by `create_router`
pub fn routes(state: &AppState) -> Router {
    domain_search::handlers::router(state.search_state())
}

/// Readiness route with live checks against every upstream
pub fn ready_router(state: AppState) -> Router {
    use axum::routing::get;

    Router::new()
        .route("/ready", get(health::ready_handler))
        .with_state(state)
}
