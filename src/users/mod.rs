use crate::state::AppState;
use axum::Router;

pub mod dto;
pub(crate) mod extractors;
pub mod handlers;
pub mod memory;
pub mod repo;
pub mod repo_types;
pub mod services;

/// Routes mounted under `/users`. Guards need the state to resolve sessions.
pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .merge(handlers::public_routes())
        .merge(handlers::member_routes(state.clone()))
        .merge(handlers::admin_routes(state))
}
