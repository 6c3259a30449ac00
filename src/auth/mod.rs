use crate::state::AppState;
use axum::Router;

mod dto;
pub mod guard;
pub mod handlers;
pub mod password;
pub mod repo;
pub mod token;

/// The gated routes carry the state themselves because the authenticate
/// middleware resolves identities through it.
pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .merge(handlers::public_routes())
        .merge(handlers::account_routes(state))
}
