use crate::state::AppState;
use axum::Router;

mod claims;
mod cookies;
mod dto;
pub(crate) mod extractors;
pub mod handlers;
pub mod jwt;
pub mod password;
pub mod tokens;

pub fn router() -> Router<AppState> {
    Router::new().merge(handlers::user_routes())
}
