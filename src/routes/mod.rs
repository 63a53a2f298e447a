use axum::{Router, extract::FromRequest};

use crate::{error::AppError, state::AppState};

pub mod admin;
pub mod auth;
pub mod categories;
pub mod doc;
pub mod health;
pub mod orders;
pub mod params;
pub mod products;

/// `Json` whose rejections come back as 400 validation errors in the
/// standard envelope.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

// Each group carries its own tier: `auth` and `orders` gate the routes that
// need a caller, `admin` gates everything it owns.
pub fn create_api_router(state: AppState) -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router(state.clone()))
        .nest("/products", products::router())
        .nest("/categories", categories::router())
        .nest("/orders", orders::router(state.clone()))
        .nest("/admin", admin::router(state))
}
