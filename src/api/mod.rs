// API module - HTTP endpoints

pub mod admin;
pub mod auth;
pub mod health;
pub mod member;
pub mod middleware;
pub mod trainer;

use axum::Router;

use middleware::session::AppState;

/// Every route of the application, without session or tracing layers
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(auth::router())
        .merge(member::router())
        .merge(trainer::router())
        .merge(admin::router())
}
