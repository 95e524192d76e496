use axum::{http::Method, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod auth;
pub mod bookings;
pub mod calls;
pub mod error;
pub mod extract;
pub mod metrics;
pub mod middleware;
pub mod notifications;
pub mod realtime;
pub mod rides;
pub mod state;
pub mod users;

pub use state::{AppState, AuthConfig};

pub fn app(state: AppState) -> Router {
    // CORS Middleware
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::USER_AGENT,
        ]);

    Router::new()
        .merge(auth::routes())
        .merge(users::routes())
        .merge(rides::routes())
        .merge(bookings::routes())
        .merge(notifications::routes())
        .merge(calls::routes())
        .merge(realtime::routes())
        .merge(metrics::routes())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn_with_state(state.clone(), middleware::rate_limit_middleware))
        .with_state(state)
}
