use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::{any, get, post};
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::{handlers, middleware};

pub fn build_router(app_state: AppState) -> Router {
    let proxy_routes = Router::new()
        .route("/v1.0/{*path}", any(handlers::proxy::proxy_v1_handler))
        .route("/beta/{*path}", any(handlers::proxy::proxy_beta_handler))
        .route_layer(from_fn_with_state(
            app_state.clone(),
            middleware::require_bearer,
        ));

    let admin_routes = Router::new()
        .route(
            "/admin/refresh/{group_id}",
            post(handlers::admin::refresh_group_handler),
        )
        .route_layer(from_fn_with_state(
            app_state.clone(),
            middleware::require_admin_key,
        ));

    Router::new()
        .route("/admin/health", get(handlers::health::health_handler))
        .route("/auth/login", post(handlers::auth::login_handler))
        .route("/auth/refresh", post(handlers::auth::refresh_handler))
        .route("/auth/logout", post(handlers::auth::logout_handler))
        .merge(proxy_routes)
        .merge(admin_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
