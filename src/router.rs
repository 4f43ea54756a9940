use std::time::Duration;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use http::{Method, header};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::{handlers, middleware_layer, state::AppState};

/// Request bodies on this surface are small JSON documents.
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Builds the application router.
///
/// Public routes issue or consume tokens from the request body; every other
/// route sits behind [`middleware_layer::auth::require_auth`].
pub fn build_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/users/register", post(handlers::users::register))
        .route("/users/login", post(handlers::users::login))
        .route("/users/refresh-session", post(handlers::users::refresh_session))
        .route("/users/logout", post(handlers::users::logout))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/users/me", get(handlers::users::me))
        .route("/users/sessions", get(handlers::users::list_sessions))
        .route("/users/logout-all", post(handlers::users::logout_all))
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware_layer::auth::require_auth,
        ))
        .with_state(state);

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
        .max_age(Duration::from_secs(86400));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default())
                .on_request(DefaultOnRequest::default().level(Level::DEBUG))
                .on_response(DefaultOnResponse::default().level(Level::DEBUG))
                .on_failure(DefaultOnFailure::default().level(Level::ERROR)),
        )
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors)
}
