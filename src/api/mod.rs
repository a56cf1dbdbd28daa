mod error;
mod handlers;
pub mod middleware;

pub use error::ApiError;

use axum::{
    http::{header, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::registrar::Registrar;
pub use middleware::{CurrentStudent, SecurityConfig};

/// Create router with default security config (permissive CORS, no rate limiting).
pub fn create_router(registrar: Registrar) -> Router {
    create_router_with_config(registrar, SecurityConfig::disabled())
}

/// Create router with custom security configuration.
pub fn create_router_with_config(registrar: Registrar, config: SecurityConfig) -> Router {
    let mut public = Router::new()
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login));

    // Only the credential endpoints are rate limited; they do the bcrypt work
    if let Some(limiter) = config.rate_limiter.clone() {
        public = public.route_layer(from_fn_with_state(
            limiter,
            middleware::rate_limit_middleware,
        ));
    }

    let protected = Router::new()
        .route("/courses", get(handlers::list_courses))
        .route("/enroll", post(handlers::enroll))
        .route("/enrollments", get(handlers::list_enrollments))
        .route("/rate", post(handlers::rate))
        .route_layer(from_fn_with_state(
            registrar.clone(),
            middleware::auth_middleware,
        ));

    let api = Router::new()
        .route("/health", get(handlers::health))
        .merge(public)
        .merge(protected);

    Router::new()
        .nest("/api", api)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&config)),
        )
        .with_state(registrar)
}

fn cors_layer(config: &SecurityConfig) -> CorsLayer {
    match &config.cors_origins {
        Some(origins) => {
            let origins: Vec<HeaderValue> = origins
                .iter()
                .filter_map(|o| match o.parse() {
                    Ok(value) => Some(value),
                    Err(_) => {
                        tracing::warn!("Ignoring invalid CORS origin: {}", o);
                        None
                    }
                })
                .collect();
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        }
        None => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers(Any),
    }
}
