use axum::{
    http::{header, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::audit::{Clock, SystemClock};
use crate::auth::{AuthError, AuthService, Authenticator, TokenService, UserAuthenticator};
use crate::config::AppConfig;
use crate::database::{RoleRepository, SqlExecutor, UserRepository};
use crate::handlers;
use crate::middleware::jwt_auth_middleware;
use crate::services::resilience::CircuitBreaker;
use crate::services::{CircuitBreakerConfig, RoleService, UserService};

/// Shared application state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub executor: Arc<dyn SqlExecutor>,
    pub tokens: Arc<TokenService>,
    pub auth: Arc<AuthService>,
    pub authenticator: Arc<dyn Authenticator>,
    pub users: Arc<UserService>,
    pub roles: Arc<RoleService>,
}

impl AppState {
    /// Wire services over the given executor, authenticating against the users table
    pub fn new(config: Arc<AppConfig>, executor: Arc<dyn SqlExecutor>) -> Result<Self, AuthError> {
        let authenticator = Arc::new(UserAuthenticator::new(UserRepository::new(executor.clone())));
        Self::with_authenticator(config, executor, authenticator)
    }

    pub fn with_authenticator(
        config: Arc<AppConfig>,
        executor: Arc<dyn SqlExecutor>,
        authenticator: Arc<dyn Authenticator>,
    ) -> Result<Self, AuthError> {
        let tokens = Arc::new(TokenService::from_config(&config.security)?);
        let auth = Arc::new(AuthService::new(tokens.clone(), authenticator.clone()));

        let breaker = |name: &'static str| {
            config
                .resilience
                .enabled
                .then(|| CircuitBreaker::new(name, CircuitBreakerConfig::from(&config.resilience)))
        };
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let users = Arc::new(UserService::new(
            UserRepository::new(executor.clone()),
            RoleRepository::new(executor.clone()),
            clock,
            breaker("users"),
        ));
        let roles = Arc::new(RoleService::new(RoleRepository::new(executor.clone()), breaker("roles")));

        Ok(Self {
            config,
            executor,
            tokens,
            auth,
            authenticator,
            users,
            roles,
        })
    }
}

/// Build the HTTP router: public health and auth routes, JWT-protected resources under `/api`
pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/api/users", get(handlers::users::list).post(handlers::users::create))
        .route(
            "/api/users/:id",
            get(handlers::users::get)
                .put(handlers::users::update)
                .delete(handlers::users::delete),
        )
        .route("/api/roles", get(handlers::roles::list).post(handlers::roles::create))
        .route(
            "/api/roles/:id",
            get(handlers::roles::get)
                .put(handlers::roles::update)
                .delete(handlers::roles::delete),
        )
        .route_layer(from_fn_with_state(state.clone(), jwt_auth_middleware));

    let mut app = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/refresh", post(handlers::auth::refresh))
        .route("/auth/logout", post(handlers::auth::logout))
        .merge(protected)
        .layer(TraceLayer::new_for_http());

    if state.config.security.enable_cors {
        app = app.layer(cors_layer(&state.config.security.cors_origins));
    }

    app.with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}
