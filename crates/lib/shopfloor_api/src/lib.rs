//! # shopfloor_api
//!
//! HTTP API library for Shopfloor.

pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use shopfloor_core::auth::password::{BcryptHasher, PasswordHasher};
use shopfloor_core::auth::session::SessionManager;
use shopfloor_core::jobs::JobService;
use shopfloor_core::store::Stores;
use shopfloor_core::users::UserService;
use sqlx::PgPool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ApiConfig;
use crate::handlers::{auth, jobs, users};

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// API configuration.
    pub config: ApiConfig,
    pub sessions: Arc<SessionManager>,
    pub users: Arc<UserService>,
    pub jobs: Arc<JobService>,
}

impl AppState {
    /// Build services over `stores` with the default bcrypt cost.
    pub fn new(config: ApiConfig, stores: Stores) -> Self {
        Self::with_hasher(config, stores, Arc::new(BcryptHasher::new()))
    }

    pub fn with_hasher(
        config: ApiConfig,
        stores: Stores,
        hasher: Arc<dyn PasswordHasher>,
    ) -> Self {
        let sessions = SessionManager::new(
            &stores,
            hasher.clone(),
            config.jwt_secret.as_bytes(),
            config.token_settings(),
        );
        Self {
            sessions: Arc::new(sessions),
            users: Arc::new(UserService::new(&stores, hasher)),
            jobs: Arc::new(JobService::new(&stores)),
            config,
        }
    }
}

/// Run embedded database migrations.
///
/// Delegates to `shopfloor_core::migrate::migrate()` which owns the migration files.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    shopfloor_core::migrate::migrate(pool).await
}

/// Builds the Axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Public routes (no auth required)
    let public = Router::new()
        .route(routes::POST_USERS_LOGIN, post(auth::login_handler))
        .route(routes::POST_USERS_REFRESH, post(auth::refresh_handler))
        .route(routes::GET_USERS_STATUS, get(auth::auth_status_handler))
        .route(routes::POST_USERS_BOOTSTRAP, post(auth::bootstrap_handler));

    // Protected routes (require auth)
    let protected = Router::new()
        .route(routes::POST_USERS_LOGOUT, post(auth::logout_handler))
        .route(
            routes::USERS,
            post(users::create_user_handler).get(users::list_users_handler),
        )
        .route(
            routes::USERS_ID,
            get(users::get_user_handler)
                .put(users::update_user_handler)
                .delete(users::delete_user_handler),
        )
        .route(routes::GET_USERS_TYPE_ROLE, get(users::list_by_role_handler))
        .route(
            routes::PUT_USERS_ID_SUPERVISOR,
            put(users::assign_supervisor_handler),
        )
        .route(
            routes::GET_USERS_SUPERVISOR_TECHNICIANS,
            get(users::technicians_handler),
        )
        .route(
            routes::JOBS,
            post(jobs::create_job_handler).get(jobs::list_jobs_handler),
        )
        .route(
            routes::JOBS_ID,
            get(jobs::get_job_handler)
                .put(jobs::update_job_handler)
                .delete(jobs::delete_job_handler),
        )
        .route(
            routes::GET_JOBS_SUPERVISOR_TASKS,
            get(jobs::supervisor_tasks_handler),
        )
        .route(
            routes::GET_JOBS_TECHNICIAN_TASKS,
            get(jobs::technician_tasks_handler),
        )
        .route(routes::PUT_JOBS_TASK, put(jobs::update_task_handler))
        .route(routes::PUT_JOBS_TASK_RESPONSE, put(jobs::respond_task_handler))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_auth,
        ));

    Router::new()
        .merge(public)
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
