// --- File: backend/src/web_server.rs ---

use axum::{
    extract::Request,
    http::{header, HeaderValue, Method},
    middleware,
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::net::SocketAddr;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::Level;
use utoipa::{
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::{self, ADMIN_ONLY, STAFF};
use crate::config::AppConfig;
use crate::db::DbPool;
use crate::error::AppError;
use crate::{admin, tasks};

#[derive(Clone)]
pub struct AppState {
    pub db_pool: DbPool,
    pub app_config: AppConfig,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::register,
        auth::login,
        auth::me,
        admin::profile,
        admin::dashboard,
        admin::moderator_panel,
        admin::list_users,
        admin::delete_user,
        tasks::list_tasks,
        tasks::pending_tasks,
        tasks::completed_tasks,
        tasks::create_task,
        tasks::get_task,
        tasks::replace_task,
        tasks::patch_task,
        tasks::delete_task,
    ),
    components(schemas(
        common::UserDto,
        common::UserSummaryDto,
        common::Role,
        common::RegisterRequest,
        common::Credentials,
        common::AuthResponse,
        common::MeResponse,
        common::UserListResponse,
        common::AdminDashboardResponse,
        common::DeleteUserResponse,
        common::TaskDto,
        common::TaskPayload,
        common::TaskPatch,
        common::TaskListResponse,
        common::TaskResponse,
        common::DeleteTaskResponse,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Registration, login and the current account"),
        (name = "admin", description = "Role-gated endpoints"),
        (name = "tasks", description = "Per-user task list"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(Http::builder().scheme(HttpAuthScheme::Bearer).bearer_format("JWT").build()),
        );
    }
}

pub async fn run_server(app_state: AppState) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        app_state.app_config.web.addr, app_state.app_config.web.port
    )
    .parse()?;
    let db_pool = app_state.db_pool.clone();
    let app = create_router(app_state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Serving API at http://{}", listener.local_addr()?);
    tracing::info!("API docs at http://{}/swagger-ui", listener.local_addr()?);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Closing database pool");
    db_pool.close().await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => tracing::error!("Failed to listen for SIGTERM: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}

pub fn create_router(app_state: AppState) -> Router {
    let authenticated = || middleware::from_fn_with_state(app_state.clone(), auth::auth_middleware);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .merge(
            Router::new()
                .route("/me", get(auth::me))
                .route_layer(authenticated()),
        );

    let task_routes = Router::new()
        .route("/", get(tasks::list_tasks).post(tasks::create_task))
        .route("/filter/pending", get(tasks::pending_tasks))
        .route("/filter/completed", get(tasks::completed_tasks))
        .route(
            "/{id}",
            get(tasks::get_task)
                .put(tasks::replace_task)
                .patch(tasks::patch_task)
                .delete(tasks::delete_task),
        )
        .route_layer(authenticated());

    let profile_routes = Router::new()
        .route("/profile", get(admin::profile))
        .route_layer(authenticated());

    // Layers run bottom-up: the token is checked before the role.
    let admin_routes = Router::new()
        .route("/admin", get(admin::dashboard))
        .route("/admin/users", get(admin::list_users))
        .route("/users/{id}", delete(admin::delete_user))
        .route_layer(middleware::from_fn_with_state(ADMIN_ONLY, auth::require_role))
        .route_layer(authenticated());

    let staff_routes = Router::new()
        .route("/moderator", get(admin::moderator_panel))
        .route_layer(middleware::from_fn_with_state(STAFF, auth::require_role))
        .route_layer(authenticated());

    let cors = cors_layer(&app_state.app_config);

    Router::new()
        .route("/", get(index))
        .route("/api/health", get(health))
        .nest("/auth", auth_routes)
        .nest("/api/tasks", task_routes)
        .merge(profile_routes)
        .merge(admin_routes)
        .merge(staff_routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .fallback(route_not_found)
        .with_state(app_state)
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request| {
                    let request_id = request
                        .headers()
                        .get("x-request-id")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("-");
                    tracing::info_span!(
                        "request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = %request_id,
                    )
                })
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origin = config.web.cors_origin.trim();
    if origin == "*" {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let origins: Vec<HeaderValue> = origin
        .split(',')
        .filter_map(|o| o.trim().parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

async fn index() -> Json<Value> {
    Json(json!({
        "message": "Welcome to the Taskdesk API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "health": "GET /api/health",
            "register": "POST /auth/register",
            "login": "POST /auth/login",
            "me": "GET /auth/me",
            "profile": "GET /profile",
            "admin": "GET /admin",
            "moderator": "GET /moderator",
            "users": "GET /admin/users",
            "deleteUser": "DELETE /users/{id}",
            "tasks": "GET|POST /api/tasks",
            "task": "GET|PUT|PATCH|DELETE /api/tasks/{id}",
            "pendingTasks": "GET /api/tasks/filter/pending",
            "completedTasks": "GET /api/tasks/filter/completed",
            "docs": "GET /swagger-ui",
        }
    }))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn route_not_found() -> AppError {
    AppError::NotFound("Route not found".to_string())
}
