//! Endpoints gated by authentication and roles.

use axum::{extract::State, Json};
use common::{AdminDashboardResponse, DeleteUserResponse, DeletedUser, UserListResponse};
use serde_json::{json, Value};

use crate::error::AppError;
use crate::extractors::{AuthUser, ResourceId};
use crate::models::User;
use crate::web_server::AppState;

/// Any authenticated user: echoes the decoded token.
#[utoipa::path(
    get,
    path = "/profile",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "The caller's token claims"),
        (status = 401, description = "Authentication required"),
    ),
    tag = "admin"
)]
pub async fn profile(user: AuthUser) -> Json<Value> {
    Json(json!({
        "message": "Your profile",
        "user": user,
    }))
}

#[utoipa::path(
    get,
    path = "/admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All accounts", body = AdminDashboardResponse),
        (status = 401, description = "Authentication required"),
        (status = 403, description = "Admin role required"),
    ),
    tag = "admin"
)]
pub async fn dashboard(State(state): State<AppState>) -> Result<Json<AdminDashboardResponse>, AppError> {
    let users: Vec<_> = User::list(&state.db_pool)
        .await?
        .iter()
        .map(User::to_dto)
        .collect();

    Ok(Json(AdminDashboardResponse {
        message: "Admin dashboard".to_string(),
        total_users: users.len(),
        users,
    }))
}

#[utoipa::path(
    get,
    path = "/moderator",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Moderator panel"),
        (status = 401, description = "Authentication required"),
        (status = 403, description = "Admin or moderator role required"),
    ),
    tag = "admin"
)]
pub async fn moderator_panel(user: AuthUser) -> Json<Value> {
    Json(json!({
        "message": "Moderator panel",
        "user": user,
    }))
}

/// Every account with the number of tasks it owns.
#[utoipa::path(
    get,
    path = "/admin/users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Accounts with task counts", body = UserListResponse),
        (status = 401, description = "Authentication required"),
        (status = 403, description = "Admin role required"),
    ),
    tag = "admin"
)]
pub async fn list_users(State(state): State<AppState>) -> Result<Json<UserListResponse>, AppError> {
    let users = User::list_with_task_counts(&state.db_pool).await?;
    tracing::info!("Listing {} users", users.len());

    Ok(Json(UserListResponse {
        count: users.len(),
        users,
    }))
}

#[utoipa::path(
    delete,
    path = "/users/{id}",
    params(("id" = i64, Path, description = "User id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "User deleted", body = DeleteUserResponse),
        (status = 400, description = "Malformed id"),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "User not found"),
    ),
    tag = "admin"
)]
pub async fn delete_user(
    State(state): State<AppState>,
    admin: AuthUser,
    ResourceId(id): ResourceId,
) -> Result<Json<DeleteUserResponse>, AppError> {
    tracing::info!("Admin {} deleting user {}", admin.user_id, id);

    let deleted = User::delete(&state.db_pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(Json(DeleteUserResponse {
        message: "User deleted successfully".to_string(),
        deleted_user: DeletedUser {
            id: deleted.id,
            email: deleted.email,
        },
    }))
}
